use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::Config;
use crate::db::Store;
use crate::services::{Notifier, TokenService};

/// Process-wide store-connectivity flag.
///
/// Lifecycle: set on the startup connection attempt, updated by the
/// monitor task on reconnect/disconnect, read (never written) by
/// request-handling code.
pub struct DbHealth(AtomicBool);

impl DbHealth {
    #[must_use]
    pub const fn new(up: bool) -> Self {
        Self(AtomicBool::new(up))
    }

    pub fn set_up(&self, up: bool) {
        self.0.store(up, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tokens: TokenService,

    pub notifier: Arc<Notifier>,

    pub db_health: Arc<DbHealth>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let secret = if config.auth.jwt_secret.is_empty() {
            warn!("No JWT secret configured, generating an ephemeral one; tokens will not survive a restart");
            generate_secret()
        } else {
            config.auth.jwt_secret.clone()
        };
        let tokens = TokenService::new(&secret, config.auth.token_expiry_days);

        let notifier = Arc::new(Notifier::new(config.general.event_buffer_size));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            tokens,
            notifier,
            db_health: Arc::new(DbHealth::new(true)),
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}

/// Random 64-char hex secret for installs that have not configured one.
fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
