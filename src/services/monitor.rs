//! Store-connectivity monitor.
//!
//! Pings the database on an interval and keeps the process-wide health
//! flag current. Request handlers only ever read the flag; this task is
//! its single writer after startup.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::state::SharedState;

#[derive(Clone)]
pub struct Monitor {
    state: Arc<SharedState>,
}

impl Monitor {
    #[must_use]
    pub const fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }

    pub async fn start(&self) {
        let interval_seconds = self
            .state
            .config
            .read()
            .await
            .general
            .health_check_interval_seconds;
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        info!("Store health monitor started ({interval_seconds}s interval)");

        loop {
            interval.tick().await;
            self.check_once().await;
        }
    }

    async fn check_once(&self) {
        let was_up = self.state.db_health.is_up();
        match self.state.store.ping().await {
            Ok(()) => {
                if !was_up {
                    info!("Store connection restored");
                }
                self.state.db_health.set_up(true);
            }
            Err(e) => {
                if was_up {
                    error!("Store unreachable: {e}");
                }
                self.state.db_health.set_up(false);
            }
        }
    }
}
