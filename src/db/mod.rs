use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::progress;
use crate::models::habit::{Habit, HabitDraft, HabitPatch, HabitStats};
use crate::models::progress::ProgressEntry;

pub mod migrator;
pub mod repositories;

pub use repositories::progress::ProgressFilter;
pub use repositories::user::{RegisterOutcome, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn habit_repo(&self) -> repositories::habit::HabitRepository {
        repositories::habit::HabitRepository::new(self.conn.clone())
    }

    fn progress_repo(&self) -> repositories::progress::ProgressRepository {
        repositories::progress::ProgressRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<RegisterOutcome> {
        self.user_repo()
            .register(username, email, password_hash)
            .await
    }

    pub async fn verify_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo()
            .verify_credentials(identifier, password)
            .await
    }

    // ========== Habits ==========

    pub async fn list_habits(&self, user_id: i32) -> Result<Vec<Habit>> {
        self.habit_repo().list_for_user(user_id).await
    }

    pub async fn get_habit(&self, user_id: i32, id: i32) -> Result<Option<Habit>> {
        self.habit_repo().get(user_id, id).await
    }

    pub async fn create_habit(&self, user_id: i32, draft: HabitDraft) -> Result<Habit> {
        self.habit_repo().create(user_id, draft).await
    }

    pub async fn update_habit(
        &self,
        user_id: i32,
        id: i32,
        patch: HabitPatch,
    ) -> Result<Option<Habit>> {
        self.habit_repo().update(user_id, id, patch).await
    }

    pub async fn delete_habit(&self, user_id: i32, id: i32) -> Result<bool> {
        self.habit_repo().delete(user_id, id).await
    }

    pub async fn toggle_habit_active(&self, user_id: i32, id: i32) -> Result<Option<Habit>> {
        self.habit_repo().toggle_active(user_id, id).await
    }

    pub async fn count_active_habits(&self, user_id: i32) -> Result<u64> {
        self.habit_repo().count_active(user_id).await
    }

    pub async fn habit_stats(&self, user_id: i32) -> Result<HabitStats> {
        self.habit_repo().stats(user_id).await
    }

    // ========== Progress ==========

    pub async fn get_progress(&self, user_id: i32, id: i32) -> Result<Option<progress::Model>> {
        self.progress_repo().get(user_id, id).await
    }

    pub async fn find_progress_by_triple(
        &self,
        user_id: i32,
        habit_id: i32,
        date: &str,
    ) -> Result<Option<progress::Model>> {
        self.progress_repo()
            .find_by_triple(user_id, habit_id, date)
            .await
    }

    pub async fn upsert_progress(
        &self,
        user_id: i32,
        habit: &Habit,
        date: &str,
        value: f64,
        notes: Option<String>,
    ) -> Result<(ProgressEntry, bool)> {
        self.progress_repo()
            .upsert(user_id, habit, date, value, notes)
            .await
    }

    pub async fn update_progress_by_id(
        &self,
        model: progress::Model,
        habit: &Habit,
        date: &str,
        value: f64,
        notes: Option<String>,
    ) -> Result<ProgressEntry> {
        self.progress_repo()
            .update_by_id(model, habit, date, value, notes)
            .await
    }

    pub async fn toggle_progress_completion(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<Option<progress::Model>> {
        self.progress_repo().toggle_completion(user_id, id).await
    }

    pub async fn delete_progress(&self, user_id: i32, id: i32) -> Result<bool> {
        self.progress_repo().delete(user_id, id).await
    }

    pub async fn query_progress(
        &self,
        user_id: i32,
        filter: ProgressFilter,
    ) -> Result<Vec<ProgressEntry>> {
        self.progress_repo().query(user_id, filter).await
    }

    pub async fn count_completed_between(
        &self,
        user_id: i32,
        start_date: &str,
        end_date: &str,
    ) -> Result<u64> {
        self.progress_repo()
            .count_completed_between(user_id, start_date, end_date)
            .await
    }

    pub async fn count_completed_total(&self, user_id: i32) -> Result<u64> {
        self.progress_repo().count_completed_total(user_id).await
    }
}
