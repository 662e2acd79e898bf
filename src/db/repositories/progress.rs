use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::entities::{prelude::*, progress};
use crate::models::habit::Habit;
use crate::models::progress::{HabitSummary, ProgressEntry, derive_completion};

/// Optional filters for progress queries, all scoped to the user.
#[derive(Clone, Debug, Default)]
pub struct ProgressFilter {
    pub habit_id: Option<i32>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u64>,
}

/// Repository for progress records. Owns the upsert path and the
/// one-record-per-(user, habit, date) invariant recovery.
pub struct ProgressRepository {
    conn: DatabaseConnection,
}

impl ProgressRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: i32, id: i32) -> Result<Option<progress::Model>> {
        Progress::find_by_id(id)
            .filter(progress::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query progress record")
    }

    pub async fn find_by_triple(
        &self,
        user_id: i32,
        habit_id: i32,
        date: &str,
    ) -> Result<Option<progress::Model>> {
        Progress::find()
            .filter(progress::Column::UserId.eq(user_id))
            .filter(progress::Column::HabitId.eq(habit_id))
            .filter(progress::Column::Date.eq(date))
            .one(&self.conn)
            .await
            .context("Failed to query progress by habit and date")
    }

    /// Create-or-update for (user, habit, date). Returns the stored entry
    /// and whether it was created.
    ///
    /// Two concurrent calls for the same triple can both miss the lookup
    /// and race to insert; the unique index lets exactly one through, and
    /// the loser retries as an update of the now-existing row. The caller
    /// never sees the race.
    pub async fn upsert(
        &self,
        user_id: i32,
        habit: &Habit,
        date: &str,
        value: f64,
        notes: Option<String>,
    ) -> Result<(ProgressEntry, bool)> {
        if let Some(existing) = self.find_by_triple(user_id, habit.id, date).await? {
            let entry = self.apply_values(existing, habit, value, notes).await?;
            return Ok((entry, false));
        }

        let (completed, completed_at) = derive_completion(value, habit.target_value);
        let now = chrono::Utc::now().to_rfc3339();

        let active = progress::ActiveModel {
            user_id: Set(user_id),
            habit_id: Set(habit.id),
            date: Set(date.to_string()),
            value: Set(value),
            notes: Set(notes.clone()),
            completed: Set(completed),
            completed_at: Set(completed_at),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok((
                ProgressEntry::from_parts(model, HabitSummary::from(habit)),
                true,
            )),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Lost the insert race; the row exists now.
                let existing = self
                    .find_by_triple(user_id, habit.id, date)
                    .await?
                    .ok_or_else(|| {
                        anyhow::anyhow!("Progress row vanished after unique violation")
                    })?;
                let entry = self.apply_values(existing, habit, value, notes).await?;
                Ok((entry, false))
            }
            Err(e) => Err(e).context("Failed to insert progress record"),
        }
    }

    /// Overwrite value/notes on an existing row and re-derive completion
    /// from the habit's target.
    async fn apply_values(
        &self,
        model: progress::Model,
        habit: &Habit,
        value: f64,
        notes: Option<String>,
    ) -> Result<ProgressEntry> {
        let (completed, completed_at) = derive_completion(value, habit.target_value);

        let mut active: progress::ActiveModel = model.into();
        active.value = Set(value);
        active.notes = Set(notes);
        active.completed = Set(completed);
        active.completed_at = Set(completed_at);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update progress record")?;

        Ok(ProgressEntry::from_parts(updated, HabitSummary::from(habit)))
    }

    /// Full update of a record by its own id, including retargeting its
    /// (habit, date) pair. The caller has already checked the target pair
    /// is not occupied by a different record.
    pub async fn update_by_id(
        &self,
        model: progress::Model,
        habit: &Habit,
        date: &str,
        value: f64,
        notes: Option<String>,
    ) -> Result<ProgressEntry> {
        let (completed, completed_at) = derive_completion(value, habit.target_value);

        let mut active: progress::ActiveModel = model.into();
        active.habit_id = Set(habit.id);
        active.date = Set(date.to_string());
        active.value = Set(value);
        active.notes = Set(notes);
        active.completed = Set(completed);
        active.completed_at = Set(completed_at);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update progress record")?;

        Ok(ProgressEntry::from_parts(updated, HabitSummary::from(habit)))
    }

    /// Manual completion override: flips `completed` without consulting the
    /// value/target rule. `completed_at` follows the new flag.
    pub async fn toggle_completion(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<Option<progress::Model>> {
        let Some(model) = self.get(user_id, id).await? else {
            return Ok(None);
        };

        let completed = !model.completed;
        let mut active: progress::ActiveModel = model.into();
        active.completed = Set(completed);
        active.completed_at = Set(completed.then(|| chrono::Utc::now().to_rfc3339()));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to toggle progress completion")?;

        Ok(Some(updated))
    }

    pub async fn delete(&self, user_id: i32, id: i32) -> Result<bool> {
        let result = Progress::delete_many()
            .filter(progress::Column::Id.eq(id))
            .filter(progress::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete progress record")?;

        Ok(result.rows_affected > 0)
    }

    /// Matching records newest-date first, each paired with its parent
    /// habit row for summary annotation.
    pub async fn query(
        &self,
        user_id: i32,
        filter: ProgressFilter,
    ) -> Result<Vec<ProgressEntry>> {
        let mut select = Progress::find()
            .find_also_related(Habits)
            .filter(progress::Column::UserId.eq(user_id));

        if let Some(habit_id) = filter.habit_id {
            select = select.filter(progress::Column::HabitId.eq(habit_id));
        }
        if let Some(date) = filter.date {
            select = select.filter(progress::Column::Date.eq(date));
        }
        if let Some(start) = filter.start_date {
            select = select.filter(progress::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            select = select.filter(progress::Column::Date.lte(end));
        }

        let mut select = select
            .order_by_desc(progress::Column::Date)
            .order_by_desc(progress::Column::Id);

        if let Some(limit) = filter.limit {
            select = select.limit(limit);
        }

        let rows = select
            .all(&self.conn)
            .await
            .context("Failed to query progress records")?;

        Ok(rows
            .into_iter()
            .filter_map(|(model, habit)| {
                let habit = Habit::from(habit?);
                Some(ProgressEntry::from_parts(model, HabitSummary::from(&habit)))
            })
            .collect())
    }

    pub async fn count_completed_between(
        &self,
        user_id: i32,
        start_date: &str,
        end_date: &str,
    ) -> Result<u64> {
        Progress::find()
            .filter(progress::Column::UserId.eq(user_id))
            .filter(progress::Column::Completed.eq(true))
            .filter(progress::Column::Date.gte(start_date))
            .filter(progress::Column::Date.lte(end_date))
            .count(&self.conn)
            .await
            .context("Failed to count completed progress in range")
    }

    pub async fn count_completed_total(&self, user_id: i32) -> Result<u64> {
        Progress::find()
            .filter(progress::Column::UserId.eq(user_id))
            .filter(progress::Column::Completed.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count completed progress")
    }
}
