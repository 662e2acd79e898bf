use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{habits, prelude::*, progress};
use crate::models::habit::{Habit, HabitDraft, HabitPatch, HabitStats};

/// Repository for habit definitions. Every operation is scoped to the
/// owning user id; a habit another user owns is indistinguishable from
/// one that does not exist.
pub struct HabitRepository {
    conn: DatabaseConnection,
}

#[derive(FromQueryResult)]
struct CategoryCountRow {
    category: String,
    count: i64,
}

impl HabitRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Habit>> {
        let rows = Habits::find()
            .filter(habits::Column::UserId.eq(user_id))
            .order_by_desc(habits::Column::CreatedAt)
            .order_by_desc(habits::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list habits")?;

        Ok(rows.into_iter().map(Habit::from).collect())
    }

    pub async fn get(&self, user_id: i32, id: i32) -> Result<Option<Habit>> {
        Ok(self.get_model(user_id, id).await?.map(Habit::from))
    }

    async fn get_model(&self, user_id: i32, id: i32) -> Result<Option<habits::Model>> {
        Habits::find_by_id(id)
            .filter(habits::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query habit")
    }

    pub async fn create(&self, user_id: i32, draft: HabitDraft) -> Result<Habit> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = habits::ActiveModel {
            user_id: Set(user_id),
            name: Set(draft.name),
            description: Set(draft.description),
            category: Set(draft.category),
            frequency: Set(draft.frequency),
            target_value: Set(draft.target_value),
            unit: Set(draft.unit),
            color: Set(draft.color),
            reminder: Set(serde_json::to_string(&draft.reminder)?),
            is_active: Set(true),
            start_date: Set(now.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await.context("Failed to insert habit")?;
        Ok(Habit::from(model))
    }

    /// Applies only the fields the patch provides; returns `None` when the
    /// habit is absent or owned by someone else.
    pub async fn update(&self, user_id: i32, id: i32, patch: HabitPatch) -> Result<Option<Habit>> {
        let Some(model) = self.get_model(user_id, id).await? else {
            return Ok(None);
        };

        let mut active: habits::ActiveModel = model.into();

        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(frequency) = patch.frequency {
            active.frequency = Set(frequency);
        }
        if let Some(target_value) = patch.target_value {
            active.target_value = Set(target_value);
        }
        if let Some(unit) = patch.unit {
            active.unit = Set(Some(unit));
        }
        if let Some(color) = patch.color {
            active.color = Set(color);
        }
        if let Some(reminder) = patch.reminder {
            active.reminder = Set(serde_json::to_string(&reminder)?);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await.context("Failed to update habit")?;
        Ok(Some(Habit::from(updated)))
    }

    /// Removes the habit and all progress records referencing it, so no
    /// progress row is ever left pointing at a missing habit.
    pub async fn delete(&self, user_id: i32, id: i32) -> Result<bool> {
        if self.get_model(user_id, id).await?.is_none() {
            return Ok(false);
        }

        Progress::delete_many()
            .filter(progress::Column::UserId.eq(user_id))
            .filter(progress::Column::HabitId.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete progress for habit")?;

        let result = Habits::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete habit")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn toggle_active(&self, user_id: i32, id: i32) -> Result<Option<Habit>> {
        let Some(model) = self.get_model(user_id, id).await? else {
            return Ok(None);
        };

        let is_active = model.is_active;
        let mut active: habits::ActiveModel = model.into();
        active.is_active = Set(!is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await.context("Failed to toggle habit")?;
        Ok(Some(Habit::from(updated)))
    }

    pub async fn count_active(&self, user_id: i32) -> Result<u64> {
        Habits::find()
            .filter(habits::Column::UserId.eq(user_id))
            .filter(habits::Column::IsActive.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count active habits")
    }

    pub async fn stats(&self, user_id: i32) -> Result<HabitStats> {
        let total = Habits::find()
            .filter(habits::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count habits")?;

        let active = self.count_active(user_id).await?;

        let rows = Habits::find()
            .select_only()
            .column(habits::Column::Category)
            .column_as(habits::Column::Id.count(), "count")
            .filter(habits::Column::UserId.eq(user_id))
            .group_by(habits::Column::Category)
            .into_model::<CategoryCountRow>()
            .all(&self.conn)
            .await
            .context("Failed to count habits by category")?;

        Ok(HabitStats {
            total,
            active,
            by_category: rows.into_iter().map(|r| (r.category, r.count)).collect(),
        })
    }
}
