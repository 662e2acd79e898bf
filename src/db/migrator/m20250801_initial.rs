use crate::entities::prelude::*;
use crate::entities::{habits, progress};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Habits)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Progress)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One progress record per (user, habit, date). The store, not
        // application logic, guarantees concurrent upserts cannot both
        // insert for the same triple.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_progress_user_habit_date")
                    .table(Progress)
                    .col(progress::Column::UserId)
                    .col(progress::Column::HabitId)
                    .col(progress::Column::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_habits_user")
                    .table(Habits)
                    .col(habits::Column::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_progress_user_date")
                    .table(Progress)
                    .col(progress::Column::UserId)
                    .col(progress::Column::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Progress).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Habits).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
