use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub habit_id: i32,

    /// Calendar day as `YYYY-MM-DD`, never a timestamp.
    pub date: String,

    pub value: f64,

    pub notes: Option<String>,

    pub completed: bool,

    /// Non-null iff `completed` is true.
    pub completed_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::habits::Entity",
        from = "Column::HabitId",
        to = "super::habits::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Habits,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::habits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Habits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
