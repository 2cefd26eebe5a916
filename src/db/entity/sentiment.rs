use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_sentiment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id:    i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub coin_id:    String,
    /// `1` is bullish, `-1` is bearish.
    pub vote:       i16,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
