use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-minute submission counter backing the rate limit.
///
/// `bucket` is the minute index (unix seconds / 60). Incremented with an
/// atomic upsert so two racing submissions cannot both read a stale count.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attempt_rate_bucket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub contest_id: i32,
    #[sea_orm(primary_key)]
    pub participant_id: i32,
    #[sea_orm(primary_key)]
    pub bucket: i64,

    pub count: i32,
}

impl ActiveModelBehavior for ActiveModel {}
