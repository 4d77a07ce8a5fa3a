use crate::db::schema::sync_state;
use diesel::prelude::*;

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = sync_state)]
pub struct SyncStateRow {
    pub key: String,
    pub value_ms: i64,
}
