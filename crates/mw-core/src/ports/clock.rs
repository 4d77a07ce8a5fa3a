use chrono::{DateTime, Utc};

use crate::time::from_epoch_millis;

pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> i64;

    fn now(&self) -> DateTime<Utc> {
        from_epoch_millis(self.now_ms())
    }
}
