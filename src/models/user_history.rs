use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FieldSpec, Record};

/// One route a user searched for, start to end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserHistory {
    /// Assigned by the store on insert.
    #[serde(default)]
    pub userhistory_num: Option<u64>,
    pub user_id: String,
    pub userhistory_start: String,
    pub userhistory_end: String,
    pub userhistory_time: DateTime<Utc>,
}

impl Record for UserHistory {
    const KIND: &'static str = "user_history";
    const KEY_FIELD: &'static str = "userhistory_num";
    const AUTO_KEY: bool = true;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::integer("userhistory_num").bounded(1, i64::MAX).optional(),
        FieldSpec::text("user_id", 50),
        FieldSpec::text("userhistory_start", 255),
        FieldSpec::text("userhistory_end", 255),
        FieldSpec::timestamp("userhistory_time"),
    ];

    fn key(&self) -> Option<String> {
        self.userhistory_num.map(|n| n.to_string())
    }

    fn assign_key(&mut self, next: u64) {
        self.userhistory_num = Some(next);
    }
}
