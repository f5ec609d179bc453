use serde::{Deserialize, Serialize};

use super::{FieldSpec, Record};

pub const PASSWORD_FIELD: &str = "user_pw";

/// A registered member account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Users {
    pub user_id: String,
    /// Hashed form once stored; plaintext only between validation and hashing.
    pub user_pw: String,
    pub user_name: String,
    #[serde(default)]
    pub user_age: Option<i64>,
    #[serde(default)]
    pub user_phonenumber: Option<String>,
}

impl Record for Users {
    const KIND: &'static str = "users";
    const KEY_FIELD: &'static str = "user_id";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("user_id", 50),
        FieldSpec::text(PASSWORD_FIELD, 128),
        FieldSpec::text("user_name", 50),
        FieldSpec::integer("user_age").bounded(1, 120).optional(),
        FieldSpec::text("user_phonenumber", 20).optional().blank(),
    ];

    fn key(&self) -> Option<String> {
        Some(self.user_id.clone())
    }
}
