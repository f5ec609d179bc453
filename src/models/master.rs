use serde::{Deserialize, Serialize};

use super::{FieldSpec, Record};

/// An administrator account. Stored exactly as submitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Master {
    pub master_id: String,
    pub master_pw: String,
    pub master_name: String,
    #[serde(default)]
    pub master_phonenumber: Option<String>,
    pub master_grade: String,
}

impl Record for Master {
    const KIND: &'static str = "master";
    const KEY_FIELD: &'static str = "master_id";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("master_id", 50),
        FieldSpec::text("master_pw", 128),
        FieldSpec::text("master_name", 50),
        FieldSpec::text("master_phonenumber", 20).optional().blank(),
        FieldSpec::text("master_grade", 10),
    ];

    fn key(&self) -> Option<String> {
        Some(self.master_id.clone())
    }
}
