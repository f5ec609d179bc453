use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FieldSpec, Record};
use crate::config::DEFAULT_REPORT_STATUS;
use crate::error::FieldError;

/// A reported piece of road damage (pothole, crack, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadReport {
    /// Assigned by the store on insert.
    #[serde(default)]
    pub roadreport_num: Option<u64>,
    /// Reporting member; `None` for reports raised by detection devices.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub roadreport_image: Option<String>,
    /// `"<lat>,<lng>"`.
    pub roadreport_latlng: String,
    pub roadreport_damagetype: String,
    #[serde(default = "default_status")]
    pub roadreport_status: String,
    #[serde(default)]
    pub roadreport_region: Option<String>,
    #[serde(default)]
    pub roadreport_address: Option<String>,
    pub roadreport_time: DateTime<Utc>,
}

fn default_status() -> String {
    DEFAULT_REPORT_STATUS.to_string()
}

impl RoadReport {
    /// Parsed coordinates, if `roadreport_latlng` is a pair of finite floats.
    pub fn lat_lng(&self) -> Option<(f64, f64)> {
        parse_lat_lng(&self.roadreport_latlng)
    }
}

pub fn parse_lat_lng(raw: &str) -> Option<(f64, f64)> {
    let (lat, lng) = raw.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    if lat.is_finite() && lng.is_finite() {
        Some((lat, lng))
    } else {
        None
    }
}

impl Record for RoadReport {
    const KIND: &'static str = "road_report";
    const KEY_FIELD: &'static str = "roadreport_num";
    const AUTO_KEY: bool = true;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::integer("roadreport_num").bounded(1, i64::MAX).optional(),
        FieldSpec::text("user_id", 50).optional(),
        FieldSpec::text("roadreport_image", 500).optional().blank(),
        FieldSpec::text("roadreport_latlng", 100),
        FieldSpec::text("roadreport_damagetype", 50),
        FieldSpec::text("roadreport_status", 20).defaulted(),
        FieldSpec::text("roadreport_region", 100).optional().blank(),
        FieldSpec::text("roadreport_address", 255).optional().blank(),
        FieldSpec::timestamp("roadreport_time"),
    ];

    fn key(&self) -> Option<String> {
        self.roadreport_num.map(|n| n.to_string())
    }

    fn assign_key(&mut self, next: u64) {
        self.roadreport_num = Some(next);
    }

    fn clean(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.lat_lng().is_none() {
            errors.push(FieldError::new(
                "roadreport_latlng",
                "Enter coordinates as \"<lat>,<lng>\".",
            ));
        }
        errors
    }
}
