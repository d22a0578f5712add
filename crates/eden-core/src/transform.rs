//! Raw alert → canonical alert.
//!
//! Pure and synchronous: validation, id assignment and timestamp formatting.
//! Nothing here touches the network or the connection registry.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{FieldError, ValidationError};
use crate::types::{CanonicalAlert, RawAlert, ALERT_ID_PREFIX, INITIAL_ALERT_STATUS};

/// Timestamp layout shown to viewers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Validates and normalizes producer alerts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertTransformer;

impl AlertTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform using the current wall clock as the ingestion instant.
    pub fn transform(&self, raw: RawAlert) -> Result<CanonicalAlert, ValidationError> {
        self.transform_at(raw, Utc::now())
    }

    /// Transform with an explicit ingestion instant, substituted when the
    /// alert carries no timestamp of its own.
    pub fn transform_at(
        &self,
        raw: RawAlert,
        ingested_at: DateTime<Utc>,
    ) -> Result<CanonicalAlert, ValidationError> {
        validate(&raw)?;

        let timestamp = raw.timestamp.unwrap_or(ingested_at);

        Ok(CanonicalAlert {
            alert_id: new_alert_id(),
            node_id: raw.node_id,
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            location: raw.location,
            confidence: raw.confidence,
            status: INITIAL_ALERT_STATUS.to_string(),
            evidence_image: raw.evidence_image,
        })
    }
}

/// Fresh id per call, never derived from the input, so duplicate submissions
/// stay distinct alerts.
pub fn new_alert_id() -> String {
    format!("{}{}", ALERT_ID_PREFIX, Uuid::new_v4())
}

fn validate(raw: &RawAlert) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if raw.node_id.trim().is_empty() {
        errors.push(FieldError::new("node_id", "must not be empty"));
    }
    if !(raw.confidence > 0.0 && raw.confidence <= 1.0) {
        errors.push(FieldError::new(
            "confidence",
            "must be greater than 0 and at most 1",
        ));
    }
    if let Some(reason) = raw.location.lat_problem() {
        errors.push(FieldError::new("location.lat", reason));
    }
    if let Some(reason) = raw.location.lon_problem() {
        errors.push(FieldError::new("location.lon", reason));
    }
    if raw.evidence_image.is_empty() {
        errors.push(FieldError::new("evidence_image", "must not be empty"));
    }

    ValidationError::check(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn raw() -> RawAlert {
        RawAlert {
            node_id: "Cam-1".to_string(),
            timestamp: None,
            location: Location::new(34.7, 32.9),
            confidence: 0.9,
            evidence_image: "x".to_string(),
        }
    }

    #[test]
    fn passes_fields_through_and_marks_unconfirmed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let alert = AlertTransformer::new().transform_at(raw(), now).unwrap();

        assert!(alert.alert_id.starts_with("eden-alert-"));
        assert!(alert.alert_id.len() > ALERT_ID_PREFIX.len());
        assert_eq!(alert.node_id, "Cam-1");
        assert_eq!(alert.location, Location::new(34.7, 32.9));
        assert_eq!(alert.confidence, 0.9);
        assert_eq!(alert.evidence_image, "x");
        assert_eq!(alert.status, "Unconfirmed");
        assert_eq!(alert.timestamp, "2024-03-05 07:08:09 UTC");
    }

    #[test]
    fn explicit_timestamp_wins_over_ingestion_time() {
        let sent = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap();
        let alert = AlertTransformer::new()
            .transform_at(RawAlert { timestamp: Some(sent), ..raw() }, now)
            .unwrap();
        assert_eq!(alert.timestamp, "2023-12-31 23:59:58 UTC");
    }

    #[test]
    fn identical_input_never_collides() {
        let t = AlertTransformer::new();
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let alert = t.transform(raw()).unwrap();
            assert!(ids.insert(alert.alert_id), "duplicate alert id");
        }
    }

    #[test]
    fn confidence_must_be_in_half_open_unit_interval() {
        let t = AlertTransformer::new();
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let err = t.transform(RawAlert { confidence: bad, ..raw() }).unwrap_err();
            assert_eq!(err.fields().collect::<Vec<_>>(), vec!["confidence"]);
        }
        assert!(t.transform(RawAlert { confidence: 1.0, ..raw() }).is_ok());
        assert!(t.transform(RawAlert { confidence: 0.0001, ..raw() }).is_ok());
    }

    #[test]
    fn reports_every_bad_field() {
        let bad = RawAlert {
            node_id: "   ".to_string(),
            timestamp: None,
            location: Location::new(91.0, -181.0),
            confidence: 2.0,
            evidence_image: String::new(),
        };
        let err = AlertTransformer::new().transform(bad).unwrap_err();
        let fields: Vec<&str> = err.fields().collect();
        assert_eq!(
            fields,
            vec![
                "node_id",
                "confidence",
                "location.lat",
                "location.lon",
                "evidence_image"
            ]
        );
    }
}
