use chrono::{DateTime, NaiveDateTime, Utc};
use eden_core::error::{FieldError, ValidationError};
use eden_core::types::{Location, RawAlert};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Producer → gateway alert body, as loosely typed as JSON allows.
///
/// Wire: `{ "node_id": "Cam-1", "timestamp": "2024-05-01T10:00:00Z",
/// "location": {"lat": 34.7, "lon": 32.9}, "confidence": 0.9,
/// "evidence_image": "data:image/gif;base64,..." }`
///
/// Every field is kept as raw JSON so a wrong type is reported against the
/// field that carries it instead of failing the whole body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(default)]
    pub node_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub evidence_image: Option<Value>,
}

impl AlertPayload {
    /// Check presence and JSON types, producing a typed [`RawAlert`].
    ///
    /// Range checks are left to the transformer.
    pub fn into_raw(self) -> Result<RawAlert, ValidationError> {
        let mut errors = Vec::new();

        let node_id = required_string(self.node_id, "node_id", &mut errors);
        let evidence_image = required_string(self.evidence_image, "evidence_image", &mut errors);
        let confidence = required_number(self.confidence, "confidence", &mut errors);
        let location = parse_location(self.location, &mut errors);

        let timestamp = match self.timestamp {
            None => None,
            Some(Value::String(s)) => match parse_timestamp(&s) {
                Some(ts) => Some(ts),
                None => {
                    errors.push(FieldError::new(
                        "timestamp",
                        "must be an ISO-8601 date-time",
                    ));
                    None
                }
            },
            Some(_) => {
                errors.push(FieldError::new("timestamp", "must be a string"));
                None
            }
        };

        ValidationError::check(errors)?;

        // check() guarantees every required field parsed.
        match (node_id, location, confidence, evidence_image) {
            (Some(node_id), Some(location), Some(confidence), Some(evidence_image)) => {
                Ok(RawAlert {
                    node_id,
                    timestamp,
                    location,
                    confidence,
                    evidence_image,
                })
            }
            _ => Err(ValidationError::single("body", "incomplete alert")),
        }
    }
}

impl From<RawAlert> for AlertPayload {
    fn from(raw: RawAlert) -> Self {
        Self {
            node_id: Some(Value::from(raw.node_id)),
            timestamp: raw.timestamp.map(|ts| Value::from(ts.to_rfc3339())),
            location: Some(serde_json::json!({
                "lat": raw.location.lat,
                "lon": raw.location.lon,
            })),
            confidence: Some(Value::from(raw.confidence)),
            evidence_image: Some(Value::from(raw.evidence_image)),
        }
    }
}

/// Accepts RFC 3339 (`2024-05-01T10:00:00+02:00`) or a naive date-time
/// (`2024-05-01T10:00:00`, `2024-05-01 10:00:00.123`) taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn required_string(value: Option<Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
        None => {
            errors.push(FieldError::new(field, "field required"));
            None
        }
    }
}

fn required_number(value: Option<Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    match value.as_ref().map(Value::as_f64) {
        Some(Some(n)) => Some(n),
        Some(None) => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
        None => {
            errors.push(FieldError::new(field, "field required"));
            None
        }
    }
}

fn parse_location(value: Option<Value>, errors: &mut Vec<FieldError>) -> Option<Location> {
    let mut map = match value {
        Some(Value::Object(map)) => map,
        Some(_) => {
            errors.push(FieldError::new("location", "must be an object"));
            return None;
        }
        None => {
            errors.push(FieldError::new("location", "field required"));
            return None;
        }
    };
    let lat = required_number(map.remove("lat"), "location.lat", errors);
    let lon = required_number(map.remove("lon"), "location.lon", errors);
    Some(Location::new(lat?, lon?))
}
