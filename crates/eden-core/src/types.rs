use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of every server-assigned alert id.
pub const ALERT_ID_PREFIX: &str = "eden-alert-";

/// Status every alert starts with. Nothing in the gateway changes it.
pub const INITIAL_ALERT_STATUS: &str = "Unconfirmed";

/// Status given to catalog devices that don't declare one.
pub const DEFAULT_DEVICE_STATUS: &str = "Monitoring";

/// Per-connection identifier (random UUID, not persisted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WGS84 coordinates. Wire names are `lat` / `lon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reason the latitude is unusable, if any.
    pub fn lat_problem(&self) -> Option<&'static str> {
        if !self.lat.is_finite() {
            Some("must be a finite number")
        } else if !(-90.0..=90.0).contains(&self.lat) {
            Some("must be between -90 and 90")
        } else {
            None
        }
    }

    /// Reason the longitude is unusable, if any.
    pub fn lon_problem(&self) -> Option<&'static str> {
        if !self.lon.is_finite() {
            Some("must be a finite number")
        } else if !(-180.0..=180.0).contains(&self.lon) {
            Some("must be between -180 and 180")
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat_problem().is_none() && self.lon_problem().is_none()
    }
}

/// An alert as submitted by an anchor node, before validation.
///
/// Lives only for the duration of one ingest call.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAlert {
    pub node_id: String,
    /// `None` means "use the ingestion instant".
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Location,
    pub confidence: f64,
    /// Base64 payload or URI reference; opaque to the gateway.
    pub evidence_image: String,
}

/// The normalized, server-identified form of an alert pushed to viewers.
///
/// Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAlert {
    pub alert_id: String,
    pub node_id: String,
    /// `YYYY-MM-DD HH:MM:SS UTC`
    pub timestamp: String,
    pub location: Location,
    pub confidence: f64,
    pub status: String,
    pub evidence_image: String,
}

/// Kind of field device shown in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Camera,
    Anchor,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => write!(f, "Camera"),
            DeviceKind::Anchor => write!(f, "Anchor"),
        }
    }
}

/// One entry of the static device catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub location: Location,
    #[serde(default = "default_device_status")]
    pub status: String,
}

fn default_device_status() -> String {
    DEFAULT_DEVICE_STATUS.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_bounds_are_inclusive() {
        assert!(Location::new(90.0, 180.0).is_valid());
        assert!(Location::new(-90.0, -180.0).is_valid());
        assert_eq!(
            Location::new(90.5, 0.0).lat_problem(),
            Some("must be between -90 and 90")
        );
        assert_eq!(
            Location::new(0.0, -180.1).lon_problem(),
            Some("must be between -180 and 180")
        );
    }

    #[test]
    fn location_rejects_nan() {
        let loc = Location::new(f64::NAN, 0.0);
        assert_eq!(loc.lat_problem(), Some("must be a finite number"));
        assert!(!loc.is_valid());
    }

    #[test]
    fn device_record_uses_type_key_and_default_status() {
        let json = r#"{"node_id":"Cam-1","type":"Camera","location":{"lat":1.0,"lon":2.0}}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.kind, DeviceKind::Camera);
        assert_eq!(device.status, "Monitoring");

        let back = serde_json::to_string(&device).unwrap();
        assert!(back.contains(r#""type":"Camera""#));
    }

    #[test]
    fn conn_ids_are_unique() {
        assert_ne!(ConnId::new(), ConnId::new());
    }
}
