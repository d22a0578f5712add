use std::sync::Arc;

use tracing::info;

use crate::error::{EdenError, Result};
use crate::types::{DeviceKind, DeviceRecord, Location, DEFAULT_DEVICE_STATUS};

/// Read-only device table loaded once at startup.
///
/// Cloning shares the same backing slice; there is no write path.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    devices: Arc<[DeviceRecord]>,
}

impl DeviceCatalog {
    /// Build a catalog, rejecting entries with an empty id or bad coordinates.
    pub fn new(devices: Vec<DeviceRecord>) -> Result<Self> {
        for device in &devices {
            if device.node_id.trim().is_empty() {
                return Err(EdenError::Catalog {
                    node_id: device.node_id.clone(),
                    reason: "node_id must not be empty".to_string(),
                });
            }
            let problem = device
                .location
                .lat_problem()
                .map(|r| format!("location.lat {r}"))
                .or_else(|| device.location.lon_problem().map(|r| format!("location.lon {r}")));
            if let Some(reason) = problem {
                return Err(EdenError::Catalog {
                    node_id: device.node_id.clone(),
                    reason,
                });
            }
        }
        info!(devices = devices.len(), "device catalog loaded");
        Ok(Self {
            devices: devices.into(),
        })
    }

    /// Demo seed used when the config declares no devices.
    pub fn sample() -> Self {
        Self {
            devices: sample_devices().into(),
        }
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn sample_devices() -> Vec<DeviceRecord> {
    let device = |node_id: &str, kind, lat, lon| DeviceRecord {
        node_id: node_id.to_string(),
        kind,
        location: Location::new(lat, lon),
        status: DEFAULT_DEVICE_STATUS.to_string(),
    };
    vec![
        device("Camera-Node-001", DeviceKind::Camera, 34.68912, 33.03521),
        device("Camera-Node-002", DeviceKind::Camera, 34.67834, 33.04987),
        device("Camera-Node-003", DeviceKind::Camera, 34.69345, 33.05612),
        device("Anchor-Node-001", DeviceKind::Anchor, 34.68501, 33.04102),
    ]
}
