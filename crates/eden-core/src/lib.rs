pub mod catalog;
pub mod config;
pub mod error;
pub mod transform;
pub mod types;

pub use catalog::DeviceCatalog;
pub use config::EdenConfig;
pub use error::{EdenError, FieldError, ValidationError};
pub use transform::AlertTransformer;
pub use types::{CanonicalAlert, ConnId, DeviceKind, DeviceRecord, Location, RawAlert};
