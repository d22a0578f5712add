// HTTP routes served by the gateway.

pub const INGEST: &str = "/api/alert";
pub const DEVICES: &str = "/api/devices";
pub const SUBSCRIBE: &str = "/ws";
pub const HEALTH: &str = "/health";
pub const STATIC_PREFIX: &str = "/static";
