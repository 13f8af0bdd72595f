use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A physical fingerprint / check-in terminal. Edited by administration only;
/// the engine treats rows as read-only apart from the capture cursor.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "company_id": 10,
    "name": "Lobby Terminal",
    "ip_address": "10.0.4.21",
    "port": 4370,
    "retrieval_times": "08:00,13:00,18:00",
    "last_captured_at": "2026-01-01T08:02:11",
    "is_active": true
}))]
pub struct Device {
    #[schema(example = 1)]
    pub id: u64,

    /// Company that owns the device; polling targets are scoped to it.
    #[schema(example = 10)]
    pub company_id: u64,

    #[schema(example = "Lobby Terminal")]
    pub name: String,

    #[schema(example = "10.0.4.21")]
    pub ip_address: String,

    #[schema(example = 4370)]
    pub port: u16,

    /// Comma-separated "HH:MM" time-of-day values at which the device
    /// should be polled.
    #[schema(example = "08:00,13:00,18:00")]
    pub retrieval_times: String,

    /// High-water mark of the last punch batch saved for this device.
    #[schema(example = "2026-01-01T08:02:11", value_type = String, format = "date-time", nullable = true)]
    pub last_captured_at: Option<NaiveDateTime>,

    pub is_active: bool,
}

impl Device {
    /// Parses the configured retrieval times, silently skipping entries that
    /// do not parse as "HH:MM". An empty or unparseable column yields an
    /// empty set, which means the device is never polled.
    pub fn retrieval_times(&self) -> Vec<NaiveTime> {
        self.retrieval_times
            .split(',')
            .filter_map(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
            .collect()
    }
}
