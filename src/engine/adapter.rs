use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::warn;

use crate::engine::error::{EngineError, EngineResult};
use crate::model::{Device, PunchDirection, RawPunch};

/// External collaborator that pulls raw punches off a terminal.
///
/// Implementations may fail per device (timeout, connection refused,
/// malformed body); the poller catches and continues with the next device.
pub trait DeviceAdapter {
    /// All punches captured since `since` for the given device-side
    /// employee ids. `since = None` means the device has never been read.
    fn retrieve_logs(
        &self,
        device: &Device,
        known_employee_ids: &[String],
        since: Option<NaiveDateTime>,
    ) -> impl Future<Output = EngineResult<Vec<RawPunch>>> + Send;
}

/// Adapter for terminals exposing the vendor's transactions web API.
#[derive(Debug, Clone)]
pub struct HttpDeviceAdapter {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    data: Vec<TransactionItem>,
}

#[derive(Debug, Deserialize)]
struct TransactionItem {
    emp_code: String,
    punch_time: String,
    punch_state: String,
}

impl HttpDeviceAdapter {
    pub fn new(timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    fn device_error(device: &Device, message: impl Into<String>) -> EngineError {
        EngineError::Device {
            device_id: device.id,
            name: device.name.clone(),
            message: message.into(),
        }
    }
}

/// Vendor punch-state codes.
fn direction_from_state(state: &str) -> Option<PunchDirection> {
    match state {
        "0" => Some(PunchDirection::CheckIn),
        "1" => Some(PunchDirection::CheckOut),
        "2" => Some(PunchDirection::BreakOut),
        "3" => Some(PunchDirection::BreakIn),
        "4" => Some(PunchDirection::OvertimeIn),
        "5" => Some(PunchDirection::OvertimeOut),
        _ => None,
    }
}

impl DeviceAdapter for HttpDeviceAdapter {
    async fn retrieve_logs(
        &self,
        device: &Device,
        known_employee_ids: &[String],
        since: Option<NaiveDateTime>,
    ) -> EngineResult<Vec<RawPunch>> {
        let mut url = format!(
            "http://{}:{}/iclock/api/transactions",
            device.ip_address, device.port
        );
        if let Some(cursor) = since {
            url.push_str(&format!("?start_time={}", cursor.format("%Y-%m-%d %H:%M:%S")));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::device_error(device, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::device_error(
                device,
                format!("unexpected status {}", response.status()),
            ));
        }

        let body: TransactionResponse = response
            .json()
            .await
            .map_err(|e| Self::device_error(device, format!("malformed body: {e}")))?;

        let mut punches = Vec::with_capacity(body.data.len());
        for item in body.data {
            if !known_employee_ids.iter().any(|id| *id == item.emp_code) {
                continue;
            }
            let Ok(timestamp) =
                NaiveDateTime::parse_from_str(&item.punch_time, "%Y-%m-%d %H:%M:%S")
            else {
                warn!(device = %device.name, punch_time = %item.punch_time, "unparseable punch time, skipped");
                continue;
            };
            let Some(direction) = direction_from_state(&item.punch_state) else {
                warn!(device = %device.name, state = %item.punch_state, "unknown punch state, skipped");
                continue;
            };
            punches.push(RawPunch {
                device_employee_id: item.emp_code,
                timestamp,
                direction,
            });
        }

        Ok(punches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_vendor_punch_states() {
        assert_eq!(direction_from_state("0"), Some(PunchDirection::CheckIn));
        assert_eq!(direction_from_state("5"), Some(PunchDirection::OvertimeOut));
        assert_eq!(direction_from_state("9"), None);
    }

    #[test]
    fn parses_transaction_payload() {
        let json = r#"{
            "data": [
                { "emp_code": "1000", "punch_time": "2026-01-05 08:57:41", "punch_state": "0" }
            ]
        }"#;
        let parsed: TransactionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].emp_code, "1000");
    }
}
