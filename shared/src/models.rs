//! Shared data models.

use serde::Serialize;
use serde_json::Value;

/// A schedule entry after normalization, in the shape the browser client expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSchedule {
    pub tour_name: String,
    pub start_time: String,
    pub end_time: String,
    pub available: i64,
    /// Minutes
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tour_id: Option<Value>,
    pub custom_fields: CustomFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomFields {
    pub field1: String,
    pub field2: String,
    pub field3: String,
    pub field4: String,
}

/// Success payload returned by the schedule proxy.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub success: bool,
    pub data: Vec<NormalizedSchedule>,
    pub last_updated: String,
    pub total_schedules: usize,
    pub source: &'static str,
    /// Diagnostics only; the shape may change without notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub response_keys: Vec<String>,
    pub raw_sample: String,
}

pub const RAW_SAMPLE_CHARS: usize = 200;

impl DebugInfo {
    pub fn from_raw(raw: &Value) -> Self {
        let response_keys = match raw {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        Self {
            response_keys,
            raw_sample: raw.to_string().chars().take(RAW_SAMPLE_CHARS).collect(),
        }
    }
}

/// 400 payload for missing credentials.
#[derive(Debug, Serialize)]
pub struct UsageError {
    pub error: String,
    pub usage: &'static str,
}

/// Payload mirroring an upstream failure.
#[derive(Debug, Serialize)]
pub struct UpstreamErrorBody {
    pub error: &'static str,
    pub message: String,
    pub details: String,
    pub url: String,
    pub timestamp: String,
}

/// 500 payload for anything that went wrong inside the proxy.
#[derive(Debug, Serialize)]
pub struct ProxyErrorBody {
    pub error: &'static str,
    pub message: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schedule_serializes_camel_case() {
        let schedule = NormalizedSchedule {
            tour_name: "Night Tour".to_string(),
            start_time: "2099-01-01T20:00:00Z".to_string(),
            end_time: "2099-01-01T20:00:00Z".to_string(),
            available: 10,
            duration: 75,
            schedule_id: Some(json!(42)),
            tour_id: None,
            custom_fields: CustomFields::default(),
        };
        let value = serde_json::to_value(&schedule).unwrap();
        assert_eq!(value["tourName"], "Night Tour");
        assert_eq!(value["scheduleId"], 42);
        assert!(value.get("tourId").is_none());
        assert_eq!(value["customFields"]["field4"], "");
    }

    #[test]
    fn test_debug_info_truncates_sample() {
        let raw = json!({ "Schedules": vec!["x".repeat(50); 10] });
        let info = DebugInfo::from_raw(&raw);
        assert_eq!(info.response_keys, vec!["Schedules"]);
        assert_eq!(info.raw_sample.chars().count(), RAW_SAMPLE_CHARS);
    }
}
