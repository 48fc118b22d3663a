use chrono::{DateTime, Utc};
use serde_json::Value;

/// Epoch milliseconds as sent by the cloud. Zero and negatives mean "unset".
pub(crate) fn epoch_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.filter(|ms| *ms > 0)
        .and_then(DateTime::from_timestamp_millis)
}

/// The `type` discriminator of a device, group, or journal record.
pub(crate) fn type_tag(record: &Value) -> Option<&str> {
    record
        .get("type")
        .or_else(|| record.get("eventType"))
        .and_then(Value::as_str)
}
