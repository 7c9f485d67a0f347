use std::collections::BTreeMap;

pub mod influx;
pub mod json;

/// Represents a field value that can be encoded in metrics
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Trait for encoding metrics data into different formats
pub trait MetricsEncoder: Send + Sync {
    /// Encode one point with measurement name, tags, fields and a nanosecond timestamp
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &BTreeMap<String, String>,
        fields: &BTreeMap<String, FieldValue>,
        timestamp: i64,
    ) -> String;
}

/// Output formats of the metrics file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsFormat {
    Influx,
    Json,
}

impl std::str::FromStr for MetricsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "influx" | "influxdb" => Ok(MetricsFormat::Influx),
            "json" => Ok(MetricsFormat::Json),
            other => Err(format!("unknown metrics format '{other}'")),
        }
    }
}

pub fn create_encoder(format: MetricsFormat) -> Box<dyn MetricsEncoder> {
    match format {
        MetricsFormat::Json => Box::new(json::JsonEncoder),
        MetricsFormat::Influx => Box::new(influx::InfluxEncoder),
    }
}
