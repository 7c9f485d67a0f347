use std::collections::BTreeMap;

use influxdb_line_protocol::LineProtocolBuilder;

use super::FieldValue;
use super::MetricsEncoder;
use crate::infrastructure::metrics::BytesWrapper;

/// InfluxDB line protocol encoder
pub struct InfluxEncoder;

impl MetricsEncoder for InfluxEncoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &BTreeMap<String, String>,
        fields: &BTreeMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        let mut builder = LineProtocolBuilder::new().measurement(measurement);
        for (key, value) in tags {
            builder = builder.tag(key, value);
        }

        // The first field moves the builder into the AfterField state.
        let mut entries = fields.iter();
        let Some((first_key, first_value)) = entries.next() else {
            let line = builder.field("_empty", true).timestamp(timestamp).close_line().build();
            return BytesWrapper::from(line).to_string();
        };

        let mut line = match first_value {
            FieldValue::String(s) => builder.field(first_key, s.as_str()),
            FieldValue::Integer(i) => builder.field(first_key, *i),
            FieldValue::Boolean(b) => builder.field(first_key, *b),
        };
        for (key, value) in entries {
            line = match value {
                FieldValue::String(s) => line.field(key, s.as_str()),
                FieldValue::Integer(i) => line.field(key, *i),
                FieldValue::Boolean(b) => line.field(key, *b),
            };
        }

        BytesWrapper::from(line.timestamp(timestamp).close_line().build()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn encodes_sorted_tags_and_typed_fields() {
        let tags = BTreeMap::from([
            ("namespace".to_string(), "azp".to_string()),
            ("name".to_string(), "azp-agent".to_string()),
        ]);
        let fields = BTreeMap::from([
            ("reason".to_string(), FieldValue::from("scale up")),
            ("busy".to_string(), FieldValue::from(3i32)),
            ("limited".to_string(), FieldValue::from(false)),
        ]);

        let line = InfluxEncoder.encode_metrics("azp_agent_pool", &tags, &fields, 1609459200000000000);

        assert_eq!(
            line,
            "azp_agent_pool,name=azp-agent,namespace=azp busy=3i,limited=false,reason=\"scale up\" 1609459200000000000\n"
        );
    }

    #[test]
    fn empty_fields_get_placeholder() {
        let tags = BTreeMap::from([("name".to_string(), "azp-agent".to_string())]);
        let line = InfluxEncoder.encode_metrics("azp_agent_pool", &tags, &BTreeMap::new(), 42);

        assert!(line.contains("_empty=true"));
        assert!(line.trim_end().ends_with(" 42"));
    }
}
