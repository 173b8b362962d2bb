// Wire types for machine status records
//
// The status server is loose about types: placement fields arrive as
// strings or numbers, probes may be null, and empty strings stand in for
// "not set". Every field except `name` is optional and the lenient
// deserializers below collapse the falsy values (`null`, `""`, `0`,
// `false`) into `None` so consumers only ever see meaningful values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Envelopes ────────────────────────────────────────────────────────

/// REST envelope: `{ "data": { "machines": [...] } }`.
#[derive(Debug, Default, Deserialize)]
pub struct MachinesEnvelope {
    #[serde(default)]
    pub data: Option<MachinesPayload>,
}

impl MachinesEnvelope {
    /// Unwrap the machine list, treating a missing `data` or `machines`
    /// key as an empty snapshot.
    pub fn into_machines(self) -> Vec<MachineRecord> {
        self.data.and_then(|d| d.machines).unwrap_or_default()
    }
}

/// Payload of the REST `data` object and of every `network-status` push.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct MachinesPayload {
    #[serde(default)]
    pub machines: Option<Vec<MachineRecord>>,
}

// ── Machine ──────────────────────────────────────────────────────────

/// One machine as reported by the status server.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct MachineRecord {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bay: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub column: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub machine_row: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub machine_column: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_switch: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gateway: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kiosk_pc: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uplink: Option<String>,
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: ProbeResults,
}

/// Per-endpoint probe outcomes. Any of the three may be missing.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProbeResults {
    #[serde(default, deserialize_with = "lenient_probe")]
    pub ip: Option<ProbeRecord>,
    #[serde(default, deserialize_with = "lenient_probe")]
    pub gateway: Option<ProbeRecord>,
    #[serde(default, deserialize_with = "lenient_probe")]
    pub kiosk_pc: Option<ProbeRecord>,
}

/// A single health-check outcome: `{ ip, alive, ping, color }`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProbeRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub alive: bool,
    /// Round-trip time in milliseconds.
    #[serde(default, deserialize_with = "lenient_number")]
    pub ping: Option<f64>,
    /// `"green"`, `"orange"` or `"red"` in practice; kept verbatim here.
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: Option<String>,
}

// ── Lenient deserializers ────────────────────────────────────────────

/// Render a scalar JSON value as a string, or `None` when it is falsy.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_owned()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        other => scalar_to_string(&other).unwrap_or_default(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_probe<'de, D>(deserializer: D) -> Result<Option<ProbeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    ProbeRecord::deserialize(value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn lenient_results<'de, D>(deserializer: D) -> Result<ProbeResults, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(ProbeResults::default());
    }
    ProbeResults::deserialize(value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn placement_accepts_strings_and_numbers() {
        let m: MachineRecord = serde_json::from_value(json!({
            "name": "PRESS-04",
            "section": "North",
            "bay": "B",
            "column": 7,
            "machine_row": "C",
            "machine_column": "5"
        }))
        .unwrap();

        assert_eq!(m.bay.as_deref(), Some("B"));
        assert_eq!(m.column.as_deref(), Some("7"));
        assert_eq!(m.machine_row.as_deref(), Some("C"));
        assert_eq!(m.machine_column.as_deref(), Some("5"));
    }

    #[test]
    fn falsy_values_become_none() {
        let m: MachineRecord = serde_json::from_value(json!({
            "name": "LATHE-1",
            "section": "",
            "column": 0,
            "machine_row": null,
            "source_switch": false,
            "results": null
        }))
        .unwrap();

        assert_eq!(m.section, None);
        assert_eq!(m.column, None);
        assert_eq!(m.machine_row, None);
        assert_eq!(m.source_switch, None);
        assert_eq!(m.results, ProbeResults::default());
    }

    #[test]
    fn probe_results_parse() {
        let m: MachineRecord = serde_json::from_value(json!({
            "name": "CNC-12",
            "results": {
                "ip": { "ip": "10.0.0.12", "alive": true, "ping": 3.4, "color": "green" },
                "gateway": { "ip": "10.0.0.1", "alive": false, "ping": null, "color": "red" },
                "kiosk_pc": "not-a-probe"
            }
        }))
        .unwrap();

        let ip = m.results.ip.unwrap();
        assert_eq!(ip.ip.as_deref(), Some("10.0.0.12"));
        assert!(ip.alive);
        assert_eq!(ip.ping, Some(3.4));
        assert_eq!(ip.color.as_deref(), Some("green"));

        let gw = m.results.gateway.unwrap();
        assert!(!gw.alive);
        assert_eq!(gw.ping, None);
        assert!(m.results.kiosk_pc.is_none());
    }

    #[test]
    fn envelope_without_machines_is_empty() {
        let env: MachinesEnvelope = serde_json::from_value(json!({ "data": {} })).unwrap();
        assert!(env.into_machines().is_empty());

        let env: MachinesEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(env.into_machines().is_empty());
    }

    #[test]
    fn numeric_name_is_stringified() {
        let m: MachineRecord = serde_json::from_value(json!({ "name": 42 })).unwrap();
        assert_eq!(m.name, "42");
    }
}
