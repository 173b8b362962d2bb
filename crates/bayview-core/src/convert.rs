// ── API-to-domain type conversions ──
//
// Bridges raw `bayview_api` records into `bayview_core::model` types.
// The wire layer already collapsed falsy values to `None`; here colors are
// classified and strings trimmed of surrounding whitespace.

use bayview_api::models::{MachineRecord, ProbeRecord, ProbeResults};

use crate::model::{Machine, Probe, Probes, StatusColor};

fn clean(raw: Option<String>) -> Option<String> {
    raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_owned())
        }
    })
}

impl From<ProbeRecord> for Probe {
    fn from(raw: ProbeRecord) -> Self {
        Self {
            ip: clean(raw.ip),
            alive: raw.alive,
            ping_ms: raw.ping.filter(|p| p.is_finite()),
            color: raw.color.as_deref().map(StatusColor::from_wire),
        }
    }
}

impl From<ProbeResults> for Probes {
    fn from(raw: ProbeResults) -> Self {
        Self {
            ip: raw.ip.map(Probe::from),
            gateway: raw.gateway.map(Probe::from),
            kiosk_pc: raw.kiosk_pc.map(Probe::from),
        }
    }
}

impl From<MachineRecord> for Machine {
    fn from(raw: MachineRecord) -> Self {
        Self {
            name: raw.name,
            section: clean(raw.section),
            bay: clean(raw.bay),
            column: clean(raw.column),
            machine_row: clean(raw.machine_row),
            machine_column: clean(raw.machine_column),
            source_switch: clean(raw.source_switch),
            ip: clean(raw.ip),
            gateway: clean(raw.gateway),
            kiosk_pc: clean(raw.kiosk_pc),
            uplink: clean(raw.uplink),
            probes: Probes::from(raw.results),
        }
    }
}

/// Convert a whole wire snapshot, preserving order.
pub fn machines_from_records<I>(records: I) -> Vec<Machine>
where
    I: IntoIterator<Item = MachineRecord>,
{
    records.into_iter().map(Machine::from).collect()
}
