// ── Machine detail view model ──
//
// Flattens a machine into the fixed set of labelled values the detail
// overlay shows. Missing values render as `-`.

use crate::model::{Endpoint, Machine, Probe, StatusColor};
use crate::status::{activity_label, is_active, overall_color};

/// Placeholder for an absent value.
pub const MISSING: &str = "-";

/// One labelled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub label: &'static str,
    pub value: String,
}

impl DetailField {
    fn new(label: &'static str, value: Option<&str>) -> Self {
        Self {
            label,
            value: value.unwrap_or(MISSING).to_owned(),
        }
    }
}

/// Per-endpoint probe summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCard {
    pub endpoint: Endpoint,
    /// `None` when no probe was reported for this endpoint.
    pub color: Option<StatusColor>,
    pub ip: String,
    /// `"<ping> ms"` while alive, `DOWN` otherwise.
    pub latency: String,
}

impl ProbeCard {
    fn new(endpoint: Endpoint, probe: Option<&Probe>) -> Self {
        Self {
            endpoint,
            color: probe.and_then(|p| p.color),
            ip: probe
                .and_then(|p| p.ip.as_deref())
                .unwrap_or(MISSING)
                .to_owned(),
            latency: probe.map_or_else(|| "DOWN".to_owned(), latency_label),
        }
    }
}

/// Everything the detail overlay renders for one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineDetail {
    pub title: String,
    pub active: bool,
    pub status: &'static str,
    pub color: StatusColor,
    /// IP address, gateway and kiosk PC.
    pub network: Vec<DetailField>,
    /// Section, bay, column, uplink and source switch.
    pub location: Vec<DetailField>,
    pub probes: Vec<ProbeCard>,
}

impl MachineDetail {
    pub fn from_machine(machine: &Machine) -> Self {
        // Declared address first, then whatever the probe reached.
        let address = |endpoint: Endpoint| {
            machine
                .declared(endpoint)
                .or_else(|| machine.probes.ip_of(endpoint))
        };

        Self {
            title: format!("{} Details", machine.name),
            active: is_active(machine),
            status: activity_label(machine),
            color: overall_color(machine),
            network: vec![
                DetailField::new("IP Address", address(Endpoint::Ip)),
                DetailField::new("Gateway", address(Endpoint::Gateway)),
                DetailField::new("Kiosk PC", address(Endpoint::KioskPc)),
            ],
            location: vec![
                DetailField::new("Section", machine.section.as_deref()),
                DetailField::new("Bay", machine.bay.as_deref()),
                DetailField::new("Column", machine.column.as_deref()),
                DetailField::new("Uplink ID", machine.uplink.as_deref()),
                DetailField::new("Source Switch", machine.source_switch.as_deref()),
            ],
            probes: Endpoint::ALL
                .iter()
                .map(|&e| ProbeCard::new(e, machine.probes.get(e)))
                .collect(),
        }
    }
}

/// `"12 ms"` / `"1.5 ms"` for a live probe, `DOWN` for a dead one.
pub fn latency_label(probe: &Probe) -> String {
    if !probe.alive {
        return "DOWN".to_owned();
    }
    match probe.ping_ms {
        Some(ms) => format!("{ms} ms"),
        None => "UP".to_owned(),
    }
}
