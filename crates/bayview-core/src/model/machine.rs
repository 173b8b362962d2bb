// ── Machine domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Section label for machines that declare none.
pub const UNKNOWN_SECTION: &str = "Unknown";

/// Traffic-light health classification of a probe or a machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Orange,
    Red,
}

impl StatusColor {
    /// Classify a wire color string. Anything that is not green or orange
    /// renders as red, matching how the status dot treats unknown values.
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Red)
    }

    pub fn is_green(self) -> bool {
        matches!(self, Self::Green)
    }
}

/// The three probed network endpoints of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Endpoint {
    #[strum(to_string = "Machine IP")]
    Ip,
    #[strum(to_string = "Gateway")]
    Gateway,
    #[strum(to_string = "Kiosk PC")]
    KioskPc,
}

impl Endpoint {
    /// Endpoints in status precedence order.
    pub const ALL: [Self; 3] = [Self::Ip, Self::Gateway, Self::KioskPc];
}

/// Outcome of one health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub ip: Option<String>,
    pub alive: bool,
    pub ping_ms: Option<f64>,
    pub color: Option<StatusColor>,
}

/// Probe outcomes keyed by endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Probes {
    pub ip: Option<Probe>,
    pub gateway: Option<Probe>,
    pub kiosk_pc: Option<Probe>,
}

impl Probes {
    pub fn get(&self, endpoint: Endpoint) -> Option<&Probe> {
        match endpoint {
            Endpoint::Ip => self.ip.as_ref(),
            Endpoint::Gateway => self.gateway.as_ref(),
            Endpoint::KioskPc => self.kiosk_pc.as_ref(),
        }
    }

    /// Probed address for an endpoint, if one was reported.
    pub fn ip_of(&self, endpoint: Endpoint) -> Option<&str> {
        self.get(endpoint).and_then(|p| p.ip.as_deref())
    }
}

/// Effective grid position of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub bay: String,
    /// Grid column; `0` means "no usable column" and never renders.
    pub column: u32,
}

/// A machine as the dashboard sees it.
///
/// Declared fields are kept as reported (absent stays `None`); derived
/// values like the effective section and placement are computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub section: Option<String>,
    pub bay: Option<String>,
    pub column: Option<String>,
    pub machine_row: Option<String>,
    pub machine_column: Option<String>,
    pub source_switch: Option<String>,
    pub ip: Option<String>,
    pub gateway: Option<String>,
    pub kiosk_pc: Option<String>,
    pub uplink: Option<String>,
    pub probes: Probes,
}

impl Machine {
    /// Create a machine with only a name; every other field absent.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            section: None,
            bay: None,
            column: None,
            machine_row: None,
            machine_column: None,
            source_switch: None,
            ip: None,
            gateway: None,
            kiosk_pc: None,
            uplink: None,
            probes: Probes::default(),
        }
    }

    /// The section this machine belongs to (`"Unknown"` when undeclared).
    pub fn section_name(&self) -> &str {
        self.section.as_deref().unwrap_or(UNKNOWN_SECTION)
    }

    /// Effective placement: `(machine_row, machine_column)` when both are
    /// present, otherwise the legacy `(bay, column)` with `"0"` / `0` filling
    /// whichever is missing.
    pub fn placement(&self) -> Placement {
        if let (Some(row), Some(col)) = (&self.machine_row, &self.machine_column) {
            return Placement {
                bay: row.clone(),
                column: parse_column(col),
            };
        }
        Placement {
            bay: self.bay.clone().unwrap_or_else(|| "0".to_owned()),
            column: self.column.as_deref().map_or(0, parse_column),
        }
    }

    /// Declared address for an endpoint.
    pub fn declared(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::Ip => self.ip.as_deref(),
            Endpoint::Gateway => self.gateway.as_deref(),
            Endpoint::KioskPc => self.kiosk_pc.as_deref(),
        }
    }
}

/// Parse a column value. Integral numbers (`"7"`, `"7.0"`, `" 7 "`) parse;
/// anything else, including negatives, yields `0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub fn parse_column(raw: &str) -> u32 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => {
            f as u32
        }
        _ => 0,
    }
}
