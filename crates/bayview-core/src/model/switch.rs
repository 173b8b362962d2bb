// ── Inferred switch types ──

use std::fmt;
use std::sync::Arc;

use super::machine::Machine;

/// Bay every section's main switch is pinned to.
pub const MAIN_SWITCH_BAY: &str = "A";

/// Column every section's main switch is pinned to.
pub const MAIN_SWITCH_COLUMN: u32 = 1;

/// Coordinates parsed from a `source_switch` label like `B12-24`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwitchInfo {
    /// Uppercased bay letter.
    pub bay: String,
    pub column: u32,
    pub ports: u32,
}

/// Identity of an inferred switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwitchId {
    /// The synthetic per-section uplink anchor.
    Main,
    /// A switch recovered from a `source_switch` label.
    Label(String),
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("MAIN SWITCH"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// A switch derived from the current machine snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub id: SwitchId,
    /// Owning section (the section of the first machine that referenced it).
    pub section: String,
    pub bay: String,
    pub column: u32,
    /// Port count; `None` for the main switch, which has no backing device.
    pub ports: Option<u32>,
    /// Machines uplinked through this switch, in snapshot order.
    pub connected: Vec<Arc<Machine>>,
}

impl Switch {
    pub(crate) fn main(section: &str) -> Self {
        Self {
            id: SwitchId::Main,
            section: section.to_owned(),
            bay: MAIN_SWITCH_BAY.to_owned(),
            column: MAIN_SWITCH_COLUMN,
            ports: None,
            connected: Vec::new(),
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self.id, SwitchId::Main)
    }

    /// Port count for display (`N/A` on the main switch).
    pub fn ports_label(&self) -> String {
        self.ports
            .map_or_else(|| "N/A".to_owned(), |p| p.to_string())
    }

    /// Whether this switch sits at `(bay, column)` within `section`.
    pub fn is_at(&self, section: &str, bay: &str, column: u32) -> bool {
        self.section == section && self.bay == bay && self.column == column
    }
}
