// ── Domain model ──
//
// Canonical representation of machines and the switches inferred from them.
// Consumers (the TUI, tests) depend on these types, never on wire records.

pub mod machine;
pub mod switch;

pub use machine::{
    Endpoint, Machine, Placement, Probe, Probes, StatusColor, UNKNOWN_SECTION, parse_column,
};
pub use switch::{MAIN_SWITCH_BAY, MAIN_SWITCH_COLUMN, Switch, SwitchId, SwitchInfo};
