// ── Status color resolution ──

use crate::model::{Endpoint, Machine, StatusColor};

/// Overall health of a machine.
///
/// The first probe that reports a color wins, in the order machine IP,
/// gateway, kiosk PC. With no colored probe the machine counts as down.
pub fn overall_color(machine: &Machine) -> StatusColor {
    Endpoint::ALL
        .iter()
        .find_map(|&endpoint| machine.probes.get(endpoint).and_then(|p| p.color))
        .unwrap_or(StatusColor::Red)
}

/// Active iff the overall color is green.
pub fn is_active(machine: &Machine) -> bool {
    overall_color(machine).is_green()
}

/// Label shown in the detail view for the active/inactive state.
pub fn activity_label(machine: &Machine) -> &'static str {
    if is_active(machine) {
        "ACTIVE (Online)"
    } else {
        "INACTIVE (Offline)"
    }
}
