// ── Detail selection state ──
//
// At most one machine is shown in the detail overlay. The payload follows
// the machine across snapshots by name.

use std::sync::Arc;

use tracing::debug;

use crate::model::Machine;

/// How the detail overlay was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DismissReason {
    /// The close control.
    Close,
    /// The Escape key.
    Escape,
    /// A click outside the dialog.
    Backdrop,
}

/// Which machine, if any, the detail overlay shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection {
    #[default]
    None,
    Showing(Arc<Machine>),
}

impl Selection {
    /// Show a machine, replacing whatever was shown.
    pub fn select(&mut self, machine: Arc<Machine>) {
        *self = Self::Showing(machine);
    }

    /// Close the overlay. Returns `false` when nothing was shown.
    pub fn dismiss(&mut self, reason: DismissReason) -> bool {
        match self {
            Self::None => false,
            Self::Showing(machine) => {
                debug!(machine = %machine.name, ?reason, "detail dismissed");
                *self = Self::None;
                true
            }
        }
    }

    /// Escape is only consumed while a machine is shown.
    pub fn handles_escape(&self) -> bool {
        self.is_showing()
    }

    pub fn is_showing(&self) -> bool {
        matches!(self, Self::Showing(_))
    }

    pub fn machine(&self) -> Option<&Arc<Machine>> {
        match self {
            Self::None => None,
            Self::Showing(machine) => Some(machine),
        }
    }

    /// Swap the shown payload for its counterpart in a new snapshot.
    ///
    /// Matching is by name. When the machine is no longer reported the last
    /// payload stays on screen. Returns `true` if the payload changed.
    pub fn refresh(&mut self, snapshot: &[Arc<Machine>]) -> bool {
        let Self::Showing(current) = self else {
            return false;
        };
        match snapshot.iter().find(|m| m.name == current.name) {
            Some(fresh) if !Arc::ptr_eq(fresh, current) && **fresh != **current => {
                *current = Arc::clone(fresh);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::StatusColor;

    fn machine(name: &str, uplink: Option<&str>) -> Arc<Machine> {
        let mut m = Machine::named(name);
        m.uplink = uplink.map(String::from);
        Arc::new(m)
    }

    #[test]
    fn escape_returns_to_no_selection() {
        let mut sel = Selection::default();
        assert!(!sel.handles_escape());

        sel.select(machine("M1", None));
        assert!(sel.handles_escape());
        assert!(sel.dismiss(DismissReason::Escape));
        assert_eq!(sel, Selection::None);
        assert!(!sel.dismiss(DismissReason::Escape));
    }

    #[test]
    fn every_dismissal_closes() {
        for reason in [DismissReason::Close, DismissReason::Escape, DismissReason::Backdrop] {
            let mut sel = Selection::default();
            sel.select(machine("M1", None));
            assert!(sel.dismiss(reason));
            assert!(!sel.is_showing());
        }
    }

    #[test]
    fn reselecting_replaces_the_payload() {
        let mut sel = Selection::default();
        sel.select(machine("M1", None));
        sel.select(machine("M2", None));
        assert_eq!(sel.machine().unwrap().name, "M2");
    }

    #[test]
    fn refresh_follows_the_machine_by_name() {
        let mut sel = Selection::default();
        sel.select(machine("M1", Some("U1")));

        let mut updated = Machine::named("M1");
        updated.uplink = Some("U2".into());
        updated.probes.ip = Some(crate::model::Probe {
            ip: Some("10.0.0.1".into()),
            alive: true,
            ping_ms: Some(2.0),
            color: Some(StatusColor::Green),
        });
        let snapshot = vec![machine("M0", None), Arc::new(updated)];

        assert!(sel.refresh(&snapshot));
        assert_eq!(sel.machine().unwrap().uplink.as_deref(), Some("U2"));
        assert!(!sel.refresh(&snapshot));
    }

    #[test]
    fn vanished_machine_keeps_last_payload() {
        let mut sel = Selection::default();
        sel.select(machine("M1", Some("U1")));
        assert!(!sel.refresh(&[machine("M2", None)]));
        assert_eq!(sel.machine().unwrap().uplink.as_deref(), Some("U1"));

        let mut none = Selection::None;
        assert!(!none.refresh(&[machine("M1", None)]));
    }
}
