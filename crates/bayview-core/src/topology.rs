// ── Switch-topology inference ──
//
// Switches are never reported directly; they are recovered from the
// `source_switch` labels machines carry (`<Bay><Column>-<Ports>`). Every
// observed section additionally gets one synthetic main switch at A1.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{Machine, Switch, SwitchId, SwitchInfo};

/// Parse a `source_switch` label: one ASCII letter, digits, `-`, digits.
///
/// Returns `None` for absent, empty or non-matching labels, and for
/// numbers too large to be a real column or port count.
pub fn parse_switch_info(label: Option<&str>) -> Option<SwitchInfo> {
    let label = label?;
    let mut chars = label.chars();
    let bay = chars.next().filter(char::is_ascii_alphabetic)?;
    let (column, ports) = chars.as_str().split_once('-')?;

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(column) || !all_digits(ports) {
        return None;
    }

    Some(SwitchInfo {
        bay: bay.to_ascii_uppercase().to_string(),
        column: column.parse().ok()?,
        ports: ports.parse().ok()?,
    })
}

/// All switches inferred from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct SwitchMap {
    /// Regular switches keyed by label, in first-seen order.
    labeled: IndexMap<String, Switch>,
    /// One main switch per section, in first-seen order.
    mains: IndexMap<String, Switch>,
}

impl SwitchMap {
    /// Look up a regular switch by its label.
    pub fn get(&self, label: &str) -> Option<&Switch> {
        self.labeled.get(label)
    }

    /// The main switch of a section.
    pub fn main_for(&self, section: &str) -> Option<&Switch> {
        self.mains.get(section)
    }

    /// Regular switches, in first-seen order.
    pub fn regular(&self) -> impl Iterator<Item = &Switch> {
        self.labeled.values()
    }

    /// The switch drawn in a grid cell, if any.
    ///
    /// A regular switch parsed to these coordinates takes precedence;
    /// otherwise the section's main switch occupies its anchor cell.
    pub fn at(&self, section: &str, bay: &str, column: u32) -> Option<&Switch> {
        self.labeled
            .values()
            .find(|sw| sw.section == section && sw.bay == bay && sw.column == column)
            .or_else(|| {
                self.main_for(section)
                    .filter(|main| main.is_at(section, bay, column))
            })
    }

    /// Sections that have a main switch.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.mains.keys().map(String::as_str)
    }

    /// Total switch count, main switches included.
    pub fn len(&self) -> usize {
        self.labeled.len() + self.mains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labeled.is_empty() && self.mains.is_empty()
    }
}

/// Cluster machines by `source_switch` label and add a main switch per section.
///
/// A switch's section is the section of the first machine that named it;
/// later machines with the same label join it whatever their own section.
pub fn infer_switches(machines: &[Arc<Machine>]) -> SwitchMap {
    let mut map = SwitchMap::default();

    for machine in machines {
        let section = machine.section_name();
        if !map.mains.contains_key(section) {
            map.mains.insert(section.to_owned(), Switch::main(section));
        }

        let Some(label) = machine.source_switch.as_deref() else {
            continue;
        };
        let Some(info) = parse_switch_info(Some(label)) else {
            continue;
        };

        map.labeled
            .entry(label.to_owned())
            .or_insert_with(|| Switch {
                id: SwitchId::Label(label.to_owned()),
                section: section.to_owned(),
                bay: info.bay,
                column: info.column,
                ports: Some(info.ports),
                connected: Vec::new(),
            })
            .connected
            .push(Arc::clone(machine));
    }

    map
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn machine(name: &str, section: Option<&str>, switch: Option<&str>) -> Arc<Machine> {
        let mut m = Machine::named(name);
        m.section = section.map(String::from);
        m.source_switch = switch.map(String::from);
        Arc::new(m)
    }

    #[test]
    fn parses_well_formed_labels() {
        assert_eq!(
            parse_switch_info(Some("B12-24")),
            Some(SwitchInfo {
                bay: "B".into(),
                column: 12,
                ports: 24
            })
        );
        assert_eq!(
            parse_switch_info(Some("c3-8")),
            Some(SwitchInfo {
                bay: "C".into(),
                column: 3,
                ports: 8
            })
        );
    }

    #[test]
    fn rejects_everything_else() {
        for label in ["", "XYZ", "B12", "B-24", "12-24", "BB12-24", "B12-", "B1a-24", " B12-24", "B12-24 ", "É1-2"] {
            assert_eq!(parse_switch_info(Some(label)), None, "label {label:?}");
        }
        assert_eq!(parse_switch_info(None), None);
        assert_eq!(parse_switch_info(Some("B99999999999-1")), None);
    }

    #[test]
    fn machines_cluster_by_label() {
        let machines = vec![
            machine("M1", Some("North"), Some("B12-24")),
            machine("M2", Some("North"), Some("B12-24")),
            machine("M3", Some("North"), Some("C2-8")),
            machine("M4", Some("North"), None),
            machine("M5", Some("North"), Some("garbage")),
        ];
        let map = infer_switches(&machines);

        let b12 = map.get("B12-24").unwrap();
        assert_eq!(b12.bay, "B");
        assert_eq!(b12.column, 12);
        assert_eq!(b12.ports, Some(24));
        let names: Vec<_> = b12.connected.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["M1", "M2"]);

        let labels: Vec<_> = map.regular().map(|s| s.id.to_string()).collect();
        assert_eq!(labels, vec!["B12-24", "C2-8"]);
        assert!(map.get("garbage").is_none());
    }

    #[test]
    fn switch_section_comes_from_first_machine() {
        let machines = vec![
            machine("M1", Some("South"), Some("A4-16")),
            machine("M2", Some("North"), Some("A4-16")),
        ];
        let map = infer_switches(&machines);
        let sw = map.get("A4-16").unwrap();
        assert_eq!(sw.section, "South");
        assert_eq!(sw.connected.len(), 2);
    }

    #[test]
    fn one_main_switch_per_section() {
        let machines = vec![
            machine("M1", Some("North"), None),
            machine("M2", Some("South"), None),
            machine("M3", Some("North"), None),
            machine("M4", None, None),
        ];
        let map = infer_switches(&machines);

        let sections: Vec<_> = map.sections().collect();
        assert_eq!(sections, vec!["North", "South", "Unknown"]);
        for section in sections {
            let main = map.main_for(section).unwrap();
            assert!(main.is_main());
            assert_eq!((main.bay.as_str(), main.column), ("A", 1));
            assert_eq!(main.ports_label(), "N/A");
        }
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn regular_switch_takes_the_anchor_cell() {
        let machines = vec![
            machine("M1", Some("North"), Some("A1-48")),
            machine("M2", Some("South"), None),
        ];
        let map = infer_switches(&machines);

        let north = map.at("North", "A", 1).unwrap();
        assert_eq!(north.id, SwitchId::Label("A1-48".into()));

        let south = map.at("South", "A", 1).unwrap();
        assert!(south.is_main());
        assert!(map.at("South", "A", 2).is_none());
        assert!(map.at("South", "B", 1).is_none());
    }

    #[test]
    fn cell_lookup_outlives_the_section_name() {
        let machines = vec![machine("M1", Some("North"), Some("B3-8"))];
        let map = infer_switches(&machines);

        let found = {
            let section = String::from("North");
            map.at(&section, "B", 3)
        };
        assert_eq!(found.unwrap().id, SwitchId::Label("B3-8".into()));
        assert!(map.at("South", "B", 3).is_none());
    }
}
