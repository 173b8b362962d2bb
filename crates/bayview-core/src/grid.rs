// ── Grid layout engine ──
//
// Places machines into a sparse section → bay → column structure. Rebuilt
// from scratch for every snapshot; nothing carries over between builds.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{MAIN_SWITCH_BAY, MAIN_SWITCH_COLUMN, Machine, Switch};
use crate::topology::SwitchMap;

/// Columns rendered per bay row, numbered from 1.
pub const MAX_COLUMNS: u32 = 50;

type Columns = BTreeMap<u32, Vec<Arc<Machine>>>;

/// The placement of every machine in one section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionGrid {
    name: String,
    bays: IndexMap<String, Columns>,
}

impl SectionGrid {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            bays: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bay identifiers in display order (see [`compare_bays`]).
    pub fn bays(&self) -> Vec<&str> {
        let mut bays: Vec<&str> = self.bays.keys().map(String::as_str).collect();
        bays.sort_by(|a, b| compare_bays(a, b));
        bays
    }

    /// Machines placed in a cell, in snapshot order.
    pub fn cell(&self, bay: &str, column: u32) -> &[Arc<Machine>] {
        self.bays
            .get(bay)
            .and_then(|cols| cols.get(&column))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether the cell exists in the structure (possibly empty).
    pub fn has_cell(&self, bay: &str, column: u32) -> bool {
        self.bays
            .get(bay)
            .is_some_and(|cols| cols.contains_key(&column))
    }

    /// The switch drawn in a cell of this section, if any.
    pub fn switch_at<'a>(&self, bay: &str, column: u32, switches: &'a SwitchMap) -> Option<&'a Switch> {
        switches.at(&self.name, bay, column)
    }

    /// Machines whose column falls outside `1..=MAX_COLUMNS` and so never
    /// appear in a rendered row.
    pub fn off_grid(&self) -> Vec<&Arc<Machine>> {
        self.bays
            .values()
            .flat_map(|cols| {
                cols.iter()
                    .filter(|(col, _)| !(1..=MAX_COLUMNS).contains(*col))
                    .flat_map(|(_, machines)| machines.iter())
            })
            .collect()
    }

    /// Every machine placed in this section.
    pub fn machines(&self) -> impl Iterator<Item = &Arc<Machine>> {
        self.bays
            .values()
            .flat_map(|cols| cols.values().flat_map(|machines| machines.iter()))
    }

    pub fn machine_count(&self) -> usize {
        self.machines().count()
    }

    fn place(&mut self, bay: String, column: u32, machine: Arc<Machine>) {
        self.bays
            .entry(bay)
            .or_default()
            .entry(column)
            .or_default()
            .push(machine);
    }

    fn ensure_anchor(&mut self) {
        self.bays
            .entry(MAIN_SWITCH_BAY.to_owned())
            .or_default()
            .entry(MAIN_SWITCH_COLUMN)
            .or_default();
    }
}

/// All sections of one snapshot, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    sections: IndexMap<String, SectionGrid>,
}

impl Grid {
    /// Place every machine at its effective position and make sure each
    /// section has the main-switch anchor cell at A1.
    pub fn build(machines: &[Arc<Machine>]) -> Self {
        let mut sections: IndexMap<String, SectionGrid> = IndexMap::new();

        for machine in machines {
            let name = machine.section_name();
            let placement = machine.placement();
            sections
                .entry(name.to_owned())
                .or_insert_with(|| SectionGrid::new(name))
                .place(placement.bay, placement.column, Arc::clone(machine));
        }

        for section in sections.values_mut() {
            section.ensure_anchor();
        }

        Self { sections }
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionGrid> {
        self.sections.values()
    }

    pub fn section(&self, name: &str) -> Option<&SectionGrid> {
        self.sections.get(name)
    }

    /// Sections to render given the current selection (all when `None`).
    pub fn visible<'a>(&'a self, selected: Option<&'a str>) -> impl Iterator<Item = &'a SectionGrid> {
        self.sections
            .values()
            .filter(move |s| selected.is_none_or(|name| s.name == name))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// ── Bay ordering ─────────────────────────────────────────────────────

fn is_single_letter(bay: &str) -> bool {
    let mut chars = bay.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

/// Single-letter bays first (alphabetical), then everything else in
/// natural order, so `"2"` sorts before `"10"`.
pub fn compare_bays(a: &str, b: &str) -> Ordering {
    match (is_single_letter(a), is_single_letter(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => natural_cmp(a, b),
    }
}

/// Numeric-aware, case-insensitive comparison with a raw tie-break.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);

    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => cmp_digits(x, y),
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn cmp_digits(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map_or(self.rest.len(), |(i, _)| i);
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn machine(name: &str, section: Option<&str>, bay: Option<&str>, column: Option<&str>) -> Arc<Machine> {
        let mut m = Machine::named(name);
        m.section = section.map(String::from);
        m.bay = bay.map(String::from);
        m.column = column.map(String::from);
        Arc::new(m)
    }

    #[test]
    fn every_section_has_the_anchor_cell() {
        let grid = Grid::build(&[
            machine("M1", Some("North"), Some("C"), Some("4")),
            machine("M2", Some("South"), Some("2"), Some("9")),
            machine("M3", None, None, None),
        ]);

        assert_eq!(grid.len(), 3);
        for section in grid.sections() {
            assert!(section.has_cell("A", 1), "{} lacks A1", section.name());
        }
        assert!(grid.section("North").unwrap().cell("A", 1).is_empty());
    }

    #[test]
    fn main_switch_sits_at_the_anchor() {
        let mut m = Machine::named("M1");
        m.section = Some("North".into());
        m.source_switch = Some("C4-8".into());
        let machines = vec![Arc::new(m)];

        let grid = Grid::build(&machines);
        let switches = crate::topology::infer_switches(&machines);
        let north = grid.section("North").unwrap();

        assert!(north.switch_at("A", 1, &switches).unwrap().is_main());
        assert_eq!(north.switch_at("C", 4, &switches).unwrap().ports, Some(8));
        assert!(north.switch_at("C", 5, &switches).is_none());
    }

    #[test]
    fn machines_land_in_their_cells() {
        let mut newer = Machine::named("NEW");
        newer.section = Some("North".into());
        newer.machine_row = Some("C".into());
        newer.machine_column = Some("5".into());
        newer.bay = Some("Z".into());
        newer.column = Some("9".into());

        let grid = Grid::build(&[
            machine("M1", Some("North"), Some("B"), Some("3")),
            machine("M2", Some("North"), Some("B"), Some("3")),
            Arc::new(newer),
        ]);
        let north = grid.section("North").unwrap();

        let names: Vec<_> = north.cell("B", 3).iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["M1", "M2"]);
        assert_eq!(north.cell("C", 5)[0].name, "NEW");
        assert!(north.cell("Z", 9).is_empty());
        assert_eq!(north.machine_count(), 3);
    }

    #[test]
    fn sections_keep_first_seen_order() {
        let grid = Grid::build(&[
            machine("M1", Some("South"), None, None),
            machine("M2", Some("North"), None, None),
            machine("M3", Some("South"), None, None),
        ]);
        let names: Vec<_> = grid.sections().map(SectionGrid::name).collect();
        assert_eq!(names, vec!["South", "North"]);

        let visible: Vec<_> = grid.visible(Some("North")).map(SectionGrid::name).collect();
        assert_eq!(visible, vec!["North"]);
    }

    #[test]
    fn unplaced_machines_are_off_grid() {
        let grid = Grid::build(&[
            machine("NOWHERE", Some("North"), None, None),
            machine("FAR", Some("North"), Some("B"), Some("51")),
            machine("OK", Some("North"), Some("B"), Some("50")),
        ]);
        let north = grid.section("North").unwrap();
        let off: Vec<_> = north.off_grid().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(off, vec!["NOWHERE", "FAR"]);
        assert_eq!(north.cell("0", 0)[0].name, "NOWHERE");
    }

    #[test]
    fn letters_sort_before_other_bays() {
        let grid = Grid::build(&[
            machine("M1", Some("S"), Some("10"), Some("1")),
            machine("M2", Some("S"), Some("c"), Some("1")),
            machine("M3", Some("S"), Some("2"), Some("1")),
            machine("M4", Some("S"), Some("B"), Some("1")),
            machine("M5", Some("S"), Some("AA"), Some("1")),
            machine("M6", Some("S"), Some("0"), Some("1")),
        ]);
        assert_eq!(
            grid.section("S").unwrap().bays(),
            vec!["A", "B", "c", "0", "2", "10", "AA"]
        );
    }

    #[test]
    fn natural_ordering() {
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("bay9", "bay10"), Ordering::Less);
        assert_eq!(natural_cmp("Bay2", "bay2"), Ordering::Less);
        assert_eq!(natural_cmp("007", "7"), Ordering::Less);
        assert_eq!(natural_cmp("x", "x"), Ordering::Equal);
    }
}
