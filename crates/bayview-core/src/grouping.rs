// ── Section grouping (flat list view) ──
//
// Buckets machines by section and applies an independent text filter per
// section. Filtering narrows what is shown; it never changes the buckets.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Endpoint, Machine};

/// Case-insensitive ordering with a case-sensitive tie-break, so the result
/// is total and stable across snapshots.
pub fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// All machines of one section, sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionGroup {
    pub section: String,
    pub machines: Vec<Arc<Machine>>,
}

/// Partition machines by section. Members are sorted by name
/// case-insensitively; partitions are sorted by section name lexically.
pub fn group_by_section(machines: &[Arc<Machine>]) -> Vec<SectionGroup> {
    let mut buckets: HashMap<&str, Vec<Arc<Machine>>> = HashMap::new();
    for machine in machines {
        buckets
            .entry(machine.section_name())
            .or_default()
            .push(Arc::clone(machine));
    }

    let mut groups: Vec<SectionGroup> = buckets
        .into_iter()
        .map(|(section, mut members)| {
            members.sort_by(|a, b| compare_case_insensitive(&a.name, &b.name));
            SectionGroup {
                section: section.to_owned(),
                machines: members,
            }
        })
        .collect();
    groups.sort_by(|a, b| a.section.cmp(&b.section));
    groups
}

/// Does `machine` match a filter query?
///
/// Case-insensitive substring match against the name and the three probed
/// addresses. An empty query matches everything.
pub fn matches_query(machine: &Machine, query: &str) -> bool {
    let query = query.to_lowercase();
    if query.is_empty() {
        return true;
    }

    std::iter::once(Some(machine.name.as_str()))
        .chain(Endpoint::ALL.iter().map(|&e| machine.probes.ip_of(e)))
        .flatten()
        .any(|field| field.to_lowercase().contains(&query))
}

/// Per-section filter text, independent between sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionFilters {
    queries: HashMap<String, String>,
}

impl SectionFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current query for a section (empty when none was set).
    pub fn query(&self, section: &str) -> &str {
        self.queries.get(section).map_or("", String::as_str)
    }

    pub fn set(&mut self, section: &str, query: impl Into<String>) {
        let query = query.into();
        if query.is_empty() {
            self.queries.remove(section);
        } else {
            self.queries.insert(section.to_owned(), query);
        }
    }

    /// Append a character to a section's query.
    pub fn push(&mut self, section: &str, c: char) {
        self.queries.entry(section.to_owned()).or_default().push(c);
    }

    /// Remove the last character of a section's query.
    pub fn pop(&mut self, section: &str) {
        if let Some(q) = self.queries.get_mut(section) {
            q.pop();
            if q.is_empty() {
                self.queries.remove(section);
            }
        }
    }

    pub fn clear(&mut self, section: &str) {
        self.queries.remove(section);
    }

    /// Machines of `group` matching that section's query.
    pub fn apply<'a>(&self, group: &'a SectionGroup) -> Vec<&'a Arc<Machine>> {
        let query = self.query(&group.section);
        group
            .machines
            .iter()
            .filter(|m| matches_query(m, query))
            .collect()
    }
}

/// Groups restricted to the selected section (all groups when `None`).
pub fn select_groups<'a>(
    groups: &'a [SectionGroup],
    selected: Option<&str>,
) -> impl Iterator<Item = &'a SectionGroup> + 'a {
    let selected = selected.map(str::to_owned);
    groups
        .iter()
        .filter(move |g| selected.as_deref().is_none_or(|s| g.section == s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Probe;
    use pretty_assertions::assert_eq;

    fn machine(name: &str, section: Option<&str>) -> Arc<Machine> {
        let mut m = Machine::named(name);
        m.section = section.map(String::from);
        Arc::new(m)
    }

    fn with_probe_ip(name: &str, ip: &str) -> Arc<Machine> {
        let mut m = Machine::named(name);
        m.section = Some("North".into());
        m.probes.gateway = Some(Probe {
            ip: Some(ip.into()),
            alive: true,
            ping_ms: Some(1.0),
            color: None,
        });
        Arc::new(m)
    }

    fn names(machines: &[Arc<Machine>]) -> Vec<&str> {
        machines.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn grouping_preserves_the_multiset() {
        let input = vec![
            machine("b", Some("X")),
            machine("a", None),
            machine("c", Some("X")),
            machine("a", Some("Y")),
            machine("a", None),
        ];
        let groups = group_by_section(&input);

        let mut flattened: Vec<_> = groups
            .iter()
            .flat_map(|g| g.machines.iter().map(|m| (m.name.clone(), m.section_name().to_owned())))
            .collect();
        let mut expected: Vec<_> = input
            .iter()
            .map(|m| (m.name.clone(), m.section_name().to_owned()))
            .collect();
        flattened.sort();
        expected.sort();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn members_sort_case_insensitively_and_sections_lexically() {
        let input = vec![
            machine("beta", Some("west")),
            machine("Alpha", Some("west")),
            machine("alpha2", Some("west")),
            machine("Gamma", Some("East")),
            machine("delta", None),
            machine("epsilon", Some("annex")),
        ];
        let groups = group_by_section(&input);

        let sections: Vec<_> = groups.iter().map(|g| g.section.as_str()).collect();
        assert_eq!(sections, vec!["East", "Unknown", "annex", "west"]);
        assert_eq!(names(&groups[3].machines), vec!["Alpha", "alpha2", "beta"]);
    }

    #[test]
    fn filter_matches_name_and_probed_ips() {
        let input = vec![
            with_probe_ip("PRESS-01", "10.0.0.1"),
            with_probe_ip("PRESS-02", "10.0.0.12"),
            with_probe_ip("LATHE-10.0.0.1", "192.168.1.5"),
            with_probe_ip("MILL", "10.0.0.2"),
        ];
        let query = "10.0.0.1";
        let hits: Vec<_> = input
            .iter()
            .filter(|m| matches_query(m, query))
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(hits, vec!["PRESS-01", "PRESS-02", "LATHE-10.0.0.1"]);
    }

    #[test]
    fn filter_ignores_declared_addresses() {
        let mut m = Machine::named("KIOSK");
        m.ip = Some("10.9.9.9".into());
        assert!(!matches_query(&m, "10.9.9.9"));
        assert!(matches_query(&m, "kio"));
        assert!(matches_query(&m, ""));
    }

    #[test]
    fn filter_keeps_surrounding_whitespace() {
        let m = with_probe_ip("PRESS-01", "10.0.0.1");
        assert!(!matches_query(&m, " "));
        assert!(!matches_query(&m, " 10.0"));
        assert!(!matches_query(&m, "press "));
        assert!(matches_query(&m, "PRESS-0"));

        let spaced = Machine::named("Press 01");
        assert!(matches_query(&spaced, "ss 0"));
        assert!(matches_query(&spaced, " "));
    }

    #[test]
    fn filters_are_independent_per_section() {
        let input = vec![
            machine("press", Some("North")),
            machine("lathe", Some("North")),
            machine("press", Some("South")),
        ];
        let groups = group_by_section(&input);
        let mut filters = SectionFilters::new();
        filters.set("North", "LAT");

        let north: Vec<_> = filters.apply(&groups[0]).iter().map(|m| m.name.as_str()).collect();
        let south: Vec<_> = filters.apply(&groups[1]).iter().map(|m| m.name.as_str()).collect();
        assert_eq!(north, vec!["lathe"]);
        assert_eq!(south, vec!["press"]);

        // Filtering never touched the groups themselves.
        assert_eq!(groups[0].machines.len(), 2);

        filters.pop("North");
        assert_eq!(filters.query("North"), "LA");
        filters.clear("North");
        assert_eq!(filters.query("North"), "");
    }

    #[test]
    fn selection_restricts_groups() {
        let input = vec![machine("a", Some("North")), machine("b", Some("South"))];
        let groups = group_by_section(&input);

        let picked: Vec<_> = select_groups(&groups, Some("South")).map(|g| g.section.as_str()).collect();
        assert_eq!(picked, vec!["South"]);
        assert_eq!(select_groups(&groups, None).count(), 2);
        assert_eq!(select_groups(&groups, Some("Nowhere")).count(), 0);
    }
}
