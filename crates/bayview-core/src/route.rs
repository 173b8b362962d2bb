// ── Section routes ──
//
// `/sections`, `/sections/<name>` and `?section=<name>` select which section
// the dashboard shows. The path segment takes precedence over the query.

use std::fmt;

use url::Url;

use crate::error::CoreError;

const ROUTE_ROOT: &str = "sections";

/// Section selection expressed as a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SectionRoute {
    section: Option<String>,
}

impl SectionRoute {
    /// Route showing every section.
    pub fn all() -> Self {
        Self::default()
    }

    /// Route showing one section (all when `name` is empty).
    pub fn section(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            section: (!name.is_empty()).then_some(name),
        }
    }

    /// Parse a route: a path, a bare query, or a full URL.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let input = input.trim();
        let (url, absolute) = match Url::parse(input) {
            Ok(url) => (url, true),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://route.invalid/")
                .and_then(|base| base.join(input))
                .map(|url| (url, false))
                .map_err(|e| invalid(input, &e.to_string()))?,
            Err(e) => return Err(invalid(input, &e.to_string())),
        };

        // Segments come from the path as written: `Url` would fold `.` and
        // `..` segments away.
        let segments: Vec<&str> = raw_path(input, absolute)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let from_path = match segments.as_slice() {
            [] | [ROUTE_ROOT] => None,
            [ROUTE_ROOT, name] => {
                Some(String::from_utf8_lossy(&urlencoding::decode_binary(name.as_bytes())).into_owned())
            }
            _ => return Err(invalid(input, "expected /sections or /sections/<name>")),
        };

        let from_query = url
            .query_pairs()
            .find(|(key, _)| key == "section")
            .map(|(_, value)| value.into_owned());

        Ok(Self::section(
            from_path
                .filter(|s| !s.is_empty())
                .or(from_query)
                .unwrap_or_default(),
        ))
    }

    /// The selected section, or `None` for all sections.
    pub fn selected(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// Canonical path form, e.g. `/sections/Hall%20B`.
    pub fn to_path(&self) -> String {
        match &self.section {
            None => format!("/{ROUTE_ROOT}"),
            // Escaped so they are not read back as dot segments.
            Some(name) if name == "." || name == ".." => {
                format!("/{ROUTE_ROOT}/{}", "%2E".repeat(name.len()))
            }
            Some(name) => format!("/{ROUTE_ROOT}/{}", urlencoding::encode(name)),
        }
    }
}

impl fmt::Display for SectionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

fn invalid(route: &str, reason: &str) -> CoreError {
    CoreError::Config {
        message: format!("invalid section route {route:?}: {reason}"),
    }
}

/// Path of `input` as written, without query or fragment.
fn raw_path(input: &str, absolute: bool) -> &str {
    let rest = if absolute {
        input.split_once("://").map_or("", |(_, after)| {
            after.find('/').map_or("", |i| after.split_at(i).1)
        })
    } else {
        input
    };
    rest.split(['?', '#']).next().unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selected(route: &str) -> Option<String> {
        SectionRoute::parse(route).unwrap().selected().map(String::from)
    }

    #[test]
    fn plain_sections_shows_everything() {
        assert_eq!(selected("/sections"), None);
        assert_eq!(selected("/sections/"), None);
        assert_eq!(selected(""), None);
    }

    #[test]
    fn path_segment_is_decoded() {
        assert_eq!(selected("/sections/North").as_deref(), Some("North"));
        assert_eq!(selected("/sections/Hall%20B").as_deref(), Some("Hall B"));
        assert_eq!(selected("/sections/Caf%C3%A9").as_deref(), Some("Café"));
        assert_eq!(selected("/sections/100%").as_deref(), Some("100%"));
    }

    #[test]
    fn query_parameter_selects() {
        assert_eq!(selected("?section=South").as_deref(), Some("South"));
        assert_eq!(selected("/sections?section=Hall+B").as_deref(), Some("Hall B"));
        assert_eq!(selected("/sections?section=").as_deref(), None);
    }

    #[test]
    fn path_wins_over_query() {
        assert_eq!(selected("/sections/North?section=South").as_deref(), Some("North"));
        assert_eq!(
            selected("http://dash.local:3000/sections/East?section=West").as_deref(),
            Some("East")
        );
    }

    #[test]
    fn other_paths_are_rejected() {
        assert!(SectionRoute::parse("/yaml-editor").is_err());
        assert!(SectionRoute::parse("/sections/a/b").is_err());
    }

    #[test]
    fn canonical_path_round_trips() {
        let route = SectionRoute::section("Hall B/2");
        assert_eq!(route.to_path(), "/sections/Hall%20B%2F2");
        assert_eq!(SectionRoute::parse(&route.to_path()).unwrap(), route);
        assert_eq!(SectionRoute::all().to_string(), "/sections");
        assert_eq!(SectionRoute::section(""), SectionRoute::all());
    }

    #[test]
    fn dot_names_survive_the_round_trip() {
        for name in [".", "..", "...", "v1.2"] {
            let route = SectionRoute::section(name);
            assert_eq!(SectionRoute::parse(&route.to_path()).unwrap(), route, "name {name:?}");
        }
        assert_eq!(SectionRoute::section("..").to_path(), "/sections/%2E%2E");
        assert_eq!(selected("/sections/%2e").as_deref(), Some("."));
        assert_eq!(
            selected("http://dash.local/sections/..?section=x#top").as_deref(),
            Some("..")
        );
    }
}
