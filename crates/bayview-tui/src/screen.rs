//! Screen identifiers, navigable by number keys.

use std::fmt;

use bayview_config::StartView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    /// Section grids with switches and connectors.
    #[default]
    Grid,
    /// Flat per-section machine lists with filters.
    Sections,
}

impl ScreenId {
    /// All screens in tab-bar order.
    pub const ALL: [ScreenId; 2] = [Self::Grid, Self::Sections];

    pub fn number(self) -> u8 {
        match self {
            Self::Grid => 1,
            Self::Sections => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Grid),
            2 => Some(Self::Sections),
            _ => None,
        }
    }

    /// Next screen in tab order (wraps around).
    pub fn next(self) -> Self {
        match self {
            Self::Grid => Self::Sections,
            Self::Sections => Self::Grid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Grid => "Grid",
            Self::Sections => "Sections",
        }
    }
}

impl From<StartView> for ScreenId {
    fn from(view: StartView) -> Self {
        match view {
            StartView::Grid => Self::Grid,
            StartView::Sections => Self::Sections,
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_round_trip() {
        for id in ScreenId::ALL {
            assert_eq!(ScreenId::from_number(id.number()), Some(id));
        }
        assert_eq!(ScreenId::from_number(3), None);
    }

    #[test]
    fn next_wraps() {
        assert_eq!(ScreenId::Grid.next(), ScreenId::Sections);
        assert_eq!(ScreenId::Sections.next(), ScreenId::Grid);
    }
}
