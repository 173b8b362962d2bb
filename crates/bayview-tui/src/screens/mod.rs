//! Screen implementations. Each screen is a top-level Component.

pub mod grid;
pub mod sections;

use bayview_core::SectionRoute;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create screen components for the tab bar, all starting on `route`.
pub fn create_screens(route: &SectionRoute) -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (ScreenId::Grid, Box::new(grid::GridScreen::new(route.clone()))),
        (
            ScreenId::Sections,
            Box::new(sections::SectionsScreen::new(route.clone())),
        ),
    ]
}
