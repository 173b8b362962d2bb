//! Small reusable rendering helpers.

pub mod detail_modal;
pub mod status_dot;
