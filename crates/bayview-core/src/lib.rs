//! Machine status model and layout engine between `bayview-api` and the TUI.
//!
//! - **[`Controller`]**: owns one status-server connection.
//!   [`connect()`](Controller::connect) fetches the REST snapshot, then
//!   follows the `network-status` push channel until
//!   [`disconnect()`](Controller::disconnect).
//!
//! - **[`MachineStore`]**: the latest snapshot behind a `tokio::sync::watch`
//!   channel, vended to consumers as a [`MachineStream`].
//!
//! - **Derivations**, all pure and recomputed per snapshot:
//!   [`status`] (overall color), [`topology`] (switch inference),
//!   [`grouping`] (flat section view), [`grid`] (bay × column placement),
//!   [`geometry`] (element boxes and connector lines) and [`detail`]
//!   (the machine detail overlay).

pub mod config;
pub mod controller;
pub mod convert;
pub mod detail;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod grouping;
pub mod model;
pub mod route;
pub mod selection;
pub mod status;
pub mod store;
pub mod stream;
pub mod topology;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, DEFAULT_SERVER_URL, TlsVerification};
pub use controller::{ConnectionState, Controller};
pub use detail::{DetailField, MachineDetail, ProbeCard};
pub use error::CoreError;
pub use geometry::{Connector, ConnectorKind, GridMetrics, SectionLayout};
pub use grid::{Grid, MAX_COLUMNS, SectionGrid};
pub use grouping::{SectionFilters, SectionGroup, group_by_section, matches_query};
pub use route::SectionRoute;
pub use selection::{DismissReason, Selection};
pub use status::{is_active, overall_color};
pub use store::{MachineStore, Snapshot};
pub use stream::MachineStream;
pub use topology::{SwitchMap, infer_switches, parse_switch_info};

pub use model::{
    Endpoint, Machine, Placement, Probe, Probes, StatusColor, Switch, SwitchId, SwitchInfo,
};
