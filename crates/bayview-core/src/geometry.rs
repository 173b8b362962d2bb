// ── Connector geometry ──
//
// Lays a section out in character cells and derives the connector lines
// from that layout alone. Nothing is measured after rendering: the same
// grid and switch map always produce the same rectangles and lines.

use std::sync::Arc;

use crate::grid::{MAX_COLUMNS, SectionGrid};
use crate::model::{Machine, StatusColor, SwitchId};
use crate::status::overall_color;
use crate::topology::SwitchMap;

/// Cell sizing used to place elements, in terminal character units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridMetrics {
    /// Width of the bay label column on the left.
    pub label_width: u32,
    /// Width of one grid column, including the gap to its neighbour.
    pub cell_width: u32,
    /// Height of one stacked element (switch or machine) in a cell.
    pub slot_height: u32,
    /// Rows reserved above the first bay for column numbers.
    pub header_height: u32,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            label_width: 4,
            cell_width: 14,
            slot_height: 3,
            header_height: 1,
        }
    }
}

/// A point in section-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned box in section-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point {
            x: f64::from(self.x) + f64::from(self.width) / 2.0,
            y: f64::from(self.y) + f64::from(self.height) / 2.0,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// A rendered bay row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    pub bay: String,
    pub y: u32,
    /// Height in characters (tallest cell × slot height).
    pub height: u32,
}

/// A switch placed in the section.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBox {
    pub id: SwitchId,
    pub ports: String,
    pub rect: Rect,
}

impl SwitchBox {
    pub fn is_main(&self) -> bool {
        matches!(self.id, SwitchId::Main)
    }
}

/// A machine placed in the section.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineBox {
    pub machine: Arc<Machine>,
    pub color: StatusColor,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    /// Machine to the switch it names.
    Uplink,
    /// Regular switch to the section's main switch.
    Trunk,
}

/// A straight line between two element centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub from: Point,
    pub to: Point,
}

/// Everything needed to draw one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionLayout {
    pub section: String,
    pub width: u32,
    pub height: u32,
    pub rows: Vec<RowLayout>,
    pub switches: Vec<SwitchBox>,
    pub machines: Vec<MachineBox>,
    pub connectors: Vec<Connector>,
}

impl SectionLayout {
    /// Place every switch and machine of `grid` and derive its connectors.
    ///
    /// Within a cell the switch (if any) comes first, then the machines in
    /// snapshot order. Columns outside `1..=MAX_COLUMNS` are not placed.
    pub fn compute(grid: &SectionGrid, switches: &SwitchMap, metrics: &GridMetrics) -> Self {
        let section = grid.name();
        let mut rows = Vec::new();
        let mut switch_boxes = Vec::new();
        let mut machine_boxes = Vec::new();
        let mut y = metrics.header_height;

        for bay in grid.bays() {
            let mut tallest = 1;

            for column in 1..=MAX_COLUMNS {
                let x = metrics.label_width + (column - 1) * metrics.cell_width;
                let mut slot = 0;
                let mut next_rect = || {
                    let rect = Rect {
                        x,
                        y: y + slot * metrics.slot_height,
                        width: metrics.cell_width.saturating_sub(1).max(1),
                        height: metrics.slot_height,
                    };
                    slot += 1;
                    rect
                };

                if let Some(sw) = grid.switch_at(bay, column, switches) {
                    switch_boxes.push(SwitchBox {
                        id: sw.id.clone(),
                        ports: sw.ports_label(),
                        rect: next_rect(),
                    });
                }
                for machine in grid.cell(bay, column) {
                    machine_boxes.push(MachineBox {
                        machine: Arc::clone(machine),
                        color: overall_color(machine),
                        rect: next_rect(),
                    });
                }

                tallest = tallest.max(slot);
            }

            let height = tallest * metrics.slot_height;
            rows.push(RowLayout {
                bay: bay.to_owned(),
                y,
                height,
            });
            y += height;
        }

        let connectors = connectors(&switch_boxes, &machine_boxes);

        Self {
            section: section.to_owned(),
            width: metrics.label_width + MAX_COLUMNS * metrics.cell_width,
            height: y,
            rows,
            switches: switch_boxes,
            machines: machine_boxes,
            connectors,
        }
    }

    pub fn main_switch(&self) -> Option<&SwitchBox> {
        self.switches.iter().find(|sw| sw.is_main())
    }

    /// The machine box under a section-local position.
    pub fn machine_at(&self, x: u32, y: u32) -> Option<&MachineBox> {
        self.machines.iter().find(|b| b.rect.contains(x, y))
    }

    pub fn machine_box(&self, name: &str) -> Option<&MachineBox> {
        self.machines.iter().find(|b| b.machine.name == name)
    }
}

fn connectors(switches: &[SwitchBox], machines: &[MachineBox]) -> Vec<Connector> {
    // Without a rendered main switch the section draws no lines at all.
    let Some(main) = switches.iter().find(|sw| sw.is_main()) else {
        return Vec::new();
    };
    let hub = main.rect.center();

    let trunks = switches
        .iter()
        .filter(|sw| !sw.is_main())
        .map(|sw| Connector {
            kind: ConnectorKind::Trunk,
            from: sw.rect.center(),
            to: hub,
        });

    let uplinks = machines.iter().filter_map(|b| {
        let label = b.machine.source_switch.as_deref()?;
        let target = switches
            .iter()
            .find(|sw| matches!(&sw.id, SwitchId::Label(l) if l == label))?;
        Some(Connector {
            kind: ConnectorKind::Uplink,
            from: b.rect.center(),
            to: target.rect.center(),
        })
    });

    trunks.chain(uplinks).collect()
}
