//! Grid placement and neighbour wiring
//!
//! Cells are laid out row-major on a `width x height` torus. In spatial
//! mode each cell is wired to its von Neumann neighbours (up, down, left,
//! right, wrapping at the edges); in non-spatial mode cells get a location
//! but no neighbours, since passing picks from the whole network.

use hypercycle_cells::CellNet;
use hypercycle_common::{NodeId, Result, Topology};
use tracing::debug;

use crate::config::GridSettings;

/// Places cells on a grid and wires their contacts
#[derive(Debug, Clone, Copy)]
pub struct GridBuilder {
    width: usize,
    height: usize,
}

impl GridBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn from_settings(settings: &GridSettings) -> Self {
        Self::new(settings.width, settings.height)
    }

    /// Cell at column `x`, row `y`
    pub fn node_at(&self, x: usize, y: usize) -> NodeId {
        NodeId(y * self.width + x)
    }

    /// Assign locations and, for spatial topology, neighbours.
    ///
    /// The network must already hold exactly `width * height` cells.
    pub fn build(&self, net: &mut CellNet, topology: Topology) -> Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                net.set_location(self.node_at(x, y), x, y)?;
            }
        }

        if topology == Topology::Spatial {
            for y in 0..self.height {
                for x in 0..self.width {
                    let here = self.node_at(x, y);
                    let right = self.node_at((x + 1) % self.width, y);
                    let down = self.node_at(x, (y + 1) % self.height);
                    for there in [right, down] {
                        if there != here {
                            net.connect(here, there)?;
                        }
                    }
                }
            }
        }

        debug!(
            width = self.width,
            height = self.height,
            %topology,
            "Built grid"
        );
        Ok(())
    }
}
