// src/nav/mod.rs
//
// Navigation grids derived from chunk contents: per-cell walkability with
// clearance and support rules, six-way neighbor expansion with step-height
// limits, and cost weighting by the endpoints' traversal costs.

mod search;
mod stitch;

pub use search::{a_star, compute_flow_field, follow_flow, FlowField, NavPath};
pub use stitch::{stitch_neighbor_regions, NavBridge, NavRegionView, StitchedNavGraph};

use std::sync::Arc;

use crate::chunk::{ChunkStorage, PlaneViews};
use crate::core::{ChunkExtent, VoxelId};

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// Start and goal are not connected under the neighbor rules (or one
    /// of them is not walkable).
    #[error("no path between start and goal")]
    NoPath,
}

pub type NavNodeIndex = usize;

pub const INVALID_NODE: NavNodeIndex = NavNodeIndex::MAX;

/// Costs and limits used when expanding node neighbors.
#[derive(Clone, Copy, Debug)]
pub struct NavNeighborConfig {
    pub horizontal_cost: f32,
    pub vertical_cost: f32,
    pub max_step_height: u32,
}

impl Default for NavNeighborConfig {
    fn default() -> Self {
        Self {
            horizontal_cost: 1.0,
            vertical_cost: 1.0,
            max_step_height: 1,
        }
    }
}

pub type SolidFn = dyn Fn(VoxelId) -> bool + Send + Sync;
pub type SampleCostFn = dyn Fn(&PlaneViews<'_>, u32, u32, u32) -> f32 + Send + Sync;

/// Parameters for deriving a [`NavGrid`] from a chunk.
#[derive(Clone)]
pub struct NavBuildConfig {
    /// Vertical headroom, in cells, a walker needs above a supported cell.
    pub clearance: u32,
    pub neighbor: NavNeighborConfig,
    pub is_solid: Arc<SolidFn>,
    pub sample_cost: Arc<SampleCostFn>,
}

impl Default for NavBuildConfig {
    fn default() -> Self {
        Self {
            clearance: 2,
            neighbor: NavNeighborConfig::default(),
            is_solid: Arc::new(|id| id != 0),
            sample_cost: Arc::new(|_, _, _, _| 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NavCell {
    pub walkable: bool,
    pub traversal_cost: f32,
}

impl Default for NavCell {
    fn default() -> Self {
        Self {
            walkable: false,
            traversal_cost: 1.0,
        }
    }
}

/// Dense walkability grid over one chunk. Node index is the linear
/// `(x, y, z)` index into the extent.
#[derive(Clone, Debug, Default)]
pub struct NavGrid {
    pub extent: ChunkExtent,
    pub cells: Vec<NavCell>,
}

impl NavGrid {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        self.extent.contains(x, y, z)
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> NavNodeIndex {
        x as usize + self.extent.x as usize * (y as usize + self.extent.y as usize * z as usize)
    }

    #[inline]
    pub fn coordinates(&self, node: NavNodeIndex) -> [u32; 3] {
        let xy = self.extent.x as usize * self.extent.y as usize;
        let z = node / xy;
        let rem = node % xy;
        let y = rem / self.extent.x as usize;
        let x = rem % self.extent.x as usize;
        [x as u32, y as u32, z as u32]
    }

    #[inline]
    pub fn walkable(&self, node: NavNodeIndex) -> bool {
        node < self.cells.len() && self.cells[node].walkable
    }

    #[inline]
    pub fn walkable_at(&self, x: u32, y: u32, z: u32) -> bool {
        self.contains(x, y, z) && self.walkable(self.index(x, y, z))
    }

    #[inline]
    pub fn cost(&self, node: NavNodeIndex) -> f32 {
        if node < self.cells.len() {
            self.cells[node].traversal_cost
        } else {
            1.0
        }
    }
}

/// Derive walkability for every cell of `chunk`.
///
/// A cell is walkable when it is open (no solid voxel within `clearance`
/// cells above it, cut off at the chunk top) and supported (at y == 0, or
/// standing on a solid voxel).
pub fn build_nav_grid(chunk: &ChunkStorage, config: &NavBuildConfig) -> NavGrid {
    let extent = chunk.extent();
    let mut grid = NavGrid {
        extent,
        cells: vec![NavCell::default(); extent.volume()],
    };

    let planes = chunk.planes();
    let views = planes.views();
    let voxels = &views.voxels;
    let clearance = config.clearance.max(1);

    for z in 0..extent.z {
        for y in 0..extent.y {
            for x in 0..extent.x {
                let mut open = true;
                for h in 0..clearance {
                    let sample_y = y + h;
                    if sample_y >= extent.y {
                        break;
                    }
                    if (config.is_solid)(voxels.at(x as usize, sample_y as usize, z as usize)) {
                        open = false;
                        break;
                    }
                }
                if !open {
                    continue;
                }

                let supported = y == 0
                    || (config.is_solid)(voxels.at(x as usize, y as usize - 1, z as usize));
                if !supported {
                    continue;
                }

                let idx = grid.index(x, y, z);
                grid.cells[idx].walkable = true;
                grid.cells[idx].traversal_cost = (config.sample_cost)(&views, x, y, z);
            }
        }
    }

    grid
}

#[derive(Clone, Copy, Debug)]
pub struct NavEdge {
    pub node: NavNodeIndex,
    pub cost: f32,
}

const NEIGHBOR_OFFSETS: [[i32; 3]; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

/// Offer the walkable axis neighbors of `node` to `visitor`, respecting
/// `max_step_height`. Edge cost is the movement cost (horizontal, or
/// |dy| * vertical) scaled by the mean of the endpoint traversal costs.
pub fn for_each_neighbor(
    grid: &NavGrid,
    node: NavNodeIndex,
    config: &NavNeighborConfig,
    mut visitor: impl FnMut(NavEdge),
) {
    if !grid.walkable(node) {
        return;
    }

    let [x, y, z] = grid.coordinates(node);
    for offset in NEIGHBOR_OFFSETS {
        let nx = x as i32 + offset[0];
        let ny = y as i32 + offset[1];
        let nz = z as i32 + offset[2];
        if nx < 0 || ny < 0 || nz < 0 {
            continue;
        }
        let (ux, uy, uz) = (nx as u32, ny as u32, nz as u32);
        if !grid.contains(ux, uy, uz) {
            continue;
        }
        if uy.abs_diff(y) > config.max_step_height {
            continue;
        }
        let neighbor = grid.index(ux, uy, uz);
        if !grid.walkable(neighbor) {
            continue;
        }

        let movement = if offset[1] != 0 {
            config.vertical_cost * offset[1].abs() as f32
        } else {
            config.horizontal_cost
        };
        let weight = 0.5 * (grid.cost(node) + grid.cost(neighbor));
        visitor(NavEdge {
            node: neighbor,
            cost: movement * weight,
        });
    }
}

pub fn neighbors(grid: &NavGrid, node: NavNodeIndex, config: &NavNeighborConfig) -> Vec<NavEdge> {
    let mut result = Vec::new();
    for_each_neighbor(grid, node, config, |edge| result.push(edge));
    result
}
