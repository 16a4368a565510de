// src/nav/stitch.rs
//
// Face-to-face bridges between the nav grids of adjacent regions. Bridges
// are emitted for every walkable cell pair along the shared face, with an
// optional vertical offset up to max_step_height.

use std::sync::Arc;

use crate::core::{ChunkExtent, RegionKey};

use super::{NavGrid, NavNeighborConfig, NavNodeIndex, INVALID_NODE};

#[derive(Clone)]
pub struct NavRegionView {
    pub key: RegionKey,
    pub grid: Arc<NavGrid>,
}

#[derive(Clone, Copy, Debug)]
pub struct NavBridge {
    pub from_region: RegionKey,
    pub from_node: NavNodeIndex,
    pub to_region: RegionKey,
    pub to_node: NavNodeIndex,
    pub cost: f32,
}

impl Default for NavBridge {
    fn default() -> Self {
        Self {
            from_region: RegionKey::default(),
            from_node: INVALID_NODE,
            to_region: RegionKey::default(),
            to_node: INVALID_NODE,
            cost: f32::INFINITY,
        }
    }
}

#[derive(Clone, Default)]
pub struct StitchedNavGraph {
    pub regions: Vec<NavRegionView>,
    pub bridges: Vec<NavBridge>,
}

fn stitch_pair(
    neighbor: &NavNeighborConfig,
    extent: ChunkExtent,
    from: &NavRegionView,
    to: &NavRegionView,
    stitched: &mut StitchedNavGraph,
) {
    let dx = to.key.x - from.key.x;
    let dy = to.key.y - from.key.y;
    let dz = to.key.z - from.key.z;
    if dx.abs() + dy.abs() + dz.abs() != 1 {
        return;
    }

    let mut add_bridge = |fx: u32, fy: u32, fz: u32, tx: u32, ty: u32, tz: u32| {
        let from_node = from.grid.index(fx, fy, fz);
        let to_node = to.grid.index(tx, ty, tz);
        if !from.grid.walkable(from_node) || !to.grid.walkable(to_node) {
            return;
        }
        if ty.abs_diff(fy) > neighbor.max_step_height {
            return;
        }

        let mut movement = neighbor.horizontal_cost;
        if dy != 0 {
            movement = neighbor.vertical_cost * dy.abs() as f32;
        }
        let step = ty.abs_diff(fy);
        if step != 0 {
            movement += neighbor.vertical_cost * step as f32;
        }
        let weight = 0.5 * (from.grid.cost(from_node) + to.grid.cost(to_node));
        stitched.bridges.push(NavBridge {
            from_region: from.key,
            from_node,
            to_region: to.key,
            to_node,
            cost: movement * weight,
        });
    };

    let step_range = |y: u32| {
        let lo = y.saturating_sub(neighbor.max_step_height);
        let hi = (y + neighbor.max_step_height).min(extent.y - 1);
        lo..=hi
    };

    if dx != 0 {
        let fx = if dx > 0 { extent.x - 1 } else { 0 };
        let tx = if dx > 0 { 0 } else { extent.x - 1 };
        for y in 0..extent.y {
            for z in 0..extent.z {
                for ty in step_range(y) {
                    add_bridge(fx, y, z, tx, ty, z);
                }
            }
        }
        return;
    }

    if dz != 0 {
        let fz = if dz > 0 { extent.z - 1 } else { 0 };
        let tz = if dz > 0 { 0 } else { extent.z - 1 };
        for y in 0..extent.y {
            for x in 0..extent.x {
                for ty in step_range(y) {
                    add_bridge(x, y, fz, x, ty, tz);
                }
            }
        }
        return;
    }

    // dy != 0: vertical adjacency crosses at the top/bottom faces.
    let fy = if dy > 0 { extent.y - 1 } else { 0 };
    let ty = if dy > 0 { 0 } else { extent.y - 1 };
    for x in 0..extent.x {
        for z in 0..extent.z {
            add_bridge(x, fy, z, x, ty, z);
        }
    }
}

/// Emit bridges for every ordered pair of face-adjacent regions in
/// `stitched.regions`.
pub fn stitch_neighbor_regions(
    neighbor: &NavNeighborConfig,
    extent: ChunkExtent,
    stitched: &mut StitchedNavGraph,
) {
    let regions = stitched.regions.clone();
    for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            stitch_pair(neighbor, extent, &regions[i], &regions[j], stitched);
            stitch_pair(neighbor, extent, &regions[j], &regions[i], stitched);
        }
    }
}
