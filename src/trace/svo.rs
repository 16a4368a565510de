// src/trace/svo.rs
//
// Sparse voxel octree over one chunk. Nodes live in a flat arena indexed
// by u32; u32::MAX is the "no child" sentinel. An internal node reserves
// its eight child slots consecutively before recursing, so
// first_child..first_child+8 is always a valid range.

use bytemuck::{Pod, Zeroable};

use crate::chunk::ChunkStorage;
use crate::core::{Span3, VoxelId};

pub const INVALID_CHILD: u32 = u32::MAX;

/// Material summary over a sub-volume; only non-empty voxels contribute.
#[derive(Clone, Copy, Debug)]
pub struct VoxelNodeBounds {
    pub min_material: VoxelId,
    pub max_material: VoxelId,
    pub occupied: bool,
}

impl Default for VoxelNodeBounds {
    fn default() -> Self {
        Self {
            min_material: VoxelId::MAX,
            max_material: 0,
            occupied: false,
        }
    }
}

impl VoxelNodeBounds {
    #[inline]
    pub fn include(&mut self, id: VoxelId) {
        if id == 0 {
            return;
        }
        self.occupied = true;
        self.min_material = self.min_material.min(id);
        self.max_material = self.max_material.max(id);
    }

    #[inline]
    pub fn merge(&mut self, other: &VoxelNodeBounds) {
        if !other.occupied {
            return;
        }
        self.occupied = true;
        self.min_material = self.min_material.min(other.min_material);
        self.max_material = self.max_material.max(other.max_material);
    }

    /// Normalize the empty sentinel for storage.
    fn finished(mut self) -> Self {
        if !self.occupied {
            self.min_material = 0;
        }
        self
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SvoNode {
    pub bounds: VoxelNodeBounds,
    pub children: [u32; 8],
    pub first_child: u32,
    pub size: u32,
    pub origin: [i32; 3],
    pub leaf: bool,
}

impl Default for SvoNode {
    fn default() -> Self {
        Self {
            bounds: VoxelNodeBounds::default(),
            children: [INVALID_CHILD; 8],
            first_child: INVALID_CHILD,
            size: 0,
            origin: [0; 3],
            leaf: true,
        }
    }
}

/// GPU export layout for one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuNode {
    pub origin: [f32; 3],
    pub size: f32,
    pub children: [u32; 8],
    pub leaf: u32,
    pub material_range: [u32; 2],
}

#[derive(Clone, Debug, Default)]
pub struct SparseVoxelOctree {
    nodes: Vec<SvoNode>,
}

impl SparseVoxelOctree {
    pub const DEFAULT_MAX_DEPTH: u32 = 5;

    /// Build the tree for `chunk`. Subdivision stops at `max_depth`, when
    /// any child dimension would drop below one voxel, or when a
    /// sub-volume holds no occupied voxels.
    pub fn build(&mut self, chunk: &ChunkStorage, max_depth: u32) {
        self.nodes.clear();
        self.nodes.push(SvoNode::default());
        let extent = chunk.extent();
        let planes = chunk.planes();
        let voxels = planes.voxels();
        self.build_node(
            0,
            &voxels,
            0,
            [extent.x, extent.y, extent.z],
            [0, 0, 0],
            max_depth,
        );
    }

    pub fn from_chunk(chunk: &ChunkStorage, max_depth: u32) -> Self {
        let mut tree = Self::default();
        tree.build(chunk, max_depth);
        tree
    }

    #[inline]
    pub fn root(&self) -> &SvoNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn nodes(&self) -> &[SvoNode] {
        &self.nodes
    }

    pub fn export_gpu_buffer(&self) -> Vec<GpuNode> {
        self.nodes
            .iter()
            .map(|node| GpuNode {
                origin: [
                    node.origin[0] as f32,
                    node.origin[1] as f32,
                    node.origin[2] as f32,
                ],
                size: node.size as f32,
                children: node.children,
                leaf: u32::from(node.leaf),
                material_range: [
                    node.bounds.min_material as u32,
                    node.bounds.max_material as u32,
                ],
            })
            .collect()
    }

    fn build_node(
        &mut self,
        node_index: u32,
        voxels: &Span3<'_, VoxelId>,
        depth: u32,
        size: [u32; 3],
        offset: [u32; 3],
        max_depth: u32,
    ) {
        let bounds = accumulate_bounds(voxels, size, offset);
        let leaf = depth >= max_depth
            || size[0] <= 1
            || size[1] <= 1
            || size[2] <= 1
            || !bounds.occupied;

        {
            let node = &mut self.nodes[node_index as usize];
            node.bounds = bounds.finished();
            node.origin = [offset[0] as i32, offset[1] as i32, offset[2] as i32];
            node.size = size[0];
            node.leaf = leaf;
            if leaf {
                node.first_child = INVALID_CHILD;
                node.children = [INVALID_CHILD; 8];
                return;
            }
        }

        // Reserve all eight child slots before descending so children are
        // consecutive in the arena.
        let first_child = self.nodes.len() as u32;
        self.nodes
            .extend(std::iter::repeat(SvoNode::default()).take(8));
        let child_size = [
            (size[0] / 2).max(1),
            (size[1] / 2).max(1),
            (size[2] / 2).max(1),
        ];

        let mut children = [INVALID_CHILD; 8];
        for (child, slot) in children.iter_mut().enumerate() {
            *slot = first_child + child as u32;
        }
        {
            let node = &mut self.nodes[node_index as usize];
            node.first_child = first_child;
            node.children = children;
        }

        for child in 0..8u32 {
            let mut child_offset = offset;
            if child & 1 != 0 {
                child_offset[0] += child_size[0];
            }
            if child & 2 != 0 {
                child_offset[1] += child_size[1];
            }
            if child & 4 != 0 {
                child_offset[2] += child_size[2];
            }
            self.build_node(
                first_child + child,
                voxels,
                depth + 1,
                child_size,
                child_offset,
                max_depth,
            );
        }
    }
}

fn accumulate_bounds(
    voxels: &Span3<'_, VoxelId>,
    size: [u32; 3],
    offset: [u32; 3],
) -> VoxelNodeBounds {
    let mut bounds = VoxelNodeBounds::default();
    for z in 0..size[2] {
        for y in 0..size[1] {
            for x in 0..size[0] {
                let px = (offset[0] + x) as usize;
                let py = (offset[1] + y) as usize;
                let pz = (offset[2] + z) as usize;
                if !voxels.contains(px, py, pz) {
                    continue;
                }
                bounds.include(voxels.at(px, py, pz));
            }
        }
    }
    bounds
}
