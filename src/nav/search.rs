// src/nav/search.rs
//
// Best-first search over a nav grid: A* point-to-point paths and Dijkstra
// flow fields toward a fixed goal.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::ChunkExtent;

use super::{for_each_neighbor, NavError, NavGrid, NavNeighborConfig, NavNodeIndex, INVALID_NODE};

const EPSILON: f32 = 1e-6;

#[derive(Clone, Debug)]
pub struct NavPath {
    pub nodes: Vec<NavNodeIndex>,
    pub total_cost: f32,
}

struct FrontierNode {
    node: NavNodeIndex,
    priority: f32,
    cost: f32,
}

impl PartialEq for FrontierNode {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for FrontierNode {}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierNode {
    // Reversed: BinaryHeap is a max-heap, we want the cheapest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
    }
}

fn heuristic(
    grid: &NavGrid,
    node: NavNodeIndex,
    goal: NavNodeIndex,
    config: &NavNeighborConfig,
) -> f32 {
    let [x1, y1, z1] = grid.coordinates(node);
    let [x2, y2, z2] = grid.coordinates(goal);
    let dx = x1.abs_diff(x2) as f32;
    let dy = y1.abs_diff(y2) as f32;
    let dz = z1.abs_diff(z2) as f32;
    (dx + dz) * config.horizontal_cost + dy * config.vertical_cost
}

/// Cheapest path from `start` to `goal`, or [`NavError::NoPath`].
pub fn a_star(
    grid: &NavGrid,
    start: NavNodeIndex,
    goal: NavNodeIndex,
    config: &NavNeighborConfig,
) -> Result<NavPath, NavError> {
    if !grid.walkable(start) || !grid.walkable(goal) {
        return Err(NavError::NoPath);
    }

    let mut frontier = BinaryHeap::new();
    let mut g_score = vec![f32::INFINITY; grid.len()];
    let mut came_from = vec![INVALID_NODE; grid.len()];

    g_score[start] = 0.0;
    frontier.push(FrontierNode {
        node: start,
        priority: heuristic(grid, start, goal, config),
        cost: 0.0,
    });

    while let Some(current) = frontier.pop() {
        if current.node == goal {
            let mut nodes = Vec::new();
            let mut walk = goal;
            while walk != INVALID_NODE {
                nodes.push(walk);
                if walk == start {
                    break;
                }
                walk = came_from[walk];
            }
            nodes.reverse();
            return Ok(NavPath {
                nodes,
                total_cost: current.cost,
            });
        }

        for_each_neighbor(grid, current.node, config, |edge| {
            let tentative = g_score[current.node] + edge.cost;
            if tentative + EPSILON < g_score[edge.node] {
                g_score[edge.node] = tentative;
                came_from[edge.node] = current.node;
                frontier.push(FrontierNode {
                    node: edge.node,
                    priority: tentative + heuristic(grid, edge.node, goal, config),
                    cost: tentative,
                });
            }
        });
    }

    Err(NavError::NoPath)
}

/// Per-node next hop and distance toward a fixed goal.
#[derive(Clone, Debug, Default)]
pub struct FlowField {
    pub extent: ChunkExtent,
    pub next: Vec<NavNodeIndex>,
    pub distance: Vec<f32>,
}

/// Dijkstra from `goal` outward. Unreachable nodes keep `INVALID_NODE` /
/// infinite distance.
pub fn compute_flow_field(
    grid: &NavGrid,
    goal: NavNodeIndex,
    config: &NavNeighborConfig,
) -> FlowField {
    let mut field = FlowField {
        extent: grid.extent,
        next: vec![INVALID_NODE; grid.len()],
        distance: vec![f32::INFINITY; grid.len()],
    };

    if !grid.walkable(goal) {
        return field;
    }

    let mut queue = BinaryHeap::new();
    field.distance[goal] = 0.0;
    field.next[goal] = goal;
    queue.push(FrontierNode {
        node: goal,
        priority: 0.0,
        cost: 0.0,
    });

    while let Some(current) = queue.pop() {
        if current.cost > field.distance[current.node] + EPSILON {
            continue;
        }

        for_each_neighbor(grid, current.node, config, |edge| {
            let candidate = current.cost + edge.cost;
            if candidate + EPSILON < field.distance[edge.node] {
                field.distance[edge.node] = candidate;
                field.next[edge.node] = current.node;
                queue.push(FrontierNode {
                    node: edge.node,
                    priority: candidate,
                    cost: candidate,
                });
            }
        });
    }

    field
}

/// Walk `next` pointers from `start` toward the goal. Returns the visited
/// nodes (goal included), or an empty path when the start is unreachable.
pub fn follow_flow(field: &FlowField, start: NavNodeIndex, max_steps: usize) -> Vec<NavNodeIndex> {
    let mut path = Vec::new();
    if start >= field.next.len() {
        return path;
    }

    let mut current = start;
    for _ in 0..max_steps {
        path.push(current);
        let next = field.next[current];
        if next == INVALID_NODE {
            path.clear();
            return path;
        }
        if next == current {
            break;
        }
        current = next;
    }
    path
}
