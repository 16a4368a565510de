//! Navigation through the region manager: lazily rebuilt grids that track
//! edits, A* and flow-field behavior on derived grids, and inter-region
//! stitching.

use voxel_world::{
    a_star, compute_flow_field, cubic_extent, follow_flow, NavNeighborConfig, RegionKey,
    RegionManager,
};

fn key(x: i32) -> RegionKey {
    RegionKey::new(x, 0, 0)
}

fn lay_floor(manager: &mut RegionManager, region: RegionKey, edge: usize) {
    let chunk = manager.assure(region).expect("create");
    let mut planes = chunk.planes_mut();
    let mut voxels = planes.voxels();
    for z in 0..edge {
        for x in 0..edge {
            voxels.set(x, 0, z, 1);
        }
    }
}

#[test]
fn navigation_after_edit_seed() {
    let edge = 8u32;
    let mut manager = RegionManager::new(cubic_extent(edge));
    manager.enable_navigation(true);
    lay_floor(&mut manager, key(0), edge as usize);
    manager.tick_all().expect("initial rebuild");

    let grid = manager.navigation_grid(key(0)).expect("grid built");
    let start = grid.index(0, 1, 0);
    let goal = grid.index(edge - 1, 1, edge - 1);
    let config = NavNeighborConfig::default();
    let first = a_star(&grid, start, goal, &config).expect("open floor connects");
    assert_eq!(*first.nodes.first().expect("non-empty"), start);
    assert_eq!(*first.nodes.last().expect("non-empty"), goal);

    // Block the middle cell and tick: the rebuilt grid reflects the edit.
    manager
        .assure(key(0))
        .expect("resident")
        .planes_mut()
        .voxels()
        .set(edge as usize / 2, 1, edge as usize / 2, 1);
    manager.tick_all().expect("rebuild after edit");

    let grid = manager.navigation_grid(key(0)).expect("rebuilt");
    assert!(!grid.walkable_at(edge / 2, 1, edge / 2));
    let detour = a_star(&grid, start, goal, &config).expect("a path still exists");
    assert!(detour
        .nodes
        .iter()
        .all(|&node| node != grid.index(edge / 2, 1, edge / 2)));
}

#[test]
fn rebuilds_coalesce_between_ticks() {
    let mut manager = RegionManager::new(cubic_extent(4));
    manager.enable_navigation(true);
    lay_floor(&mut manager, key(0), 4);
    manager.tick_all().expect("initial build");
    let revision = manager.navigation_revision(key(0));

    // A burst of edits before the next tick yields exactly one rebuild.
    for i in 0..10 {
        manager
            .assure(key(0))
            .expect("resident")
            .planes_mut()
            .voxels()
            .set(i % 4, 2, 0, 1);
    }
    manager.tick_all().expect("coalesced rebuild");
    assert_eq!(manager.navigation_revision(key(0)), revision + 1);
}

#[test]
fn disabled_navigation_returns_no_grid() {
    let mut manager = RegionManager::new(cubic_extent(4));
    lay_floor(&mut manager, key(0), 4);
    manager.tick_all().expect("tick");
    assert!(manager.navigation_grid(key(0)).is_none());

    // Enabling late schedules the backlog.
    manager.enable_navigation(true);
    manager.tick_all().expect("rebuild");
    assert!(manager.navigation_grid(key(0)).is_some());
}

#[test]
fn flow_field_guides_to_goal_on_manager_grid() {
    let edge = 6u32;
    let mut manager = RegionManager::new(cubic_extent(edge));
    manager.enable_navigation(true);
    lay_floor(&mut manager, key(0), edge as usize);
    manager.tick_all().expect("build");

    let grid = manager.navigation_grid(key(0)).expect("grid");
    let config = NavNeighborConfig::default();
    let goal = grid.index(edge - 1, 1, edge - 1);
    let field = compute_flow_field(&grid, goal, &config);

    let path = follow_flow(&field, grid.index(0, 1, 0), 256);
    assert!(!path.is_empty());
    assert_eq!(*path.last().expect("non-empty"), goal);

    // Unreachable cells yield an empty walk.
    let in_air = grid.index(0, 3, 0);
    assert!(follow_flow(&field, in_air, 256).is_empty());
}

#[test]
fn stitched_regions_connect_across_the_seam() {
    let edge = 4u32;
    let mut manager = RegionManager::new(cubic_extent(edge));
    manager.enable_navigation(true);
    lay_floor(&mut manager, key(0), edge as usize);
    lay_floor(&mut manager, key(1), edge as usize);
    manager.tick_all().expect("build");

    let graph = manager.stitch_navigation(key(0), &[key(1)]);
    assert_eq!(graph.regions.len(), 2);

    // Every boundary column at walking height bridges in both directions.
    let east_bridges = graph
        .bridges
        .iter()
        .filter(|bridge| bridge.from_region == key(0))
        .count();
    let west_bridges = graph
        .bridges
        .iter()
        .filter(|bridge| bridge.from_region == key(1))
        .count();
    assert_eq!(east_bridges, edge as usize);
    assert_eq!(west_bridges, edge as usize);
}

#[test]
fn stitching_skips_missing_grids() {
    let mut manager = RegionManager::new(cubic_extent(4));
    manager.enable_navigation(true);
    lay_floor(&mut manager, key(0), 4);
    manager.tick_all().expect("build");

    // key(1) was never loaded, so only one region participates.
    let graph = manager.stitch_navigation(key(0), &[key(1)]);
    assert_eq!(graph.regions.len(), 1);
    assert!(graph.bridges.is_empty());
}
