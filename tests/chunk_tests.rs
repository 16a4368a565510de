//! Chunk storage seen from outside: plane configuration, dirty tracking
//! with listeners, and the compression protocol end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use voxel_world::{
    cubic_extent, ChunkConfig, ChunkError, ChunkFill, ChunkStorage, CompressFn, DecompressFn,
    EffectChannels, PlaneViews, PlaneViewsMut,
};

#[test]
fn optional_planes_follow_config() {
    let minimal = ChunkStorage::with_extent(cubic_extent(2));
    {
        let planes = minimal.planes();
        assert!(matches!(
            planes.materials(),
            Err(ChunkError::DisabledPlane("materials"))
        ));
        assert!(planes.skylight_cache().is_err());
        assert!(planes.effect_density().is_err());
    }

    let full = ChunkStorage::new(ChunkConfig {
        extent: cubic_extent(2),
        enable_materials: true,
        enable_high_precision_lighting: true,
        effect_channels: EffectChannels::ALL,
    });
    let planes = full.planes();
    assert!(planes.materials().is_ok());
    assert!(planes.skylight_cache().is_ok());
    assert!(planes.blocklight_cache().is_ok());
    assert!(planes.effect_density().is_ok());
    assert!(planes.effect_velocity().is_ok());
    assert!(planes.effect_lifetime().is_ok());
}

#[test]
fn dirty_listener_order_is_registration_order() {
    let mut chunk = ChunkStorage::with_extent(cubic_extent(2));
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let log = log.clone();
        chunk.add_dirty_listener(Arc::new(move || {
            log.lock().expect("log lock").push(tag);
        }));
    }

    chunk.planes_mut().voxels().set(0, 0, 0, 1);
    assert_eq!(*log.lock().expect("log lock"), vec!["first", "second", "third"]);

    chunk.clear_dirty_listeners();
    chunk.mark_dirty(true);
    assert_eq!(log.lock().expect("log lock").len(), 3, "cleared listeners stay silent");
}

fn full_plane_hooks() -> (Arc<CompressFn>, Arc<DecompressFn>) {
    // Encode voxels + skylight; enough to prove the present plane set is
    // what the encoder sees.
    let encode: Arc<CompressFn> = Arc::new(|views: &PlaneViews<'_>| {
        let mut blob = Vec::new();
        blob.extend_from_slice(bytemuck::cast_slice(views.voxels.linear()));
        blob.extend_from_slice(views.skylight.linear());
        blob
    });
    let decode: Arc<DecompressFn> = Arc::new(|mut views: PlaneViewsMut<'_>, blob: &[u8]| {
        let voxel_bytes = views.voxels.len() * 2;
        views
            .voxels
            .linear_mut()
            .copy_from_slice(bytemuck::cast_slice(&blob[..voxel_bytes]));
        views
            .skylight
            .linear_mut()
            .copy_from_slice(&blob[voxel_bytes..]);
    });
    (encode, decode)
}

#[test]
fn compression_protocol_end_to_end() {
    let mut chunk = ChunkStorage::with_extent(cubic_extent(2));
    chunk.fill(ChunkFill {
        voxel: 7,
        skylight: 11,
        ..ChunkFill::default()
    });

    let (encode, decode) = full_plane_hooks();
    chunk.set_compression_hooks(encode, Some(decode));
    chunk.request_compression();
    assert!(chunk.flush_compression());
    assert!(chunk.compressed());
    assert_eq!(chunk.compressed_blob().len(), 8 * 2 + 8);

    // A second flush without a new request is a no-op.
    assert!(!chunk.flush_compression());

    // Reads re-inflate lazily and see the original data.
    assert_eq!(chunk.planes().voxels().at(1, 1, 1), 7);
    assert_eq!(chunk.planes().skylight().at(0, 0, 0), 11);
    assert!(!chunk.compressed());
}

#[test]
fn parallel_flush_of_distinct_chunks() {
    let make = || {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(8));
        chunk.fill(ChunkFill::voxel(3));
        let (encode, decode) = full_plane_hooks();
        chunk.set_compression_hooks(encode, Some(decode));
        chunk.request_compression();
        Arc::new(chunk)
    };
    let a = make();
    let b = make();

    let flushed = Arc::new(AtomicUsize::new(0));
    std::thread::scope(|scope| {
        for chunk in [&a, &b] {
            let chunk = chunk.clone();
            let flushed = flushed.clone();
            scope.spawn(move || {
                if chunk.flush_compression() {
                    flushed.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(flushed.load(Ordering::SeqCst), 2);
    assert!(a.compressed());
    assert!(b.compressed());
}

#[test]
fn fill_defaults_match_plane_semantics() {
    let mut chunk = ChunkStorage::new(ChunkConfig {
        extent: cubic_extent(2),
        enable_materials: true,
        ..ChunkConfig::default()
    });
    chunk.fill(ChunkFill::voxel(9));

    let planes = chunk.planes();
    assert!(planes.voxels().linear().iter().all(|&v| v == 9));
    assert!(planes.skylight().linear().iter().all(|&v| v == 0));
    // Default material fill is the invalid sentinel.
    assert!(planes
        .materials()
        .expect("enabled")
        .linear()
        .iter()
        .all(|&m| m == voxel_world::INVALID_MATERIAL_INDEX));
}
