// src/serial/mod.rs
//
// Self-describing binary chunk payloads and the framed region blobs built
// from them. The format is host-endian: headers are Pod structs and plane
// data is byte-cast in place, which is exactly what the file sinks write.
//
// v1 header (20 bytes): magic "AVCK", version, extent. Payload is the four
// base planes. v2 appends a channel-flag word and the optional planes in
// flag-bit order.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use tracing::{debug, warn};

use crate::chunk::{ChunkConfig, ChunkStorage};
use crate::core::{ChunkExtent, MaterialIndex, RegionKey, VoxelId};
use crate::effects::{EffectChannels, VelocitySample};
use crate::region::{RegionManager, RegionSnapshot};

pub const CHUNK_MAGIC: [u8; 4] = *b"AVCK";
pub const CHUNK_VERSION_LATEST: u32 = 2;

pub const CHANNEL_MATERIALS: u32 = 1 << 0;
pub const CHANNEL_SKYLIGHT_CACHE: u32 = 1 << 1;
pub const CHANNEL_BLOCKLIGHT_CACHE: u32 = 1 << 2;
pub const CHANNEL_EFFECT_DENSITY: u32 = 1 << 3;
pub const CHANNEL_EFFECT_VELOCITY: u32 = 1 << 4;
pub const CHANNEL_EFFECT_LIFETIME: u32 = 1 << 5;

const CHANNEL_KNOWN_MASK: u32 = CHANNEL_MATERIALS
    | CHANNEL_SKYLIGHT_CACHE
    | CHANNEL_BLOCKLIGHT_CACHE
    | CHANNEL_EFFECT_DENSITY
    | CHANNEL_EFFECT_VELOCITY
    | CHANNEL_EFFECT_LIFETIME;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("invalid chunk magic")]
    BadMagic,
    #[error("unsupported chunk version {0}")]
    UnsupportedVersion(u32),
    #[error("chunk payload truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("payload names planes this runtime cannot provide (flags {flags:#x})")]
    DisabledPlane { flags: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct ChunkHeaderV1 {
    magic: [u8; 4],
    version: u32,
    extent: [u32; 3],
}

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct ChunkHeaderV2 {
    magic: [u8; 4],
    version: u32,
    extent: [u32; 3],
    channel_flags: u32,
}

const HEADER_V1_SIZE: usize = std::mem::size_of::<ChunkHeaderV1>();
const HEADER_V2_SIZE: usize = std::mem::size_of::<ChunkHeaderV2>();

/// One chunk payload framed with its world-space key.
#[derive(Clone, Debug, Default)]
pub struct RegionBlob {
    pub key: RegionKey,
    pub payload: Vec<u8>,
}

fn channel_flags_for(config: &ChunkConfig) -> u32 {
    let mut flags = 0;
    if config.enable_materials {
        flags |= CHANNEL_MATERIALS;
    }
    if config.enable_high_precision_lighting {
        flags |= CHANNEL_SKYLIGHT_CACHE | CHANNEL_BLOCKLIGHT_CACHE;
    }
    if config.effect_channels.contains(EffectChannels::DENSITY) {
        flags |= CHANNEL_EFFECT_DENSITY;
    }
    if config.effect_channels.contains(EffectChannels::VELOCITY) {
        flags |= CHANNEL_EFFECT_VELOCITY;
    }
    if config.effect_channels.contains(EffectChannels::LIFETIME) {
        flags |= CHANNEL_EFFECT_LIFETIME;
    }
    flags
}

fn payload_bytes(count: usize, flags: u32) -> usize {
    let mut bytes = count * (std::mem::size_of::<VoxelId>() + 3);
    if flags & CHANNEL_MATERIALS != 0 {
        bytes += count * std::mem::size_of::<MaterialIndex>();
    }
    if flags & CHANNEL_SKYLIGHT_CACHE != 0 {
        bytes += count * 4;
    }
    if flags & CHANNEL_BLOCKLIGHT_CACHE != 0 {
        bytes += count * 4;
    }
    if flags & CHANNEL_EFFECT_DENSITY != 0 {
        bytes += count * 4;
    }
    if flags & CHANNEL_EFFECT_VELOCITY != 0 {
        bytes += count * 12;
    }
    if flags & CHANNEL_EFFECT_LIFETIME != 0 {
        bytes += count * 4;
    }
    bytes
}

/// Encode a chunk as a v2 payload with channel flags matching its enabled
/// planes.
pub fn serialize_chunk(chunk: &ChunkStorage) -> Vec<u8> {
    let extent = chunk.extent();
    let flags = channel_flags_for(chunk.config());

    let header = ChunkHeaderV2 {
        magic: CHUNK_MAGIC,
        version: CHUNK_VERSION_LATEST,
        extent: [extent.x, extent.y, extent.z],
        channel_flags: flags,
    };

    let mut buffer = Vec::with_capacity(HEADER_V2_SIZE + payload_bytes(extent.volume(), flags));
    buffer.extend_from_slice(bytemuck::bytes_of(&header));

    let planes = chunk.planes();
    let views = planes.views();
    buffer.extend_from_slice(bytemuck::cast_slice(views.voxels.linear()));
    buffer.extend_from_slice(views.skylight.linear());
    buffer.extend_from_slice(views.blocklight.linear());
    buffer.extend_from_slice(views.metadata.linear());

    if let Some(materials) = views.materials {
        buffer.extend_from_slice(bytemuck::cast_slice(materials.linear()));
    }
    if let Some(cache) = views.skylight_cache {
        buffer.extend_from_slice(bytemuck::cast_slice(cache.linear()));
    }
    if let Some(cache) = views.blocklight_cache {
        buffer.extend_from_slice(bytemuck::cast_slice(cache.linear()));
    }
    if let Some(density) = views.effect_density {
        buffer.extend_from_slice(bytemuck::cast_slice(density.linear()));
    }
    if let Some(velocity) = views.effect_velocity {
        buffer.extend_from_slice(bytemuck::cast_slice(velocity.linear()));
    }
    if let Some(lifetime) = views.effect_lifetime {
        buffer.extend_from_slice(bytemuck::cast_slice(lifetime.linear()));
    }

    buffer
}

struct PayloadReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], SerialError> {
        let bytes = self.bytes;
        let end = self.offset + len;
        if end > bytes.len() {
            return Err(SerialError::Truncated {
                expected: end,
                actual: bytes.len(),
            });
        }
        let slice = &bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }
}

/// Decode a v1 or v2 payload into a freshly allocated chunk. The restored
/// chunk reports clean.
pub fn deserialize_chunk(bytes: &[u8]) -> Result<ChunkStorage, SerialError> {
    if bytes.len() < HEADER_V1_SIZE {
        if bytes.len() < 4 || bytes[0..4] != CHUNK_MAGIC {
            return Err(SerialError::BadMagic);
        }
        return Err(SerialError::Truncated {
            expected: HEADER_V1_SIZE,
            actual: bytes.len(),
        });
    }

    let header_v1: ChunkHeaderV1 = bytemuck::pod_read_unaligned(&bytes[..HEADER_V1_SIZE]);
    if header_v1.magic != CHUNK_MAGIC {
        return Err(SerialError::BadMagic);
    }
    if header_v1.version > CHUNK_VERSION_LATEST {
        return Err(SerialError::UnsupportedVersion(header_v1.version));
    }

    let (flags, body_offset) = if header_v1.version == 1 {
        (0u32, HEADER_V1_SIZE)
    } else {
        if bytes.len() < HEADER_V2_SIZE {
            return Err(SerialError::Truncated {
                expected: HEADER_V2_SIZE,
                actual: bytes.len(),
            });
        }
        let header_v2: ChunkHeaderV2 = bytemuck::pod_read_unaligned(&bytes[..HEADER_V2_SIZE]);
        (header_v2.channel_flags, HEADER_V2_SIZE)
    };

    if flags & !CHANNEL_KNOWN_MASK != 0 {
        return Err(SerialError::DisabledPlane {
            flags: flags & !CHANNEL_KNOWN_MASK,
        });
    }

    let extent = ChunkExtent::new(
        header_v1.extent[0],
        header_v1.extent[1],
        header_v1.extent[2],
    );
    let count = extent.volume();

    let required = body_offset + payload_bytes(count, flags);
    if bytes.len() < required {
        return Err(SerialError::Truncated {
            expected: required,
            actual: bytes.len(),
        });
    }

    let mut effect_channels = EffectChannels::NONE;
    if flags & CHANNEL_EFFECT_DENSITY != 0 {
        effect_channels |= EffectChannels::DENSITY;
    }
    if flags & CHANNEL_EFFECT_VELOCITY != 0 {
        effect_channels |= EffectChannels::VELOCITY;
    }
    if flags & CHANNEL_EFFECT_LIFETIME != 0 {
        effect_channels |= EffectChannels::LIFETIME;
    }

    let config = ChunkConfig {
        extent,
        enable_materials: flags & CHANNEL_MATERIALS != 0,
        enable_high_precision_lighting: flags
            & (CHANNEL_SKYLIGHT_CACHE | CHANNEL_BLOCKLIGHT_CACHE)
            != 0,
        effect_channels,
    };
    let mut chunk = ChunkStorage::new(config);

    {
        let mut reader = PayloadReader {
            bytes,
            offset: body_offset,
        };
        let mut planes = chunk.planes_mut();
        let mut views = planes.views_mut();

        views
            .voxels
            .linear_mut()
            .copy_from_slice(bytemuck::cast_slice(
                reader.take(count * std::mem::size_of::<VoxelId>())?,
            ));
        views.skylight.linear_mut().copy_from_slice(reader.take(count)?);
        views
            .blocklight
            .linear_mut()
            .copy_from_slice(reader.take(count)?);
        views.metadata.linear_mut().copy_from_slice(reader.take(count)?);

        if let Some(materials) = views.materials.as_mut() {
            materials.linear_mut().copy_from_slice(bytemuck::cast_slice(
                reader.take(count * std::mem::size_of::<MaterialIndex>())?,
            ));
        }
        if flags & CHANNEL_SKYLIGHT_CACHE != 0 {
            if let Some(cache) = views.skylight_cache.as_mut() {
                cache
                    .linear_mut()
                    .copy_from_slice(bytemuck::cast_slice(reader.take(count * 4)?));
            }
        }
        if flags & CHANNEL_BLOCKLIGHT_CACHE != 0 {
            if let Some(cache) = views.blocklight_cache.as_mut() {
                cache
                    .linear_mut()
                    .copy_from_slice(bytemuck::cast_slice(reader.take(count * 4)?));
            }
        }
        if let Some(density) = views.effect_density.as_mut() {
            density
                .linear_mut()
                .copy_from_slice(bytemuck::cast_slice(reader.take(count * 4)?));
        }
        if let Some(velocity) = views.effect_velocity.as_mut() {
            let raw: &[VelocitySample] = bytemuck::cast_slice(reader.take(count * 12)?);
            velocity.linear_mut().copy_from_slice(raw);
        }
        if let Some(lifetime) = views.effect_lifetime.as_mut() {
            lifetime
                .linear_mut()
                .copy_from_slice(bytemuck::cast_slice(reader.take(count * 4)?));
        }
    }

    chunk.mark_dirty(false);
    Ok(chunk)
}

/// True for payloads carrying the v1 header.
pub fn is_legacy_chunk_payload(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_V1_SIZE {
        return false;
    }
    let header: ChunkHeaderV1 = bytemuck::pod_read_unaligned(&bytes[..HEADER_V1_SIZE]);
    header.magic == CHUNK_MAGIC && header.version == 1
}

/// Round-trip a v1 payload into the current format. The four base planes
/// survive; no optional planes are introduced.
pub fn migrate_legacy_chunk_payload(bytes: &[u8]) -> Result<Vec<u8>, SerialError> {
    if !is_legacy_chunk_payload(bytes) {
        return Err(SerialError::BadMagic);
    }
    warn!(len = bytes.len(), "migrating legacy chunk payload");
    let chunk = deserialize_chunk(bytes)?;
    Ok(serialize_chunk(&chunk))
}

/// Encode one manager snapshot as a keyed blob.
pub fn serialize_snapshot(snapshot: &RegionSnapshot) -> RegionBlob {
    RegionBlob {
        key: snapshot.key,
        payload: serialize_chunk(&snapshot.chunk),
    }
}

/// Feed every loaded snapshot (dirty only unless `include_clean`) through
/// `sink`.
pub fn dump_region<E>(
    manager: &RegionManager,
    mut sink: impl FnMut(&RegionSnapshot) -> Result<(), E>,
    include_clean: bool,
) -> Result<(), E> {
    for snapshot in manager.snapshot_loaded(include_clean) {
        sink(&snapshot)?;
    }
    Ok(())
}

/// Append-mode sink writing framed blobs to one file.
pub fn file_sink(path: impl Into<PathBuf>) -> impl FnMut(&RegionBlob) -> Result<(), SerialError> {
    let path: PathBuf = path.into();
    move |blob| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = OpenOptions::new().create(true).append(true).open(&path)?;
        write_region_blob(&mut out, blob)?;
        Ok(())
    }
}

/// Write one framed blob: key (3 x i32), payload length (u32), payload.
pub fn write_region_blob(out: &mut impl Write, blob: &RegionBlob) -> Result<(), SerialError> {
    out.write_all(bytemuck::bytes_of(&blob.key))?;
    let size = blob.payload.len() as u32;
    out.write_all(&size.to_ne_bytes())?;
    out.write_all(&blob.payload)?;
    Ok(())
}

/// Read the next framed blob, or Ok(None) at a clean end of stream.
pub fn read_region_blob(input: &mut impl Read) -> Result<Option<RegionBlob>, SerialError> {
    let mut key_bytes = [0u8; 12];
    match input.read_exact(&mut key_bytes) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let key: RegionKey = bytemuck::pod_read_unaligned(&key_bytes);

    let mut size_bytes = [0u8; 4];
    input.read_exact(&mut size_bytes)?;
    let size = u32::from_ne_bytes(size_bytes) as usize;

    let mut payload = vec![0u8; size];
    input.read_exact(&mut payload)?;
    Ok(Some(RegionBlob { key, payload }))
}

/// Read every framed blob from a file.
pub fn read_region_file(path: impl AsRef<Path>) -> Result<Vec<RegionBlob>, SerialError> {
    let mut input = File::open(path)?;
    let mut blobs = Vec::new();
    while let Some(blob) = read_region_blob(&mut input)? {
        blobs.push(blob);
    }
    Ok(blobs)
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Serial(#[from] SerialError),
    #[error(transparent)]
    Region(#[from] crate::region::RegionError),
}

/// Decode `blob` and replace the target chunk wholesale. The manager
/// entry's listener wiring survives; the chunk lands clean.
pub fn ingest_blob(manager: &mut RegionManager, blob: &RegionBlob) -> Result<(), IngestError> {
    let incoming = deserialize_chunk(&blob.payload)?;
    let target = manager.assure(blob.key)?;
    target.replace_contents(incoming);
    debug!(key = ?blob.key, bytes = blob.payload.len(), "blob ingested");
    Ok(())
}
