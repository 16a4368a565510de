// src/effects.rs
//
// Optional particle-effect planes: a channel mask selecting which planes a
// chunk carries, an emitter brush that stamps single cells, and a decay tick
// that ages lifetimes and damps velocities.

use bytemuck::{Pod, Zeroable};

use crate::chunk::ChunkStorage;
use crate::core::Span3Mut;

/// Bitmask selecting which effect planes a chunk allocates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EffectChannels(u32);

impl EffectChannels {
    pub const NONE: Self = Self(0);
    pub const DENSITY: Self = Self(1 << 0);
    pub const VELOCITY: Self = Self(1 << 1);
    pub const LIFETIME: Self = Self(1 << 2);
    pub const ALL: Self = Self(0b111);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for EffectChannels {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EffectChannels {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EffectChannels {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Per-cell velocity stored in the effect velocity plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct VelocitySample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl VelocitySample {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Values written into one cell by [`stamp_emitter`].
#[derive(Clone, Copy, Debug)]
pub struct EmitterBrush {
    pub density: f32,
    pub lifetime: f32,
    pub initial_velocity: VelocitySample,
}

impl Default for EmitterBrush {
    fn default() -> Self {
        Self {
            density: 1.0,
            lifetime: 1.0,
            initial_velocity: VelocitySample::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DecaySettings {
    pub delta_time: f32,
    pub velocity_damping: f32,
}

impl Default for DecaySettings {
    fn default() -> Self {
        Self {
            delta_time: 1.0,
            velocity_damping: 0.95,
        }
    }
}

/// Stamp an emitter cell. Returns false when any effect plane is disabled
/// or the coordinate is out of bounds.
pub fn stamp_emitter(chunk: &mut ChunkStorage, local: [u32; 3], brush: &EmitterBrush) -> bool {
    if !chunk.config().effect_channels.contains(EffectChannels::ALL) {
        return false;
    }
    if !chunk
        .extent()
        .contains(local[0], local[1], local[2])
    {
        return false;
    }

    let (x, y, z) = (local[0] as usize, local[1] as usize, local[2] as usize);
    let mut planes = chunk.planes_mut();
    let mut views = planes.views_mut();

    // Guarded by the channel check above.
    if let (Some(density), Some(velocity), Some(lifetime)) = (
        views.effect_density.as_mut(),
        views.effect_velocity.as_mut(),
        views.effect_lifetime.as_mut(),
    ) {
        density.set(x, y, z, brush.density);
        lifetime.set(x, y, z, brush.lifetime);
        velocity.set(x, y, z, brush.initial_velocity);
        true
    } else {
        false
    }
}

/// True when any cell still has a positive lifetime.
pub fn has_active_effects(chunk: &ChunkStorage) -> bool {
    if !chunk
        .config()
        .effect_channels
        .contains(EffectChannels::LIFETIME)
    {
        return false;
    }
    let planes = chunk.planes();
    match planes.effect_lifetime() {
        Ok(lifetime) => lifetime.linear().iter().any(|&life| life > 0.0),
        Err(_) => false,
    }
}

/// Advance the decay tick: age lifetimes, damp live velocities, zero the
/// density/velocity of cells that expire. Returns whether anything is still
/// alive afterwards.
pub fn simulate_decay(chunk: &mut ChunkStorage, settings: DecaySettings) -> bool {
    if !chunk
        .config()
        .effect_channels
        .contains(EffectChannels::LIFETIME)
    {
        return false;
    }

    let mut planes = chunk.planes_mut();
    let views = planes.views_mut();
    let Some(lifetime) = views.effect_lifetime else {
        return false;
    };
    let lifetime = lifetime.into_linear();
    let mut density = views.effect_density.map(Span3Mut::into_linear);
    let mut velocity = views.effect_velocity.map(Span3Mut::into_linear);

    let mut any_alive = false;
    for i in 0..lifetime.len() {
        let life = &mut lifetime[i];
        if *life <= 0.0 {
            if let Some(density) = density.as_deref_mut() {
                density[i] = 0.0;
            }
            if let Some(velocity) = velocity.as_deref_mut() {
                velocity[i] = VelocitySample::default();
            }
            continue;
        }

        *life = (*life - settings.delta_time).max(0.0);
        if *life > 0.0 {
            any_alive = true;
            if let Some(velocity) = velocity.as_deref_mut() {
                let vel = &mut velocity[i];
                vel.x *= settings.velocity_damping;
                vel.y *= settings.velocity_damping;
                vel.z *= settings.velocity_damping;
            }
        } else {
            if let Some(density) = density.as_deref_mut() {
                density[i] = 0.0;
            }
            if let Some(velocity) = velocity.as_deref_mut() {
                velocity[i] = VelocitySample::default();
            }
        }
    }

    any_alive
}
