use glam::Vec2;

use crate::types::*;

/// Primitive intersection tests used by the resolver, raycasts and the grapple.
pub trait NarrowphaseApi {
    // Rays / lines ----------------------------------------------------------

    /// Slab ray test; `toi` is in units of `dir`. Origin inside gives `toi == 0`.
    fn ray_rect(origin: Vec2, dir: Vec2, rect: Rect) -> Option<SweepHit>;

    /// Parameters `t` where the infinite line `a + t (b - a)` meets the circle.
    fn line_circle(a: Vec2, b: Vec2, center: Vec2, r: f32) -> Option<(f32, f32)>;

    /// Entry/exit of the segment `origin .. origin + delta` through the rect's
    /// open interior. Axes with no motion must have the origin strictly inside.
    fn slab_interval(origin: Vec2, delta: Vec2, rect: Rect) -> Option<SlabHit>;

    // Overlaps --------------------------------------------------------------

    /// Shortest axis-aligned way out for `a` when it penetrates `b`.
    /// Edge contact is not penetration.
    fn overlap_rect_rect(a: Rect, b: Rect) -> Option<Overlap>;

    // Sweeps ----------------------------------------------------------------

    /// Sweep `mover` by `delta` against a static `obstacle` (Minkowski-expanded slab test).
    fn sweep_rect_rect(mover: Rect, delta: Vec2, obstacle: Rect) -> Option<SlabHit>;
}

/// Static level collision supplied by the host (tile map, level editor, ...).
pub trait TileSource {
    /// All blocking tiles whose bounds touch `region`.
    fn colliders_in_region(&self, region: Rect) -> Vec<Obstacle>;
}

/// A source with no tiles, for worlds built purely from registered terrain.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTiles;

impl TileSource for NoTiles {
    fn colliders_in_region(&self, _region: Rect) -> Vec<Obstacle> {
        Vec::new()
    }
}

/// Actors requested during a tick; created after the tick's updates finish.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SpawnRequest {
    Projectile {
        center: Vec2,
        size: Vec2,
        velocity: Vec2,
        damage: f32,
        lifetime: f32,
        source: ActorId,
    },
    Pickup {
        center: Vec2,
        size: Vec2,
        value: u32,
    },
}

/// Entity-creation seam handed to actor policies.
pub trait Spawner {
    fn spawn(&mut self, request: SpawnRequest);
}

impl Spawner for Vec<SpawnRequest> {
    fn spawn(&mut self, request: SpawnRequest) {
        self.push(request);
    }
}
