//! Shared ground movement: walking forces, gravity, jumping, grounded checks,
//! and the integrate → resolve → translate pipeline every mover goes through.

use glam::Vec2;

use crate::api::{NarrowphaseApi, TileSource};
use crate::config::{MovementConfig, WorldConfig};
use crate::error::PhysicsError;
use crate::integrator::PhysicsBody;
use crate::narrowphase::Narrowphase;
use crate::registry::ColliderRegistry;
use crate::resolve::{probe_below, resolve_against};
use crate::stairs::StairController;
use crate::types::*;
use crate::vector::sign;

/// Grounded bookkeeping carried across ticks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GroundState {
    pub grounded: bool,
    /// Ticks left during which vertical velocity is held at zero after landing.
    pub landing_grace: u32,
    pub facing: Facing,
    /// Jump input from the previous tick, to detect release.
    pub jump_held: bool,
}

impl Default for GroundState {
    fn default() -> Self {
        Self {
            grounded: false,
            landing_grace: 0,
            facing: Facing::Right,
            jump_held: false,
        }
    }
}

/// Result of one `move_body` call.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveOutcome {
    /// Displacement proposed by the integrator, before collision.
    pub proposed: Vec2,
    pub resolution: Resolution,
}

/// A terminal-velocity-capped body for a walker.
pub fn walker_body(cfg: &MovementConfig) -> PhysicsBody {
    PhysicsBody::new(Vec2::new(cfg.max_run_speed, cfg.terminal_fall_speed))
}

/// Horizontal walking forces for this tick. `input` is clamped to [-1, 1].
pub fn apply_walk(
    physics: &mut PhysicsBody,
    ground: &mut GroundState,
    input: f32,
    cfg: &MovementConfig,
) {
    let input = if input.is_nan() {
        0.0
    } else {
        input.clamp(-1.0, 1.0)
    };
    let scale = if ground.grounded {
        1.0
    } else {
        cfg.air_control
    };
    if input == 0.0 {
        physics.apply_counter_acceleration(Vec2::new(cfg.stop * scale, 0.0));
        return;
    }
    let vx = physics.velocity.x;
    let coefficient = if vx == 0.0 || sign(vx) == sign(input) {
        cfg.accelerate
    } else {
        cfg.reverse
    };
    physics.apply_acceleration(Vec2::new(coefficient * input * scale, 0.0));
    if let Some(f) = Facing::from_sign(input) {
        ground.facing = f;
    }
}

/// Gravity, skipped while grounded or inside the landing grace window.
pub fn apply_gravity(physics: &mut PhysicsBody, ground: &GroundState, cfg: &MovementConfig) {
    if ground.grounded || ground.landing_grace > 0 {
        return;
    }
    physics.apply_acceleration(Vec2::new(0.0, cfg.gravity));
}

/// Start a jump when grounded with jump held; cut the rise short on release.
/// Returns true if a jump started.
pub fn apply_jump(
    physics: &mut PhysicsBody,
    ground: &mut GroundState,
    held: bool,
    cfg: &MovementConfig,
) -> bool {
    let jumped = held && ground.grounded;
    if jumped {
        physics.velocity.y = -cfg.jump_velocity;
        ground.grounded = false;
        ground.landing_grace = 0;
    } else if !held && ground.jump_held && physics.velocity.y < 0.0 {
        physics.velocity.y *= cfg.jump_cut;
    }
    ground.jump_held = held;
    jumped
}

/// Solid registry colliders (other than the mover's own body) and tiles touching
/// the region swept by `rect` moving `d`, grown by `margin`.
pub fn gather_obstacles(
    registry: &ColliderRegistry,
    tiles: &dyn TileSource,
    rect: Rect,
    d: Vec2,
    exclude: BodyId,
    margin: f32,
) -> Vec<Obstacle> {
    let region = rect.union(&rect.translate(d)).expand(Vec2::splat(margin));
    let mut obstacles = registry.solids_in(region, Some(exclude));
    obstacles.extend(
        tiles
            .colliders_in_region(region)
            .into_iter()
            .filter(|o| o.tag.is_solid()),
    );
    obstacles
}

/// Closest solid hit (registry colliders not on `exclude`, then tiles) along a
/// unit `dir` within `max_len`.
pub fn cast_solid(
    registry: &ColliderRegistry,
    tiles: &dyn TileSource,
    origin: Vec2,
    dir: Vec2,
    max_len: f32,
    exclude: BodyId,
) -> Option<Vec2> {
    let registry_hit = registry
        .raycast(origin, dir, max_len, |d| {
            d.tag.is_solid() && !d.is_trigger && d.body != exclude
        })
        .map(|(_, hit, _)| hit.toi);
    let reach = Rect::new(origin, dir * max_len);
    let tile_hit = tiles
        .colliders_in_region(reach)
        .into_iter()
        .filter(|o| o.tag.is_solid())
        .filter_map(|o| Narrowphase::ray_rect(origin, dir, o.rect))
        .map(|hit| hit.toi)
        .filter(|t| (0.0..=max_len).contains(t))
        .min_by(f32::total_cmp);
    let toi = registry_hit.into_iter().chain(tile_hit).min_by(f32::total_cmp)?;
    Some(origin + dir * toi)
}

/// Integrate `physics`, resolve the displacement of `hull` and move its body.
///
/// Velocity components pushing into blocked sides are zeroed.
pub fn move_body(
    registry: &mut ColliderRegistry,
    tiles: &dyn TileSource,
    hull: ColliderId,
    physics: &mut PhysicsBody,
    stairs: Option<&mut StairController>,
    cfg: &WorldConfig,
    dt: f32,
) -> Result<MoveOutcome, PhysicsError> {
    let desc = *registry.desc(hull).ok_or(PhysicsError::UnknownCollider(hull))?;
    let rect = registry
        .bounds(hull)
        .ok_or(PhysicsError::UnknownBody(desc.body))?;

    let mut proposed = physics.update_velocity(dt);
    if !proposed.is_finite() {
        log::warn!("non-finite displacement {proposed:?} for {hull:?}; holding still");
        physics.velocity = Vec2::ZERO;
        proposed = Vec2::ZERO;
    }

    let obstacles = gather_obstacles(registry, tiles, rect, proposed, desc.body, cfg.query_margin);
    let resolution = match stairs {
        Some(s) => s.resolve(rect, proposed, &obstacles, &cfg.stairs, &cfg.resolver),
        None => resolve_against(rect, proposed, &obstacles, &cfg.resolver),
    };
    registry.translate(desc.body, resolution.displacement)?;
    physics.stop_against(resolution.blocked);
    Ok(MoveOutcome {
        proposed,
        resolution,
    })
}

/// Refresh `ground` after a move. Returns true on the tick the body lands.
pub fn update_ground(
    registry: &ColliderRegistry,
    tiles: &dyn TileSource,
    hull: ColliderId,
    physics: &mut PhysicsBody,
    ground: &mut GroundState,
    cfg: &WorldConfig,
) -> Result<bool, PhysicsError> {
    let desc = registry.desc(hull).ok_or(PhysicsError::UnknownCollider(hull))?;
    let rect = registry
        .bounds(hull)
        .ok_or(PhysicsError::UnknownBody(desc.body))?;
    let reach = cfg.movement.ground_probe + cfg.resolver.epsilon;
    let below = gather_obstacles(
        registry,
        tiles,
        rect,
        Vec2::new(0.0, reach),
        desc.body,
        cfg.query_margin,
    );
    let grounded = physics.velocity.y >= 0.0 && probe_below(rect, &below, reach).is_some();

    let landed = grounded && !ground.grounded;
    if landed {
        physics.velocity.y = 0.0;
        ground.landing_grace = cfg.movement.landing_grace_ticks;
        log::trace!("{hull:?} landed at y {:.2}", rect.bottom());
    } else if ground.landing_grace > 0 {
        ground.landing_grace -= 1;
        if grounded {
            physics.velocity.y = 0.0;
        }
    }
    ground.grounded = grounded;
    Ok(landed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NoTiles;
    use crate::tiles::TileGrid;

    const DT: f32 = 1.0 / 60.0;

    fn walker(reg: &mut ColliderRegistry, at: Vec2) -> ColliderId {
        let body = reg.add_body(at);
        reg.register(ColliderDesc {
            body,
            offset: Vec2::ZERO,
            size: Vec2::new(16.0, 30.0),
            tag: ColliderTag::Player,
            is_trigger: false,
            owner: None,
        })
        .unwrap()
    }

    fn run(
        reg: &mut ColliderRegistry,
        tiles: &dyn TileSource,
        hull: ColliderId,
        physics: &mut PhysicsBody,
        ground: &mut GroundState,
        input: f32,
        ticks: usize,
    ) {
        let cfg = WorldConfig::default();
        for _ in 0..ticks {
            apply_walk(physics, ground, input, &cfg.movement);
            apply_gravity(physics, ground, &cfg.movement);
            move_body(reg, tiles, hull, physics, None, &cfg, DT).unwrap();
            update_ground(reg, tiles, hull, physics, ground, &cfg).unwrap();
        }
    }

    #[test]
    fn test_falls_and_lands_on_floor() {
        let cfg = WorldConfig::default();
        let mut reg = ColliderRegistry::new();
        reg.register_static(
            Rect::from_edges(-100.0, 100.0, 100.0, 132.0).unwrap(),
            ColliderTag::Terrain,
        );
        let hull = walker(&mut reg, Vec2::new(0.0, 20.0));
        let mut physics = walker_body(&cfg.movement);
        let mut ground = GroundState::default();
        run(&mut reg, &NoTiles, hull, &mut physics, &mut ground, 0.0, 60);

        let r = reg.bounds(hull).unwrap();
        assert!(ground.grounded);
        assert_eq!(physics.velocity.y, 0.0);
        assert!((r.bottom() - 100.0).abs() < 0.02, "bottom {}", r.bottom());
    }

    #[test]
    fn test_lands_on_tile_floor() {
        let cfg = WorldConfig::default();
        let tiles = TileGrid::from_rows(Vec2::ZERO, 32.0, &["....", "....", "####"]).unwrap();
        let mut reg = ColliderRegistry::new();
        let hull = walker(&mut reg, Vec2::new(40.0, 0.0));
        let mut physics = walker_body(&cfg.movement);
        let mut ground = GroundState::default();
        run(&mut reg, &tiles, hull, &mut physics, &mut ground, 0.0, 60);
        assert!(ground.grounded);
        assert!((reg.bounds(hull).unwrap().bottom() - 64.0).abs() < 0.02);

        // Walking across tile seams stays on the floor
        run(&mut reg, &tiles, hull, &mut physics, &mut ground, 1.0, 20);
        assert!(ground.grounded);
        assert!(physics.velocity.x > 0.0);
        assert!((reg.bounds(hull).unwrap().bottom() - 64.0).abs() < 0.02);
    }

    #[test]
    fn test_walk_caps_at_run_speed_and_stops_without_reversing() {
        let cfg = MovementConfig::default();
        let mut physics = walker_body(&cfg);
        let mut ground = GroundState {
            grounded: true,
            ..GroundState::default()
        };
        for _ in 0..120 {
            apply_walk(&mut physics, &mut ground, 1.0, &cfg);
            physics.update_velocity(DT);
        }
        assert_eq!(physics.velocity.x, cfg.max_run_speed);
        assert_eq!(ground.facing, Facing::Right);

        for _ in 0..120 {
            apply_walk(&mut physics, &mut ground, 0.0, &cfg);
            physics.update_velocity(DT);
        }
        assert_eq!(physics.velocity.x, 0.0);
    }

    #[test]
    fn test_reverse_and_air_control_coefficients() {
        let cfg = MovementConfig::default();
        let mut physics = walker_body(&cfg).with_velocity(Vec2::new(100.0, 0.0));
        let mut ground = GroundState {
            grounded: true,
            ..GroundState::default()
        };
        apply_walk(&mut physics, &mut ground, -1.0, &cfg);
        assert_eq!(physics.acceleration().x, -cfg.reverse);
        assert_eq!(ground.facing, Facing::Left);
        physics.update_velocity(DT);

        ground.grounded = false;
        physics.velocity = Vec2::ZERO;
        apply_walk(&mut physics, &mut ground, 1.0, &cfg);
        assert!((physics.acceleration().x - cfg.accelerate * cfg.air_control).abs() < 1e-3);
    }

    #[test]
    fn test_jump_and_cut() {
        let cfg = MovementConfig::default();
        let mut physics = walker_body(&cfg);
        let mut ground = GroundState {
            grounded: true,
            ..GroundState::default()
        };
        assert!(apply_jump(&mut physics, &mut ground, true, &cfg));
        assert_eq!(physics.velocity.y, -cfg.jump_velocity);
        assert!(!ground.grounded);

        // Still held in the air: nothing changes
        assert!(!apply_jump(&mut physics, &mut ground, true, &cfg));
        assert_eq!(physics.velocity.y, -cfg.jump_velocity);

        // Released while rising
        apply_jump(&mut physics, &mut ground, false, &cfg);
        assert!((physics.velocity.y + cfg.jump_velocity * cfg.jump_cut).abs() < 1e-3);
    }

    #[test]
    fn test_wall_zeroes_horizontal_velocity() {
        let cfg = WorldConfig::default();
        let mut reg = ColliderRegistry::new();
        reg.register_static(
            Rect::from_edges(30.0, -100.0, 40.0, 100.0).unwrap(),
            ColliderTag::Terrain,
        );
        let hull = walker(&mut reg, Vec2::ZERO);
        let mut physics = walker_body(&cfg.movement).with_velocity(Vec2::new(250.0, 0.0));
        let out = move_body(&mut reg, &NoTiles, hull, &mut physics, None, &cfg, 0.1).unwrap();
        assert!(out.resolution.blocked.contains(Blocked::RIGHT));
        assert_eq!(physics.velocity.x, 0.0);
        assert!(reg.bounds(hull).unwrap().right() <= 30.0);
    }

    #[test]
    fn test_cast_solid_prefers_nearest_of_registry_and_tiles() {
        let tiles = TileGrid::from_rows(Vec2::ZERO, 10.0, &["....#"]).unwrap();
        let mut reg = ColliderRegistry::new();
        let me = reg.add_body(Vec2::ZERO);
        reg.register_static(Rect::from_edges(60.0, 0.0, 70.0, 10.0).unwrap(), ColliderTag::Terrain);
        let origin = Vec2::new(0.0, 5.0);
        let hit = cast_solid(&reg, &tiles, origin, Vec2::X, 100.0, me).unwrap();
        assert!((hit.x - 40.0).abs() < 1e-4);
        assert!(cast_solid(&reg, &tiles, origin, Vec2::X, 30.0, me).is_none());
        assert!(cast_solid(&reg, &tiles, origin, -Vec2::X, 100.0, me).is_none());
    }

    #[test]
    fn test_unknown_hull_is_an_error() {
        let cfg = WorldConfig::default();
        let mut reg = ColliderRegistry::new();
        let mut physics = walker_body(&cfg.movement);
        let err = move_body(&mut reg, &NoTiles, ColliderId(3), &mut physics, None, &cfg, DT);
        assert_eq!(err, Err(PhysicsError::UnknownCollider(ColliderId(3))));
    }
}
