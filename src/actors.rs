//! Per-actor policies: the player, enemies, projectiles and pickups.
//!
//! Every actor owns one body in the registry and a solid or sensing hull on it.
//! Policies only read and move their own body; everything that affects other
//! actors (damage, spawns, removals) is queued and applied by the world after
//! all updates for the tick have run.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::{SpawnRequest, Spawner, TileSource};
use crate::config::WorldConfig;
use crate::error::PhysicsError;
use crate::grapple::{FuelTanks, Grapple, Swing};
use crate::integrator::PhysicsBody;
use crate::movement::{self, GroundState};
use crate::registry::ColliderRegistry;
use crate::resolve::resolve_against;
use crate::stairs::StairController;
use crate::types::*;
use crate::vector::VectorExt;

pub const PROJECTILE_SIZE: Vec2 = Vec2::splat(6.0);
/// Seconds a projectile flies before expiring.
pub const PROJECTILE_LIFETIME: f32 = 3.0;

/// How an enemy moves.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MovePolicy {
    /// Walk between two x bounds (hull centre) at a fixed speed; turn around at
    /// a bound or when blocked.
    Patrol { min_x: f32, max_x: f32, speed: f32 },
    /// Fly straight at a detected player, ignoring gravity.
    Chase { speed: f32 },
    Stationary,
}

/// What an enemy does while the player is inside its sensor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttackPolicy {
    /// Damage immediately, then wait `cooldown` seconds.
    Contact { damage: f32, cooldown: f32 },
    /// Damage after `delay` seconds if the player is still detected.
    Windup { delay: f32, damage: f32 },
    /// Fire a projectile at the player every `period` seconds.
    Volley { period: f32, speed: f32, damage: f32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySpec {
    pub size: Vec2,
    /// Detection area, centred on the hull.
    pub sensor: Vec2,
    pub movement: MovePolicy,
    pub attack: AttackPolicy,
}

fn non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

impl EnemySpec {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let invalid = |field, reason| Err(PhysicsError::InvalidConfig { field, reason });
        if !(self.size.is_finite() && self.size.cmpgt(Vec2::ZERO).all()) {
            return invalid("enemy.size", "must be positive");
        }
        if !(self.sensor.is_finite() && self.sensor.cmpge(Vec2::ZERO).all()) {
            return invalid("enemy.sensor", "must be finite and >= 0");
        }
        match self.movement {
            MovePolicy::Patrol { min_x, max_x, speed } => {
                if !(min_x.is_finite() && max_x.is_finite() && min_x < max_x) {
                    return Err(PhysicsError::InvalidPatrol { min_x, max_x });
                }
                if !non_negative(speed) {
                    return invalid("enemy.movement.speed", "must be finite and >= 0");
                }
            }
            MovePolicy::Chase { speed } if !non_negative(speed) => {
                return invalid("enemy.movement.speed", "must be finite and >= 0");
            }
            MovePolicy::Chase { .. } | MovePolicy::Stationary => {}
        }
        let ok = match self.attack {
            AttackPolicy::Contact { damage, cooldown } => {
                non_negative(damage) && non_negative(cooldown)
            }
            AttackPolicy::Windup { delay, damage } => non_negative(delay) && non_negative(damage),
            AttackPolicy::Volley { period, speed, damage } => {
                non_negative(period) && period > 0.0 && non_negative(speed) && non_negative(damage)
            }
        };
        if !ok {
            return invalid("enemy.attack", "timings and amounts must be finite, periods positive");
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub size: Vec2,
    pub health: f32,
}

impl Default for PlayerSpec {
    fn default() -> Self {
        Self {
            size: Vec2::new(16.0, 30.0),
            health: 3.0,
        }
    }
}

impl PlayerSpec {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.size.is_finite() && self.size.cmpgt(Vec2::ZERO).all()) {
            return Err(PhysicsError::InvalidConfig {
                field: "player.size",
                reason: "must be positive",
            });
        }
        if !(self.health.is_finite() && self.health > 0.0) {
            return Err(PhysicsError::InvalidConfig {
                field: "player.health",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub ground: GroundState,
    pub stairs: StairController,
    pub grapple: Option<Grapple>,
    pub fuel: FuelTanks,
    pub health: f32,
    grapple_held: bool,
}

impl Player {
    pub fn new(spec: &PlayerSpec, cfg: &WorldConfig) -> Self {
        Self {
            ground: GroundState::default(),
            stairs: StairController::new(),
            grapple: None,
            fuel: FuelTanks::full(&cfg.grapple),
            health: spec.health,
            grapple_held: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub ground: GroundState,
    pub movement: MovePolicy,
    pub attack: AttackPolicy,
    /// Non-blocking detection collider on the enemy's body.
    pub sensor: ColliderId,
    timer: f32,
    winding: bool,
}

impl Enemy {
    pub fn new(spec: &EnemySpec, sensor: ColliderId) -> Self {
        Self {
            ground: GroundState::default(),
            movement: spec.movement,
            attack: spec.attack,
            sensor,
            timer: 0.0,
            winding: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projectile {
    pub damage: f32,
    pub lifetime: f32,
    pub source: ActorId,
}

#[derive(Clone, Debug)]
pub enum ActorKind {
    Player(Player),
    Enemy(Enemy),
    Projectile(Projectile),
    Pickup { value: u32 },
}

/// Damage queued during a tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Damage {
    pub target: ActorId,
    pub source: ActorId,
    pub amount: f32,
}

/// Everything an actor may touch while it updates.
pub struct TickContext<'a> {
    pub registry: &'a mut ColliderRegistry,
    pub tiles: &'a dyn TileSource,
    pub cfg: &'a WorldConfig,
    pub dt: f32,
    pub intent: &'a Intent,
    pub spawner: &'a mut dyn Spawner,
    pub events: &'a mut Vec<WorldEvent>,
    pub damage: &'a mut Vec<Damage>,
}

impl TickContext<'_> {
    fn bounds(&self, hull: ColliderId) -> Result<Rect, PhysicsError> {
        self.registry
            .bounds(hull)
            .ok_or(PhysicsError::UnknownCollider(hull))
    }

    fn body_of(&self, hull: ColliderId) -> Result<BodyId, PhysicsError> {
        self.registry
            .desc(hull)
            .map(|d| d.body)
            .ok_or(PhysicsError::UnknownCollider(hull))
    }

    /// First player collider overlapping `collider`, with the owning actor.
    fn player_touching(&self, collider: ColliderId) -> Option<(ActorId, ColliderId)> {
        self.registry
            .query_overlaps(collider)
            .find(|(_, d)| d.tag == ColliderTag::Player)
            .and_then(|(id, d)| Some((ActorId::from_key(d.owner?), id)))
    }
}

#[derive(Clone, Debug)]
pub struct Actor {
    id: ActorId,
    body: BodyId,
    hull: ColliderId,
    pub physics: PhysicsBody,
    pub kind: ActorKind,
    removed: bool,
}

impl Actor {
    pub fn new(
        id: ActorId,
        body: BodyId,
        hull: ColliderId,
        physics: PhysicsBody,
        kind: ActorKind,
    ) -> Self {
        Self {
            id,
            body,
            hull,
            physics,
            kind,
            removed: false,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn hull(&self) -> ColliderId {
        self.hull
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Flag for removal at the end of the tick.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            ActorKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            ActorKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Run this actor's policy for one tick. Flagged actors do nothing.
    pub fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), PhysicsError> {
        if self.removed {
            return Ok(());
        }
        let done = match &mut self.kind {
            ActorKind::Player(p) => update_player(self.id, self.hull, &mut self.physics, p, ctx)?,
            ActorKind::Enemy(e) => update_enemy(self.id, self.hull, &mut self.physics, e, ctx)?,
            ActorKind::Projectile(pr) => update_projectile(self.hull, &mut self.physics, pr, ctx)?,
            ActorKind::Pickup { value } => update_pickup(self.id, self.hull, *value, ctx),
        };
        if done {
            self.removed = true;
        }
        Ok(())
    }
}

fn update_player(
    id: ActorId,
    hull: ColliderId,
    physics: &mut PhysicsBody,
    p: &mut Player,
    ctx: &mut TickContext<'_>,
) -> Result<bool, PhysicsError> {
    let cfg = ctx.cfg;
    let intent = *ctx.intent;
    let dt = ctx.dt;

    let pressed = intent.grapple && !p.grapple_held;
    p.grapple_held = intent.grapple;
    if p.grapple.is_some() && !intent.grapple {
        p.grapple = None;
        log::debug!("{id:?} let go of the tether");
        ctx.events.push(WorldEvent::GrappleReleased {
            actor: id,
            broken: false,
        });
    } else if pressed && p.grapple.is_none() {
        try_attach(id, hull, p, ctx)?;
    }

    movement::apply_walk(physics, &mut p.ground, intent.move_x, &cfg.movement);
    if p.grapple.is_none()
        && movement::apply_jump(physics, &mut p.ground, intent.jump, &cfg.movement)
    {
        p.stairs.leave();
    }
    movement::apply_gravity(physics, &p.ground, &cfg.movement);

    let mut broken = false;
    match p.grapple.as_mut() {
        None => {
            let stairs = Some(&mut p.stairs);
            movement::move_body(ctx.registry, ctx.tiles, hull, physics, stairs, cfg, dt)?;
            p.fuel.update(None, dt, &cfg.grapple);
        }
        Some(g) => {
            movement::move_body(ctx.registry, ctx.tiles, hull, physics, None, cfg, dt)?;
            let rect = ctx.bounds(hull)?;
            let body = ctx.body_of(hull)?;
            let mut pos = rect.center();
            let swing = g.step(&mut pos, &mut physics.velocity, &cfg.grapple);
            let climbing = match swing {
                Swing::Taut { climbing } => climbing,
                Swing::Free => None,
            };
            p.fuel.update(climbing, dt, &cfg.grapple);
            if matches!(swing, Swing::Taut { .. }) {
                // The swing overrides position; terrain in the way cuts the tether
                let delta = pos - rect.center();
                let obstacles = movement::gather_obstacles(
                    ctx.registry,
                    ctx.tiles,
                    rect,
                    delta,
                    body,
                    cfg.query_margin,
                );
                let res = resolve_against(rect, delta, &obstacles, &cfg.resolver);
                ctx.registry.translate(body, res.displacement)?;
                if !res.blocked.is_empty() {
                    physics.stop_against(res.blocked);
                    broken = true;
                }
            }
        }
    }
    if broken {
        p.grapple = None;
        log::debug!("{id:?} tether broken by terrain");
        ctx.events.push(WorldEvent::GrappleReleased {
            actor: id,
            broken: true,
        });
    }

    movement::update_ground(ctx.registry, ctx.tiles, hull, physics, &mut p.ground, cfg)?;
    Ok(false)
}

fn try_attach(
    id: ActorId,
    hull: ColliderId,
    p: &mut Player,
    ctx: &mut TickContext<'_>,
) -> Result<(), PhysicsError> {
    let cfg = ctx.cfg;
    let aim = ctx.intent.aim.normalized();
    if aim == Vec2::ZERO {
        return Ok(());
    }
    if let Some(side) = Facing::from_sign(aim.x) {
        if !p.fuel.can_attach(side, &cfg.grapple) {
            log::debug!("{id:?} grapple {side:?} refused: fuel {:.2}", p.fuel.level(side));
            return Ok(());
        }
    }
    let origin = ctx.bounds(hull)?.center();
    let body = ctx.body_of(hull)?;
    let reach = cfg.grapple.max_length;
    let hit = movement::cast_solid(ctx.registry, ctx.tiles, origin, aim, reach, body);
    let Some(anchor) = hit else {
        return Ok(());
    };
    match Grapple::attach(anchor, origin, (anchor - origin).magnitude()) {
        Ok(g) => {
            log::debug!("{id:?} grapple attached at {anchor:?}, radius {:.1}", g.radius());
            ctx.events.push(WorldEvent::GrappleAttached {
                actor: id,
                anchor,
                radius: g.radius(),
            });
            p.grapple = Some(g);
            p.stairs.leave();
            p.ground.grounded = false;
        }
        Err(e) => log::debug!("{id:?} grapple not attached: {e}"),
    }
    Ok(())
}

fn update_enemy(
    id: ActorId,
    hull: ColliderId,
    physics: &mut PhysicsBody,
    e: &mut Enemy,
    ctx: &mut TickContext<'_>,
) -> Result<bool, PhysicsError> {
    let cfg = ctx.cfg;
    let dt = ctx.dt;
    let target = ctx.player_touching(e.sensor);
    let target_rect = match target {
        Some((_, collider)) => ctx.registry.bounds(collider),
        None => None,
    };

    match e.movement {
        MovePolicy::Patrol { min_x, max_x, speed } => {
            let cx = ctx.bounds(hull)?.center().x;
            if cx <= min_x {
                e.ground.facing = Facing::Right;
            } else if cx >= max_x {
                e.ground.facing = Facing::Left;
            }
            physics.velocity.x = e.ground.facing.sign() * speed;
            movement::apply_gravity(physics, &e.ground, &cfg.movement);
            let out = movement::move_body(ctx.registry, ctx.tiles, hull, physics, None, cfg, dt)?;
            if out.resolution.blocked.intersects(Blocked::HORIZONTAL) {
                e.ground.facing = e.ground.facing.flip();
            }
            movement::update_ground(ctx.registry, ctx.tiles, hull, physics, &mut e.ground, cfg)?;
        }
        MovePolicy::Chase { speed } => {
            let here = ctx.bounds(hull)?.center();
            physics.velocity = match target_rect {
                Some(t) => (t.center() - here).normalized() * speed,
                None => Vec2::ZERO,
            };
            if let Some(f) = Facing::from_sign(physics.velocity.x) {
                e.ground.facing = f;
            }
            movement::move_body(ctx.registry, ctx.tiles, hull, physics, None, cfg, dt)?;
        }
        MovePolicy::Stationary => {
            physics.velocity.x = 0.0;
            movement::apply_gravity(physics, &e.ground, &cfg.movement);
            movement::move_body(ctx.registry, ctx.tiles, hull, physics, None, cfg, dt)?;
            movement::update_ground(ctx.registry, ctx.tiles, hull, physics, &mut e.ground, cfg)?;
        }
    }

    e.timer = (e.timer - dt).max(0.0);
    let (Some((player, _)), Some(target_rect)) = (target, target_rect) else {
        e.winding = false;
        return Ok(false);
    };
    match e.attack {
        AttackPolicy::Contact { damage, cooldown } => {
            if e.timer <= 0.0 {
                ctx.damage.push(Damage {
                    target: player,
                    source: id,
                    amount: damage,
                });
                e.timer = cooldown;
            }
        }
        AttackPolicy::Windup { delay, damage } => {
            if !e.winding {
                e.winding = true;
                e.timer = delay;
            } else if e.timer <= 0.0 {
                ctx.damage.push(Damage {
                    target: player,
                    source: id,
                    amount: damage,
                });
                e.winding = false;
            }
        }
        AttackPolicy::Volley { period, speed, damage } => {
            if e.timer <= 0.0 {
                let from = ctx.bounds(hull)?.center();
                let dir = (target_rect.center() - from).normalized();
                if dir != Vec2::ZERO {
                    ctx.spawner.spawn(SpawnRequest::Projectile {
                        center: from,
                        size: PROJECTILE_SIZE,
                        velocity: dir * speed,
                        damage,
                        lifetime: PROJECTILE_LIFETIME,
                        source: id,
                    });
                    e.timer = period;
                }
            }
        }
    }
    Ok(false)
}

fn update_projectile(
    hull: ColliderId,
    physics: &mut PhysicsBody,
    pr: &mut Projectile,
    ctx: &mut TickContext<'_>,
) -> Result<bool, PhysicsError> {
    pr.lifetime -= ctx.dt;
    let out = movement::move_body(ctx.registry, ctx.tiles, hull, physics, None, ctx.cfg, ctx.dt)?;
    if let Some((player, _)) = ctx.player_touching(hull) {
        ctx.damage.push(Damage {
            target: player,
            source: pr.source,
            amount: pr.damage,
        });
        return Ok(true);
    }
    Ok(!out.resolution.blocked.is_empty() || pr.lifetime <= 0.0)
}

fn update_pickup(id: ActorId, hull: ColliderId, value: u32, ctx: &mut TickContext<'_>) -> bool {
    match ctx.player_touching(hull) {
        Some((by, _)) => {
            ctx.events.push(WorldEvent::PickupCollected {
                pickup: id,
                by,
                value,
            });
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patrol() -> EnemySpec {
        EnemySpec {
            size: Vec2::new(20.0, 20.0),
            sensor: Vec2::new(60.0, 40.0),
            movement: MovePolicy::Patrol {
                min_x: 0.0,
                max_x: 100.0,
                speed: 40.0,
            },
            attack: AttackPolicy::Contact {
                damage: 1.0,
                cooldown: 1.0,
            },
        }
    }

    #[test]
    fn test_enemy_spec_validation() {
        assert!(patrol().validate().is_ok());

        let mut spec = patrol();
        spec.movement = MovePolicy::Patrol {
            min_x: 10.0,
            max_x: 10.0,
            speed: 1.0,
        };
        assert_eq!(
            spec.validate(),
            Err(PhysicsError::InvalidPatrol {
                min_x: 10.0,
                max_x: 10.0
            })
        );

        let mut spec = patrol();
        spec.attack = AttackPolicy::Volley {
            period: 0.0,
            speed: 100.0,
            damage: 1.0,
        };
        assert!(matches!(
            spec.validate(),
            Err(PhysicsError::InvalidConfig { field: "enemy.attack", .. })
        ));

        let mut spec = patrol();
        spec.size = Vec2::new(0.0, 5.0);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_player_spec_validation() {
        assert!(PlayerSpec::default().validate().is_ok());
        let spec = PlayerSpec {
            health: 0.0,
            ..PlayerSpec::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_flagged_actor_skips_update() {
        let cfg = WorldConfig::default();
        let mut registry = ColliderRegistry::new();
        let body = registry.add_body(Vec2::ZERO);
        let hull = registry.register_static(Rect::new(Vec2::ZERO, Vec2::ONE), ColliderTag::Pickup);
        let mut actor = Actor::new(
            ActorId(0),
            body,
            hull,
            PhysicsBody::new(Vec2::ZERO),
            ActorKind::Pickup { value: 1 },
        );
        actor.mark_removed();
        let mut spawns: Vec<SpawnRequest> = Vec::new();
        let (mut events, mut damage) = (Vec::new(), Vec::new());
        let mut ctx = TickContext {
            registry: &mut registry,
            tiles: &crate::api::NoTiles,
            cfg: &cfg,
            dt: 0.1,
            intent: &Intent::default(),
            spawner: &mut spawns,
            events: &mut events,
            damage: &mut damage,
        };
        actor.update(&mut ctx).unwrap();
        assert!(actor.is_removed());
        assert!(events.is_empty());
    }
}
