use glam::Vec2;

use crate::actors::*;
use crate::api::{SpawnRequest, TileSource};
use crate::config::WorldConfig;
use crate::error::PhysicsError;
use crate::integrator::PhysicsBody;
use crate::movement::walker_body;
use crate::registry::{ColliderRegistry, RegistryStats};
use crate::types::*;

/// The simulation: an owned collider registry plus the actors living in it.
///
/// `tick` runs in two phases. First every actor updates, in spawn order,
/// against the registry; removals are flags and spawns are queued. Then
/// damage is applied, flagged actors are dropped, the registry is compacted
/// and queued spawns are created.
pub struct World {
    cfg: WorldConfig,
    registry: ColliderRegistry,
    actors: Vec<Actor>,
    next_actor: u32,
    player: Option<ActorId>,
    pending: Vec<SpawnRequest>,
    damage: Vec<Damage>,
    events: Vec<WorldEvent>,
    ticks: u64,
}

/// Debug statistics for the world.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub actors: usize,
    pub ticks: u64,
    pub registry: RegistryStats,
}

impl World {
    pub fn new(cfg: WorldConfig) -> Result<Self, PhysicsError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            registry: ColliderRegistry::new(),
            actors: Vec::new(),
            next_actor: 0,
            player: None,
            pending: Vec::new(),
            damage: Vec::new(),
            events: Vec::new(),
            ticks: 0,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &ColliderRegistry {
        &self.registry
    }

    /// Static level geometry registered directly (in addition to any `TileSource`).
    pub fn add_terrain(&mut self, rect: Rect, tag: ColliderTag) -> ColliderId {
        self.registry.register_static(rect, tag)
    }

    pub fn remove_terrain(&mut self, id: ColliderId) -> Result<(), PhysicsError> {
        if self.registry.unregister(id) {
            Ok(())
        } else {
            Err(PhysicsError::UnknownCollider(id))
        }
    }

    fn next_id(&mut self) -> ActorId {
        let id = ActorId(self.next_actor);
        self.next_actor = self.next_actor.wrapping_add(1);
        id
    }

    /// New body centred on `center` with one hull collider owned by `id`.
    fn add_hull(
        &mut self,
        id: ActorId,
        center: Vec2,
        size: Vec2,
        tag: ColliderTag,
    ) -> Result<(BodyId, ColliderId), PhysicsError> {
        let body = self.registry.add_body(center - size * 0.5);
        let hull = self.registry.register(ColliderDesc {
            body,
            offset: Vec2::ZERO,
            size,
            tag,
            is_trigger: false,
            owner: Some(id.key()),
        })?;
        Ok((body, hull))
    }

    /// Spawn the player. A second call replaces which actor enemies target.
    pub fn spawn_player(
        &mut self,
        center: Vec2,
        spec: &PlayerSpec,
    ) -> Result<ActorId, PhysicsError> {
        spec.validate()?;
        let id = self.next_id();
        let (body, hull) = self.add_hull(id, center, spec.size, ColliderTag::Player)?;
        let player = Player::new(spec, &self.cfg);
        self.actors.push(Actor::new(
            id,
            body,
            hull,
            walker_body(&self.cfg.movement),
            ActorKind::Player(player),
        ));
        self.player = Some(id);
        log::debug!("spawned player {id:?} at {center:?}");
        Ok(id)
    }

    pub fn spawn_enemy(&mut self, center: Vec2, spec: &EnemySpec) -> Result<ActorId, PhysicsError> {
        spec.validate()?;
        let id = self.next_id();
        let (body, hull) = self.add_hull(id, center, spec.size, ColliderTag::Enemy)?;
        let sensor = self.registry.register(ColliderDesc {
            body,
            offset: (spec.size - spec.sensor) * 0.5,
            size: spec.sensor,
            tag: ColliderTag::Trigger,
            is_trigger: true,
            owner: Some(id.key()),
        })?;
        let terminal = match spec.movement {
            MovePolicy::Chase { .. } => Vec2::splat(f32::INFINITY),
            MovePolicy::Patrol { .. } | MovePolicy::Stationary => {
                Vec2::new(f32::INFINITY, self.cfg.movement.terminal_fall_speed)
            }
        };
        self.actors.push(Actor::new(
            id,
            body,
            hull,
            PhysicsBody::new(terminal),
            ActorKind::Enemy(Enemy::new(spec, sensor)),
        ));
        log::debug!("spawned enemy {id:?} at {center:?}");
        Ok(id)
    }

    pub fn spawn_pickup(
        &mut self,
        center: Vec2,
        size: Vec2,
        value: u32,
    ) -> Result<ActorId, PhysicsError> {
        let id = self.next_id();
        let (body, hull) = self.add_hull(id, center, size.abs(), ColliderTag::Pickup)?;
        self.actors.push(Actor::new(
            id,
            body,
            hull,
            PhysicsBody::new(Vec2::ZERO),
            ActorKind::Pickup { value },
        ));
        Ok(id)
    }

    /// Flag an actor; it stays visible to queries until the end of the next tick.
    pub fn remove_actor(&mut self, id: ActorId) -> Result<(), PhysicsError> {
        let actor = self
            .actors
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(PhysicsError::UnknownActor(id))?;
        actor.mark_removed();
        Ok(())
    }

    pub fn player(&self) -> Option<ActorId> {
        self.player
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id() == id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id() == id)
    }

    /// Actors in update order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn bounds(&self, id: ActorId) -> Option<Rect> {
        self.actor(id).and_then(|a| self.registry.bounds(a.hull()))
    }

    pub fn player_health(&self) -> Option<f32> {
        self.player
            .and_then(|id| self.actor(id))
            .and_then(Actor::as_player)
            .map(|p| p.health)
    }

    /// Advance the simulation by `dt` seconds. Non-positive or non-finite `dt` is ignored.
    pub fn tick(&mut self, dt: f32, intent: &Intent, tiles: &dyn TileSource) {
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("tick skipped: dt = {dt}");
            return;
        }
        self.ticks += 1;
        self.update_actors(dt, intent, tiles);
        self.end_tick();
    }

    /// Phase 1: updates against the registry as it stands. Removals are only flagged.
    fn update_actors(&mut self, dt: f32, intent: &Intent, tiles: &dyn TileSource) {
        for actor in self.actors.iter_mut() {
            let mut ctx = TickContext {
                registry: &mut self.registry,
                tiles,
                cfg: &self.cfg,
                dt,
                intent,
                spawner: &mut self.pending,
                events: &mut self.events,
                damage: &mut self.damage,
            };
            if let Err(e) = actor.update(&mut ctx) {
                log::warn!("actor {:?} dropped: {e}", actor.id());
                actor.mark_removed();
            }
        }
    }

    /// Phase 2: apply queued effects, drop flagged actors, compact, spawn.
    fn end_tick(&mut self) {
        self.apply_damage();
        self.remove_flagged();
        self.registry.compact();
        self.spawn_pending();
    }

    fn apply_damage(&mut self) {
        for hit in std::mem::take(&mut self.damage) {
            let Some(actor) = self.actors.iter_mut().find(|a| a.id() == hit.target) else {
                log::warn!("damage for missing actor {:?}", hit.target);
                continue;
            };
            let Some(player) = actor.as_player_mut() else {
                continue;
            };
            if player.health <= 0.0 {
                continue;
            }
            player.health -= hit.amount;
            self.events.push(WorldEvent::PlayerDamaged {
                player: hit.target,
                source: hit.source,
                amount: hit.amount,
                health: player.health,
            });
            if player.health <= 0.0 {
                log::debug!("player {:?} defeated by {:?}", hit.target, hit.source);
                self.events.push(WorldEvent::PlayerDefeated { player: hit.target });
            }
        }
    }

    fn remove_flagged(&mut self) {
        let registry = &mut self.registry;
        let events = &mut self.events;
        let player = &mut self.player;
        self.actors.retain(|a| {
            if !a.is_removed() {
                return true;
            }
            registry.remove_body(a.body());
            if *player == Some(a.id()) {
                *player = None;
            }
            events.push(WorldEvent::ActorRemoved { actor: a.id() });
            false
        });
    }

    fn spawn_pending(&mut self) {
        for request in std::mem::take(&mut self.pending) {
            if let Err(e) = self.spawn_request(request) {
                log::warn!("spawn {request:?} failed: {e}");
            }
        }
    }

    fn spawn_request(&mut self, request: SpawnRequest) -> Result<(), PhysicsError> {
        match request {
            SpawnRequest::Projectile {
                center,
                size,
                velocity,
                damage,
                lifetime,
                source,
            } => {
                let id = self.next_id();
                let (body, hull) = self.add_hull(id, center, size.abs(), ColliderTag::Projectile)?;
                self.actors.push(Actor::new(
                    id,
                    body,
                    hull,
                    PhysicsBody::new(Vec2::splat(f32::INFINITY)).with_velocity(velocity),
                    ActorKind::Projectile(Projectile {
                        damage,
                        lifetime,
                        source,
                    }),
                ));
                self.events.push(WorldEvent::ProjectileSpawned {
                    projectile: id,
                    source,
                });
            }
            SpawnRequest::Pickup {
                center,
                size,
                value,
            } => {
                self.spawn_pickup(center, size, value)?;
            }
        }
        Ok(())
    }

    /// Return and clear the events buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn debug_stats(&self) -> WorldStats {
        WorldStats {
            actors: self.actors.len(),
            ticks: self.ticks,
            registry: self.registry.debug_stats(),
        }
    }
}
