//! Tether swing around a fixed anchor, plus the per-side fuel that gates attaching.

use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::config::GrappleConfig;
use crate::error::PhysicsError;
use crate::narrowphase::Narrowphase;
use crate::types::Facing;
use crate::vector::{VectorExt, sign};

/// What a swing step did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Swing {
    /// Inside the radius; the body moves freely.
    Free,
    /// Held on the circle. `climbing` is the side the body is rising toward.
    Taut { climbing: Option<Facing> },
}

/// An attached tether.
#[derive(Clone, Debug, PartialEq)]
pub struct Grapple {
    anchor: Vec2,
    radius: f32,
    last_rel: Vec2,
    locked: bool,
}

impl Grapple {
    pub fn attach(anchor: Vec2, position: Vec2, radius: f32) -> Result<Self, PhysicsError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidTether { radius });
        }
        Ok(Self {
            anchor,
            radius,
            last_rel: position - anchor,
            locked: false,
        })
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// True while the last step held the body on the circle.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Constrain `pos`/`vel` after free motion has been applied for this tick.
    ///
    /// When the body ended outside the radius, it is walked back to where its
    /// path left the circle, advanced along the arc by the distance it
    /// overshot, and given the speed its energy at the exit point allows.
    pub fn step(&mut self, pos: &mut Vec2, vel: &mut Vec2, cfg: &GrappleConfig) -> Swing {
        let rel = *pos - self.anchor;
        if rel.length() <= self.radius {
            self.last_rel = rel;
            self.locked = false;
            return Swing::Free;
        }

        let r = self.radius;
        let exit = match Narrowphase::line_circle(self.last_rel, rel, Vec2::ZERO, r) {
            Some((t0, t1)) => {
                let t = if (t0 - 1.0).abs() <= (t1 - 1.0).abs() {
                    t0
                } else {
                    t1
                };
                self.last_rel + (rel - self.last_rel) * t
            }
            None => rel.normalized() * r,
        };
        let radial = exit.normalized();
        let tangent_exit = radial.perp();

        let arc = (rel - exit).dot(tangent_exit);
        let angle = exit.y.atan2(exit.x) + arc / r;
        let new_rel = Vec2::new(angle.cos(), angle.sin()) * r;

        // Only the tangential part of the velocity survives the tether
        let v_t = vel.dot(tangent_exit);
        let drop = new_rel.y - exit.y;
        let mut speed = (v_t * v_t + 2.0 * cfg.gravity * drop).max(0.0).sqrt();
        let from_down = new_rel.x.atan2(new_rel.y).abs();
        if from_down < cfg.small_angle {
            speed *= cfg.small_angle_damping;
        }
        let heading = if v_t != 0.0 { sign(v_t) } else { sign(arc) };
        let new_vel = new_rel.normalized().perp() * heading * speed;

        *pos = self.anchor + new_rel;
        *vel = new_vel;
        self.last_rel = new_rel;
        if !self.locked {
            log::trace!("tether taut at angle {angle:.3}");
        }
        self.locked = true;

        let climbing = if new_vel.y < 0.0 {
            Facing::from_sign(new_vel.x)
        } else {
            None
        };
        Swing::Taut { climbing }
    }
}

/// One fuel pool per swing side.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FuelTanks {
    pub left: f32,
    pub right: f32,
}

impl FuelTanks {
    pub fn full(cfg: &GrappleConfig) -> Self {
        Self {
            left: cfg.fuel_capacity,
            right: cfg.fuel_capacity,
        }
    }

    pub fn level(&self, side: Facing) -> f32 {
        match side {
            Facing::Left => self.left,
            Facing::Right => self.right,
        }
    }

    fn level_mut(&mut self, side: Facing) -> &mut f32 {
        match side {
            Facing::Left => &mut self.left,
            Facing::Right => &mut self.right,
        }
    }

    /// Drain the side being climbed toward, refill the other. Both refill when not climbing.
    pub fn update(&mut self, climbing: Option<Facing>, dt: f32, cfg: &GrappleConfig) {
        for side in [Facing::Left, Facing::Right] {
            let rate = if climbing == Some(side) {
                -cfg.fuel_drain_rate
            } else {
                cfg.fuel_regen_rate
            };
            let level = self.level_mut(side);
            *level = (*level + rate * dt).max(0.0).min(cfg.fuel_capacity);
        }
    }

    pub fn can_attach(&self, side: Facing, cfg: &GrappleConfig) -> bool {
        self.level(side) >= cfg.min_attach_fuel
    }
}
