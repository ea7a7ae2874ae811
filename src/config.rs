//! Tuning parameters.
//!
//! Units are world units (pixels at 1x) and seconds; +y points down.

use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

fn check(ok: bool, field: &'static str, reason: &'static str) -> Result<(), PhysicsError> {
    if ok {
        Ok(())
    } else {
        Err(PhysicsError::InvalidConfig { field, reason })
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

/// Displacement resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Gap left between a resolved mover and the obstacle it hit.
    pub epsilon: f32,
    /// Upper bound on resolution passes per call (one contact per pass).
    pub max_passes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            max_passes: 4,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        check(positive(self.epsilon), "resolver.epsilon", "must be positive")?;
        check(self.max_passes > 0, "resolver.max_passes", "must be at least 1")
    }
}

/// Ground and air movement for walking actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Downward acceleration (units/s²).
    pub gravity: f32,
    /// Horizontal acceleration while input agrees with motion.
    pub accelerate: f32,
    /// Horizontal acceleration while input opposes motion.
    pub reverse: f32,
    /// Friction magnitude applied with no input.
    pub stop: f32,
    /// Scale on horizontal coefficients while airborne (0..=1).
    pub air_control: f32,
    pub max_run_speed: f32,
    pub terminal_fall_speed: f32,
    pub jump_velocity: f32,
    /// Multiplier on upward speed when jump is released early.
    pub jump_cut: f32,
    /// Ticks after landing during which vertical velocity stays zero.
    pub landing_grace_ticks: u32,
    /// How far below the feet counts as standing on something.
    pub ground_probe: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            gravity: 2000.0,
            accelerate: 1800.0,
            reverse: 3600.0,
            stop: 2200.0,
            air_control: 0.6,
            max_run_speed: 260.0,
            terminal_fall_speed: 900.0,
            jump_velocity: 620.0,
            jump_cut: 0.45,
            landing_grace_ticks: 2,
            ground_probe: 1.0,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        check(non_negative(self.gravity), "movement.gravity", "must be finite and >= 0")?;
        check(non_negative(self.accelerate), "movement.accelerate", "must be finite and >= 0")?;
        check(non_negative(self.reverse), "movement.reverse", "must be finite and >= 0")?;
        check(non_negative(self.stop), "movement.stop", "must be finite and >= 0")?;
        check(
            (0.0..=1.0).contains(&self.air_control),
            "movement.air_control",
            "must be within 0..=1",
        )?;
        check(positive(self.max_run_speed), "movement.max_run_speed", "must be positive")?;
        check(
            positive(self.terminal_fall_speed),
            "movement.terminal_fall_speed",
            "must be positive",
        )?;
        check(
            non_negative(self.jump_velocity),
            "movement.jump_velocity",
            "must be finite and >= 0",
        )?;
        check(
            (0.0..=1.0).contains(&self.jump_cut),
            "movement.jump_cut",
            "must be within 0..=1",
        )?;
        check(positive(self.ground_probe), "movement.ground_probe", "must be positive")
    }
}

/// Stair snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StairConfig {
    /// Largest downward step per tick that still snaps to the stair below.
    pub snap_down_threshold: f32,
    /// How far below the feet to search for a stair top.
    pub probe_depth: f32,
    /// Tallest step that is climbed instead of blocking.
    pub max_step_up: f32,
    /// Feet within this distance above a stair top count as standing on it.
    pub contact_tolerance: f32,
}

impl Default for StairConfig {
    fn default() -> Self {
        Self {
            snap_down_threshold: 24.0,
            probe_depth: 34.0,
            max_step_up: 33.0,
            contact_tolerance: 0.5,
        }
    }
}

impl StairConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        check(
            non_negative(self.snap_down_threshold),
            "stairs.snap_down_threshold",
            "must be finite and >= 0",
        )?;
        check(positive(self.probe_depth), "stairs.probe_depth", "must be positive")?;
        check(positive(self.max_step_up), "stairs.max_step_up", "must be positive")?;
        check(
            non_negative(self.contact_tolerance),
            "stairs.contact_tolerance",
            "must be finite and >= 0",
        )
    }
}

/// Tether swing and fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrappleConfig {
    /// Gravity used for the swing's energy balance (units/s²).
    pub gravity: f32,
    /// Longest tether that can attach.
    pub max_length: f32,
    /// Swings within this angle of straight down get extra damping (radians).
    pub small_angle: f32,
    /// Speed multiplier per tick inside `small_angle`.
    pub small_angle_damping: f32,
    pub fuel_capacity: f32,
    /// Fuel per second drained from the side being climbed.
    pub fuel_drain_rate: f32,
    /// Fuel per second regained on the other side.
    pub fuel_regen_rate: f32,
    /// Fuel needed on a side to attach toward it.
    pub min_attach_fuel: f32,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            gravity: 2000.0,
            max_length: 320.0,
            small_angle: 0.35,
            small_angle_damping: 0.985,
            fuel_capacity: 1.0,
            fuel_drain_rate: 0.8,
            fuel_regen_rate: 0.5,
            min_attach_fuel: 0.25,
        }
    }
}

impl GrappleConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        check(non_negative(self.gravity), "grapple.gravity", "must be finite and >= 0")?;
        check(positive(self.max_length), "grapple.max_length", "must be positive")?;
        check(non_negative(self.small_angle), "grapple.small_angle", "must be finite and >= 0")?;
        check(
            self.small_angle_damping > 0.0 && self.small_angle_damping <= 1.0,
            "grapple.small_angle_damping",
            "must be within (0, 1]",
        )?;
        check(positive(self.fuel_capacity), "grapple.fuel_capacity", "must be positive")?;
        check(
            non_negative(self.fuel_drain_rate),
            "grapple.fuel_drain_rate",
            "must be finite and >= 0",
        )?;
        check(
            non_negative(self.fuel_regen_rate),
            "grapple.fuel_regen_rate",
            "must be finite and >= 0",
        )?;
        check(
            non_negative(self.min_attach_fuel) && self.min_attach_fuel <= self.fuel_capacity,
            "grapple.min_attach_fuel",
            "must be within 0..=fuel_capacity",
        )
    }
}

/// Everything the world needs, validated once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub resolver: ResolverConfig,
    pub movement: MovementConfig,
    pub stairs: StairConfig,
    pub grapple: GrappleConfig,
    /// Extra margin around a swept region when gathering obstacles.
    pub query_margin: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            movement: MovementConfig::default(),
            stairs: StairConfig::default(),
            grapple: GrappleConfig::default(),
            query_margin: 2.0,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        self.resolver.validate()?;
        self.movement.validate()?;
        self.stairs.validate()?;
        self.grapple.validate()?;
        check(non_negative(self.query_margin), "query_margin", "must be finite and >= 0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_values_name_the_field() {
        let mut cfg = WorldConfig::default();
        cfg.movement.air_control = 1.5;
        assert_eq!(
            cfg.validate(),
            Err(PhysicsError::InvalidConfig {
                field: "movement.air_control",
                reason: "must be within 0..=1",
            })
        );

        let mut cfg = WorldConfig::default();
        cfg.resolver.epsilon = f32::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(PhysicsError::InvalidConfig { field: "resolver.epsilon", .. })
        ));

        let mut cfg = WorldConfig::default();
        cfg.grapple.min_attach_fuel = 5.0;
        assert!(cfg.validate().is_err());
    }
}
