use glam::Vec2;

use crate::vector::sign;

/// Velocity integrator shared by every moving actor.
///
/// Accelerations applied during a tick are summed and consumed by
/// `update_velocity`, which always leaves both accumulators at zero.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsBody {
    pub velocity: Vec2,
    /// Per-axis speed cap (may be infinite).
    pub terminal_velocity: Vec2,
    acceleration: Vec2,
    counter_acceleration: Vec2,
}

impl PhysicsBody {
    pub fn new(terminal_velocity: Vec2) -> Self {
        Self {
            velocity: Vec2::ZERO,
            terminal_velocity: terminal_velocity.abs(),
            acceleration: Vec2::ZERO,
            counter_acceleration: Vec2::ZERO,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn apply_acceleration(&mut self, a: Vec2) {
        self.acceleration += a;
    }

    /// Friction/drag magnitudes; the direction is chosen against the motion.
    pub fn apply_counter_acceleration(&mut self, a: Vec2) {
        self.counter_acceleration += a.abs();
    }

    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    pub fn counter_acceleration(&self) -> Vec2 {
        self.counter_acceleration
    }

    /// Integrate this tick's accelerations and return the displacement `velocity * dt`.
    ///
    /// Friction opposes the velocity as it stands after acceleration and can
    /// only bring an axis to rest, never reverse it. NaN inputs propagate.
    pub fn update_velocity(&mut self, dt: f32) -> Vec2 {
        let tv = self.terminal_velocity;
        let mut v = self.velocity + self.acceleration * dt;
        v = Vec2::new(clamp_abs(v.x, tv.x), clamp_abs(v.y, tv.y));

        let before = v;
        let counter = Vec2::new(
            -sign(before.x) * self.counter_acceleration.x,
            -sign(before.y) * self.counter_acceleration.y,
        );
        v += counter * dt;
        if sign(v.x) != sign(before.x) {
            v.x = 0.0;
        }
        if sign(v.y) != sign(before.y) {
            v.y = 0.0;
        }

        self.velocity = v;
        self.acceleration = Vec2::ZERO;
        self.counter_acceleration = Vec2::ZERO;
        v * dt
    }

    /// Zero velocity components pushing into the given sides.
    pub fn stop_against(&mut self, blocked: crate::types::Blocked) {
        use crate::types::Blocked;
        if (blocked.contains(Blocked::RIGHT) && self.velocity.x > 0.0)
            || (blocked.contains(Blocked::LEFT) && self.velocity.x < 0.0)
        {
            self.velocity.x = 0.0;
        }
        if (blocked.contains(Blocked::BELOW) && self.velocity.y > 0.0)
            || (blocked.contains(Blocked::ABOVE) && self.velocity.y < 0.0)
        {
            self.velocity.y = 0.0;
        }
    }
}

#[inline]
fn clamp_abs(v: f32, cap: f32) -> f32 {
    // min/max rather than f32::clamp so NaN caps do not panic
    v.max(-cap).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Blocked;

    #[test]
    fn test_terminal_velocity_scenario() {
        let mut body = PhysicsBody::new(Vec2::new(f32::INFINITY, 500.0))
            .with_velocity(Vec2::new(0.0, 500.0));
        body.apply_acceleration(Vec2::new(0.0, 1000.0));
        let d = body.update_velocity(0.1);
        assert_eq!(body.velocity.y, 500.0);
        assert!((d.y - 50.0).abs() < 1e-4);
        assert_eq!(d.x, 0.0);
    }

    #[test]
    fn test_accumulators_reset_and_sum() {
        let mut body = PhysicsBody::new(Vec2::splat(1000.0));
        body.apply_acceleration(Vec2::new(10.0, 0.0));
        body.apply_acceleration(Vec2::new(5.0, 2.0));
        body.apply_counter_acceleration(Vec2::new(1.0, 0.0));
        body.apply_counter_acceleration(Vec2::new(-2.0, 0.0));
        assert_eq!(body.acceleration(), Vec2::new(15.0, 2.0));
        assert_eq!(body.counter_acceleration(), Vec2::new(3.0, 0.0));
        body.update_velocity(1.0);
        assert_eq!(body.acceleration(), Vec2::ZERO);
        assert_eq!(body.counter_acceleration(), Vec2::ZERO);
        assert_eq!(body.velocity, Vec2::new(12.0, 2.0));
    }

    #[test]
    fn test_clamp_holds_for_many_inputs() {
        let tv = Vec2::new(300.0, 700.0);
        let mut body = PhysicsBody::new(tv);
        for i in 0..200 {
            let a = Vec2::new((i as f32 * 37.0).sin() * 1e5, (i as f32 * 11.0).cos() * 1e5);
            let dt = 0.001 + (i % 7) as f32 * 0.01;
            body.apply_acceleration(a);
            body.update_velocity(dt);
            assert!(body.velocity.x.abs() <= tv.x);
            assert!(body.velocity.y.abs() <= tv.y);
        }
    }

    #[test]
    fn test_friction_stops_but_never_reverses() {
        let mut body = PhysicsBody::new(Vec2::splat(1000.0)).with_velocity(Vec2::new(10.0, -10.0));
        body.apply_counter_acceleration(Vec2::new(500.0, 500.0));
        body.update_velocity(0.1);
        assert_eq!(body.velocity, Vec2::ZERO);

        let mut body = PhysicsBody::new(Vec2::splat(1000.0)).with_velocity(Vec2::new(100.0, 0.0));
        body.apply_counter_acceleration(Vec2::new(200.0, 0.0));
        body.update_velocity(0.1);
        assert!((body.velocity.x - 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_friction_opposes_post_acceleration_velocity() {
        // Input flips motion this tick; friction must then oppose the new direction
        let mut body = PhysicsBody::new(Vec2::splat(1000.0)).with_velocity(Vec2::new(5.0, 0.0));
        body.apply_acceleration(Vec2::new(-200.0, 0.0));
        body.apply_counter_acceleration(Vec2::new(50.0, 0.0));
        body.update_velocity(0.1);
        // 5 - 20 = -15, then friction +5 -> -10
        assert!((body.velocity.x + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_stop_against_only_zeroes_into_surface() {
        let mut body = PhysicsBody::new(Vec2::splat(1000.0)).with_velocity(Vec2::new(5.0, -3.0));
        body.stop_against(Blocked::RIGHT | Blocked::BELOW);
        assert_eq!(body.velocity, Vec2::new(0.0, -3.0));
    }
}
