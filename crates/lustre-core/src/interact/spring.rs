//! Damped spring for the "kick" impulse

use glam::Vec2;

/// Spring constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub stiffness: f32,
    pub damping: f32,
    /// Largest timestep integrated in one tick
    pub max_dt: f32,
    /// Offset and velocity both below this snap to exactly zero
    pub rest_epsilon: f32,
}

/// Offset/velocity state of a unit-mass spring anchored at zero
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spring {
    pub offset: Vec2,
    pub velocity: Vec2,
}

impl Spring {
    /// Add an instantaneous velocity change
    pub fn impulse(&mut self, dv: Vec2) {
        self.velocity += dv;
    }

    pub fn at_rest(&self) -> bool {
        self.offset == Vec2::ZERO && self.velocity == Vec2::ZERO
    }

    /// Semi-implicit Euler step
    pub fn step(&mut self, dt: f32, params: &SpringParams) {
        if self.at_rest() {
            return;
        }
        let dt = dt.clamp(0.0, params.max_dt);

        let accel = -params.stiffness * self.offset - params.damping * self.velocity;
        self.velocity += accel * dt;
        self.offset += self.velocity * dt;

        if self.offset.abs().max_element() < params.rest_epsilon
            && self.velocity.abs().max_element() < params.rest_epsilon
        {
            self.offset = Vec2::ZERO;
            self.velocity = Vec2::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SpringParams {
        SpringParams {
            stiffness: 35.0,
            damping: 6.0,
            max_dt: 0.05,
            rest_epsilon: 1e-4,
        }
    }

    #[test]
    fn resting_spring_stays_put() {
        let mut s = Spring::default();
        s.step(0.016, &params());
        assert!(s.at_rest());
    }

    #[test]
    fn kick_settles_to_exact_zero() {
        let mut s = Spring::default();
        s.impulse(Vec2::new(0.0, 1.5));
        let mut ticks = 0;
        while !s.at_rest() {
            s.step(1.0 / 60.0, &params());
            ticks += 1;
            assert!(ticks < 2_000, "spring never settled");
        }
        assert_eq!(s.offset, Vec2::ZERO);
        assert_eq!(s.velocity, Vec2::ZERO);
    }

    #[test]
    fn huge_frame_gaps_are_clamped() {
        let mut s = Spring::default();
        s.impulse(Vec2::new(0.0, 1.5));
        for _ in 0..400 {
            s.step(5.0, &params());
            assert!(s.offset.y.abs() < 1.0);
        }
        assert!(s.at_rest());
    }
}
