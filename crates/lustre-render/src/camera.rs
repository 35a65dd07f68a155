//! Card camera and placement

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

/// Fixed eye on the +z axis, looking at the card centre
const EYE: Vec3 = Vec3::new(0.0, 0.0, 5.0);
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

/// Perspective projection for the card stage
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov: f32,
    /// Width over height
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0_f32.to_radians(),
            aspect: 1.0,
        }
    }
}

impl Camera {
    pub fn view_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, NEAR, FAR) * Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y)
    }

    /// Keep the projection in step with the drawable; empty sizes are
    /// ignored so the aspect never becomes zero or infinite
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

/// Card transform: pitch about x, then yaw about y, lifted by the idle bob
pub fn card_model(rotation: Vec2, bob: f32) -> Mat4 {
    Mat4::from_rotation_translation(
        Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, 0.0),
        Vec3::new(0.0, bob, 0.0),
    )
}
