use bevy_math::EulerRot;
use bevy_math::Mat4;
use bevy_math::Quat;
use bevy_math::Vec3;

/// Position, rotation (degrees about X, Y and Z) and scale, with the world
/// matrix kept in step by every setter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    world: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ONE)
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let mut transform = Self {
            position,
            rotation,
            scale,
            world: Mat4::IDENTITY,
        };
        transform.recompute();
        transform
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, Vec3::ONE)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recompute();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.recompute();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.recompute();
    }

    // X is applied first, then Y, then Z.
    fn recompute(&mut self) {
        let rotation = Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_x(self.rotation.x.to_radians());
        self.world =
            Mat4::from_translation(self.position) * rotation * Mat4::from_scale(self.scale);
    }
}

/// Orientation used for direction vectors: roll about Z, then pitch about X,
/// then yaw about Y.
fn orientation(rotation: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        rotation.y.to_radians(),
        rotation.x.to_radians(),
        rotation.z.to_radians(),
    )
}

pub fn forward_vector(rotation: Vec3) -> Vec3 {
    orientation(rotation) * Vec3::Z
}

pub fn right_vector(rotation: Vec3) -> Vec3 {
    orientation(rotation) * Vec3::X
}

pub fn up_vector(rotation: Vec3) -> Vec3 {
    orientation(rotation) * Vec3::Y
}
