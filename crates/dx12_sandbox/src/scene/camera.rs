use bevy_math::Mat4;
use bevy_math::Vec3;

use super::Transform;
use super::forward_vector;
use super::right_vector;
use super::up_vector;

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 1000.0;
pub const CAMERA_SPEED: f32 = 0.05;
pub const START_POSITION: Vec3 = Vec3::new(0.0, 0.0, -4.0);

/// Left-handed perspective camera looking along its transform's forward vector.
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    projection: Mat4,
    view: Mat4,
    speed: f32,
}

impl Camera {
    pub fn new(aspect_ratio: f32) -> Self {
        let mut camera = Self {
            transform: Transform::from_position(START_POSITION),
            projection: Mat4::perspective_lh(
                FIELD_OF_VIEW_DEGREES.to_radians(),
                aspect_ratio,
                NEAR_PLANE,
                FAR_PLANE,
            ),
            view: Mat4::IDENTITY,
            speed: CAMERA_SPEED,
        };
        camera.recompute_view();
        camera
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
        self.recompute_view();
    }

    pub fn move_forward(&mut self, delta: f32) {
        self.move_along(forward_vector(self.transform.rotation()), delta);
    }

    pub fn move_right(&mut self, delta: f32) {
        self.move_along(right_vector(self.transform.rotation()), delta);
    }

    pub fn move_up(&mut self, delta: f32) {
        self.move_along(up_vector(self.transform.rotation()), delta);
    }

    fn move_along(&mut self, axis: Vec3, delta: f32) {
        let position = self.transform.position() + axis * delta * self.speed;
        self.set_position(position);
    }

    fn recompute_view(&mut self) {
        self.view = Mat4::look_to_lh(
            self.transform.position(),
            forward_vector(self.transform.rotation()),
            Vec3::Y,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_behind_the_origin() {
        let camera = Camera::new(16.0 / 9.0);
        assert_eq!(camera.transform().position(), START_POSITION);
        // The origin sits four units in front of the camera.
        let origin = camera.view().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), 1e-5));
    }

    #[test]
    fn movement_is_scaled_by_speed() {
        let mut camera = Camera::new(1.0);
        camera.move_forward(1.0);
        camera.move_right(-2.0);
        camera.move_up(4.0);
        let expected = START_POSITION
            + Vec3::Z * CAMERA_SPEED
            + Vec3::NEG_X * 2.0 * CAMERA_SPEED
            + Vec3::Y * 4.0 * CAMERA_SPEED;
        assert!(camera.transform().position().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn view_follows_position() {
        let mut camera = Camera::new(1.0);
        camera.set_position(Vec3::new(1.0, 0.0, 0.0));
        let origin = camera.view().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5));
    }
}
