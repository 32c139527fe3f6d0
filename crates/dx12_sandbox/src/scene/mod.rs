pub mod camera;
pub mod color_pulse;
pub mod mesh;
pub mod transform;

pub use camera::Camera;
pub use color_pulse::ColorPulse;
pub use mesh::Mesh;
pub use mesh::MeshData;
pub use mesh::Vertex;
pub use transform::Transform;
pub use transform::forward_vector;
pub use transform::right_vector;
pub use transform::up_vector;

use bevy_math::Mat4;

/// Column-vector convention: `clip = wvp * position`.
pub fn world_view_projection(camera: &Camera, object: &Transform) -> Mat4 {
    camera.view_projection() * object.world()
}

#[cfg(test)]
mod tests {
    use bevy_math::Vec3;
    use bevy_math::Vec4;

    use super::*;

    #[test]
    fn cube_corner_projects_like_the_reference_matrix() {
        let aspect: f32 = 1280.0 / 720.0;
        let camera = Camera::new(aspect);
        let cube = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let wvp = world_view_projection(&camera, &cube);

        // Reference built by hand: translate by the cube position, then by the
        // camera offset (+4 in z), then the left-handed perspective.
        let f = 1.0 / (camera::FIELD_OF_VIEW_DEGREES.to_radians() * 0.5).tan();
        let near = camera::NEAR_PLANE;
        let far = camera::FAR_PLANE;
        let depth_scale = far / (far - near);
        let projection = Mat4::from_cols_array(&[
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, depth_scale, 1.0,
            0.0, 0.0, -near * depth_scale, 0.0,
        ]);
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0));
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let reference = projection * view * world;

        assert!(wvp.abs_diff_eq(reference, 1e-4));

        let corner = wvp * Vec4::new(0.5, 0.5, 0.5, 1.0);
        let expected = Vec4::new(
            1.5 * f / aspect,
            2.5 * f,
            7.5 * depth_scale - near * depth_scale,
            7.5,
        );
        assert!(corner.abs_diff_eq(expected, 1e-4));
    }
}
