use std::time::Duration;

use uniflow_ngin::{
    camera::{Camera, Orbit},
    cgmath::{Deg, Matrix4, Point3, Quaternion, Rad, Rotation3, Vector3, Vector4},
    data_structures::{entity::View, transform::Transform},
    water::WaterPlane,
};

use crate::common::test_utils::camera;

mod common;

#[test]
fn update_recomputes_the_aspect_ratio() {
    let mut camera = Camera::default();
    camera.update([1920, 1080], Duration::ZERO);
    assert_eq!(camera.aspect, 1920.0 / 1080.0);

    // A minimised window keeps the last usable ratio.
    camera.update([0, 0], Duration::ZERO);
    assert_eq!(camera.aspect, 1920.0 / 1080.0);
}

#[test]
fn orbit_moves_around_the_target() {
    let mut camera = Camera::new((0.0, 0.0, 0.0), (1.0, 0.0, 1.0));
    camera.orbit = Some(Orbit {
        radius: 10.0,
        height: 3.0,
        speed: std::f32::consts::FRAC_PI_2,
        angle: Rad(0.0),
    });

    camera.update([800, 600], Duration::from_secs(1));

    let orbit = camera.orbit.unwrap();
    assert_eq!(orbit.angle, Rad(std::f32::consts::FRAC_PI_2));
    assert!((camera.position.x - 11.0).abs() < 1e-4);
    assert_eq!(camera.position.y, 3.0);
    assert!((camera.position.z - 1.0).abs() < 1e-4);
}

#[test]
fn projection_maps_near_plane_to_zero_depth() {
    let camera = Camera::new((0.0, 0.0, 0.0), (0.0, 0.0, -1.0));
    let clip = camera.view_projection() * Vector4::new(0.0, 0.0, -camera.znear, 1.0);
    assert!((clip.z / clip.w).abs() < 1e-5);
}

#[test]
fn reflection_mirrors_the_camera_across_the_water() {
    let main = camera();
    let water = WaterPlane::new(1.0);

    let reflection = water.reflection_camera(&main);
    assert_eq!(reflection.position, Point3::new(0.0, -3.0, 10.0));
    assert_eq!(reflection.target, Point3::new(0.0, 2.0, 0.0));
    assert_eq!(reflection.fovy, main.fovy);

    let refraction = water.refraction_camera(&main);
    assert_eq!(refraction.position, main.position);
    assert_ne!(reflection.view_projection(), refraction.view_projection());
    assert_eq!(water.camera_for(View::Main, &main), main);
}

#[test]
fn transform_is_translate_rotate_scale() {
    let transform = Transform {
        position: Vector3::new(1.0, 2.0, 3.0),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: Vector3::new(2.0, 1.0, 1.0),
    };
    let moved = transform.to_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);

    // Scaled to x = 2, turned onto -z, then translated.
    assert!((moved.x - 1.0).abs() < 1e-5);
    assert!((moved.y - 2.0).abs() < 1e-5);
    assert!((moved.z - 1.0).abs() < 1e-5);
    assert_eq!(Transform::default().to_matrix(), Matrix4::from_scale(1.0));
}
