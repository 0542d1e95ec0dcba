use glam::Vec3;

use zed_cam::{ZedCamera, ZedConfig};
use zed_cam_driver::synthetic::SyntheticDriver;

pub fn main() {
    tracing_subscriber::fmt::init();

    let mut camera = ZedCamera::new(ZedConfig::default());
    let mut driver = SyntheticDriver::default();
    camera.start(&mut driver).expect("starting camera");

    camera.update().expect("grabbing frame");

    let points = camera.point_cloud().to_vec();
    let colors = camera.point_cloud_colors();
    assert_eq!(points.len(), colors.len());

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut sum = Vec3::ZERO;
    for point in &points {
        min = min.min(*point);
        max = max.max(*point);
        sum += *point;
    }
    let centroid = sum / points.len() as f32;

    println!("{} points", points.len());
    println!("bounds: {min:?} .. {max:?}");
    println!("centroid: {centroid:?}");
    if let (Some(point), Some(color)) = (points.first(), colors.first()) {
        println!("first point: {point:?} colored {color:?}");
    }
}
