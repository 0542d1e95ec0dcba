use image::{GrayImage, RgbImage};

use zed_cam::{ZedCamera, ZedConfig, DEFAULT_DEPTH_RANGE_MM};
use zed_cam_driver::synthetic::SyntheticDriver;

pub fn main() {
    tracing_subscriber::fmt::init();

    let mut config = ZedConfig::default();
    config.use_point_cloud = false;

    let mut camera = ZedCamera::new(config);
    let mut driver = SyntheticDriver::default();
    camera.start(&mut driver).expect("starting camera");

    camera.update().expect("grabbing frame");

    let left = camera.left_pixels();
    let left_image = RgbImage::from_raw(left.width(), left.height(), left.data().to_vec())
        .expect("left buffer has the wrong size");
    left_image.save("left.png").expect("saving left.png");

    let (min_mm, max_mm) = DEFAULT_DEPTH_RANGE_MM;
    let depth = camera.depth_pixels_grayscale_range(min_mm, max_mm);
    let depth_image = GrayImage::from_raw(depth.width(), depth.height(), depth.data().to_vec())
        .expect("depth buffer has the wrong size");
    depth_image.save("depth.png").expect("saving depth.png");

    camera.stop();
    println!("wrote left.png and depth.png");
}
