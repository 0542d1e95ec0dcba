//! Convenience wrapper around a stereo depth camera driver.
//!
//! [`ZedCamera`] sits between a [`driver::CameraSession`] and a display
//! loop. It wraps the basic camera settings (resolution, fps, depth
//! computing quality) and gives CPU access to the left and right rectified
//! RGB images, depth in millimeters or as grayscale bytes, and a point
//! cloud with colors.
//!
//! All pixel buffers and textures are updated lazily: a grab only marks
//! them stale, and each one is recomputed from the device the first time
//! it is requested afterwards, saving CPU when a consumer only needs some
//! of the views.
//!
//! ```no_run
//! use zed_cam::{ZedCamera, ZedConfig};
//! use zed_cam_driver::synthetic::SyntheticDriver;
//!
//! let mut camera = ZedCamera::new(ZedConfig::default());
//! let mut driver = SyntheticDriver::default();
//! camera.start(&mut driver).expect("starting camera");
//!
//! camera.update().expect("grabbing frame");
//! let depth = camera.depth_pixels_mm();
//! println!("top-left depth: {} mm", depth.data()[0]);
//! ```

mod camera;
mod texture;
mod types;

pub use camera::{ZedCamera, DEFAULT_DEPTH_RANGE_MM, FALLBACK_HEIGHT, FALLBACK_WIDTH};
pub use texture::{TextureFormat, TextureSink};
pub use types::{FloatPixels, Pixels, PointCloudConfig, Rgba, TextureKind, ViewKind, ZedConfig};

pub use zed_cam_driver as driver;
pub use zed_cam_driver::{
    CameraSession, CloseError, DepthQuality, Driver, GrabError, OpenError, OpenParams, Resolution,
    SensingMode, Side,
};
