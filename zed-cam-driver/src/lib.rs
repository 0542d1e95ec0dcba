//! Device boundary for the zed-cam adapter.
//!
//! A vendor backend implements [`Driver`] and [`CameraSession`]; everything
//! the convenience layer in `zed-cam` needs from the hardware crosses this
//! boundary as a [`BytePlane`] or [`FloatPlane`]. Planes are row-major with a
//! declared row stride in bytes, which may exceed the packed row width, and
//! are consumed only inside the conversion step of the caller.
//!
//! The `synthetic` feature provides an in-process backend with a
//! deterministic test scene, so examples and tests run without a camera or
//! the vendor runtime.

use std::mem;

use thiserror::Error;

#[cfg(feature = "synthetic")]
pub mod synthetic;

/// Fixed capture presets of the device, each with its own allowed frame
/// rates.
#[derive(Debug, Copy, Clone, Default, Hash, PartialEq, Eq)]
pub enum Resolution {
    /// 2208x1242, supported framerate: 15 fps
    HD2K,
    /// 1920x1080, supported framerates: 15, 30 fps
    HD1080,
    /// 1280x720, supported framerates: 15, 30, 60 fps
    #[default]
    HD720,
    /// 672x376, supported framerates: 15, 30, 60, 100 fps
    Vga,
}

impl Resolution {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::HD2K => (2208, 1242),
            Resolution::HD1080 => (1920, 1080),
            Resolution::HD720 => (1280, 720),
            Resolution::Vga => (672, 376),
        }
    }

    pub fn supported_fps(self) -> &'static [f32] {
        match self {
            Resolution::HD2K => &[15.0],
            Resolution::HD1080 => &[15.0, 30.0],
            Resolution::HD720 => &[15.0, 30.0, 60.0],
            Resolution::Vga => &[15.0, 30.0, 60.0, 100.0],
        }
    }

    /// Frame rate used when the caller asks for 0.0 (the highest the preset
    /// allows).
    pub fn default_fps(self) -> f32 {
        match self {
            Resolution::HD2K => 15.0,
            Resolution::HD1080 => 30.0,
            Resolution::HD720 => 60.0,
            Resolution::Vga => 100.0,
        }
    }

    pub fn supports_fps(self, fps: f32) -> bool {
        self.supported_fps().contains(&fps)
    }
}

/// Trade-off between disparity map robustness and computation time.
#[derive(Debug, Copy, Clone, Default, Hash, PartialEq, Eq)]
pub enum DepthQuality {
    /// Fastest mode, less robust disparity map, least GPU memory.
    Performance,
    /// Balanced quality, a little less detail.
    Medium,
    /// Most precise disparity map.
    #[default]
    Quality,
}

/// Depth postprocessing applied during a single capture.
#[derive(Debug, Copy, Clone, Default, Hash, PartialEq, Eq)]
pub enum SensingMode {
    /// No occlusion filling.
    #[default]
    Standard,
    /// Occlusion filling, edge sharpening, advanced post-filtering.
    Fill,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Measurement channels retrievable after a grab.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Measure {
    /// Depth in millimeters, 1 channel, f32.
    Depth,
    /// 3D coordinates of the image points, 4 channels, f32 (4th reserved).
    Xyz,
    /// 3D coordinates plus color, 4 channels, f32. The bytes of the 4th
    /// channel encode a packed (R, G, B, A) color in native f32 layout.
    XyzRgba,
}

/// Device-level parameters. All of these must be set before `open`; there is
/// no runtime reconfiguration.
#[derive(Debug, Clone)]
pub struct OpenParams {
    pub resolution: Resolution,
    /// Target frame rate; 0.0 lets the driver pick the preset default.
    pub fps: f32,
    pub depth_quality: DepthQuality,
    /// Minimum depth that will be computed, in millimeters; -1 keeps the
    /// driver default. Raising it speeds up the depth computation.
    pub min_depth_mm: i32,
    /// Graphics card the computation runs on; -1 picks the most powerful
    /// usable GPU.
    pub gpu_device: i32,
    /// Flip all captured images vertically.
    pub vflip: bool,
    /// Ask the backend to report initialization details.
    pub verbose: bool,
}

impl Default for OpenParams {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            fps: 0.0,
            depth_quality: DepthQuality::default(),
            min_depth_mm: -1,
            gpu_device: -1,
            vflip: false,
            verbose: false,
        }
    }
}

/// Interleaved byte plane returned by the device.
#[derive(Debug, Clone, Default)]
pub struct BytePlane {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Row stride in bytes; `stride >= width * channels`.
    pub stride: u32,
    pub data: Vec<u8>,
}

impl BytePlane {
    /// Zeroed plane without row padding.
    pub fn packed(width: u32, height: u32, channels: u32) -> Self {
        Self::with_stride(width, height, channels, width * channels)
    }

    /// Zeroed plane with an explicit row stride in bytes.
    pub fn with_stride(width: u32, height: u32, channels: u32, stride: u32) -> Self {
        debug_assert!(stride >= width * channels);
        Self {
            width,
            height,
            channels,
            stride,
            data: vec![0; (stride * height) as usize],
        }
    }

    /// Full row `y`, padding bytes included.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride as usize;
        &self.data[y as usize * stride..][..stride]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride as usize;
        &mut self.data[y as usize * stride..][..stride]
    }
}

/// Interleaved f32 plane returned by the device.
///
/// The stride stays declared in bytes, as the device reports it; divide by
/// `size_of::<f32>()` before indexing `data`.
#[derive(Debug, Clone, Default)]
pub struct FloatPlane {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Row stride in bytes; always a multiple of 4.
    pub stride: u32,
    pub data: Vec<f32>,
}

impl FloatPlane {
    pub fn packed(width: u32, height: u32, channels: u32) -> Self {
        Self::with_stride(width, height, channels, width * channels * 4)
    }

    pub fn with_stride(width: u32, height: u32, channels: u32, stride: u32) -> Self {
        debug_assert!(stride % 4 == 0);
        debug_assert!(stride >= width * channels * 4);
        Self {
            width,
            height,
            channels,
            stride,
            data: vec![0.0; (stride / 4 * height) as usize],
        }
    }

    /// Row stride in f32 elements.
    pub fn stride_elems(&self) -> usize {
        self.stride as usize / mem::size_of::<f32>()
    }

    /// Full row `y`, padding elements included.
    pub fn row(&self, y: u32) -> &[f32] {
        let step = self.stride_elems();
        &self.data[y as usize * step..][..step]
    }
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("no camera detected")]
    NoDevice,
    #[error("camera is already in use")]
    Busy,
    #[error("gpu device {0} cannot run the depth computation")]
    Gpu(i32),
    #[error("{fps} fps is not supported at {resolution:?}")]
    UnsupportedFps { resolution: Resolution, fps: f32 },
    #[error("device failure: {0}")]
    Device(String),
}

#[derive(Debug, Error)]
pub enum GrabError {
    #[error("no new frame available")]
    NotReady,
    #[error("camera disconnected")]
    Disconnected,
    #[error("device failure: {0}")]
    Device(String),
}

#[derive(Debug, Error)]
#[error("failed to release camera: {0}")]
pub struct CloseError(pub String);

/// Entry point of a backend: opens sessions against configured devices.
pub trait Driver {
    type Session: CameraSession;

    fn open(&mut self, params: &OpenParams) -> Result<Self::Session, OpenError>;
}

/// A started capture device with fixed dimensions.
///
/// Dropping a session must release the device; `close` exists for callers
/// that want to see the error.
pub trait CameraSession {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Capture a new frame. `compute_depth` and `compute_xyz` tell the
    /// backend which measurement channels the caller will retrieve.
    fn grab(
        &mut self,
        mode: SensingMode,
        compute_depth: bool,
        compute_xyz: bool,
    ) -> Result<(), GrabError>;

    /// Rectified color image of one sensor, 3 channels, device channel
    /// order.
    fn retrieve_image(&mut self, side: Side) -> BytePlane;

    fn retrieve_measure(&mut self, measure: Measure) -> FloatPlane;

    /// Measurement normalized into bytes over `[min, max]`, 3 channels.
    fn normalize_measure(&mut self, measure: Measure, min: f32, max: f32) -> BytePlane;

    fn close(self) -> Result<(), CloseError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_presets() {
        assert_eq!(Resolution::HD2K.dimensions(), (2208, 1242));
        assert_eq!(Resolution::HD1080.dimensions(), (1920, 1080));
        assert_eq!(Resolution::HD720.dimensions(), (1280, 720));
        assert_eq!(Resolution::Vga.dimensions(), (672, 376));

        assert_eq!(Resolution::HD2K.supported_fps(), &[15.0]);
        assert_eq!(Resolution::Vga.supported_fps(), &[15.0, 30.0, 60.0, 100.0]);

        assert!(Resolution::HD720.supports_fps(60.0));
        assert!(!Resolution::HD720.supports_fps(100.0));
        assert_eq!(Resolution::HD1080.default_fps(), 30.0);
    }

    #[test]
    fn byte_plane_rows_cover_padding() {
        let mut plane = BytePlane::with_stride(4, 2, 3, 16);
        assert_eq!(plane.data.len(), 32);
        assert_eq!(plane.row(1).len(), 16);
        plane.row_mut(0)[15] = 7;
        assert_eq!(plane.data[15], 7);
    }

    #[test]
    fn float_plane_stride_in_elements() {
        let plane = FloatPlane::with_stride(3, 2, 1, 20);
        assert_eq!(plane.stride_elems(), 5);
        assert_eq!(plane.data.len(), 10);
        assert_eq!(plane.row(1).len(), 5);
    }

    #[test]
    fn default_open_params() {
        let params = OpenParams::default();
        assert_eq!(params.resolution, Resolution::HD720);
        assert_eq!(params.fps, 0.0);
        assert_eq!(params.depth_quality, DepthQuality::Quality);
        assert_eq!(params.min_depth_mm, -1);
        assert_eq!(params.gpu_device, -1);
        assert!(!params.vflip);
        assert!(!params.verbose);
    }
}
