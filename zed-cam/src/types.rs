use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use zed_cam_driver::{OpenParams, SensingMode};

/// Everything the camera needs to know before `start()`. The config is
/// consumed by [`crate::ZedCamera::new`], so nothing can change while a
/// session is running.
#[derive(Debug, Clone)]
pub struct ZedConfig {
    /// Device-level parameters handed to the driver on `start()`.
    pub open: OpenParams,
    /// Sensing mode `update()` uses for every grab.
    pub sensing_mode: SensingMode,
    /// Capture the left/right rectified color images.
    pub use_images: bool,
    /// Compute depth on every grab.
    pub use_depth: bool,
    /// Compute 3D coordinates on every grab (implies depth).
    pub use_point_cloud: bool,
    pub point_cloud: PointCloudConfig,
}

impl Default for ZedConfig {
    fn default() -> Self {
        Self {
            open: OpenParams::default(),
            sensing_mode: SensingMode::default(),
            use_images: true,
            use_depth: true,
            use_point_cloud: true,
            point_cloud: PointCloudConfig::default(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct PointCloudConfig {
    /// Also retrieve a packed color per point.
    pub include_colors: bool,
    /// Negate every point's Y after retrieval.
    pub flip_y: bool,
    /// Negate every point's Z after retrieval.
    pub flip_z: bool,
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        Self {
            include_colors: true,
            flip_y: true,
            flip_z: true,
        }
    }
}

/// The derivable CPU-side views. Each one owns exactly one staleness flag.
///
/// `PointCloud` covers the point positions and the byte colors filled
/// alongside them; `PointCloudColors` is the float-color view derived from
/// the byte colors, with its own flag.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ViewKind {
    LeftImage,
    RightImage,
    DepthMillimeters,
    DepthGrayscale,
    PointCloud,
    PointCloudColors,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::LeftImage,
        ViewKind::RightImage,
        ViewKind::DepthMillimeters,
        ViewKind::DepthGrayscale,
        ViewKind::PointCloud,
        ViewKind::PointCloudColors,
    ];
}

/// GPU-resident views, dirty-tracked separately from the CPU buffers they
/// are uploaded from.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum TextureKind {
    Left,
    Right,
    Depth,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] = [TextureKind::Left, TextureKind::Right, TextureKind::Depth];
}

/// One staleness flag per view and per texture, so mark-all is a fill over a
/// closed set instead of a pile of named booleans.
#[derive(Debug, Default)]
pub(crate) struct StaleFlags {
    views: [bool; 6],
    textures: [bool; 3],
}

impl StaleFlags {
    pub fn set_all(&mut self, stale: bool) {
        self.views = [stale; 6];
        self.textures = [stale; 3];
    }

    pub fn view(&self, kind: ViewKind) -> bool {
        self.views[kind as usize]
    }

    /// Reads the flag and clears it.
    pub fn take_view(&mut self, kind: ViewKind) -> bool {
        let stale = self.views[kind as usize];
        self.views[kind as usize] = false;
        stale
    }

    pub fn take_texture(&mut self, kind: TextureKind) -> bool {
        let stale = self.textures[kind as usize];
        self.textures[kind as usize] = false;
        stale
    }
}

/// Tightly packed interleaved byte pixels, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pixels {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<u8>,
}

impl Pixels {
    pub(crate) fn allocate(&mut self, width: u32, height: u32, channels: u32) {
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.data = vec![0; (width * height * channels) as usize];
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Single-channel f32 pixels, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatPixels {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FloatPixels {
    pub(crate) fn allocate(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data = vec![0.0; (width * height) as usize];
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Packed byte color in (R, G, B, A) order.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Channels normalized from bytes to [0, 1].
    pub fn to_float(self) -> Vec4 {
        Vec4::new(self.r as f32, self.g as f32, self.b as f32, self.a as f32) / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_view_clears_the_flag() {
        let mut flags = StaleFlags::default();
        flags.set_all(true);
        assert!(flags.take_view(ViewKind::DepthGrayscale));
        assert!(!flags.take_view(ViewKind::DepthGrayscale));
        assert!(flags.view(ViewKind::LeftImage));
    }

    #[test]
    fn rgba_normalizes_to_unit_range() {
        let color = Rgba {
            r: 255,
            g: 0,
            b: 51,
            a: 255,
        };
        let float = color.to_float();
        assert_eq!(float.x, 1.0);
        assert_eq!(float.y, 0.0);
        assert!((float.z - 0.2).abs() < 1e-6);
        assert_eq!(float.w, 1.0);
    }
}
