use std::mem;

use glam::{Vec3, Vec4};
use tracing::{info, warn};

use zed_cam_driver::{
    BytePlane, CameraSession, Driver, GrabError, Measure, OpenError, SensingMode, Side,
};

use crate::texture::{TextureFormat, TextureSink};
use crate::types::{FloatPixels, Pixels, Rgba, StaleFlags, TextureKind, ViewKind, ZedConfig};

/// Dimensions used when the device fails to open, so buffers and drawing
/// code never have to handle a missing-buffer case.
pub const FALLBACK_WIDTH: u32 = 1280;
pub const FALLBACK_HEIGHT: u32 = 720;

/// Default display range for grayscale depth, in millimeters.
pub const DEFAULT_DEPTH_RANGE_MM: (f32, f32) = (0.0, 5000.0);

/// Convenience object over a stereo depth camera session.
///
/// One tick is a single [`update`](Self::update) (or
/// [`grab`](Self::grab)) followed by any number of view accessors. A grab
/// marks every view stale; an accessor recomputes its buffer from the
/// device only when its own flag is stale, then serves the cached buffer
/// until the next grab. References returned by accessors stay valid until
/// the next `&mut self` call.
///
/// Single-threaded by design: one consumer thread, no internal locking.
pub struct ZedCamera<S: CameraSession> {
    config: ZedConfig,
    session: Option<S>,
    width: u32,
    height: u32,
    left_pixels: Pixels,
    right_pixels: Pixels,
    depth_pixels_mm: FloatPixels,
    depth_pixels_grayscale: Pixels,
    point_cloud: Vec<Vec3>,
    point_cloud_colors: Vec<Rgba>,
    point_cloud_float_colors: Vec<Vec4>,
    stale: StaleFlags,
}

impl<S: CameraSession> ZedCamera<S> {
    pub fn new(config: ZedConfig) -> Self {
        let mut camera = Self {
            config,
            session: None,
            width: FALLBACK_WIDTH,
            height: FALLBACK_HEIGHT,
            left_pixels: Pixels::default(),
            right_pixels: Pixels::default(),
            depth_pixels_mm: FloatPixels::default(),
            depth_pixels_grayscale: Pixels::default(),
            point_cloud: Vec::new(),
            point_cloud_colors: Vec::new(),
            point_cloud_float_colors: Vec::new(),
            stale: StaleFlags::default(),
        };
        camera.allocate_buffers();
        camera
    }

    /// Opens a session with the configured parameters.
    ///
    /// On failure the camera stays in a valid "not running" state: the
    /// error is returned for diagnosis, dimensions fall back to
    /// [`FALLBACK_WIDTH`]x[`FALLBACK_HEIGHT`] and all buffers are still
    /// allocated at that size.
    pub fn start<D>(&mut self, driver: &mut D) -> Result<(), OpenError>
    where
        D: Driver<Session = S>,
    {
        self.stop();
        info!("starting stereo camera");
        let failed = match driver.open(&self.config.open) {
            Ok(session) => {
                self.session = Some(session);
                None
            }
            Err(err) => {
                warn!("stereo camera failed to start: {err}");
                Some(err)
            }
        };

        // Buffers are allocated either way, at fallback size without a
        // device.
        (self.width, self.height) = match &self.session {
            Some(session) => (session.width(), session.height()),
            None => (FALLBACK_WIDTH, FALLBACK_HEIGHT),
        };
        self.allocate_buffers();

        match failed {
            Some(err) => Err(err),
            None => {
                info!(width = self.width, height = self.height, "stereo camera started");
                Ok(())
            }
        }
    }

    /// Releases the device. Safe to call repeatedly or before `start()`.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            info!("closing stereo camera");
            if let Err(err) = session.close() {
                warn!("stereo camera did not close cleanly: {err}");
            }
        }
        // Nothing new to publish once stopped: flags go clean and the
        // accessors keep serving the last cached buffers.
        self.stale.set_all(false);
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> f32 {
        self.config.open.fps
    }

    pub fn config(&self) -> &ZedConfig {
        &self.config
    }

    /// Whether `kind` would be recomputed by its next accessor call.
    pub fn is_view_stale(&self, kind: ViewKind) -> bool {
        self.stale.view(kind)
    }

    /// Grabs a frame with the configured sensing mode.
    pub fn update(&mut self) -> Result<(), GrabError> {
        self.grab(self.config.sensing_mode)
    }

    /// Advances to a new frame.
    ///
    /// Trivially succeeds when not running or when no view category is
    /// enabled. On success every view is marked stale at once; on failure
    /// the error is surfaced for this tick only and the session stays
    /// running, so the caller may simply grab again.
    pub fn grab(&mut self, mode: SensingMode) -> Result<(), GrabError> {
        let compute_depth = self.config.use_depth || self.config.use_point_cloud;
        let compute_xyz = self.config.use_point_cloud;
        let any_enabled = self.config.use_images || compute_depth;

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !any_enabled {
            return Ok(());
        }
        session.grab(mode, compute_depth, compute_xyz)?;
        self.stale.set_all(true);
        Ok(())
    }

    /// Left rectified image, 3 bytes per pixel, RGB.
    pub fn left_pixels(&mut self) -> &Pixels {
        self.materialize_image(Side::Left);
        &self.left_pixels
    }

    /// Right rectified image, 3 bytes per pixel, RGB.
    pub fn right_pixels(&mut self) -> &Pixels {
        self.materialize_image(Side::Right);
        &self.right_pixels
    }

    /// Depth in millimeters, one f32 per pixel.
    pub fn depth_pixels_mm(&mut self) -> &FloatPixels {
        self.materialize_depth_mm();
        &self.depth_pixels_mm
    }

    /// Grayscale depth over the default range of
    /// [`DEFAULT_DEPTH_RANGE_MM`], one byte per pixel.
    pub fn depth_pixels_grayscale(&mut self) -> &Pixels {
        let (min_mm, max_mm) = DEFAULT_DEPTH_RANGE_MM;
        self.depth_pixels_grayscale_range(min_mm, max_mm)
    }

    /// Grayscale depth with `min_depth_mm` and `max_depth_mm` mapped onto
    /// the byte range.
    ///
    /// The range only matters when the view is recomputed; a clean view is
    /// returned as cached, whatever range it was built with.
    pub fn depth_pixels_grayscale_range(&mut self, min_depth_mm: f32, max_depth_mm: f32) -> &Pixels {
        self.materialize_depth_grayscale(min_depth_mm, max_depth_mm);
        &self.depth_pixels_grayscale
    }

    /// One point per pixel, row-major (`x + width * y`).
    pub fn point_cloud(&mut self) -> &[Vec3] {
        self.fill_point_cloud();
        &self.point_cloud
    }

    /// Byte colors matching [`point_cloud`](Self::point_cloud); empty when
    /// colors are not included.
    pub fn point_cloud_colors(&mut self) -> &[Rgba] {
        self.fill_point_cloud();
        &self.point_cloud_colors
    }

    /// Point colors normalized to [0, 1] per channel, converted from the
    /// byte colors exactly as cached. Only this view's own flag gates the
    /// rebuild; the byte cache is never refreshed here, so a consumer that
    /// skipped [`point_cloud_colors`](Self::point_cloud_colors) this tick
    /// gets the previous tick's colors.
    pub fn point_cloud_float_colors(&mut self) -> &[Vec4] {
        if self.stale.take_view(ViewKind::PointCloudColors) {
            self.point_cloud_float_colors = self
                .point_cloud_colors
                .iter()
                .map(|color| color.to_float())
                .collect();
        }
        &self.point_cloud_float_colors
    }

    /// Uploads the left image to `sink` if it changed since the last
    /// upload.
    pub fn left_texture<T: TextureSink>(&mut self, sink: &mut T) {
        self.upload_image_texture(Side::Left, sink);
    }

    /// Uploads the right image to `sink` if it changed since the last
    /// upload.
    pub fn right_texture<T: TextureSink>(&mut self, sink: &mut T) {
        self.upload_image_texture(Side::Right, sink);
    }

    /// Uploads the grayscale depth to `sink` if it changed since the last
    /// upload, normalizing over `[min_depth_mm, max_depth_mm]`.
    pub fn depth_texture<T: TextureSink>(
        &mut self,
        sink: &mut T,
        min_depth_mm: f32,
        max_depth_mm: f32,
    ) {
        if self.session.is_none() {
            return;
        }
        if !self.config.use_depth {
            warn!("depth texture requested but depth capture is disabled; enable `use_depth` before start()");
            return;
        }
        if !self.stale.take_texture(TextureKind::Depth) {
            return;
        }
        self.materialize_depth_grayscale(min_depth_mm, max_depth_mm);
        let pixels = &self.depth_pixels_grayscale;
        sink.upload(
            TextureFormat::Gray8,
            pixels.width(),
            pixels.height(),
            pixels.data(),
        );
    }

    fn allocate_buffers(&mut self) {
        let (w, h) = (self.width, self.height);
        self.left_pixels.allocate(w, h, 3);
        self.right_pixels.allocate(w, h, 3);
        self.depth_pixels_mm.allocate(w, h);
        self.depth_pixels_grayscale.allocate(w, h, 1);
        self.point_cloud.clear();
        self.point_cloud_colors.clear();
        self.point_cloud_float_colors.clear();
    }

    fn materialize_image(&mut self, side: Side) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.config.use_images {
            warn!("image access with image capture disabled; enable `use_images` before start()");
            return;
        }
        let kind = match side {
            Side::Left => ViewKind::LeftImage,
            Side::Right => ViewKind::RightImage,
        };
        if !self.stale.take_view(kind) {
            return;
        }
        let plane = session.retrieve_image(side);
        let target = match side {
            Side::Left => &mut self.left_pixels,
            Side::Right => &mut self.right_pixels,
        };
        reverse_channels_into(&plane, target);
    }

    fn materialize_depth_mm(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.config.use_depth {
            warn!("depth access with depth capture disabled; enable `use_depth` before start()");
            return;
        }
        if !self.stale.take_view(ViewKind::DepthMillimeters) {
            return;
        }
        let plane = session.retrieve_measure(Measure::Depth);
        // stride is declared in bytes; index the f32 data in elements and
        // keep only `width` columns per row
        let step = plane.stride as usize / mem::size_of::<f32>();
        let (w, h) = (self.width as usize, self.height as usize);
        let dst = self.depth_pixels_mm.data_mut();
        for y in 0..h {
            for x in 0..w {
                dst[x + y * w] = plane.data[x + step * y];
            }
        }
    }

    fn materialize_depth_grayscale(&mut self, min_depth_mm: f32, max_depth_mm: f32) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.config.use_depth {
            warn!("depth access with depth capture disabled; enable `use_depth` before start()");
            return;
        }
        if !self.stale.take_view(ViewKind::DepthGrayscale) {
            return;
        }
        let plane = session.normalize_measure(Measure::Depth, min_depth_mm, max_depth_mm);
        let channels = plane.channels as usize;
        let (w, h) = (self.width as usize, self.height as usize);
        let dst = self.depth_pixels_grayscale.data_mut();
        for y in 0..h {
            let row = plane.row(y as u32);
            for x in 0..w {
                // first channel of the normalized triplet
                dst[x + y * w] = row[x * channels];
            }
        }
    }

    fn fill_point_cloud(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.config.use_point_cloud {
            warn!("point cloud access with point cloud capture disabled; enable `use_point_cloud` before start()");
            return;
        }
        if !self.stale.take_view(ViewKind::PointCloud) {
            return;
        }

        let point_cloud_config = self.config.point_cloud;
        if !point_cloud_config.include_colors {
            let plane = session.retrieve_measure(Measure::Xyz);
            let (w, h) = (plane.width as usize, plane.height as usize);
            let step = plane.stride as usize / mem::size_of::<f32>();
            self.point_cloud.resize(w * h, Vec3::ZERO);
            self.point_cloud_colors.clear();
            for y in 0..h {
                for x in 0..w {
                    let i = x * 4 + step * y;
                    self.point_cloud[x + w * y] =
                        Vec3::new(plane.data[i], plane.data[i + 1], plane.data[i + 2]);
                }
            }
        } else {
            let plane = session.retrieve_measure(Measure::XyzRgba);
            let (w, h) = (plane.width as usize, plane.height as usize);
            let step = plane.stride as usize / mem::size_of::<f32>();
            self.point_cloud.resize(w * h, Vec3::ZERO);
            self.point_cloud_colors.resize(w * h, Rgba::default());
            for y in 0..h {
                for x in 0..w {
                    let i = x * 4 + step * y;
                    self.point_cloud[x + w * y] =
                        Vec3::new(plane.data[i], plane.data[i + 1], plane.data[i + 2]);
                    // The 4th float carries the packed color: its
                    // native-endian byte layout is (R, G, B, A).
                    let [r, g, b, a]: [u8; 4] = bytemuck::cast(plane.data[i + 3]);
                    self.point_cloud_colors[x + w * y] = Rgba { r, g, b, a };
                }
            }
        }

        if point_cloud_config.flip_y {
            for point in &mut self.point_cloud {
                point.y = -point.y;
            }
        }
        if point_cloud_config.flip_z {
            for point in &mut self.point_cloud {
                point.z = -point.z;
            }
        }
    }

    fn upload_image_texture<T: TextureSink>(&mut self, side: Side, sink: &mut T) {
        if self.session.is_none() {
            return;
        }
        if !self.config.use_images {
            warn!("image texture requested but image capture is disabled; enable `use_images` before start()");
            return;
        }
        let kind = match side {
            Side::Left => TextureKind::Left,
            Side::Right => TextureKind::Right,
        };
        if !self.stale.take_texture(kind) {
            return;
        }
        self.materialize_image(side);
        let pixels = match side {
            Side::Left => &self.left_pixels,
            Side::Right => &self.right_pixels,
        };
        sink.upload(
            TextureFormat::Rgb8,
            pixels.width(),
            pixels.height(),
            pixels.data(),
        );
    }
}

impl<S: CameraSession> Drop for ZedCamera<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The device hands back interleaved pixels in one channel order; consumers
/// get the reverse (a BGR to RGB swap with the middle channel untouched).
fn reverse_channels_into(plane: &BytePlane, out: &mut Pixels) {
    let (w, h) = (out.width() as usize, out.height() as usize);
    let dst = out.data_mut();
    for y in 0..h {
        let row = plane.row(y as u32);
        for x in 0..w {
            let src = x * 3;
            let i = 3 * (x + y * w);
            dst[i] = row[src + 2];
            dst[i + 1] = row[src + 1];
            dst[i + 2] = row[src];
        }
    }
}
