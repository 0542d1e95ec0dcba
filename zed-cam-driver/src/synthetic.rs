//! In-process backend with a deterministic scene.
//!
//! The scene is a depth ramp that recedes to the right, with a color
//! gradient over the image plane. Planes carry a padded row stride so
//! callers exercise the same indexing they need against real hardware.

use crate::{
    BytePlane, CameraSession, Driver, FloatPlane, GrabError, Measure, OpenError, OpenParams,
    SensingMode, Side,
};

/// Extra bytes appended to every row of every plane.
const ROW_PADDING: u32 = 16;

/// Depth assumed when the caller keeps the driver default cutoff.
const DEFAULT_MIN_DEPTH_MM: f32 = 525.0;

/// Far end of the synthetic depth ramp, in millimeters.
const MAX_DEPTH_MM: f32 = 8000.0;

/// Backend producing the synthetic scene. Opening never touches hardware;
/// it only validates the requested frame rate against the preset.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDriver;

impl Driver for SyntheticDriver {
    type Session = SyntheticSession;

    fn open(&mut self, params: &OpenParams) -> Result<SyntheticSession, OpenError> {
        if params.fps != 0.0 && !params.resolution.supports_fps(params.fps) {
            return Err(OpenError::UnsupportedFps {
                resolution: params.resolution,
                fps: params.fps,
            });
        }
        let (width, height) = params.resolution.dimensions();
        let min_depth_mm = if params.min_depth_mm < 0 {
            DEFAULT_MIN_DEPTH_MM
        } else {
            params.min_depth_mm as f32
        };
        Ok(SyntheticSession {
            width,
            height,
            min_depth_mm,
            frame: 0,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSession {
    width: u32,
    height: u32,
    min_depth_mm: f32,
    frame: u64,
}

impl SyntheticSession {
    /// Frames grabbed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn depth_at(&self, x: u32, _y: u32) -> f32 {
        let t = x as f32 / (self.width - 1).max(1) as f32;
        self.min_depth_mm + t * (MAX_DEPTH_MM - self.min_depth_mm)
    }

    fn color_at(&self, x: u32, y: u32, side: Side) -> [u8; 4] {
        let r = (x * 255 / self.width.max(1)) as u8;
        let g = (y * 255 / self.height.max(1)) as u8;
        let b = match side {
            Side::Left => self.frame as u8,
            Side::Right => (self.frame as u8).wrapping_add(128),
        };
        [r, g, b, 255]
    }
}

impl CameraSession for SyntheticSession {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn grab(
        &mut self,
        _mode: SensingMode,
        _compute_depth: bool,
        _compute_xyz: bool,
    ) -> Result<(), GrabError> {
        self.frame += 1;
        Ok(())
    }

    fn retrieve_image(&mut self, side: Side) -> BytePlane {
        let mut plane =
            BytePlane::with_stride(self.width, self.height, 3, self.width * 3 + ROW_PADDING);
        for y in 0..self.height {
            let row = plane.row_mut(y);
            for x in 0..self.width {
                let [r, g, b, _] = self.color_at(x, y, side);
                // device order is BGR
                let i = x as usize * 3;
                row[i] = b;
                row[i + 1] = g;
                row[i + 2] = r;
            }
        }
        plane
    }

    fn retrieve_measure(&mut self, measure: Measure) -> FloatPlane {
        match measure {
            Measure::Depth => {
                let mut plane = FloatPlane::with_stride(
                    self.width,
                    self.height,
                    1,
                    self.width * 4 + ROW_PADDING,
                );
                let step = plane.stride_elems();
                for y in 0..self.height {
                    for x in 0..self.width {
                        plane.data[x as usize + step * y as usize] = self.depth_at(x, y);
                    }
                }
                plane
            }
            Measure::Xyz | Measure::XyzRgba => {
                let mut plane = FloatPlane::with_stride(
                    self.width,
                    self.height,
                    4,
                    self.width * 16 + ROW_PADDING,
                );
                let step = plane.stride_elems();
                let fx = self.width as f32;
                let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
                for y in 0..self.height {
                    for x in 0..self.width {
                        let z = self.depth_at(x, y);
                        let i = x as usize * 4 + step * y as usize;
                        plane.data[i] = (x as f32 - cx) * z / fx;
                        plane.data[i + 1] = (y as f32 - cy) * z / fx;
                        plane.data[i + 2] = z;
                        if measure == Measure::XyzRgba {
                            plane.data[i + 3] =
                                f32::from_ne_bytes(self.color_at(x, y, Side::Left));
                        }
                    }
                }
                plane
            }
        }
    }

    fn normalize_measure(&mut self, _measure: Measure, min: f32, max: f32) -> BytePlane {
        let mut plane =
            BytePlane::with_stride(self.width, self.height, 3, self.width * 3 + ROW_PADDING);
        let range = (max - min).max(1.0);
        for y in 0..self.height {
            let row = plane.row_mut(y);
            for x in 0..self.width {
                let t = ((self.depth_at(x, y) - min) / range).clamp(0.0, 1.0);
                // near is bright
                let value = (255.0 * (1.0 - t)) as u8;
                let i = x as usize * 3;
                row[i] = value;
                row[i + 1] = value;
                row[i + 2] = value;
            }
        }
        plane
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resolution;

    fn open_vga() -> SyntheticSession {
        let params = OpenParams {
            resolution: Resolution::Vga,
            ..OpenParams::default()
        };
        SyntheticDriver.open(&params).expect("synthetic open")
    }

    #[test]
    fn rejects_unsupported_fps() {
        let params = OpenParams {
            resolution: Resolution::HD720,
            fps: 100.0,
            ..OpenParams::default()
        };
        let result = SyntheticDriver.open(&params);
        assert!(matches!(
            result,
            Err(OpenError::UnsupportedFps { fps, .. }) if fps == 100.0
        ));
    }

    #[test]
    fn accepts_default_fps() {
        let mut session = open_vga();
        assert_eq!(session.width(), 672);
        assert_eq!(session.height(), 376);
        session.grab(SensingMode::Standard, true, true).unwrap();
        assert_eq!(session.frame(), 1);
    }

    #[test]
    fn planes_carry_padded_strides() {
        let mut session = open_vga();
        session.grab(SensingMode::Standard, true, true).unwrap();

        let image = session.retrieve_image(Side::Left);
        assert!(image.stride > image.width * image.channels);

        let depth = session.retrieve_measure(Measure::Depth);
        assert_eq!(depth.channels, 1);
        assert!(depth.stride_elems() > depth.width as usize);
        assert!(depth.data[0] >= DEFAULT_MIN_DEPTH_MM);
    }

    #[test]
    fn packed_color_round_trips_through_float_bytes() {
        let mut session = open_vga();
        session.grab(SensingMode::Standard, true, true).unwrap();

        let cloud = session.retrieve_measure(Measure::XyzRgba);
        let packed = cloud.data[3];
        let [r, g, b, a] = packed.to_ne_bytes();
        assert_eq!([r, g, b, a], session.color_at(0, 0, Side::Left));
        assert_eq!(a, 255);
    }
}
