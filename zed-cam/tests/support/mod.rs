//! Call-counting mock backend for exercising the lazy view cache.

use std::cell::RefCell;
use std::rc::Rc;

use zed_cam_driver::{
    BytePlane, CameraSession, CloseError, Driver, FloatPlane, GrabError, Measure, OpenError,
    OpenParams, SensingMode, Side,
};

/// Sentinel written into row padding; it must never reach an output buffer.
pub const PAD_SENTINEL: f32 = 9999.0;

/// First channel of the triplet returned by `normalize_measure`.
pub const NORMALIZED_FIRST_CHANNEL: u8 = 200;

#[derive(Debug, Default)]
pub struct Counters {
    pub grabs: usize,
    pub last_grab: Option<(SensingMode, bool, bool)>,
    pub image_left: usize,
    pub image_right: usize,
    pub measure_depth: usize,
    pub measure_xyz: usize,
    pub measure_xyzrgba: usize,
    pub normalize: usize,
    pub last_normalize_range: Option<(f32, f32)>,
    pub closes: usize,
}

pub struct MockDriver {
    pub width: u32,
    pub height: u32,
    pub fail_open: bool,
    pub fail_grab: bool,
    /// Pixel handed out for every image position, in device channel order.
    pub image_pixel: [u8; 3],
    /// Extra stride bytes per plane row; must be a multiple of 4.
    pub row_padding: u32,
    /// Point per pixel, index `x + width * y`; generated when empty.
    pub points: Vec<[f32; 3]>,
    /// Value of the 4th float of every XYZRGBA element.
    pub packed_color: f32,
    pub counters: Rc<RefCell<Counters>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            width: 4,
            height: 3,
            fail_open: false,
            fail_grab: false,
            image_pixel: [10, 20, 30],
            row_padding: 0,
            points: Vec::new(),
            packed_color: f32::from_ne_bytes([5, 6, 7, 8]),
            counters: Rc::new(RefCell::new(Counters::default())),
        }
    }
}

impl Driver for MockDriver {
    type Session = MockSession;

    fn open(&mut self, _params: &OpenParams) -> Result<MockSession, OpenError> {
        if self.fail_open {
            return Err(OpenError::NoDevice);
        }
        Ok(MockSession {
            width: self.width,
            height: self.height,
            fail_grab: self.fail_grab,
            image_pixel: self.image_pixel,
            row_padding: self.row_padding,
            points: self.points.clone(),
            packed_color: self.packed_color,
            counters: Rc::clone(&self.counters),
        })
    }
}

pub struct MockSession {
    width: u32,
    height: u32,
    fail_grab: bool,
    image_pixel: [u8; 3],
    row_padding: u32,
    points: Vec<[f32; 3]>,
    packed_color: f32,
    counters: Rc<RefCell<Counters>>,
}

impl MockSession {
    fn point_at(&self, x: u32, y: u32) -> [f32; 3] {
        let index = (x + self.width * y) as usize;
        match self.points.get(index) {
            Some(point) => *point,
            None => [x as f32, y as f32, 10.0],
        }
    }

    fn xyz_plane(&self, packed: Option<f32>) -> FloatPlane {
        let mut plane = FloatPlane::with_stride(
            self.width,
            self.height,
            4,
            self.width * 16 + self.row_padding,
        );
        plane.data.fill(PAD_SENTINEL);
        let step = plane.stride_elems();
        for y in 0..self.height {
            for x in 0..self.width {
                let [px, py, pz] = self.point_at(x, y);
                let i = x as usize * 4 + step * y as usize;
                plane.data[i] = px;
                plane.data[i + 1] = py;
                plane.data[i + 2] = pz;
                plane.data[i + 3] = packed.unwrap_or(0.0);
            }
        }
        plane
    }
}

impl CameraSession for MockSession {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn grab(
        &mut self,
        mode: SensingMode,
        compute_depth: bool,
        compute_xyz: bool,
    ) -> Result<(), GrabError> {
        let mut counters = self.counters.borrow_mut();
        counters.grabs += 1;
        counters.last_grab = Some((mode, compute_depth, compute_xyz));
        if self.fail_grab {
            return Err(GrabError::NotReady);
        }
        Ok(())
    }

    fn retrieve_image(&mut self, side: Side) -> BytePlane {
        {
            let mut counters = self.counters.borrow_mut();
            match side {
                Side::Left => counters.image_left += 1,
                Side::Right => counters.image_right += 1,
            }
        }
        let mut plane = BytePlane::with_stride(
            self.width,
            self.height,
            3,
            self.width * 3 + self.row_padding,
        );
        for y in 0..self.height {
            let row = plane.row_mut(y);
            for x in 0..self.width {
                row[x as usize * 3..][..3].copy_from_slice(&self.image_pixel);
            }
        }
        plane
    }

    fn retrieve_measure(&mut self, measure: Measure) -> FloatPlane {
        match measure {
            Measure::Depth => {
                self.counters.borrow_mut().measure_depth += 1;
                let mut plane = FloatPlane::with_stride(
                    self.width,
                    self.height,
                    1,
                    self.width * 4 + self.row_padding,
                );
                plane.data.fill(PAD_SENTINEL);
                let step = plane.stride_elems();
                for y in 0..self.height {
                    for x in 0..self.width {
                        plane.data[x as usize + step * y as usize] = (x + 100 * y) as f32;
                    }
                }
                plane
            }
            Measure::Xyz => {
                self.counters.borrow_mut().measure_xyz += 1;
                self.xyz_plane(None)
            }
            Measure::XyzRgba => {
                self.counters.borrow_mut().measure_xyzrgba += 1;
                self.xyz_plane(Some(self.packed_color))
            }
        }
    }

    fn normalize_measure(&mut self, _measure: Measure, min: f32, max: f32) -> BytePlane {
        {
            let mut counters = self.counters.borrow_mut();
            counters.normalize += 1;
            counters.last_normalize_range = Some((min, max));
        }
        let mut plane = BytePlane::with_stride(
            self.width,
            self.height,
            3,
            self.width * 3 + self.row_padding,
        );
        for y in 0..self.height {
            let row = plane.row_mut(y);
            for x in 0..self.width {
                row[x as usize * 3..][..3].copy_from_slice(&[NORMALIZED_FIRST_CHANNEL, 123, 7]);
            }
        }
        plane
    }

    fn close(self) -> Result<(), CloseError> {
        self.counters.borrow_mut().closes += 1;
        Ok(())
    }
}
