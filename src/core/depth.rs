//! Dense single-channel maps (depth, validity masks, delta depth).

use thiserror::Error;

/// Buffer length does not match the requested shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("buffer of {len} values cannot hold a {height}×{width}×{channels} map")]
pub struct ShapeError {
    pub len: usize,
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

/// An H×W map of `f32`, stored row-major.
///
/// Used for depth maps, validity masks and delta-depth maps alike. Depth is
/// the distance along the camera z-axis; invalid pixels may hold 0 or NaN.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthMap {
    /// A zero-filled map.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width * height) as usize],
        }
    }

    /// Wrap a row-major buffer.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self, ShapeError> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(ShapeError {
                len: data.len(),
                height,
                width,
                channels: 1,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a map by evaluating `f(row, col)` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width)`, matching array shape order.
    pub fn shape(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: u32, col: u32) -> f32 {
        self.data[(row * self.width + col) as usize]
    }

    #[inline]
    pub fn set(&mut self, row: u32, col: u32, value: f32) {
        self.data[(row * self.width + col) as usize] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Multiply every value by `factor` in place.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Number of strictly positive entries (valid pixels of a mask).
    pub fn count_positive(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0.0).count()
    }
}
