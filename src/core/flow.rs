//! Dense optical flow fields.

use super::depth::ShapeError;
use nalgebra::Vector2;

/// Per-pixel `(du, dv)` displacement from the previous frame to the current
/// one, stored as an interleaved H×W×2 row-major buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FlowField {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0, 0.0)
    }

    /// Uniform translation `(du, dv)` at every pixel.
    pub fn filled(width: u32, height: u32, du: f32, dv: f32) -> Self {
        let mut data = Vec::with_capacity((width * height * 2) as usize);
        for _ in 0..width * height {
            data.push(du);
            data.push(dv);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an interleaved H×W×2 buffer.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self, ShapeError> {
        if data.len() != (width as usize) * (height as usize) * 2 {
            return Err(ShapeError {
                len: data.len(),
                height,
                width,
                channels: 2,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width)`; the trailing channel axis is implicit.
    pub fn shape(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    #[inline]
    pub fn get(&self, row: u32, col: u32) -> Vector2<f32> {
        let i = ((row * self.width + col) * 2) as usize;
        Vector2::new(self.data[i], self.data[i + 1])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
