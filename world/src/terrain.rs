//! Sampled terrain heights.

use glam::Vec3;
use thiserror::Error;
use waypoint_core::{Terrain, TerrainSpec};

/// Ceiling applied to small flyers, which the level does not limit.
const UNLIMITED_FLIGHT: f32 = 280.0;

/// Reasons a terrain description is rejected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TerrainError {
    /// Fewer than two samples along an axis.
    #[error("terrain needs at least 2x2 samples, got {columns}x{rows}")]
    TooSmall {
        /// Samples along x.
        columns: u32,
        /// Samples along z.
        rows: u32,
    },
    /// Spacing is zero, negative or not a number.
    #[error("sample spacing must be positive, got {0}")]
    Spacing(f32),
    /// The height list does not match the sample count.
    #[error("expected {expected} heights, got {actual}")]
    Heights {
        /// Samples described by the dimensions.
        expected: usize,
        /// Heights provided.
        actual: usize,
    },
}

/// Height field centred on the origin, interpolated bilinearly.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    columns: usize,
    rows: usize,
    spacing: f32,
    origin_x: f32,
    origin_z: f32,
    heights: Vec<f32>,
    water_level: f32,
    flying_max_height: f32,
}

impl HeightField {
    /// Validates a description and builds the field.
    pub fn new(spec: TerrainSpec) -> Result<Self, TerrainError> {
        if spec.columns < 2 || spec.rows < 2 {
            return Err(TerrainError::TooSmall {
                columns: spec.columns,
                rows: spec.rows,
            });
        }
        if !(spec.spacing > 0.0) {
            return Err(TerrainError::Spacing(spec.spacing));
        }
        let columns = spec.columns as usize;
        let rows = spec.rows as usize;
        let expected = columns * rows;
        if spec.heights.len() != expected {
            return Err(TerrainError::Heights {
                expected,
                actual: spec.heights.len(),
            });
        }

        Ok(Self {
            columns,
            rows,
            spacing: spec.spacing,
            origin_x: -((columns - 1) as f32) * spec.spacing * 0.5,
            origin_z: -((rows - 1) as f32) * spec.spacing * 0.5,
            heights: spec.heights,
            water_level: spec.water_level,
            flying_max_height: spec.flying_max_height,
        })
    }

    /// Flat field at height zero with `samples` samples per side.
    pub(crate) fn level(samples: usize, spacing: f32) -> Self {
        let samples = samples.max(2);
        let origin = -((samples - 1) as f32) * spacing * 0.5;
        Self {
            columns: samples,
            rows: samples,
            spacing,
            origin_x: origin,
            origin_z: origin,
            heights: vec![0.0; samples * samples],
            water_level: -100.0,
            flying_max_height: 280.0,
        }
    }

    /// Lowest corner of the field, at height zero.
    #[must_use]
    pub fn min_corner(&self) -> Vec3 {
        Vec3::new(self.origin_x, 0.0, self.origin_z)
    }

    /// Highest corner of the field, at height zero.
    #[must_use]
    pub fn max_corner(&self) -> Vec3 {
        Vec3::new(
            self.origin_x + (self.columns - 1) as f32 * self.spacing,
            0.0,
            self.origin_z + (self.rows - 1) as f32 * self.spacing,
        )
    }

    fn sample(&self, column: usize, row: usize) -> f32 {
        self.heights
            .get(row * self.columns + column)
            .copied()
            .unwrap_or(0.0)
    }

    fn height(&self, x: f32, z: f32) -> f32 {
        let fx = ((x - self.origin_x) / self.spacing).clamp(0.0, (self.columns - 1) as f32);
        let fz = ((z - self.origin_z) / self.spacing).clamp(0.0, (self.rows - 1) as f32);
        let column = (fx.floor() as usize).min(self.columns - 2);
        let row = (fz.floor() as usize).min(self.rows - 2);
        let tx = fx - column as f32;
        let tz = fz - row as f32;

        let near = self.sample(column, row) * (1.0 - tx) + self.sample(column + 1, row) * tx;
        let far =
            self.sample(column, row + 1) * (1.0 - tx) + self.sample(column + 1, row + 1) * tx;
        near * (1.0 - tz) + far * tz
    }
}

impl Terrain for HeightField {
    fn floor_level(&self, position: Vec3) -> f32 {
        self.height(position.x, position.z)
    }

    fn fine_slope(&self, position: Vec3) -> f32 {
        self.normal(position).y.clamp(-1.0, 1.0).acos()
    }

    fn normal(&self, position: Vec3) -> Vec3 {
        let h = self.spacing * 0.5;
        let dx = (self.height(position.x + h, position.z) - self.height(position.x - h, position.z))
            / (2.0 * h);
        let dz = (self.height(position.x, position.z + h) - self.height(position.x, position.z - h))
            / (2.0 * h);
        Vec3::new(-dx, 1.0, -dz).normalize()
    }

    fn water_level(&self) -> f32 {
        self.water_level
    }

    fn flying_limit(&self, _position: Vec3, small_flyer: bool) -> f32 {
        if small_flyer {
            UNLIMITED_FLIGHT
        } else {
            self.flying_max_height
        }
    }

    fn flying_max_height(&self) -> f32 {
        self.flying_max_height
    }

    fn clamp_to_bounds(&self, position: Vec3) -> Vec3 {
        let min = self.min_corner();
        let max = self.max_corner();
        Vec3::new(
            position.x.clamp(min.x, max.x),
            position.y,
            position.z.clamp(min.z, max.z),
        )
    }
}
