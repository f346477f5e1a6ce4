use glam::Vec3;
use waypoint_core::{GridConfig, Terrain};

/// 20x20 grid of 5 unit cells centred on the origin.
pub(crate) fn grid_config() -> GridConfig {
    GridConfig {
        half_extent: 50.0,
        ..GridConfig::default()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct FlatTerrain {
    pub(crate) water_level: f32,
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self {
            water_level: -100.0,
        }
    }
}

impl Terrain for FlatTerrain {
    fn floor_level(&self, _position: Vec3) -> f32 {
        0.0
    }

    fn fine_slope(&self, _position: Vec3) -> f32 {
        0.0
    }

    fn normal(&self, _position: Vec3) -> Vec3 {
        Vec3::Y
    }

    fn water_level(&self) -> f32 {
        self.water_level
    }

    fn flying_limit(&self, _position: Vec3, _small_flyer: bool) -> f32 {
        200.0
    }

    fn flying_max_height(&self) -> f32 {
        200.0
    }
}

/// Flat ground crossed by a 30 degree strip for `5 <= x < 25`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SlopedStrip;

impl Terrain for SlopedStrip {
    fn floor_level(&self, _position: Vec3) -> f32 {
        0.0
    }

    fn fine_slope(&self, position: Vec3) -> f32 {
        if (5.0..25.0).contains(&position.x) {
            30f32.to_radians()
        } else {
            0.0
        }
    }

    fn normal(&self, _position: Vec3) -> Vec3 {
        Vec3::Y
    }

    fn water_level(&self) -> f32 {
        -100.0
    }

    fn flying_limit(&self, _position: Vec3, _small_flyer: bool) -> f32 {
        200.0
    }

    fn flying_max_height(&self) -> f32 {
        200.0
    }
}
