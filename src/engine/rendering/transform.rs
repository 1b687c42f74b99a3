//! ### English
//! Cube transforms: perspective projection and the rotating model-view.
//!
//! ### 中文
//! 立方体变换：透视投影与旋转的 model-view。

use dpi::PhysicalSize;
use glam::{Mat4, Vec3};

use crate::engine::config::SpinConfig;

pub const FOV_Y_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 3.0;
pub const Z_FAR: f32 = 7.0;
pub const CUBE_DISTANCE: f32 = 5.0;
pub const CUBE_SCALE: f32 = 0.5;

/// ### English
/// Accumulated rotation in degrees.
///
/// ### 中文
/// 累积旋转角度（度）。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Rotation {
    /// ### English
    /// Adds one spin step, wrapping each axis into `[0, 360)`.
    ///
    /// ### 中文
    /// 叠加一次旋转步长，并把各轴折回 `[0, 360)`。
    pub fn advance(&mut self, spin: &SpinConfig) {
        self.x = (self.x + spin.x).rem_euclid(360.0);
        self.y = (self.y + spin.y).rem_euclid(360.0);
        self.z = (self.z + spin.z).rem_euclid(360.0);
    }
}

/// ### English
/// Perspective projection for a viewport; a zero height is treated as 1.
///
/// ### 中文
/// 视口对应的透视投影；高度为 0 时按 1 处理。
pub fn projection(size: PhysicalSize<u32>) -> Mat4 {
    let aspect = size.width as f32 / size.height.max(1) as f32;
    Mat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}

/// ### English
/// `T(0, 0, -5) · S(0.5) · Rx · Ry · Rz`.
///
/// ### 中文
/// `T(0, 0, -5) · S(0.5) · Rx · Ry · Rz`。
pub fn model_view(rotation: &Rotation) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -CUBE_DISTANCE))
        * Mat4::from_scale(Vec3::splat(CUBE_SCALE))
        * Mat4::from_rotation_x(rotation.x.to_radians())
        * Mat4::from_rotation_y(rotation.y.to_radians())
        * Mat4::from_rotation_z(rotation.z.to_radians())
}

pub fn mvp(projection: &Mat4, rotation: &Rotation) -> Mat4 {
    *projection * model_view(rotation)
}
