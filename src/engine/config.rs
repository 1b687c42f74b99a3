//! ### English
//! View configuration assembled from constructor parameters and the `u32` flag bitmask.
//!
//! ### 中文
//! 由构造参数与 `u32` 标志位掩码组合而成的 view 配置。

use std::path::PathBuf;
use std::time::Duration;

use dpi::PhysicalSize;
use tracing::warn;

use crate::engine::flags;
use crate::engine::handoff::MIN_HANDOFF_DEPTH;

/// ### English
/// Default producer frame size.
///
/// ### 中文
/// 生产者默认帧尺寸。
pub const DEFAULT_FRAME_SIZE: PhysicalSize<u32> = PhysicalSize::new(320, 240);

/// ### English
/// Largest accepted frame edge in pixels (the common `GL_MAX_TEXTURE_SIZE` floor of desktop GPUs).
///
/// ### 中文
/// 可接受的最大帧边长（像素），取桌面 GPU `GL_MAX_TEXTURE_SIZE` 的常见下限。
pub const MAX_FRAME_DIMENSION: u32 = 8192;

/// ### English
/// Replaces a zero-area size with [`DEFAULT_FRAME_SIZE`] and clamps each edge to
/// [`MAX_FRAME_DIMENSION`].
///
/// ### 中文
/// 零面积尺寸替换为 [`DEFAULT_FRAME_SIZE`]，并把每条边限制在 [`MAX_FRAME_DIMENSION`] 以内。
pub fn clamp_frame_size(size: PhysicalSize<u32>) -> PhysicalSize<u32> {
    if size.width == 0 || size.height == 0 {
        warn!(
            width = size.width,
            height = size.height,
            "invalid frame size, using default"
        );
        return DEFAULT_FRAME_SIZE;
    }
    if size.width > MAX_FRAME_DIMENSION || size.height > MAX_FRAME_DIMENSION {
        warn!(
            width = size.width,
            height = size.height,
            max = MAX_FRAME_DIMENSION,
            "frame size too large, clamping"
        );
        return PhysicalSize::new(
            size.width.min(MAX_FRAME_DIMENSION),
            size.height.min(MAX_FRAME_DIMENSION),
        );
    }
    size
}

/// ### English
/// Per-paint rotation step in degrees around the x, y and z axes.
///
/// ### 中文
/// 每次绘制绕 x、y、z 轴旋转的步长（角度）。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinConfig {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SpinConfig {
    pub const STILL: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn is_still(&self) -> bool {
        *self == Self::STILL
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            x: -0.3,
            y: -0.2,
            z: -0.4,
        }
    }
}

/// ### English
/// Configuration of one video-cube view.
///
/// ### 中文
/// 单个视频立方体 view 的配置。
#[derive(Clone, Debug)]
pub struct ViewConfig {
    /// ### English
    /// Maximum number of frames outside the producer (see `Pipeline`).
    ///
    /// ### 中文
    /// 位于生产者之外的最大帧数（见 `Pipeline`）。
    pub handoff_depth: usize,
    /// ### English
    /// Size of the frames the producer allocates.
    ///
    /// ### 中文
    /// 生产者分配的帧尺寸。
    pub frame_size: PhysicalSize<u32>,
    /// ### English
    /// Producer pacing; `0` means unpaced.
    ///
    /// ### 中文
    /// 生产者节奏；`0` 表示不限速。
    pub target_fps: u32,
    pub spin: SpinConfig,
    pub clear_color: [f32; 4],
    /// ### English
    /// Whether frame arrival triggers an immediate synchronous paint.
    ///
    /// ### 中文
    /// 帧到达时是否立即同步绘制。
    pub paint_on_arrival: bool,
    /// ### English
    /// Optional directory holding `vshader.glsl` / `fshader.glsl`.
    ///
    /// ### 中文
    /// 可选目录，包含 `vshader.glsl` / `fshader.glsl`。
    pub resources_dir: Option<PathBuf>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            handoff_depth: MIN_HANDOFF_DEPTH,
            frame_size: DEFAULT_FRAME_SIZE,
            target_fps: 30,
            spin: SpinConfig::default(),
            clear_color: [1.0, 0.0, 0.0, 1.0],
            paint_on_arrival: true,
            resources_dir: None,
        }
    }
}

impl ViewConfig {
    /// ### English
    /// Builds a config from embedder parameters and `CUBE_SHARE_VIEW_FLAG_*` bits.
    ///
    /// ### 中文
    /// 由宿主参数与 `CUBE_SHARE_VIEW_FLAG_*` 位构建配置。
    pub fn from_flags(
        handoff_depth: usize,
        frame_size: PhysicalSize<u32>,
        target_fps: u32,
        view_flags: u32,
    ) -> Self {
        let unknown = view_flags & !flags::CUBE_SHARE_VIEW_FLAGS_ALL;
        if unknown != 0 {
            warn!(flags = format_args!("{unknown:#x}"), "ignoring unknown view flags");
        }

        let mut config = Self {
            handoff_depth,
            frame_size,
            target_fps,
            ..Self::default()
        };
        if view_flags & flags::CUBE_SHARE_VIEW_FLAG_NO_SPIN != 0 {
            config.spin = SpinConfig::STILL;
        }
        if view_flags & flags::CUBE_SHARE_VIEW_FLAG_UNPACED != 0 {
            config.target_fps = 0;
        }
        if view_flags & flags::CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT != 0 {
            config.paint_on_arrival = false;
        }
        config
    }

    /// ### English
    /// Returns a copy with out-of-range values replaced (depth raised to the minimum, frame size
    /// passed through [`clamp_frame_size`]).
    ///
    /// ### 中文
    /// 返回替换了越界值的副本（depth 提升到下限，帧尺寸经 [`clamp_frame_size`] 处理）。
    pub fn validated(mut self) -> Self {
        if self.handoff_depth < MIN_HANDOFF_DEPTH {
            warn!(
                requested = self.handoff_depth,
                min = MIN_HANDOFF_DEPTH,
                "handoff depth too small, clamping"
            );
            self.handoff_depth = MIN_HANDOFF_DEPTH;
        }
        self.frame_size = clamp_frame_size(self.frame_size);
        self
    }

    /// ### English
    /// Delay between two produced frames, or `None` when unpaced.
    ///
    /// ### 中文
    /// 两次生产之间的间隔；不限速时返回 `None`。
    pub fn frame_interval(&self) -> Option<Duration> {
        (self.target_fps != 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.target_fps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let config = ViewConfig::from_flags(
            4,
            PhysicalSize::new(64, 32),
            60,
            flags::CUBE_SHARE_VIEW_FLAG_NO_SPIN
                | flags::CUBE_SHARE_VIEW_FLAG_UNPACED
                | flags::CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT,
        );
        assert_eq!(config.handoff_depth, 4);
        assert!(config.spin.is_still());
        assert_eq!(config.target_fps, 0);
        assert!(config.frame_interval().is_none());
        assert!(!config.paint_on_arrival);
    }

    #[test]
    fn no_flags_keep_defaults() {
        let config = ViewConfig::from_flags(2, DEFAULT_FRAME_SIZE, 25, 0);
        assert!(!config.spin.is_still());
        assert!(config.paint_on_arrival);
        assert_eq!(config.frame_interval(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn validation_clamps_depth_and_size() {
        let config = ViewConfig {
            handoff_depth: 0,
            frame_size: PhysicalSize::new(0, 10),
            ..ViewConfig::default()
        }
        .validated();
        assert_eq!(config.handoff_depth, MIN_HANDOFF_DEPTH);
        assert_eq!(config.frame_size, DEFAULT_FRAME_SIZE);
    }

    #[test]
    fn oversized_frames_are_clamped_per_edge() {
        let config = ViewConfig {
            frame_size: PhysicalSize::new(u32::MAX, 600),
            ..ViewConfig::default()
        }
        .validated();
        assert_eq!(config.frame_size, PhysicalSize::new(MAX_FRAME_DIMENSION, 600));
        assert_eq!(
            clamp_frame_size(PhysicalSize::new(1920, 1080)),
            PhysicalSize::new(1920, 1080)
        );
    }
}
