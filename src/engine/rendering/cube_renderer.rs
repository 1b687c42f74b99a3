//! ### English
//! Consumer-side render pass: draws the currently held frame onto the rotating cube.
//!
//! ### 中文
//! 消费者侧渲染流程：把当前持有的帧绘制到旋转的立方体上。

use dpi::PhysicalSize;
use glam::Mat4;
use tracing::{trace, warn};

use super::backend::{GlError, RenderBackend};
use super::transform::{self, Rotation};
use crate::engine::config::SpinConfig;
use crate::engine::frame::Frame;

/// ### English
/// Result of one render call.
///
/// ### 中文
/// 一次渲染调用的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// ### English
    /// No frame held yet; nothing was drawn.
    ///
    /// ### 中文
    /// 尚未持有任何帧；未绘制任何内容。
    Idle,
    Drawn,
    /// ### English
    /// Texture binding failed; the pass was abandoned and the next frame is attempted normally.
    ///
    /// ### 中文
    /// 纹理绑定失败；本次绘制被放弃，下一帧照常尝试。
    Aborted(GlError),
}

/// ### English
/// Owns the consumer backend, the projection and the cube's rotation state.
///
/// ### 中文
/// 持有消费者后端、投影矩阵以及立方体的旋转状态。
pub struct CubeRenderer<B: RenderBackend> {
    backend: B,
    size: PhysicalSize<u32>,
    projection: Mat4,
    rotation: Rotation,
    spin: SpinConfig,
    clear_color: [f32; 4],
    destroyed: bool,
}

impl<B: RenderBackend> CubeRenderer<B> {
    pub fn new(
        mut backend: B,
        size: PhysicalSize<u32>,
        spin: SpinConfig,
        clear_color: [f32; 4],
    ) -> Self {
        backend.set_viewport(size);
        Self {
            backend,
            size,
            projection: transform::projection(size),
            rotation: Rotation::default(),
            spin,
            clear_color,
            destroyed: false,
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        self.projection = transform::projection(size);
        self.backend.set_viewport(size);
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// ### English
    /// Draws `frame` on the cube.
    ///
    /// - `None` is a no-op returning [`RenderOutcome::Idle`].
    /// - A frame without GL memory is a pipeline misconfiguration and panics.
    /// - The frame's owning context is flushed before its texture is bound.
    /// - A bind failure is logged and aborts the pass; other GL errors are logged and the pass
    ///   continues.
    ///
    /// ### 中文
    /// 在立方体上绘制 `frame`。
    ///
    /// - `None` 为 no-op，返回 [`RenderOutcome::Idle`]。
    /// - 不带 GL 内存的帧表示管线配置错误，直接 panic。
    /// - 绑定纹理之前先 flush 帧所属的上下文。
    /// - 绑定失败会记录日志并放弃本次绘制；其它 GL 错误仅记录日志，绘制继续。
    pub fn render(&mut self, frame: Option<&Frame>) -> RenderOutcome {
        let Some(frame) = frame else {
            return RenderOutcome::Idle;
        };
        let Some(memory) = frame.gl_memory() else {
            panic!(
                "frame {} carries {:?} memory; the cube renderer only accepts GL memory",
                frame.seq(),
                frame.memory_kind()
            );
        };

        memory.flush_owner();

        log_soft(frame.seq(), self.backend.enable_depth_test());

        if let Err(err) = self.backend.bind_texture(memory.texture_id()) {
            warn!(
                frame_seq = frame.seq(),
                texture_id = memory.texture_id(),
                gl_error = err.code,
                "failed to bind frame texture, skipping frame"
            );
            return RenderOutcome::Aborted(err);
        }

        log_soft(frame.seq(), self.backend.set_sampling());
        log_soft(frame.seq(), self.backend.clear(self.clear_color));

        let mvp = transform::mvp(&self.projection, &self.rotation);
        log_soft(frame.seq(), self.backend.draw_cube(&mvp));
        log_soft(frame.seq(), self.backend.unbind_texture());

        self.rotation.advance(&self.spin);
        trace!(frame_seq = frame.seq(), "frame drawn");
        RenderOutcome::Drawn
    }

    /// ### English
    /// Releases the backend's GL objects (idempotent). The GUI context must be current.
    ///
    /// ### 中文
    /// 释放后端的 GL 对象（幂等）。GUI 上下文必须处于 current。
    pub fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        self.backend.destroy();
    }
}

fn log_soft(frame_seq: u64, result: Result<(), GlError>) {
    if let Err(err) = result {
        warn!(frame_seq, op = err.op, gl_error = err.code, "GL error during render");
    }
}
