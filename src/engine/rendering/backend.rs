use dpi::PhysicalSize;
use glam::Mat4;

/// ### English
/// A GL error code reported by `glGetError` after operation `op`.
///
/// ### 中文
/// 操作 `op` 之后由 `glGetError` 报告的 GL 错误码。
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("GL error {code:#06x} after {op}")]
pub struct GlError {
    pub op: &'static str,
    pub code: u32,
}

impl GlError {
    pub fn new(op: &'static str, code: u32) -> Self {
        Self { op, code }
    }
}

/// ### English
/// GL operations the cube renderer performs on the consumer (GUI) context.
///
/// Every fallible step reports the first `glGetError` code raised by that step. All calls happen
/// on the thread where the consumer context is current.
///
/// ### 中文
/// 立方体渲染器在消费者（GUI）上下文上执行的 GL 操作。
///
/// 每个可能失败的步骤都会返回该步骤产生的第一个 `glGetError` 错误码。
/// 所有调用都发生在消费者上下文 current 的线程上。
pub trait RenderBackend {
    fn set_viewport(&mut self, size: PhysicalSize<u32>);

    fn enable_depth_test(&mut self) -> Result<(), GlError>;

    /// ### English
    /// Binds `texture_id` (a name from the shared producer context) to `TEXTURE_2D` on unit 0.
    ///
    /// ### 中文
    /// 将 `texture_id`（来自共享生产者上下文的名字）绑定到纹理单元 0 的 `TEXTURE_2D`。
    fn bind_texture(&mut self, texture_id: u32) -> Result<(), GlError>;

    /// ### English
    /// Linear min/mag filtering, clamp-to-edge on S and T.
    ///
    /// ### 中文
    /// 线性缩小/放大过滤，S 与 T 方向 clamp-to-edge。
    fn set_sampling(&mut self) -> Result<(), GlError>;

    fn clear(&mut self, color: [f32; 4]) -> Result<(), GlError>;

    /// ### English
    /// Uploads `mvp` and the sampler unit, then draws the cube mesh.
    ///
    /// ### 中文
    /// 上传 `mvp` 与采样器单元，然后绘制立方体网格。
    fn draw_cube(&mut self, mvp: &Mat4) -> Result<(), GlError>;

    fn unbind_texture(&mut self) -> Result<(), GlError>;

    /// ### English
    /// Releases GL objects owned by the backend (idempotent).
    ///
    /// ### 中文
    /// 释放后端持有的 GL 对象（幂等）。
    fn destroy(&mut self);
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn set_viewport(&mut self, size: PhysicalSize<u32>) {
        (**self).set_viewport(size)
    }

    fn enable_depth_test(&mut self) -> Result<(), GlError> {
        (**self).enable_depth_test()
    }

    fn bind_texture(&mut self, texture_id: u32) -> Result<(), GlError> {
        (**self).bind_texture(texture_id)
    }

    fn set_sampling(&mut self) -> Result<(), GlError> {
        (**self).set_sampling()
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), GlError> {
        (**self).clear(color)
    }

    fn draw_cube(&mut self, mvp: &Mat4) -> Result<(), GlError> {
        (**self).draw_cube(mvp)
    }

    fn unbind_texture(&mut self) -> Result<(), GlError> {
        (**self).unbind_texture()
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}
