/// ### English
/// `cube_frame_share` crate root.
/// Exposes the C ABI via `ffi`; the frame handoff, producer thread and cube renderer live under
/// `engine`.
///
/// ### 中文
/// `cube_frame_share` 的 crate 根。
/// 通过 `ffi` 导出 C ABI；帧交接、生产者线程与立方体渲染器位于 `engine` 模块。
pub mod engine;
mod ffi;

pub use engine::{
    CubeView, Frame, Pipeline, RenderOutcome, ViewConfig, ViewEvent, ViewStatus, logging,
};
