/// ### English
/// Engine internal modules (frame handoff, producer thread, GL contexts and the cube renderer).
///
/// ### 中文
/// 引擎内部模块（帧交接、生产者线程、GL 上下文与立方体渲染器）。
pub mod config;
pub mod flags;
pub mod frame;
pub mod glfw;
pub mod handoff;
pub mod logging;
pub mod notify;
pub mod producer;
pub mod rendering;
pub mod resources;
pub mod runtime;

pub use config::{SpinConfig, ViewConfig};
pub use frame::{Frame, FrameMemory, GlMemory, MemoryKind, VideoFormat, VideoMeta};
pub use handoff::{HandoffError, HandoffQueue, Pipeline, StopSignal};
pub use notify::{Inbox, Notifier, ViewEvent, WakeHook};
pub use producer::{FrameSource, MediaThread, SourceError, TestPatternSource, UploadTarget};
pub use rendering::{
    ContextBootstrap, ContextError, CubeRenderer, FlushContext, GlContextThread, GlError,
    GlowBackend, RenderBackend, RenderOutcome, RendererError,
};
pub use runtime::{CubeView, ViewError, ViewStatus};
