//! ### English
//! Rendering module entry point.
//! Consumer side: the cube renderer and its GL backend. Producer side: the GL context thread,
//! context bootstrap and owning-context flush.
//!
//! ### 中文
//! 渲染模块入口。
//! 消费者侧：立方体渲染器及其 GL 后端。生产者侧：GL 上下文线程、上下文初始化与所属上下文 flush。

mod backend;
mod bootstrap;
mod context;
mod cube_renderer;
mod geometry;
mod glow_backend;
mod shader;
pub mod transform;

pub use backend::{GlError, RenderBackend};
pub use bootstrap::{
    ContextBootstrap, GlfwSharedBootstrap, HostGetProcAddressFn, HostMakeCurrentFn,
    HostReleaseFn, SharedGlContext, WrappedContextBootstrap,
};
pub use context::{CONTEXT_INIT_TIMEOUT, ContextError, FlushContext, GlContextThread, GlFlush};
pub use cube_renderer::{CubeRenderer, RenderOutcome};
pub use geometry::{CUBE_INDICES, CUBE_VERTICES, CubeGeometry, Vertex};
pub use glow_backend::GlowBackend;
pub use shader::{RendererError, ShaderProgram};
