//! ### English
//! View runtime orchestration (public API).
//!
//! ### 中文
//! View 运行时编排（对外公开 API）。

mod cube_view;

pub use cube_view::{CubeView, ViewError, ViewStatus};
