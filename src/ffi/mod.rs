//! ### English
//! C ABI surface for `cube_frame_share`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! Every `cube_share_view_*` call must happen on the thread that owns the host GUI context, with
//! that context current. Strings must be NUL-terminated UTF-8 (C string).
//!
//! ### 中文
//! `cube_frame_share` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! 所有 `cube_share_view_*` 调用都必须在持有宿主 GUI 上下文的线程上进行，且该上下文处于 current。
//! 字符串必须是以 NUL 结尾的 UTF-8（C 字符串）。
mod abi;
mod view;

use std::ffi::{CStr, c_char, c_void};
use std::path::PathBuf;

use crate::engine::glfw::{EmbedderGlfwApi, GLFWwindow};
use crate::engine::rendering::{
    GlowBackend, HostGetProcAddressFn, HostMakeCurrentFn, HostReleaseFn,
};
use crate::engine::runtime::CubeView;

/// ### English
/// C ABI version for `cube_frame_share`.
///
/// ### 中文
/// `cube_frame_share` 的 C ABI 版本号。
const CUBE_SHARE_ABI_VERSION: u32 = 1;

/// ### English
/// Producer context is an invisible GLFW window sharing with `host_window`.
///
/// ### 中文
/// 生产者上下文为与 `host_window` 共享的不可见 GLFW window。
pub const CUBE_SHARE_BOOTSTRAP_GLFW_SHARED: u32 = 0;

/// ### English
/// Producer context is created by the host and driven through the `context_*` callbacks.
///
/// ### 中文
/// 生产者上下文由宿主创建，并通过 `context_*` 回调驱动。
pub const CUBE_SHARE_BOOTSTRAP_WRAPPED: u32 = 1;

/// ### English
/// Host callback asking the GUI thread's run loop to call `cube_share_view_pump` soon.
///
/// It is invoked from the media thread and must only schedule work.
///
/// ### 中文
/// 宿主回调：请求 GUI 线程的 run loop 尽快调用 `cube_share_view_pump`。
///
/// 它在媒体线程上被调用，只能安排工作。
pub type CubeShareWakeFn = unsafe extern "C" fn(user: *mut c_void);

/// ### English
/// Parameters for `cube_share_view_create`.
///
/// ### 中文
/// `cube_share_view_create` 的参数。
#[repr(C)]
pub struct CubeShareViewDesc {
    /// ### English
    /// `CUBE_SHARE_BOOTSTRAP_*`.
    ///
    /// ### 中文
    /// `CUBE_SHARE_BOOTSTRAP_*`。
    pub bootstrap_kind: u32,
    pub host_window: *mut GLFWwindow,
    pub glfw_api: EmbedderGlfwApi,

    pub context_user: *mut c_void,
    pub context_make_current: Option<HostMakeCurrentFn>,
    pub context_get_proc_address: Option<HostGetProcAddressFn>,
    pub context_release: Option<HostReleaseFn>,

    /// ### English
    /// Loader for the host GUI context. May be NULL with the GLFW bootstrap, in which case
    /// `glfwGetProcAddress` is used.
    ///
    /// ### 中文
    /// 宿主 GUI 上下文的函数加载器。使用 GLFW 方式时可为 NULL，此时改用 `glfwGetProcAddress`。
    pub gui_user: *mut c_void,
    pub gui_get_proc_address: Option<HostGetProcAddressFn>,

    pub frame_width: u32,
    pub frame_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// ### English
    /// Maximum frames in flight; values below 2 are raised to 2.
    ///
    /// ### 中文
    /// 在途帧上限；小于 2 的值会被提升为 2。
    pub handoff_depth: u32,
    /// ### English
    /// Producer pacing; `0` runs unpaced.
    ///
    /// ### 中文
    /// 生产节奏；`0` 表示不限速。
    pub target_fps: u32,
    /// ### English
    /// `CUBE_SHARE_VIEW_FLAG_*` bitmask.
    ///
    /// ### 中文
    /// `CUBE_SHARE_VIEW_FLAG_*` 位掩码。
    pub view_flags: u32,
    /// ### English
    /// Optional directory holding `vshader.glsl` / `fshader.glsl`; NULL uses the built-ins.
    ///
    /// ### 中文
    /// 可选目录，包含 `vshader.glsl` / `fshader.glsl`；为 NULL 时使用内置着色器。
    pub resources_dir: *const c_char,

    pub wake: Option<CubeShareWakeFn>,
    pub wake_user: *mut c_void,
}

/// ### English
/// Opaque view handle. Not thread-safe: use it only on the GUI thread.
///
/// ### 中文
/// 不透明 view 句柄。非线程安全：只能在 GUI 线程上使用。
pub struct CubeShareView {
    view: CubeView<GlowBackend>,
}

/// ### English
/// Converts an optional NUL-terminated UTF-8 C string into a `PathBuf`.
///
/// Returns `None` for NULL pointers, invalid UTF-8, or empty strings.
///
/// # Safety
/// `ptr` must be valid and point to a NUL-terminated string for the duration of the call.
///
/// ### 中文
/// 将可选的 NUL 结尾 UTF-8 C 字符串转换为 `PathBuf`。
///
/// 对 NULL 指针、UTF-8 非法或空字符串返回 `None`。
///
/// # Safety
/// `ptr` 在本次调用期间必须有效，并指向以 NUL 结尾的字符串。
unsafe fn cstr_to_path(ptr: *const c_char) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }

    let value = unsafe { CStr::from_ptr(ptr) }.to_str().ok()?;
    if value.is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstr_to_path_rejects_null_and_empty() {
        assert_eq!(unsafe { cstr_to_path(std::ptr::null()) }, None);
        assert_eq!(unsafe { cstr_to_path(c"".as_ptr()) }, None);
        assert_eq!(
            unsafe { cstr_to_path(c"/tmp/shaders".as_ptr()) },
            Some(PathBuf::from("/tmp/shaders"))
        );
    }
}
