//! ### English
//! Minimal GLFW loader built from an embedder-provided function table.
//!
//! The host already links GLFW and owns the GUI window; it hands us the handful of symbols needed
//! to create an invisible window whose context shares objects with the host window. No library
//! lookup by name is performed, so the same code works on every platform GLFW supports.
//!
//! ### 中文
//! 基于宿主提供的函数表构建的最小 GLFW loader。
//!
//! 宿主已经链接了 GLFW 并持有 GUI window；它交给我们少量符号，用于创建一个与宿主 window
//! 共享对象的不可见 window。这里不按名字查找动态库，因此同一份代码适用于 GLFW 支持的所有平台。

use std::ffi::{CStr, c_char, c_int, c_void};

use crate::engine::rendering::ContextError;

/// ### English
/// Opaque GLFW window type (`GLFWwindow`).
///
/// ### 中文
/// 不透明 GLFW window 类型（`GLFWwindow`）。
#[repr(C)]
pub struct GLFWwindow {
    _private: [u8; 0],
}

/// ### English
/// Opaque GLFW monitor type (`GLFWmonitor`).
///
/// ### 中文
/// 不透明 GLFW monitor 类型（`GLFWmonitor`）。
#[repr(C)]
pub struct GLFWmonitor {
    _private: [u8; 0],
}

type GLFWglproc = *const c_void;
type GlfwGetProcAddress = unsafe extern "C" fn(*const c_char) -> GLFWglproc;
type GlfwMakeContextCurrent = unsafe extern "C" fn(*mut GLFWwindow);
type GlfwDefaultWindowHints = unsafe extern "C" fn();
type GlfwWindowHint = unsafe extern "C" fn(c_int, c_int);
type GlfwGetWindowAttrib = unsafe extern "C" fn(*mut GLFWwindow, c_int) -> c_int;
type GlfwCreateWindow = unsafe extern "C" fn(
    c_int,
    c_int,
    *const c_char,
    *mut GLFWmonitor,
    *mut GLFWwindow,
) -> *mut GLFWwindow;
type GlfwDestroyWindow = unsafe extern "C" fn(*mut GLFWwindow);

/// ### English
/// Function pointer table for GLFW symbols provided by the embedder.
///
/// All fields are raw addresses (`usize`) and must be non-zero. They must come from the same GLFW
/// library instance that created the host window.
///
/// ### 中文
/// 由宿主提供的 GLFW 符号函数指针表。
///
/// 所有字段都是原始地址（`usize`），且必须非 0；它们必须来自创建宿主 window 的同一个 GLFW 库实例。
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbedderGlfwApi {
    pub glfw_get_proc_address: usize,
    pub glfw_make_context_current: usize,
    pub glfw_default_window_hints: usize,
    pub glfw_window_hint: usize,
    pub glfw_get_window_attrib: usize,
    pub glfw_create_window: usize,
    pub glfw_destroy_window: usize,
}

impl EmbedderGlfwApi {
    /// ### English
    /// Returns the name of the first missing (NULL) symbol, if any.
    ///
    /// ### 中文
    /// 返回第一个缺失（NULL）符号的名字（若有）。
    pub fn first_missing(&self) -> Option<&'static str> {
        [
            (self.glfw_get_proc_address, "glfwGetProcAddress"),
            (self.glfw_make_context_current, "glfwMakeContextCurrent"),
            (self.glfw_default_window_hints, "glfwDefaultWindowHints"),
            (self.glfw_window_hint, "glfwWindowHint"),
            (self.glfw_get_window_attrib, "glfwGetWindowAttrib"),
            (self.glfw_create_window, "glfwCreateWindow"),
            (self.glfw_destroy_window, "glfwDestroyWindow"),
        ]
        .into_iter()
        .find_map(|(addr, name)| (addr == 0).then_some(name))
    }
}

/// ### English
/// Typed view of [`EmbedderGlfwApi`] (context control, window creation and proc loading).
///
/// ### 中文
/// [`EmbedderGlfwApi`] 的类型化视图（上下文控制、window 创建与函数指针加载）。
#[derive(Clone, Copy)]
pub struct GlfwApi {
    glfw_get_proc_address: GlfwGetProcAddress,
    glfw_make_context_current: GlfwMakeContextCurrent,
    glfw_default_window_hints: GlfwDefaultWindowHints,
    glfw_window_hint: GlfwWindowHint,
    glfw_get_window_attrib: GlfwGetWindowAttrib,
    glfw_create_window: GlfwCreateWindow,
    glfw_destroy_window: GlfwDestroyWindow,
}

impl GlfwApi {
    /// ### English
    /// Builds the typed table, rejecting any NULL entry.
    ///
    /// #### Safety
    /// Every non-zero address must point at the GLFW function of the matching name.
    ///
    /// ### 中文
    /// 构建类型化函数表；任何 NULL 项都会被拒绝。
    ///
    /// #### 安全性
    /// 每个非 0 地址都必须指向同名的 GLFW 函数。
    pub unsafe fn from_embedder(api: EmbedderGlfwApi) -> Result<Self, ContextError> {
        if let Some(name) = api.first_missing() {
            return Err(ContextError::MissingSymbol(name));
        }

        unsafe {
            Ok(Self {
                glfw_get_proc_address: std::mem::transmute::<usize, GlfwGetProcAddress>(
                    api.glfw_get_proc_address,
                ),
                glfw_make_context_current: std::mem::transmute::<usize, GlfwMakeContextCurrent>(
                    api.glfw_make_context_current,
                ),
                glfw_default_window_hints: std::mem::transmute::<usize, GlfwDefaultWindowHints>(
                    api.glfw_default_window_hints,
                ),
                glfw_window_hint: std::mem::transmute::<usize, GlfwWindowHint>(
                    api.glfw_window_hint,
                ),
                glfw_get_window_attrib: std::mem::transmute::<usize, GlfwGetWindowAttrib>(
                    api.glfw_get_window_attrib,
                ),
                glfw_create_window: std::mem::transmute::<usize, GlfwCreateWindow>(
                    api.glfw_create_window,
                ),
                glfw_destroy_window: std::mem::transmute::<usize, GlfwDestroyWindow>(
                    api.glfw_destroy_window,
                ),
            })
        }
    }

    pub unsafe fn make_current(&self, window: *mut GLFWwindow) {
        unsafe { (self.glfw_make_context_current)(window) };
    }

    pub unsafe fn get_proc_address(&self, name: &CStr) -> *const c_void {
        unsafe { (self.glfw_get_proc_address)(name.as_ptr()) }
    }

    pub unsafe fn destroy_window(&self, window: *mut GLFWwindow) {
        unsafe { (self.glfw_destroy_window)(window) };
    }

    /// ### English
    /// Creates an invisible 1x1 window whose GL context shares objects with `share`.
    ///
    /// The new context copies the client API, version, profile and creation API of `share` so
    /// both contexts land in the same share group. Window hints are reset afterwards so the
    /// host's own window creation is unaffected.
    ///
    /// ### 中文
    /// 创建一个不可见的 1x1 window，使其 GL 上下文与 `share` 共享对象。
    ///
    /// 新上下文复制 `share` 的 client API、版本、profile 与创建 API，保证两者位于同一 share group。
    /// 创建后会重置 window hints，不影响宿主自己的 window 创建。
    pub unsafe fn create_shared_offscreen_window(
        &self,
        share: *mut GLFWwindow,
    ) -> Result<*mut GLFWwindow, ContextError> {
        const GLFW_FALSE: c_int = 0;

        const GLFW_VISIBLE: c_int = 0x0002_0004;
        const GLFW_FOCUSED: c_int = 0x0002_0001;
        const GLFW_RESIZABLE: c_int = 0x0002_0003;

        const GLFW_CLIENT_API: c_int = 0x0002_2001;
        const GLFW_CONTEXT_VERSION_MAJOR: c_int = 0x0002_2002;
        const GLFW_CONTEXT_VERSION_MINOR: c_int = 0x0002_2003;
        const GLFW_OPENGL_FORWARD_COMPAT: c_int = 0x0002_2006;
        const GLFW_OPENGL_DEBUG_CONTEXT: c_int = 0x0002_2007;
        const GLFW_OPENGL_PROFILE: c_int = 0x0002_2008;
        const GLFW_CONTEXT_CREATION_API: c_int = 0x0002_200B;

        if share.is_null() {
            return Err(ContextError::NullHandle("host GLFW window"));
        }

        let attrib = |name| unsafe { (self.glfw_get_window_attrib)(share, name) };
        let client_api = attrib(GLFW_CLIENT_API);
        let major = attrib(GLFW_CONTEXT_VERSION_MAJOR);
        let minor = attrib(GLFW_CONTEXT_VERSION_MINOR);
        let profile = attrib(GLFW_OPENGL_PROFILE);
        let forward_compat = attrib(GLFW_OPENGL_FORWARD_COMPAT);
        let debug = attrib(GLFW_OPENGL_DEBUG_CONTEXT);
        let creation_api = attrib(GLFW_CONTEXT_CREATION_API);

        let hint = |name, value| unsafe { (self.glfw_window_hint)(name, value) };
        unsafe { (self.glfw_default_window_hints)() };
        hint(GLFW_VISIBLE, GLFW_FALSE);
        hint(GLFW_FOCUSED, GLFW_FALSE);
        hint(GLFW_RESIZABLE, GLFW_FALSE);
        if client_api != 0 {
            hint(GLFW_CLIENT_API, client_api);
        }
        if major > 0 {
            hint(GLFW_CONTEXT_VERSION_MAJOR, major);
        }
        if minor > 0 {
            hint(GLFW_CONTEXT_VERSION_MINOR, minor);
        }
        if profile != 0 {
            hint(GLFW_OPENGL_PROFILE, profile);
        }
        hint(GLFW_OPENGL_FORWARD_COMPAT, forward_compat);
        hint(GLFW_OPENGL_DEBUG_CONTEXT, debug);
        if creation_api != 0 {
            hint(GLFW_CONTEXT_CREATION_API, creation_api);
        }

        let title = c"cube_frame_share-producer";
        let window =
            unsafe { (self.glfw_create_window)(1, 1, title.as_ptr(), std::ptr::null_mut(), share) };
        unsafe { (self.glfw_default_window_hints)() };

        if window.is_null() {
            return Err(ContextError::WindowCreation);
        }
        Ok(window)
    }
}
