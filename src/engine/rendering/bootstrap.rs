//! ### English
//! Producer GL context bootstrap.
//!
//! The producer needs its own context in the host's share group. Two host capabilities are
//! supported:
//! - `GlfwShared`: the host hands over its GLFW window and a GLFW function table; we create an
//!   invisible shared window ourselves.
//! - `Wrapped`: the host already created a shared context and exposes it through callbacks.
//!
//! ### 中文
//! 生产者 GL 上下文初始化。
//!
//! 生产者需要一个位于宿主 share group 中的独立上下文。支持两种宿主能力：
//! - `GlfwShared`：宿主交出其 GLFW window 与 GLFW 函数表，由我们创建不可见的共享 window。
//! - `Wrapped`：宿主已创建好共享上下文，并通过回调暴露给我们。

use std::ffi::{CStr, CString, c_char, c_void};
use std::rc::Rc;

use gleam::gl::{self, Gl};
use glow::HasContext as _;
use tracing::{debug, info};

use super::context::{ContextError, GlFlush};
use crate::engine::glfw::{EmbedderGlfwApi, GLFWwindow, GlfwApi};

/// ### English
/// Host callback making the wrapped context current (`current = true`) or releasing it.
/// Returns `false` on failure.
///
/// ### 中文
/// 宿主回调：使包装的上下文 current（`current = true`）或释放它；失败返回 `false`。
pub type HostMakeCurrentFn = unsafe extern "C" fn(user: *mut c_void, current: bool) -> bool;

/// ### English
/// Host callback resolving a GL entry point for the wrapped context.
///
/// ### 中文
/// 宿主回调：为包装的上下文解析 GL 函数入口。
pub type HostGetProcAddressFn =
    unsafe extern "C" fn(user: *mut c_void, name: *const c_char) -> *const c_void;

/// ### English
/// Host callback invoked once when the wrapped context is no longer used.
///
/// ### 中文
/// 宿主回调：包装的上下文不再使用时调用一次。
pub type HostReleaseFn = unsafe extern "C" fn(user: *mut c_void);

/// ### English
/// Creates the producer context as an invisible GLFW window sharing with the host window.
///
/// ### 中文
/// 以与宿主 window 共享的不可见 GLFW window 创建生产者上下文。
#[derive(Clone, Copy, Debug)]
pub struct GlfwSharedBootstrap {
    /// ### English
    /// Host `GLFWwindow*` as a raw address.
    ///
    /// ### 中文
    /// 宿主 `GLFWwindow*` 的原始地址。
    pub host_window: usize,
    pub api: EmbedderGlfwApi,
}

/// ### English
/// Adopts a host-created context that already shares objects with the host's GUI context.
///
/// ### 中文
/// 接管宿主创建的、已与宿主 GUI 上下文共享对象的上下文。
#[derive(Clone, Copy, Debug)]
pub struct WrappedContextBootstrap {
    /// ### English
    /// Opaque host pointer passed back to every callback, as a raw address.
    ///
    /// ### 中文
    /// 回传给每个回调的不透明宿主指针（原始地址）。
    pub user: usize,
    pub make_current: HostMakeCurrentFn,
    pub get_proc_address: HostGetProcAddressFn,
    pub release: Option<HostReleaseFn>,
}

/// ### English
/// How the producer context is obtained.
///
/// ### 中文
/// 生产者上下文的获取方式。
#[derive(Clone, Copy, Debug)]
pub enum ContextBootstrap {
    GlfwShared(GlfwSharedBootstrap),
    Wrapped(WrappedContextBootstrap),
}

impl ContextBootstrap {
    /// ### English
    /// Creates the context and makes it current. Must run on the thread that will own it.
    ///
    /// ### 中文
    /// 创建上下文并使其 current。必须在将要持有它的线程上调用。
    pub fn create(self) -> Result<SharedGlContext, ContextError> {
        match self {
            Self::GlfwShared(bootstrap) => {
                if bootstrap.host_window == 0 {
                    return Err(ContextError::NullHandle("host GLFW window"));
                }
                let api = unsafe { GlfwApi::from_embedder(bootstrap.api)? };
                let share = bootstrap.host_window as *mut GLFWwindow;
                let window = unsafe { api.create_shared_offscreen_window(share)? };
                unsafe { api.make_current(window) };
                debug!("created shared offscreen GLFW window");

                let gl = load_gl(|name| unsafe { api.get_proc_address(name) });
                Ok(SharedGlContext::new(gl, ContextOwner::Glfw { api, window }))
            }
            Self::Wrapped(bootstrap) => {
                let user = bootstrap.user as *mut c_void;
                if !unsafe { (bootstrap.make_current)(user, true) } {
                    return Err(ContextError::MakeCurrent);
                }
                debug!("adopted host-provided shared context");

                let gl = load_gl(|name| unsafe { (bootstrap.get_proc_address)(user, name.as_ptr()) });
                Ok(SharedGlContext::new(gl, ContextOwner::Wrapped(bootstrap)))
            }
        }
    }
}

struct LoadedGl {
    gl: Rc<dyn Gl>,
    version: String,
    is_gles: bool,
}

fn load_gl(get_proc_address: impl Fn(&CStr) -> *const c_void) -> LoadedGl {
    let resolve = |name: &str| {
        CString::new(name).map_or(std::ptr::null(), |name| get_proc_address(&name))
    };

    let version = {
        let glow = unsafe { glow::Context::from_loader_function(resolve) };
        unsafe { glow.get_parameter_string(glow::VERSION) }
    };
    let is_gles = version.starts_with("OpenGL ES");

    let gl: Rc<dyn Gl> = unsafe {
        if is_gles {
            gl::GlesFns::load_with(resolve)
        } else {
            gl::GlFns::load_with(resolve)
        }
    };
    LoadedGl {
        gl,
        version,
        is_gles,
    }
}

/// ### English
/// Parses `"4.6.0 ..."` or `"OpenGL ES 3.2 ..."` into `(major, minor)`; `(0, 0)` if unknown.
///
/// ### 中文
/// 将 `"4.6.0 ..."` 或 `"OpenGL ES 3.2 ..."` 解析为 `(major, minor)`；无法识别时为 `(0, 0)`。
fn parse_gl_version(version: &str) -> (u32, u32) {
    let Some(token) = version
        .split_whitespace()
        .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))
    else {
        return (0, 0);
    };
    let mut parts = token.split('.').map(|s| s.parse::<u32>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

enum ContextOwner {
    Glfw {
        api: GlfwApi,
        window: *mut GLFWwindow,
    },
    Wrapped(WrappedContextBootstrap),
}

/// ### English
/// The producer GL context, current on its owning thread, plus the gleam API used for uploads.
///
/// Dropping it releases the context (destroys the offscreen window or hands the wrapped context
/// back to the host).
///
/// ### 中文
/// 生产者 GL 上下文（在其所属线程上 current），以及用于上传的 gleam API。
///
/// drop 时释放上下文（销毁离屏 window，或把包装的上下文交还宿主）。
pub struct SharedGlContext {
    gl: Rc<dyn Gl>,
    version: (u32, u32),
    is_gles: bool,
    owner: ContextOwner,
}

impl SharedGlContext {
    fn new(loaded: LoadedGl, owner: ContextOwner) -> Self {
        let version = parse_gl_version(&loaded.version);
        info!(
            gl_version = %loaded.version,
            gles = loaded.is_gles,
            "producer GL context ready"
        );
        Self {
            gl: loaded.gl,
            version,
            is_gles: loaded.is_gles,
            owner,
        }
    }

    pub fn gl(&self) -> &Rc<dyn Gl> {
        &self.gl
    }

    pub fn version(&self) -> (u32, u32) {
        self.version
    }

    pub fn is_gles(&self) -> bool {
        self.is_gles
    }
}

impl GlFlush for SharedGlContext {
    fn flush_gl(&self) {
        self.gl.flush();
    }

    fn delete_texture_gl(&self, texture_id: u32) {
        self.gl.delete_textures(&[texture_id]);
    }
}

impl Drop for SharedGlContext {
    fn drop(&mut self) {
        match &self.owner {
            ContextOwner::Glfw { api, window } => unsafe {
                api.make_current(std::ptr::null_mut());
                api.destroy_window(*window);
            },
            ContextOwner::Wrapped(bootstrap) => {
                let user = bootstrap.user as *mut c_void;
                unsafe {
                    (bootstrap.make_current)(user, false);
                    if let Some(release) = bootstrap.release {
                        release(user);
                    }
                }
            }
        }
        debug!("producer GL context released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_desktop_and_es_versions() {
        assert_eq!(parse_gl_version("4.6.0 NVIDIA 555.85"), (4, 6));
        assert_eq!(parse_gl_version("OpenGL ES 3.2 Mesa 24.0"), (3, 2));
        assert_eq!(parse_gl_version("unknown"), (0, 0));
    }

    #[test]
    fn null_host_window_is_rejected_before_touching_glfw() {
        let bootstrap = ContextBootstrap::GlfwShared(GlfwSharedBootstrap {
            host_window: 0,
            api: EmbedderGlfwApi::default(),
        });
        assert!(matches!(
            bootstrap.create(),
            Err(ContextError::NullHandle(_))
        ));
    }

    unsafe extern "C" fn refuse_current(_user: *mut c_void, _current: bool) -> bool {
        false
    }

    unsafe extern "C" fn no_proc(_user: *mut c_void, _name: *const c_char) -> *const c_void {
        std::ptr::null()
    }

    #[test]
    fn wrapped_context_that_cannot_be_made_current_fails() {
        let bootstrap = ContextBootstrap::Wrapped(WrappedContextBootstrap {
            user: 0,
            make_current: refuse_current,
            get_proc_address: no_proc,
            release: None,
        });
        assert!(matches!(bootstrap.create(), Err(ContextError::MakeCurrent)));
    }
}
