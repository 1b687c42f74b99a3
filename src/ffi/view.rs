//! ### English
//! C ABI bindings for view lifecycle, painting and close handling.
//!
//! ### 中文
//! view 生命周期、绘制与关闭处理的 C ABI 绑定。

use std::ffi::{CString, c_void};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dpi::PhysicalSize;
use tracing::error;

use super::{
    CUBE_SHARE_BOOTSTRAP_GLFW_SHARED, CUBE_SHARE_BOOTSTRAP_WRAPPED, CubeShareView,
    CubeShareViewDesc, cstr_to_path,
};
use crate::engine::glfw::GlfwApi;
use crate::engine::notify::WakeHook;
use crate::engine::producer::TestPatternSource;
use crate::engine::rendering::{
    ContextBootstrap, GlfwSharedBootstrap, GlowBackend, RendererError, WrappedContextBootstrap,
};
use crate::engine::runtime::CubeView;
use crate::engine::{RenderOutcome, ViewConfig};

/// ### English
/// Translates the bootstrap part of `desc`, or `None` if it is incomplete.
///
/// ### 中文
/// 转换 `desc` 中的上下文创建参数；参数不完整时返回 `None`。
fn bootstrap_from_desc(desc: &CubeShareViewDesc) -> Option<ContextBootstrap> {
    match desc.bootstrap_kind {
        CUBE_SHARE_BOOTSTRAP_GLFW_SHARED => {
            Some(ContextBootstrap::GlfwShared(GlfwSharedBootstrap {
                host_window: desc.host_window as usize,
                api: desc.glfw_api,
            }))
        }
        CUBE_SHARE_BOOTSTRAP_WRAPPED => {
            let (Some(make_current), Some(get_proc_address)) =
                (desc.context_make_current, desc.context_get_proc_address)
            else {
                error!("wrapped bootstrap needs make_current and get_proc_address callbacks");
                return None;
            };
            Some(ContextBootstrap::Wrapped(WrappedContextBootstrap {
                user: desc.context_user as usize,
                make_current,
                get_proc_address,
                release: desc.context_release,
            }))
        }
        kind => {
            error!(kind, "unknown bootstrap kind");
            None
        }
    }
}

/// ### English
/// Builds the consumer backend against the current GUI context.
///
/// # Safety
/// The GUI context must be current, and the loader in `desc` must belong to it.
///
/// ### 中文
/// 基于当前 GUI 上下文构建消费者后端。
///
/// # Safety
/// GUI 上下文必须处于 current，且 `desc` 中的加载器必须属于该上下文。
unsafe fn backend_from_desc(
    desc: &CubeShareViewDesc,
    resources_dir: Option<&Path>,
) -> Result<GlowBackend, RendererError> {
    if let Some(get_proc_address) = desc.gui_get_proc_address {
        let user = desc.gui_user;
        return unsafe {
            GlowBackend::from_loader(
                |name| match CString::new(name) {
                    Ok(name) => get_proc_address(user, name.as_ptr()),
                    Err(_) => std::ptr::null(),
                },
                resources_dir,
            )
        };
    }

    if desc.bootstrap_kind != CUBE_SHARE_BOOTSTRAP_GLFW_SHARED {
        return Err(RendererError::Create {
            what: "backend",
            reason: "no GUI context loader".to_owned(),
        });
    }
    let api = unsafe { GlfwApi::from_embedder(desc.glfw_api) }.map_err(|err| {
        RendererError::Create {
            what: "backend",
            reason: err.to_string(),
        }
    })?;
    unsafe {
        GlowBackend::from_loader(
            |name| match CString::new(name) {
                Ok(name) => api.get_proc_address(&name),
                Err(_) => std::ptr::null(),
            },
            resources_dir,
        )
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Creates one view and starts its producer.
///
/// Must be called on the GUI thread with the host GUI context current. A shader failure does not
/// return NULL: the view is created closed and the first `cube_share_view_pump` reports `2`.
///
/// Returns NULL if `desc` is NULL or incomplete, or the media thread cannot be spawned.
///
/// ### 中文
/// 创建一个 view 并启动其生产者。
///
/// 必须在 GUI 线程上、宿主 GUI 上下文处于 current 时调用。着色器失败不会返回 NULL：
/// view 以关闭状态创建，第一次 `cube_share_view_pump` 将返回 `2`。
///
/// 当 `desc` 为 NULL 或参数不完整，或无法启动媒体线程时返回 NULL。
pub unsafe extern "C" fn cube_share_view_create(
    desc: *const CubeShareViewDesc,
) -> *mut CubeShareView {
    if desc.is_null() {
        return std::ptr::null_mut();
    }
    let desc = unsafe { &*desc };

    let Some(bootstrap) = bootstrap_from_desc(desc) else {
        return std::ptr::null_mut();
    };

    let frame_size = PhysicalSize::new(desc.frame_width, desc.frame_height);
    let mut config = ViewConfig::from_flags(
        desc.handoff_depth as usize,
        frame_size,
        desc.target_fps,
        desc.view_flags,
    )
    .validated();
    config.resources_dir = unsafe { cstr_to_path(desc.resources_dir) };

    let backend = unsafe { backend_from_desc(desc, config.resources_dir.as_deref()) };

    let wake_hook = desc.wake.map(|wake| {
        let user = desc.wake_user as usize;
        let hook: Arc<dyn WakeHook> = Arc::new(move || unsafe { wake(user as *mut c_void) });
        hook
    });

    let viewport = PhysicalSize::new(desc.viewport_width, desc.viewport_height);
    let source = TestPatternSource::new(bootstrap, config.frame_size);
    let view = match CubeView::start(backend, source, config, viewport, wake_hook) {
        Ok(view) => view,
        Err(err) => {
            error!(%err, "failed to create cube view");
            return std::ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(CubeShareView { view }))
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a view created by `cube_share_view_create`.
///
/// Stops and joins the producer, then deletes the view's GL objects; the GUI context must be
/// current.
///
/// ### 中文
/// 销毁由 `cube_share_view_create` 创建的 view。
///
/// 会停止并等待生产者退出，然后删除 view 的 GL 对象；GUI 上下文必须处于 current。
pub unsafe extern "C" fn cube_share_view_destroy(view: *mut CubeShareView) {
    if view.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(view));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Drains pending notifications (call it after the wake callback fired).
///
/// Returns the view status: `0` running, `1` closing, `2` closed. NULL returns `2`.
///
/// ### 中文
/// 处理待处理的通知（在唤醒回调触发后调用）。
///
/// 返回 view 状态：`0` 运行中，`1` 关闭中，`2` 已关闭。NULL 返回 `2`。
pub unsafe extern "C" fn cube_share_view_pump(view: *mut CubeShareView) -> u32 {
    if view.is_null() {
        return 2;
    }
    unsafe { (*view).view.pump() as u32 }
}

#[unsafe(no_mangle)]
/// ### English
/// Paints the held frame into the current framebuffer.
///
/// Returns `0` if no frame has arrived yet, `1` if drawn, `2` if the pass was aborted.
///
/// ### 中文
/// 把当前持有的帧绘制到当前 framebuffer。
///
/// 尚无帧时返回 `0`，已绘制返回 `1`，本次渲染被中止返回 `2`。
pub unsafe extern "C" fn cube_share_view_paint(view: *mut CubeShareView) -> u32 {
    if view.is_null() {
        return 0;
    }
    match unsafe { (*view).view.paint() } {
        RenderOutcome::Idle => 0,
        RenderOutcome::Drawn => 1,
        RenderOutcome::Aborted(_) => 2,
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Updates the viewport and projection (in pixels).
///
/// ### 中文
/// 更新视口与投影（单位：像素）。
pub unsafe extern "C" fn cube_share_view_resize(view: *mut CubeShareView, width: u32, height: u32) {
    if view.is_null() {
        return;
    }
    unsafe { (*view).view.resize(PhysicalSize::new(width.max(1), height.max(1))) };
}

#[unsafe(no_mangle)]
/// ### English
/// Handles a window close request.
///
/// The first call asks the producer to stop and returns `false`: the host should ignore the close
/// and keep pumping. Returns `true` once the producer has finished and the window may close.
/// NULL returns `true`.
///
/// ### 中文
/// 处理窗口关闭请求。
///
/// 第一次调用会请求生产者停止并返回 `false`：宿主应忽略本次关闭并继续 pump。
/// 生产者结束后返回 `true`，此时窗口可以关闭。NULL 返回 `true`。
pub unsafe extern "C" fn cube_share_view_request_close(view: *mut CubeShareView) -> bool {
    if view.is_null() {
        return true;
    }
    unsafe { (*view).view.request_close() }
}

#[unsafe(no_mangle)]
/// ### English
/// Blocks up to `timeout_ms` for the producer to finish, pumping meanwhile. Returns the status.
///
/// ### 中文
/// 最多阻塞 `timeout_ms` 毫秒等待生产者结束，期间持续 pump。返回状态值。
pub unsafe extern "C" fn cube_share_view_wait_closed(
    view: *mut CubeShareView,
    timeout_ms: u32,
) -> u32 {
    if view.is_null() {
        return 2;
    }
    let timeout = Duration::from_millis(u64::from(timeout_ms));
    unsafe { (*view).view.wait_closed(timeout) as u32 }
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `seq + 1` of the held frame, or `0` if none is held.
///
/// ### 中文
/// 返回当前持有帧的 `seq + 1`；未持有帧时返回 `0`。
pub unsafe extern "C" fn cube_share_view_frame_seq(view: *const CubeShareView) -> u64 {
    if view.is_null() {
        return 0;
    }
    unsafe { (*view).view.current_frame_seq() }.map_or(0, |seq| seq + 1)
}

#[unsafe(no_mangle)]
/// ### English
/// Number of paints that drew a frame.
///
/// ### 中文
/// 实际绘制了帧的次数。
pub unsafe extern "C" fn cube_share_view_painted_frames(view: *const CubeShareView) -> u64 {
    if view.is_null() {
        return 0;
    }
    unsafe { (*view).view.painted_frames() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_desc(bootstrap_kind: u32) -> CubeShareViewDesc {
        CubeShareViewDesc {
            bootstrap_kind,
            host_window: std::ptr::null_mut(),
            glfw_api: Default::default(),
            context_user: std::ptr::null_mut(),
            context_make_current: None,
            context_get_proc_address: None,
            context_release: None,
            gui_user: std::ptr::null_mut(),
            gui_get_proc_address: None,
            frame_width: 16,
            frame_height: 16,
            viewport_width: 0,
            viewport_height: 0,
            handoff_depth: 2,
            target_fps: 0,
            view_flags: 0,
            resources_dir: std::ptr::null(),
            wake: None,
            wake_user: std::ptr::null_mut(),
        }
    }

    #[test]
    fn null_handles_are_rejected() {
        unsafe {
            assert!(cube_share_view_create(std::ptr::null()).is_null());
            assert_eq!(cube_share_view_pump(std::ptr::null_mut()), 2);
            assert_eq!(cube_share_view_paint(std::ptr::null_mut()), 0);
            assert!(cube_share_view_request_close(std::ptr::null_mut()));
            assert_eq!(cube_share_view_frame_seq(std::ptr::null()), 0);
            cube_share_view_resize(std::ptr::null_mut(), 10, 10);
            cube_share_view_destroy(std::ptr::null_mut());
        }
    }

    #[test]
    fn incomplete_bootstrap_is_rejected() {
        assert!(bootstrap_from_desc(&empty_desc(CUBE_SHARE_BOOTSTRAP_WRAPPED)).is_none());
        assert!(bootstrap_from_desc(&empty_desc(7)).is_none());
        assert!(matches!(
            bootstrap_from_desc(&empty_desc(CUBE_SHARE_BOOTSTRAP_GLFW_SHARED)),
            Some(ContextBootstrap::GlfwShared(_))
        ));
    }

    #[test]
    fn missing_gui_loader_fails_backend_creation() {
        let desc = empty_desc(CUBE_SHARE_BOOTSTRAP_WRAPPED);
        let result = unsafe { backend_from_desc(&desc, None) };
        assert!(matches!(result, Err(RendererError::Create { .. })));

        let desc = empty_desc(CUBE_SHARE_BOOTSTRAP_GLFW_SHARED);
        let result = unsafe { backend_from_desc(&desc, None) };
        assert!(matches!(result, Err(RendererError::Create { .. })));
    }
}
