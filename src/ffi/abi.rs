use crate::engine::{flags, logging};

#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn cube_share_abi_version() -> u32 {
    super::CUBE_SHARE_ABI_VERSION
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `CUBE_SHARE_VIEW_FLAG_NO_SPIN`.
///
/// ### 中文
/// 返回 `CUBE_SHARE_VIEW_FLAG_NO_SPIN`。
pub extern "C" fn cube_share_view_flag_no_spin() -> u32 {
    flags::CUBE_SHARE_VIEW_FLAG_NO_SPIN
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `CUBE_SHARE_VIEW_FLAG_UNPACED`.
///
/// ### 中文
/// 返回 `CUBE_SHARE_VIEW_FLAG_UNPACED`。
pub extern "C" fn cube_share_view_flag_unpaced() -> u32 {
    flags::CUBE_SHARE_VIEW_FLAG_UNPACED
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT`.
///
/// ### 中文
/// 返回 `CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT`。
pub extern "C" fn cube_share_view_flag_deferred_paint() -> u32 {
    flags::CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT
}

#[unsafe(no_mangle)]
/// ### English
/// Installs the `tracing` subscriber (`RUST_LOG` filter, default `info`).
///
/// Returns `false` if a global subscriber was already installed.
///
/// ### 中文
/// 安装 `tracing` 订阅者（`RUST_LOG` 过滤，默认 `info`）。
///
/// 若全局订阅者已安装则返回 `false`。
pub extern "C" fn cube_share_init_logging() -> bool {
    logging::init()
}
