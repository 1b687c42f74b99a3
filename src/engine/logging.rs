//! ### English
//! Optional `tracing` subscriber for embedders that have none of their own.
//!
//! ### 中文
//! 为没有自有日志订阅者的宿主提供的可选 `tracing` subscriber。

use tracing_subscriber::EnvFilter;

/// ### English
/// Filter used when `RUST_LOG` is unset.
///
/// ### 中文
/// 未设置 `RUST_LOG` 时使用的过滤器。
pub const DEFAULT_FILTER: &str = "info";

/// ### English
/// Installs a global `fmt` subscriber filtered by `RUST_LOG` (default [`DEFAULT_FILTER`]).
///
/// Returns `false` if a global subscriber was already installed; calling twice is harmless.
///
/// ### 中文
/// 安装一个按 `RUST_LOG` 过滤（默认 [`DEFAULT_FILTER`]）的全局 `fmt` subscriber。
///
/// 若全局 subscriber 已存在则返回 `false`；重复调用无副作用。
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    #[test]
    fn second_init_is_a_no_op() {
        super::init();
        assert!(!super::init());
    }
}
