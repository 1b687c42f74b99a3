//! ### English
//! Bitflags controlling optional view behaviors.
//!
//! These are passed through the C ABI as a `u32` bitmask.
//!
//! ### 中文
//! 控制 view 可选行为的位标志（bitflags）。
//!
//! 通过 C ABI 以 `u32` 位掩码传入。

/// ### English
/// Keep the cube static (no per-paint rotation).
///
/// ### 中文
/// 保持立方体静止（每次绘制不旋转）。
pub const CUBE_SHARE_VIEW_FLAG_NO_SPIN: u32 = 1 << 0;

/// ### English
/// Ignore the target FPS; the producer runs as fast as the handoff backpressure allows.
///
/// ### 中文
/// 忽略目标 FPS；生产者在交接背压允许的范围内全速运行。
pub const CUBE_SHARE_VIEW_FLAG_UNPACED: u32 = 1 << 1;

/// ### English
/// Do not repaint synchronously on frame arrival; the embedder repaints on its own cadence.
///
/// With this flag a slow embedder no longer throttles decoding one-for-one, but frames that arrive
/// between two paints are never drawn.
///
/// ### 中文
/// 帧到达时不同步重绘；由宿主按自己的节奏重绘。
///
/// 启用后，慢速宿主不再一帧一帧地节流解码，但两次绘制之间到达的帧不会被绘制。
pub const CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT: u32 = 1 << 2;

/// ### English
/// Mask of all known flags.
///
/// ### 中文
/// 所有已知标志的掩码。
pub const CUBE_SHARE_VIEW_FLAGS_ALL: u32 =
    CUBE_SHARE_VIEW_FLAG_NO_SPIN | CUBE_SHARE_VIEW_FLAG_UNPACED | CUBE_SHARE_VIEW_FLAG_DEFERRED_PAINT;
