//! ### English
//! Bounded blocking handoff between the media thread and the view thread.
//!
//! Two FIFO queues move frames by ownership transfer: `queue_input_buf` carries fresh frames to
//! the consumer and `queue_output_buf` returns consumed frames to the producer for reuse. A shared
//! [`StopSignal`] unblocks every pending wait when the session shuts down.
//!
//! ### 中文
//! 媒体线程与 view 线程之间的有界阻塞交接。
//!
//! 两个 FIFO 队列以所有权转移的方式搬运帧：`queue_input_buf` 把新帧交给消费者，
//! `queue_output_buf` 把用完的帧还给生产者复用。共享的 [`StopSignal`] 会在会话关闭时解除所有阻塞等待。

mod pipeline;
mod queue;
mod stop;

pub use pipeline::{MIN_HANDOFF_DEPTH, Pipeline};
pub use queue::HandoffQueue;
pub use stop::StopSignal;

/// ### English
/// Errors returned by blocking handoff operations.
///
/// ### 中文
/// 阻塞交接操作返回的错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    /// ### English
    /// The pipeline was stopped; any value being transferred was dropped.
    ///
    /// ### 中文
    /// 管线已停止；正在传递的值已被丢弃。
    #[error("handoff pipeline stopped")]
    Stopped,
}
