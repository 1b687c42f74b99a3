//! ### English
//! Producer side: frame sources and the media thread that feeds the handoff pipeline.
//!
//! ### 中文
//! 生产者侧：帧源，以及向交接管线供帧的媒体线程。

mod media_thread;
mod test_pattern;

pub use media_thread::MediaThread;
pub use test_pattern::{TestPatternSource, UploadTarget};

#[cfg(test)]
pub(crate) use test_pattern::fake_target;

use crate::engine::frame::Frame;
use crate::engine::rendering::ContextError;

/// ### English
/// Frame producer failures. They end the media thread and are reported through
/// `ViewEvent::ProducerFinished`.
///
/// ### 中文
/// 帧生产失败；会结束媒体线程，并通过 `ViewEvent::ProducerFinished` 上报。
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("frame source used before start")]
    NotStarted,
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("{0}")]
    Other(String),
}

/// ### English
/// Something that decodes or generates frames on the media thread.
///
/// ### 中文
/// 在媒体线程上解码或生成帧的对象。
pub trait FrameSource: Send + 'static {
    /// ### English
    /// Called once on the media thread before the first frame.
    ///
    /// ### 中文
    /// 在媒体线程上、第一帧之前调用一次。
    fn start(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// ### English
    /// Produces frame `seq`, reusing `recycled` (a frame returned by the consumer) when given.
    /// `Ok(None)` means end of stream.
    ///
    /// ### 中文
    /// 生产序号为 `seq` 的帧；若提供了 `recycled`（消费者归还的帧）则复用它。
    /// `Ok(None)` 表示流结束。
    fn next_frame(&mut self, seq: u64, recycled: Option<Frame>)
    -> Result<Option<Frame>, SourceError>;

    /// ### English
    /// Called once on the media thread after the last frame, whatever the exit reason.
    ///
    /// ### 中文
    /// 在媒体线程上、最后一帧之后调用一次（无论退出原因）。
    fn stop(&mut self) {}
}
