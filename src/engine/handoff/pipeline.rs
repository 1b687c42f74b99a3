use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::engine::frame::Frame;

use super::{HandoffError, HandoffQueue, StopSignal};

/// ### English
/// Smallest usable in-flight bound.
///
/// The consumer only returns a frame when the next one arrives, so with a bound of 1 the producer
/// would wait forever for a frame the consumer is still holding.
///
/// ### 中文
/// 可用的最小在途帧上限。
///
/// 消费者只会在下一帧到达时归还上一帧；若上限为 1，生产者会永远等待消费者仍持有的那一帧。
pub const MIN_HANDOFF_DEPTH: usize = 2;

/// ### English
/// Producer/consumer handoff channel: a fresh-frame queue plus a recycle queue.
///
/// `depth` bounds the number of frames outside the producer (in `queue_input_buf`, held by the
/// consumer, or in `queue_output_buf`). The producer enforces it by calling [`Self::reclaim`]
/// whenever [`Self::must_reclaim`] is true, which is the backpressure point.
///
/// ### 中文
/// 生产者/消费者交接通道：新帧队列 + 回收队列。
///
/// `depth` 限制位于生产者之外的帧数量（在 `queue_input_buf` 中、被消费者持有、或在
/// `queue_output_buf` 中）。生产者在 [`Self::must_reclaim`] 为真时调用 [`Self::reclaim`]
/// 来维持该上限，这也是背压发生的位置。
pub struct Pipeline<T = Frame> {
    /// ### English
    /// Producer → consumer queue of freshly produced frames.
    ///
    /// ### 中文
    /// 生产者 → 消费者：新生产帧的队列。
    pub queue_input_buf: HandoffQueue<T>,
    /// ### English
    /// Consumer → producer queue of consumed frames returned for reuse.
    ///
    /// ### 中文
    /// 消费者 → 生产者：用完后归还复用的帧队列。
    pub queue_output_buf: HandoffQueue<T>,
    depth: usize,
    in_flight: AtomicUsize,
    stop: StopSignal,
}

impl<T> Pipeline<T> {
    /// ### English
    /// Creates a pipeline with an explicit in-flight bound (clamped to [`MIN_HANDOFF_DEPTH`]).
    ///
    /// ### 中文
    /// 以显式在途上限创建管线（下限为 [`MIN_HANDOFF_DEPTH`]）。
    pub fn new(depth: usize) -> Self {
        let depth = if depth < MIN_HANDOFF_DEPTH {
            warn!(
                requested = depth,
                min = MIN_HANDOFF_DEPTH,
                "handoff depth too small, clamping"
            );
            MIN_HANDOFF_DEPTH
        } else {
            depth
        };

        let stop = StopSignal::new();
        debug!(depth, "creating handoff pipeline");
        Self {
            queue_input_buf: HandoffQueue::new("input", depth, stop.clone()),
            queue_output_buf: HandoffQueue::new("output", depth, stop.clone()),
            depth,
            in_flight: AtomicUsize::new(0),
            stop,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// ### English
    /// Frames handed to the consumer and not yet reclaimed by the producer.
    ///
    /// ### 中文
    /// 已交给消费者且尚未被生产者回收的帧数。
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// ### English
    /// Returns whether the producer must reclaim a frame before submitting another.
    ///
    /// ### 中文
    /// 返回生产者在提交下一帧之前是否必须先回收一帧。
    pub fn must_reclaim(&self) -> bool {
        self.in_flight() >= self.depth
    }

    /// ### English
    /// Producer side: hands a frame to the consumer.
    ///
    /// ### 中文
    /// 生产者侧：把一帧交给消费者。
    pub fn submit(&self, frame: T) -> Result<(), HandoffError> {
        self.queue_input_buf.put(frame)?;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// ### English
    /// Producer side: blocks until the consumer returns a frame.
    ///
    /// ### 中文
    /// 生产者侧：阻塞直到消费者归还一帧。
    pub fn reclaim(&self) -> Result<T, HandoffError> {
        let frame = self.queue_output_buf.get()?;
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        Ok(frame)
    }

    /// ### English
    /// Producer side: takes a returned frame if one is already waiting.
    ///
    /// ### 中文
    /// 生产者侧：若已有归还的帧则直接取走。
    pub fn try_reclaim(&self) -> Option<T> {
        let frame = self.queue_output_buf.try_get()?;
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        Some(frame)
    }

    /// ### English
    /// Consumer side: recycles `previous` (if any) and then fetches the next frame.
    ///
    /// The recycle happens first so the producer can reclaim it before it produces the frame after
    /// the one being fetched.
    ///
    /// ### 中文
    /// 消费者侧：先回收 `previous`（若有），再获取下一帧。
    ///
    /// 先回收，保证生产者在生产“下一帧之后的那一帧”之前能够拿回它。
    pub fn exchange(&self, previous: Option<T>) -> Result<T, HandoffError> {
        if let Some(previous) = previous {
            self.queue_output_buf.put(previous)?;
        }
        self.queue_input_buf.get()
    }

    /// ### English
    /// Requests stop: every pending or future blocking wait returns `Stopped`.
    ///
    /// ### 中文
    /// 请求停止：所有挂起或后续的阻塞等待都会返回 `Stopped`。
    pub fn stop(&self) {
        if self.stop.trigger() {
            debug!(in_flight = self.in_flight(), "handoff pipeline stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_triggered()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }
}
