//! ### English
//! The video-cube view: consumer-side orchestration on the host's GUI thread.
//!
//! ### 中文
//! 视频立方体 view：在宿主 GUI 线程上进行的消费者侧编排。

use std::sync::Arc;
use std::time::{Duration, Instant};

use dpi::PhysicalSize;
use tracing::{debug, error, info, warn};

use crate::engine::config::ViewConfig;
use crate::engine::frame::Frame;
use crate::engine::handoff::Pipeline;
use crate::engine::notify::{Inbox, ViewEvent, WakeHook, mailbox};
use crate::engine::producer::{FrameSource, MediaThread, SourceError};
use crate::engine::rendering::{CubeRenderer, RenderBackend, RenderOutcome, RendererError};

/// ### English
/// View construction failures.
///
/// Only spawning the media thread fails synchronously. Renderer setup and frame source failures
/// are reported through [`ViewStatus`] and [`CubeView::producer_error`].
///
/// ### 中文
/// View 构造失败。
///
/// 只有启动媒体线程会同步失败。渲染器初始化与帧源的失败通过 [`ViewStatus`] 与
/// [`CubeView::producer_error`] 报告。
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("failed to start media thread: {0}")]
    Producer(#[from] SourceError),
}

/// ### English
/// Lifecycle of a view as reported to the host.
///
/// ### 中文
/// 向宿主报告的 view 生命周期状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ViewStatus {
    Running = 0,
    /// ### English
    /// A close was requested (or setup failed); waiting for the producer to finish.
    ///
    /// ### 中文
    /// 已请求关闭（或初始化失败）；正在等待生产者结束。
    Closing = 1,
    /// ### English
    /// The producer has finished; the host should close the display surface.
    ///
    /// ### 中文
    /// 生产者已结束；宿主应关闭显示表面。
    Closed = 2,
}

/// ### English
/// Consumer side of one producer/consumer session.
///
/// Every method must be called on the thread that owns the GUI GL context, with that context
/// current whenever a paint may happen (`paint`, `pump` with paint-on-arrival, drop).
///
/// ### 中文
/// 一次生产者/消费者会话的消费者侧。
///
/// 所有方法都必须在持有 GUI GL 上下文的线程上调用；在可能发生绘制时（`paint`、
/// 启用到达即绘制的 `pump`、drop），该上下文必须处于 current。
pub struct CubeView<B: RenderBackend> {
    config: ViewConfig,
    pipeline: Arc<Pipeline<Frame>>,
    inbox: Inbox<ViewEvent>,
    renderer: Option<CubeRenderer<B>>,
    media: Option<MediaThread>,
    held: Option<Frame>,
    status: ViewStatus,
    painted_frames: u64,
    producer_error: Option<String>,
}

impl<B: RenderBackend> CubeView<B> {
    /// ### English
    /// Starts a session.
    ///
    /// `viewport` is the drawable size of the host widget; a zero-area size falls back to the
    /// producer frame size until the first `resize`.
    ///
    /// `backend` is the result of building the consumer renderer. A failure there (shader
    /// compile/link) is fatal for the session but not for the process: it is logged, no producer
    /// is started and the view reports `Closed` on the next `pump`.
    ///
    /// ### 中文
    /// 启动一次会话。
    ///
    /// `viewport` 为宿主控件的可绘制尺寸；零面积时在首次 `resize` 之前使用生产者帧尺寸。
    ///
    /// `backend` 是构建消费者渲染器的结果。若构建失败（着色器编译/链接），会话随之结束但进程不受影响：
    /// 记录日志、不启动生产者，并在下一次 `pump` 时报告 `Closed`。
    pub fn start<S: FrameSource>(
        backend: Result<B, RendererError>,
        source: S,
        config: ViewConfig,
        viewport: PhysicalSize<u32>,
        wake_hook: Option<Arc<dyn WakeHook>>,
    ) -> Result<Self, ViewError> {
        let config = config.validated();
        let viewport = if viewport.width == 0 || viewport.height == 0 {
            config.frame_size
        } else {
            viewport
        };
        let pipeline = Arc::new(Pipeline::new(config.handoff_depth));
        let (notifier, inbox) = mailbox(wake_hook);

        let mut view = Self {
            pipeline: pipeline.clone(),
            inbox,
            renderer: None,
            media: None,
            held: None,
            status: ViewStatus::Running,
            painted_frames: 0,
            producer_error: None,
            config,
        };

        match backend {
            Ok(backend) => {
                view.renderer = Some(CubeRenderer::new(
                    backend,
                    viewport,
                    view.config.spin,
                    view.config.clear_color,
                ));
            }
            Err(err) => {
                error!(%err, "cube renderer setup failed, closing view");
                view.status = ViewStatus::Closing;
                return Ok(view);
            }
        }

        let media = MediaThread::start(source, pipeline, notifier, view.config.frame_interval())?;
        view.media = Some(media);
        info!(
            depth = view.config.handoff_depth,
            paint_on_arrival = view.config.paint_on_arrival,
            "cube view started"
        );
        Ok(view)
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    /// ### English
    /// Sequence number of the frame currently held for painting.
    ///
    /// ### 中文
    /// 当前持有、用于绘制的帧序号。
    pub fn current_frame_seq(&self) -> Option<u64> {
        self.held.as_ref().map(Frame::seq)
    }

    /// ### English
    /// Number of render passes that drew a frame; hosts compare it to decide whether to present.
    ///
    /// ### 中文
    /// 实际绘制了帧的渲染次数；宿主可据此判断是否需要 present。
    pub fn painted_frames(&self) -> u64 {
        self.painted_frames
    }

    pub fn producer_error(&self) -> Option<&str> {
        self.producer_error.as_deref()
    }

    /// ### English
    /// Draws the held frame (no-op before the first frame).
    ///
    /// ### 中文
    /// 绘制当前持有的帧（首帧到达之前为 no-op）。
    pub fn paint(&mut self) -> RenderOutcome {
        let Some(renderer) = self.renderer.as_mut() else {
            return RenderOutcome::Idle;
        };
        let outcome = renderer.render(self.held.as_ref());
        if outcome == RenderOutcome::Drawn {
            self.painted_frames += 1;
        }
        outcome
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size);
        }
    }

    /// ### English
    /// Handles every queued notification on the calling (owner) thread.
    ///
    /// ### 中文
    /// 在调用（所有者）线程上处理所有排队的通知。
    pub fn pump(&mut self) -> ViewStatus {
        for event in self.inbox.drain() {
            self.handle(event);
        }
        self.settle_status()
    }

    /// ### English
    /// Close-event interception.
    ///
    /// The first request sends an asynchronous stop to the producer and returns `false` (keep the
    /// surface open). Returns `true` once the producer has finished and the surface may close.
    ///
    /// ### 中文
    /// 关闭事件拦截。
    ///
    /// 第一次请求向生产者发送异步停止并返回 `false`（保持表面打开）。
    /// 生产者结束后返回 `true`，表示表面可以关闭。
    pub fn request_close(&mut self) -> bool {
        if self.status == ViewStatus::Running {
            info!("close requested, stopping producer");
            self.status = ViewStatus::Closing;
            if let Some(media) = &self.media {
                media.stop();
            }
            return false;
        }
        self.pump() == ViewStatus::Closed
    }

    /// ### English
    /// Blocks until the view is `Closed` or `timeout` elapses, handling notifications meanwhile.
    /// For hosts without a run loop of their own.
    ///
    /// ### 中文
    /// 阻塞直到 view 进入 `Closed` 或超时，期间处理通知。供没有自有 run loop 的宿主使用。
    pub fn wait_closed(&mut self, timeout: Duration) -> ViewStatus {
        let deadline = Instant::now() + timeout;
        while self.pump() != ViewStatus::Closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if let Some(event) = self.inbox.recv_timeout(remaining) {
                self.handle(event);
            }
        }
        self.status
    }

    fn handle(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::FrameReady { seq } => {
                if self.status == ViewStatus::Running {
                    self.on_frame_ready(seq);
                }
            }
            ViewEvent::ProducerFinished { error } => {
                match &error {
                    Some(err) => warn!(err = %err, "producer finished with error"),
                    None => debug!("producer finished"),
                }
                self.producer_error = error;
                self.held = None;
                if let Some(mut media) = self.media.take() {
                    media.join();
                }
                self.status = ViewStatus::Closed;
            }
        }
    }

    /// ### English
    /// Recycle-then-fetch for one `FrameReady`, then a synchronous paint unless deferred.
    ///
    /// ### 中文
    /// 针对一次 `FrameReady` 执行“先回收再获取”，随后同步绘制（除非配置为延后绘制）。
    fn on_frame_ready(&mut self, seq: u64) {
        match self.pipeline.exchange(self.held.take()) {
            Ok(frame) => {
                if frame.seq() != seq {
                    debug!(expected = seq, got = frame.seq(), "frame notification out of step");
                }
                self.held = Some(frame);
            }
            Err(_) => {
                debug!(frame_seq = seq, "pipeline stopped before frame could be fetched");
                return;
            }
        }
        if self.config.paint_on_arrival {
            self.paint();
        }
    }

    fn settle_status(&mut self) -> ViewStatus {
        if self.status == ViewStatus::Closing && self.media.is_none() {
            self.status = ViewStatus::Closed;
        }
        self.status
    }
}

impl<B: RenderBackend> Drop for CubeView<B> {
    fn drop(&mut self) {
        self.inbox.close();
        self.pipeline.stop();
        if let Some(mut media) = self.media.take() {
            media.join();
        }
        self.held = None;
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.destroy();
        }
        debug!(painted = self.painted_frames, "cube view dropped");
    }
}
