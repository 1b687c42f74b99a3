use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::{FrameSource, SourceError};
use crate::engine::frame::Frame;
use crate::engine::handoff::Pipeline;
use crate::engine::notify::{Notifier, ViewEvent};

/// ### English
/// Background thread that pulls frames from a [`FrameSource`] and hands them to the consumer.
///
/// Each iteration reclaims a returned frame first when the in-flight bound is reached (this is
/// where a slow consumer throttles production), produces the next frame into it, submits it and
/// posts `FrameReady`. On exit the source is stopped and `ProducerFinished` is posted.
///
/// ### 中文
/// 从 [`FrameSource`] 拉取帧并交给消费者的后台线程。
///
/// 每轮循环中，若已达到在途上限，先回收一帧归还的帧（慢消费者在此处节流生产），
/// 再把下一帧生产到其中、提交并投递 `FrameReady`。退出时停止帧源并投递 `ProducerFinished`。
pub struct MediaThread {
    pipeline: Arc<Pipeline<Frame>>,
    join: Option<JoinHandle<()>>,
}

impl MediaThread {
    pub const THREAD_NAME: &'static str = "cube-share-media";

    /// ### English
    /// Spawns the media thread. `frame_interval` paces production; `None` runs unpaced.
    ///
    /// ### 中文
    /// 启动媒体线程。`frame_interval` 控制生产节奏；`None` 表示不限速。
    pub fn start<S: FrameSource>(
        source: S,
        pipeline: Arc<Pipeline<Frame>>,
        notifier: Notifier<ViewEvent>,
        frame_interval: Option<Duration>,
    ) -> Result<Self, SourceError> {
        let thread_pipeline = pipeline.clone();
        let join = thread::Builder::new()
            .name(Self::THREAD_NAME.to_owned())
            .spawn(move || media_main(source, thread_pipeline, notifier, frame_interval))
            .map_err(|err| SourceError::Other(format!("failed to spawn media thread: {err}")))?;

        Ok(Self {
            pipeline,
            join: Some(join),
        })
    }

    /// ### English
    /// Asynchronous stop request: unblocks any handoff wait; the thread exits on its own.
    ///
    /// ### 中文
    /// 异步停止请求：解除所有交接等待，线程随后自行退出。
    pub fn stop(&self) {
        self.pipeline.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn join(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        if join.join().is_err() {
            warn!("media thread panicked");
        }
    }
}

impl Drop for MediaThread {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn media_main<S: FrameSource>(
    mut source: S,
    pipeline: Arc<Pipeline<Frame>>,
    notifier: Notifier<ViewEvent>,
    frame_interval: Option<Duration>,
) {
    info!(depth = pipeline.depth(), "media thread started");
    let result = run(&mut source, &pipeline, &notifier, frame_interval);
    source.stop();

    let error = match result {
        Ok(produced) => {
            info!(produced, "media thread finished");
            None
        }
        Err(err) => {
            warn!(%err, "media thread failed");
            Some(err.to_string())
        }
    };
    notifier.post(ViewEvent::ProducerFinished { error });
}

fn run<S: FrameSource>(
    source: &mut S,
    pipeline: &Pipeline<Frame>,
    notifier: &Notifier<ViewEvent>,
    frame_interval: Option<Duration>,
) -> Result<u64, SourceError> {
    source.start()?;

    let mut seq = 0u64;
    while !pipeline.is_stopped() {
        let recycled = if pipeline.must_reclaim() {
            match pipeline.reclaim() {
                Ok(frame) => Some(frame),
                Err(_) => break,
            }
        } else {
            pipeline.try_reclaim()
        };

        let Some(frame) = source.next_frame(seq, recycled)? else {
            debug!(produced = seq, "end of stream");
            break;
        };
        if pipeline.submit(frame).is_err() {
            break;
        }
        trace!(frame_seq = seq, in_flight = pipeline.in_flight(), "frame submitted");
        notifier.post(ViewEvent::FrameReady { seq });
        seq += 1;

        let stopped_while_pacing = frame_interval
            .is_some_and(|interval| pipeline.stop_signal().wait_timeout(interval));
        if stopped_while_pacing {
            break;
        }
    }
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use dpi::PhysicalSize;
    use parking_lot::Mutex;

    use crate::engine::frame::{FrameMemory, VideoFormat, VideoMeta};
    use crate::engine::notify::{Inbox, mailbox};

    /// ### English
    /// Source producing system-memory frames; records which frame was recycled into which seq.
    ///
    /// ### 中文
    /// 生产系统内存帧的帧源；记录每个序号复用了哪一帧。
    struct CountingSource {
        limit: Option<u64>,
        recycled: Arc<Mutex<Vec<(u64, Option<u64>)>>>,
        stopped: Arc<AtomicBool>,
        fail_at: Option<u64>,
    }

    impl CountingSource {
        fn new(limit: Option<u64>) -> Self {
            Self {
                limit,
                recycled: Arc::default(),
                stopped: Arc::default(),
                fail_at: None,
            }
        }
    }

    impl FrameSource for CountingSource {
        fn next_frame(
            &mut self,
            seq: u64,
            recycled: Option<Frame>,
        ) -> Result<Option<Frame>, SourceError> {
            if self.limit.is_some_and(|limit| seq >= limit) {
                return Ok(None);
            }
            if self.fail_at == Some(seq) {
                return Err(SourceError::Other("decoder exploded".into()));
            }
            self.recycled
                .lock()
                .push((seq, recycled.as_ref().map(Frame::seq)));

            let meta = VideoMeta::new(VideoFormat::Rgba, PhysicalSize::new(2, 2));
            Ok(Some(match recycled {
                Some(frame) => frame.recycle(seq, meta),
                None => Frame::new(seq, meta, FrameMemory::System(vec![0; 16])),
            }))
        }

        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    fn finished(inbox: &Inbox<ViewEvent>) -> Option<Option<String>> {
        loop {
            match inbox.recv_timeout(Duration::from_secs(5))? {
                ViewEvent::ProducerFinished { error } => return Some(error),
                ViewEvent::FrameReady { .. } => {}
            }
        }
    }

    #[test]
    fn consumer_sees_every_frame_and_recycling_follows_the_bound() {
        const COUNT: u64 = 50;
        let pipeline = Arc::new(Pipeline::new(2));
        let (notifier, inbox) = mailbox(None);
        let source = CountingSource::new(Some(COUNT));
        let recycled = source.recycled.clone();
        let mut media = MediaThread::start(source, pipeline.clone(), notifier, None).unwrap();

        let mut held: Option<Frame> = None;
        let mut seen = Vec::new();
        let mut ready = Vec::new();
        while seen.len() < COUNT as usize {
            match inbox.recv_timeout(Duration::from_secs(5)).expect("event") {
                ViewEvent::FrameReady { seq } => {
                    ready.push(seq);
                    let next = pipeline.exchange(held.take()).unwrap();
                    seen.push(next.seq());
                    held = Some(next);
                }
                ViewEvent::ProducerFinished { error } => panic!("finished early: {error:?}"),
            }
        }

        assert_eq!(finished(&inbox), Some(None));
        media.join();

        let expected: Vec<u64> = (0..COUNT).collect();
        assert_eq!(seen, expected);
        assert_eq!(ready, expected);

        // frame A, recycled when B arrived, is reused for C
        for (seq, reused) in recycled.lock().iter().copied() {
            if seq >= 2 {
                assert_eq!(reused, Some(seq - 2), "frame {seq}");
            } else {
                assert_eq!(reused, None);
            }
        }
    }

    #[test]
    fn producer_blocks_at_the_in_flight_bound() {
        let pipeline = Arc::new(Pipeline::new(3));
        let (notifier, _inbox) = mailbox(None);
        let media =
            MediaThread::start(CountingSource::new(None), pipeline.clone(), notifier, None)
                .unwrap();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(pipeline.in_flight(), 3);
        assert_eq!(pipeline.queue_input_buf.len(), 3);
        assert!(!media.is_finished());
    }

    #[test]
    fn stop_unblocks_a_waiting_producer_and_reports_completion() {
        let pipeline = Arc::new(Pipeline::new(2));
        let (notifier, inbox) = mailbox(None);
        let source = CountingSource::new(None);
        let stopped = source.stopped.clone();
        let mut media = MediaThread::start(source, pipeline, notifier, None).unwrap();

        thread::sleep(Duration::from_millis(50));
        media.stop();

        assert_eq!(finished(&inbox), Some(None));
        media.join();
        assert!(media.is_finished());
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn paced_producer_stops_promptly() {
        let pipeline = Arc::new(Pipeline::new(2));
        let (notifier, inbox) = mailbox(None);
        let mut media = MediaThread::start(
            CountingSource::new(None),
            pipeline,
            notifier,
            Some(Duration::from_secs(60)),
        )
        .unwrap();

        assert_eq!(
            inbox.recv_timeout(Duration::from_secs(5)),
            Some(ViewEvent::FrameReady { seq: 0 })
        );
        media.stop();
        assert_eq!(finished(&inbox), Some(None));
        media.join();
    }

    #[test]
    fn source_error_is_reported_in_the_completion_event() {
        let pipeline = Arc::new(Pipeline::new(2));
        let (notifier, inbox) = mailbox(None);
        let mut source = CountingSource::new(None);
        source.fail_at = Some(0);
        let stopped = source.stopped.clone();
        let mut media = MediaThread::start(source, pipeline, notifier, None).unwrap();

        let error = finished(&inbox).expect("completion event");
        assert_eq!(error.as_deref(), Some("decoder exploded"));
        media.join();
        assert!(stopped.load(Ordering::SeqCst));
    }
}
