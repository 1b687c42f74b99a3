//! ### English
//! Cross-thread notifications from the media thread to the view (owner) thread.
//!
//! Events are posted into the owner's mailbox and only ever handled by the owner when it drains
//! its [`Inbox`]; the posting thread never runs a handler. An optional [`WakeHook`] lets a host
//! toolkit schedule that drain on its own run loop.
//!
//! ### 中文
//! 从媒体线程发往 view（所有者）线程的跨线程通知。
//!
//! 事件被投递到所有者的邮箱中，只有所有者在 drain 其 [`Inbox`] 时才会处理；投递线程从不执行处理逻辑。
//! 可选的 [`WakeHook`] 让宿主 UI 工具包在自己的 run loop 上安排这次 drain。

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as channel;

/// ### English
/// Events delivered to the view thread.
///
/// ### 中文
/// 投递给 view 线程的事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// ### English
    /// A frame was enqueued into `queue_input_buf`.
    ///
    /// ### 中文
    /// 已有一帧进入 `queue_input_buf`。
    FrameReady { seq: u64 },
    /// ### English
    /// The media thread exited (end of stream, stop request or error).
    ///
    /// ### 中文
    /// 媒体线程已退出（流结束、停止请求或错误）。
    ProducerFinished { error: Option<String> },
}

/// ### English
/// Host callback asking the owner thread's run loop to drain the inbox soon.
/// Called from the posting thread; it must only schedule work, never do it.
///
/// ### 中文
/// 宿主回调：请求所有者线程的 run loop 尽快 drain 收件箱。
/// 在投递线程上调用；只能安排工作，不能直接执行。
pub trait WakeHook: Send + Sync {
    fn wake(&self);
}

impl<F> WakeHook for F
where
    F: Fn() + Send + Sync,
{
    fn wake(&self) {
        self()
    }
}

/// ### English
/// Creates a connected notifier/inbox pair.
///
/// ### 中文
/// 创建一对相连的 notifier/inbox。
pub fn mailbox<E>(wake_hook: Option<Arc<dyn WakeHook>>) -> (Notifier<E>, Inbox<E>) {
    let (tx, rx) = channel::unbounded();
    (Notifier { tx, wake_hook }, Inbox { rx: Some(rx) })
}

/// ### English
/// Sending half, cloneable and usable from any thread.
///
/// ### 中文
/// 发送端：可克隆，可在任意线程使用。
pub struct Notifier<E> {
    tx: channel::Sender<E>,
    wake_hook: Option<Arc<dyn WakeHook>>,
}

impl<E> Clone for Notifier<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wake_hook: self.wake_hook.clone(),
        }
    }
}

impl<E> Notifier<E> {
    /// ### English
    /// Posts one event. Returns `false` if the inbox was closed or dropped.
    ///
    /// ### 中文
    /// 投递一个事件；若收件箱已关闭或被丢弃则返回 `false`。
    pub fn post(&self, event: E) -> bool {
        if self.tx.send(event).is_err() {
            return false;
        }
        if let Some(hook) = &self.wake_hook {
            hook.wake();
        }
        true
    }
}

/// ### English
/// Receiving half, owned by the view thread.
///
/// ### 中文
/// 接收端，由 view 线程持有。
pub struct Inbox<E> {
    rx: Option<channel::Receiver<E>>,
}

impl<E> Inbox<E> {
    pub fn try_recv(&self) -> Option<E> {
        self.rx.as_ref()?.try_recv().ok()
    }

    /// ### English
    /// Waits up to `timeout` for one event (for owners without their own run loop).
    ///
    /// ### 中文
    /// 最多等待 `timeout` 以获取一个事件（供没有自有 run loop 的所有者使用）。
    pub fn recv_timeout(&self, timeout: Duration) -> Option<E> {
        self.rx.as_ref()?.recv_timeout(timeout).ok()
    }

    /// ### English
    /// Takes every event currently queued.
    ///
    /// ### 中文
    /// 取出当前排队的全部事件。
    pub fn drain(&self) -> Vec<E> {
        match &self.rx {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }

    /// ### English
    /// Closes the inbox; later posts return `false` and queued events are dropped.
    ///
    /// ### 中文
    /// 关闭收件箱；之后的投递返回 `false`，已排队事件被丢弃。
    pub fn close(&mut self) {
        self.rx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn events_are_handled_on_the_owner_thread() {
        let (notifier, inbox) = mailbox::<(u64, thread::ThreadId)>(None);
        let owner = thread::current().id();

        let sender = thread::spawn(move || {
            for seq in 0..3 {
                assert!(notifier.post((seq, thread::current().id())));
            }
            thread::current().id()
        });
        let sender_id = sender.join().unwrap();

        let mut handled = Vec::new();
        for (seq, posted_from) in inbox.drain() {
            assert_eq!(posted_from, sender_id);
            handled.push((seq, thread::current().id()));
        }

        assert_eq!(handled.len(), 3);
        assert!(handled.iter().all(|(_, handled_on)| *handled_on == owner));
        assert_eq!(
            handled.iter().map(|(seq, _)| *seq).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn wake_hook_fires_once_per_post() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let hook: Arc<dyn WakeHook> = {
            let wakes = wakes.clone();
            Arc::new(move || {
                wakes.fetch_add(1, Ordering::Relaxed);
            })
        };
        let (notifier, inbox) = mailbox(Some(hook));

        notifier.post(ViewEvent::FrameReady { seq: 1 });
        notifier.post(ViewEvent::FrameReady { seq: 2 });

        assert_eq!(wakes.load(Ordering::Relaxed), 2);
        assert_eq!(inbox.try_recv(), Some(ViewEvent::FrameReady { seq: 1 }));
    }

    #[test]
    fn posting_after_close_is_rejected() {
        let (notifier, mut inbox) = mailbox(None);
        inbox.close();
        assert!(inbox.is_closed());
        assert!(!notifier.post(ViewEvent::ProducerFinished { error: None }));
        assert!(inbox.try_recv().is_none());
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn recv_timeout_returns_posted_event() {
        let (notifier, inbox) = mailbox(None);
        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.post(ViewEvent::FrameReady { seq: 9 })
        });
        assert_eq!(
            inbox.recv_timeout(Duration::from_secs(5)),
            Some(ViewEvent::FrameReady { seq: 9 })
        );
        assert!(sender.join().unwrap());
    }
}
