//! ### English
//! One-shot stop signal observed by every blocking handoff wait.
//!
//! The signal is a zero-capacity channel whose only sender is dropped on `trigger`; a
//! disconnected receiver is always ready, so any `select!` that includes it wakes up.
//!
//! ### 中文
//! 被所有阻塞交接等待观察的一次性停止信号。
//!
//! 该信号是一个零容量 channel，`trigger` 时丢弃其唯一发送端；断开的接收端始终就绪，
//! 因此任何包含它的 `select!` 都会被唤醒。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;

struct StopInner {
    sender: Mutex<Option<channel::Sender<()>>>,
    observer: channel::Receiver<()>,
    triggered: AtomicBool,
}

/// ### English
/// Cloneable, idempotent stop signal.
///
/// ### 中文
/// 可克隆、幂等的停止信号。
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, observer) = channel::bounded(0);
        Self {
            inner: Arc::new(StopInner {
                sender: Mutex::new(Some(sender)),
                observer,
                triggered: AtomicBool::new(false),
            }),
        }
    }

    /// ### English
    /// Fires the signal. Returns `true` only for the call that actually fired it.
    ///
    /// ### 中文
    /// 触发信号。只有真正触发的那次调用返回 `true`。
    pub fn trigger(&self) -> bool {
        let sender = self.inner.sender.lock().take();
        self.inner.triggered.store(true, Ordering::Release);
        let fired = sender.is_some();
        drop(sender);
        fired
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// ### English
    /// Sleeps for up to `timeout`, returning early with `true` if the signal fires.
    ///
    /// ### 中文
    /// 最多睡眠 `timeout`；若信号触发则提前返回 `true`。
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.inner.observer.recv_timeout(timeout) {
            Err(channel::RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(channel::RecvTimeoutError::Disconnected) => true,
        }
    }

    pub(super) fn observer(&self) -> &channel::Receiver<()> {
        &self.inner.observer
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::Instant;

    #[test]
    fn trigger_is_idempotent() {
        let stop = StopSignal::new();
        assert!(!stop.is_triggered());
        assert!(stop.trigger());
        assert!(!stop.trigger());
        assert!(stop.is_triggered());
        assert!(stop.clone().is_triggered());
    }

    #[test]
    fn wait_timeout_times_out_while_untriggered() {
        let stop = StopSignal::new();
        assert!(!stop.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_timeout_wakes_on_trigger() {
        let stop = StopSignal::new();
        let remote = stop.clone();
        let waiter = thread::spawn(move || {
            let started = Instant::now();
            let fired = remote.wait_timeout(Duration::from_secs(10));
            (fired, started.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        stop.trigger();

        let (fired, elapsed) = waiter.join().unwrap();
        assert!(fired);
        assert!(elapsed < Duration::from_secs(5));
    }
}
