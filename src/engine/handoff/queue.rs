use crossbeam_channel as channel;
use tracing::trace;

use super::{HandoffError, StopSignal};

/// ### English
/// Bounded blocking FIFO used for single-producer / single-consumer ownership transfer.
///
/// - `put` blocks while the queue is full (backpressure on the sender).
/// - `get` blocks while the queue is empty.
/// - Both return [`HandoffError::Stopped`] once the shared stop signal fires.
///
/// ### 中文
/// 用于单生产者/单消费者所有权转移的有界阻塞 FIFO。
///
/// - 队列满时 `put` 阻塞（对发送方施加背压）。
/// - 队列空时 `get` 阻塞。
/// - 共享停止信号触发后，两者都返回 [`HandoffError::Stopped`]。
pub struct HandoffQueue<T> {
    name: &'static str,
    capacity: usize,
    tx: channel::Sender<T>,
    rx: channel::Receiver<T>,
    stop: StopSignal,
}

impl<T> HandoffQueue<T> {
    /// ### English
    /// Creates a queue holding at most `capacity` values (at least 1).
    ///
    /// ### 中文
    /// 创建最多容纳 `capacity` 个值（至少 1）的队列。
    pub fn new(name: &'static str, capacity: usize, stop: StopSignal) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = channel::bounded(capacity);
        Self {
            name,
            capacity,
            tx,
            rx,
            stop,
        }
    }

    /// ### English
    /// Blocking push. On stop the value is dropped and `Stopped` is returned.
    ///
    /// ### 中文
    /// 阻塞 push。停止时该值被丢弃并返回 `Stopped`。
    pub fn put(&self, value: T) -> Result<(), HandoffError> {
        if self.stop.is_triggered() {
            return Err(HandoffError::Stopped);
        }

        let value = match self.tx.try_send(value) {
            Ok(()) => return Ok(()),
            Err(channel::TrySendError::Full(value)) => value,
            Err(channel::TrySendError::Disconnected(_)) => return Err(HandoffError::Stopped),
        };

        trace!(queue = self.name, capacity = self.capacity, "queue full, waiting");
        crossbeam_channel::select! {
            send(self.tx, value) -> sent => sent.map_err(|_| HandoffError::Stopped),
            recv(self.stop.observer()) -> _ => Err(HandoffError::Stopped),
        }
    }

    /// ### English
    /// Blocking pop. Values already queued are still returned after stop; an empty queue returns
    /// `Stopped` instead of waiting.
    ///
    /// ### 中文
    /// 阻塞 pop。停止后仍会返回已入队的值；空队列则返回 `Stopped` 而不再等待。
    pub fn get(&self) -> Result<T, HandoffError> {
        if let Ok(value) = self.rx.try_recv() {
            return Ok(value);
        }
        if self.stop.is_triggered() {
            return Err(HandoffError::Stopped);
        }

        trace!(queue = self.name, "queue empty, waiting");
        crossbeam_channel::select! {
            recv(self.rx) -> value => value.map_err(|_| HandoffError::Stopped),
            recv(self.stop.observer()) -> _ => Err(HandoffError::Stopped),
        }
    }

    /// ### English
    /// Non-blocking pop.
    ///
    /// ### 中文
    /// 非阻塞 pop。
    pub fn try_get(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn queue(capacity: usize) -> (Arc<HandoffQueue<u32>>, StopSignal) {
        let stop = StopSignal::new();
        (
            Arc::new(HandoffQueue::new("test", capacity, stop.clone())),
            stop,
        )
    }

    #[test]
    fn preserves_fifo_order() {
        let (queue, _stop) = queue(4);
        for i in 0..4 {
            queue.put(i).unwrap();
        }
        assert_eq!(queue.len(), 4);
        let drained: Vec<u32> = (0..4).map(|_| queue.get().unwrap()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let (queue, _stop) = queue(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn put_blocks_while_full() {
        let (queue, _stop) = queue(1);
        queue.put(1).unwrap();

        let (done_tx, done_rx) = channel::bounded(1);
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                queue.put(2).unwrap();
                done_tx.send(()).unwrap();
            })
        };

        assert!(
            done_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "put must block while the queue is full"
        );

        assert_eq!(queue.get().unwrap(), 1);
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("put should complete once space frees up");
        assert_eq!(queue.get().unwrap(), 2);
        producer.join().unwrap();
    }

    #[test]
    fn get_blocks_until_a_value_arrives() {
        let (queue, _stop) = queue(1);
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.get())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!consumer.is_finished());

        queue.put(42).unwrap();
        assert_eq!(consumer.join().unwrap(), Ok(42));
    }

    #[test]
    fn stop_unblocks_pending_put_and_get() {
        let (full, stop) = queue(1);
        full.put(0).unwrap();
        let empty = Arc::new(HandoffQueue::<u32>::new("empty", 1, stop.clone()));

        let blocked_put = {
            let full = full.clone();
            thread::spawn(move || full.put(1))
        };
        let blocked_get = {
            let empty = empty.clone();
            thread::spawn(move || empty.get())
        };

        thread::sleep(Duration::from_millis(50));
        stop.trigger();

        assert_eq!(blocked_put.join().unwrap(), Err(HandoffError::Stopped));
        assert_eq!(blocked_get.join().unwrap(), Err(HandoffError::Stopped));
    }

    #[test]
    fn queued_values_survive_stop() {
        let (queue, stop) = queue(2);
        queue.put(5).unwrap();
        stop.trigger();

        assert_eq!(queue.put(6), Err(HandoffError::Stopped));
        assert_eq!(queue.get(), Ok(5));
        assert_eq!(queue.get(), Err(HandoffError::Stopped));
    }
}
