//! ### English
//! Dedicated GL context thread and owning-context flush.
//!
//! A GL context is current on exactly one thread. The producer context lives on its own
//! `GlContextThread`; every GL call against it (texture uploads, flushes requested by the
//! consumer) is marshalled to that thread with [`GlContextThread::thread_add`].
//!
//! ### 中文
//! 专用 GL 上下文线程与“所属上下文 flush”。
//!
//! 一个 GL 上下文只在一个线程上 current。生产者上下文运行在自己的 `GlContextThread` 上；
//! 针对它的所有 GL 调用（纹理上传、消费者请求的 flush）都通过 [`GlContextThread::thread_add`]
//! 转发到该线程执行。

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::GlError;

/// ### English
/// Upper bound for the context bootstrap on the new thread.
///
/// ### 中文
/// 新线程上下文初始化的最长等待时间。
pub const CONTEXT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// ### English
/// GL context bootstrap and GL thread failures.
///
/// ### 中文
/// GL 上下文初始化与 GL 线程相关的错误。
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("GLFW function table is missing `{0}`")]
    MissingSymbol(&'static str),
    #[error("{0} handle is NULL")]
    NullHandle(&'static str),
    #[error("failed to create the shared offscreen window")]
    WindowCreation,
    #[error("host refused to make the shared context current")]
    MakeCurrent,
    #[error("failed to spawn GL thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("GL context initialization timed out after {0:?}")]
    InitTimeout(Duration),
    #[error("GL thread is not running")]
    ThreadGone,
    #[error("GL thread task panicked")]
    TaskPanicked,
    #[error("GL thread task cannot be queued from the GL thread itself")]
    Reentrant,
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// ### English
/// A GL context that frames can reference as their owner.
///
/// `flush` must complete (issue) all pending GPU work of the owning context before returning, so
/// that another context in the same share group may sample its textures.
///
/// `release_texture` is called from whichever thread drops the frame and must not block on the
/// owning context.
///
/// ### 中文
/// 可作为帧“所属上下文”被引用的 GL 上下文。
///
/// `flush` 必须在返回前提交所属上下文的全部挂起 GPU 工作，使同一 share group 中的其它上下文
/// 可以采样其纹理。
///
/// `release_texture` 在 drop 帧的线程上调用，不得阻塞等待所属上下文。
pub trait FlushContext: Send + Sync {
    fn flush(&self);

    fn release_texture(&self, texture_id: u32);
}

/// ### English
/// Context object living on a GL thread that knows how to flush itself and delete its textures.
///
/// ### 中文
/// 运行在 GL 线程上、能自行 flush 并删除自身纹理的上下文对象。
pub trait GlFlush {
    fn flush_gl(&self);

    fn delete_texture_gl(&self, texture_id: u32);
}

type Task<C> = Box<dyn FnOnce(&C) + Send>;

enum Command<C> {
    Run(Task<C>),
    Shutdown,
}

/// ### English
/// Thread owning a current GL context of type `C`.
///
/// `C` is created on the thread by the bootstrap closure and never leaves it, so it does not need
/// to be `Send`.
///
/// ### 中文
/// 持有类型为 `C` 的 current GL 上下文的线程。
///
/// `C` 由初始化闭包在该线程上创建且从不离开该线程，因此不需要 `Send`。
pub struct GlContextThread<C: 'static> {
    name: String,
    thread_id: ThreadId,
    commands: channel::Sender<Command<C>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl<C: 'static> GlContextThread<C> {
    /// ### English
    /// Spawns the thread, runs `bootstrap` on it and waits for the result.
    ///
    /// ### 中文
    /// 启动线程，在其上运行 `bootstrap` 并等待结果。
    pub fn spawn<F>(name: &str, bootstrap: F) -> Result<Self, ContextError>
    where
        F: FnOnce() -> Result<C, ContextError> + Send + 'static,
    {
        Self::spawn_with_timeout(name, CONTEXT_INIT_TIMEOUT, bootstrap)
    }

    pub fn spawn_with_timeout<F>(
        name: &str,
        init_timeout: Duration,
        bootstrap: F,
    ) -> Result<Self, ContextError>
    where
        F: FnOnce() -> Result<C, ContextError> + Send + 'static,
    {
        let (commands, command_rx) = channel::unbounded::<Command<C>>();
        let (init_tx, init_rx) = channel::bounded::<Result<(), ContextError>>(1);

        let join = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let context = match bootstrap() {
                    Ok(context) => {
                        let _ = init_tx.send(Ok(()));
                        context
                    }
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(command) = command_rx.recv() {
                    match command {
                        Command::Run(task) => task(&context),
                        Command::Shutdown => break,
                    }
                }
                drop(context);
            })
            .map_err(ContextError::Spawn)?;

        match init_rx.recv_timeout(init_timeout) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = join.join();
                return Err(err);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                warn!(thread = name, "GL context bootstrap timed out");
                return Err(ContextError::InitTimeout(init_timeout));
            }
            Err(channel::RecvTimeoutError::Disconnected) => {
                let _ = join.join();
                return Err(ContextError::ThreadGone);
            }
        }

        info!(thread = name, "GL context thread ready");
        Ok(Self {
            name: name.to_owned(),
            thread_id: join.thread().id(),
            commands,
            join: Mutex::new(Some(join)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_gl_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// ### English
    /// Runs `f` against the context on the GL thread and blocks for its result.
    ///
    /// ### 中文
    /// 在 GL 线程上以上下文为参数运行 `f`，并阻塞等待结果。
    pub fn thread_add<R, F>(&self, f: F) -> Result<R, ContextError>
    where
        F: FnOnce(&C) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_gl_thread() {
            return Err(ContextError::Reentrant);
        }

        let (reply_tx, reply_rx) = channel::bounded(1);
        let task: Task<C> = Box::new(move |context| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(context)));
            let _ = reply_tx.send(result);
        });
        self.commands
            .send(Command::Run(task))
            .map_err(|_| ContextError::ThreadGone)?;

        match reply_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ContextError::TaskPanicked),
            Err(_) => Err(ContextError::ThreadGone),
        }
    }

    /// ### English
    /// Queues `f` on the GL thread without waiting for it. Allowed from the GL thread itself.
    ///
    /// ### 中文
    /// 把 `f` 排入 GL 线程队列而不等待其完成；允许在 GL 线程自身上调用。
    pub fn post<F>(&self, f: F) -> Result<(), ContextError>
    where
        F: FnOnce(&C) + Send + 'static,
    {
        let name = self.name.clone();
        let task: Task<C> = Box::new(move |context| {
            if panic::catch_unwind(AssertUnwindSafe(|| f(context))).is_err() {
                warn!(thread = %name, "posted GL task panicked");
            }
        });
        self.commands
            .send(Command::Run(task))
            .map_err(|_| ContextError::ThreadGone)
    }

    /// ### English
    /// Stops the thread and drops the context on it (idempotent).
    ///
    /// ### 中文
    /// 停止线程并在其上释放上下文（幂等）。
    pub fn shutdown(&self) {
        let Some(join) = self.join.lock().take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        if self.is_gl_thread() {
            return;
        }
        if join.join().is_err() {
            warn!(thread = %self.name, "GL context thread panicked");
        }
        debug!(thread = %self.name, "GL context thread joined");
    }
}

impl<C: GlFlush + 'static> FlushContext for GlContextThread<C> {
    fn flush(&self) {
        if let Err(err) = self.thread_add(|context| context.flush_gl()) {
            warn!(thread = %self.name, %err, "failed to flush producer context");
        }
    }

    fn release_texture(&self, texture_id: u32) {
        if let Err(err) = self.post(move |context| context.delete_texture_gl(texture_id)) {
            warn!(thread = %self.name, texture_id, %err, "failed to release producer texture");
        }
    }
}

impl<C: 'static> Drop for GlContextThread<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeContext {
        owner: ThreadId,
        flushes: Arc<AtomicUsize>,
        calls: Cell<u32>,
        deleted: RefCell<Vec<u32>>,
    }

    impl GlFlush for FakeContext {
        fn flush_gl(&self) {
            assert_eq!(thread::current().id(), self.owner);
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }

        fn delete_texture_gl(&self, texture_id: u32) {
            assert_eq!(thread::current().id(), self.owner);
            self.deleted.borrow_mut().push(texture_id);
        }
    }

    fn spawn_fake(flushes: Arc<AtomicUsize>) -> GlContextThread<FakeContext> {
        GlContextThread::spawn("fake-gl", move || {
            Ok(FakeContext {
                owner: thread::current().id(),
                flushes,
                calls: Cell::new(0),
                deleted: RefCell::default(),
            })
        })
        .unwrap()
    }

    #[test]
    fn tasks_run_on_the_context_thread_in_order() {
        let gl = spawn_fake(Arc::default());
        let caller = thread::current().id();

        for expected in 1..=3 {
            let (count, ran_on) = gl
                .thread_add(|ctx| {
                    ctx.calls.set(ctx.calls.get() + 1);
                    (ctx.calls.get(), thread::current().id())
                })
                .unwrap();
            assert_eq!(count, expected);
            assert_ne!(ran_on, caller);
        }
    }

    #[test]
    fn flush_runs_on_the_owner_thread() {
        let flushes = Arc::new(AtomicUsize::new(0));
        let gl: Arc<dyn FlushContext> = Arc::new(spawn_fake(flushes.clone()));
        gl.flush();
        gl.flush();
        assert_eq!(flushes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bootstrap_error_is_returned_to_the_caller() {
        let result = GlContextThread::<FakeContext>::spawn("broken-gl", || {
            Err(ContextError::WindowCreation)
        });
        assert!(matches!(result, Err(ContextError::WindowCreation)));
    }

    #[test]
    fn panicking_task_is_reported_and_thread_survives() {
        let gl = spawn_fake(Arc::default());
        let result: Result<(), _> = gl.thread_add(|_| panic!("boom"));
        assert!(matches!(result, Err(ContextError::TaskPanicked)));
        assert_eq!(gl.thread_add(|_| 7).unwrap(), 7);
    }

    #[test]
    fn tasks_after_shutdown_fail() {
        let gl = spawn_fake(Arc::default());
        gl.shutdown();
        gl.shutdown();
        assert!(matches!(gl.thread_add(|_| ()), Err(ContextError::ThreadGone)));
    }

    #[test]
    fn released_textures_are_deleted_on_the_owner_thread_in_order() {
        let gl = Arc::new(spawn_fake(Arc::default()));
        let owner: Arc<dyn FlushContext> = gl.clone();
        owner.release_texture(4);
        owner.release_texture(9);

        let deleted = gl.thread_add(|ctx| ctx.deleted.borrow().clone()).unwrap();
        assert_eq!(deleted, vec![4, 9]);
    }

    #[test]
    fn post_after_shutdown_fails() {
        let gl = spawn_fake(Arc::default());
        gl.shutdown();
        assert!(matches!(gl.post(|_| ()), Err(ContextError::ThreadGone)));
    }
}
