//! ### English
//! Frame data model shared between the media thread (producer) and the view thread (consumer).
//! A `Frame` is never shared: it moves by value through the handoff queues, so at any time it is
//! held by exactly one side or sits in exactly one queue.
//!
//! ### 中文
//! 媒体线程（生产者）与 view 线程（消费者）之间共享的帧数据模型。
//! `Frame` 从不被共享：它按值在交接队列中移动，因此任意时刻只被一方持有或只位于一个队列中。

use std::fmt;
use std::sync::Arc;

use dpi::PhysicalSize;

use crate::engine::rendering::FlushContext;

/// ### English
/// Pixel layout of a decoded frame (metadata only; the consumer samples an RGBA texture).
///
/// ### 中文
/// 解码帧的像素布局（仅元数据；消费者采样的是 RGBA 纹理）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoFormat {
    Rgba,
    Rgbx,
    Bgra,
    Nv12,
    I420,
}

/// ### English
/// Video metadata attached to every frame.
///
/// ### 中文
/// 每帧附带的视频元数据。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoMeta {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
}

impl VideoMeta {
    pub fn new(format: VideoFormat, size: PhysicalSize<u32>) -> Self {
        Self {
            format,
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.width, self.height)
    }
}

/// ### English
/// Tag describing where a frame's pixels live.
///
/// ### 中文
/// 描述帧像素存放位置的标记。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    /// ### English
    /// GPU texture owned by the producer's GL context (the only kind the renderer accepts).
    ///
    /// ### 中文
    /// 由生产者 GL 上下文持有的 GPU 纹理（渲染器唯一接受的类型）。
    Gl,
    /// ### English
    /// Plain system memory.
    ///
    /// ### 中文
    /// 普通系统内存。
    System,
}

/// ### English
/// GPU memory attached to a frame: a texture name plus the context that wrote it.
///
/// The texture lives in the producer context's share group. Before sampling it from another
/// context the consumer must call [`GlMemory::flush_owner`]. The texture is deleted on its owning
/// context when the `GlMemory` is dropped, on whichever side holds it last.
///
/// ### 中文
/// 附加在帧上的 GPU 内存：纹理名以及写入它的上下文。
///
/// 纹理位于生产者上下文的共享组中。消费者在另一个上下文中采样之前必须调用 [`GlMemory::flush_owner`]。
/// `GlMemory` 被 drop 时（无论最后由哪一方持有），纹理会在其所属上下文上删除。
pub struct GlMemory {
    texture_id: u32,
    context: Arc<dyn FlushContext>,
}

impl GlMemory {
    pub fn new(texture_id: u32, context: Arc<dyn FlushContext>) -> Self {
        Self {
            texture_id,
            context,
        }
    }

    /// ### English
    /// Texture name in the shared producer/consumer object namespace.
    ///
    /// ### 中文
    /// 生产者/消费者共享对象命名空间中的纹理名。
    pub fn texture_id(&self) -> u32 {
        self.texture_id
    }

    /// ### English
    /// Forces completion of pending GL work on the context that owns this texture.
    ///
    /// ### 中文
    /// 强制持有该纹理的上下文完成其挂起的 GL 工作。
    pub fn flush_owner(&self) {
        self.context.flush();
    }

    pub fn context(&self) -> &Arc<dyn FlushContext> {
        &self.context
    }
}

impl Drop for GlMemory {
    fn drop(&mut self) {
        self.context.release_texture(self.texture_id);
    }
}

impl fmt::Debug for GlMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlMemory")
            .field("texture_id", &self.texture_id)
            .finish_non_exhaustive()
    }
}

/// ### English
/// Memory object attached to a frame.
///
/// ### 中文
/// 附加到帧上的内存对象。
#[derive(Debug)]
pub enum FrameMemory {
    Gl(GlMemory),
    System(Vec<u8>),
}

impl FrameMemory {
    pub fn kind(&self) -> MemoryKind {
        match self {
            Self::Gl(_) => MemoryKind::Gl,
            Self::System(_) => MemoryKind::System,
        }
    }
}

/// ### English
/// One decoded video image, exchanged between threads by ownership transfer.
///
/// `Frame` is intentionally not `Clone`.
///
/// ### 中文
/// 一帧解码后的视频图像，通过所有权转移在线程之间交换。
///
/// `Frame` 刻意不实现 `Clone`。
#[derive(Debug)]
pub struct Frame {
    seq: u64,
    meta: VideoMeta,
    memory: FrameMemory,
}

impl Frame {
    pub fn new(seq: u64, meta: VideoMeta, memory: FrameMemory) -> Self {
        Self { seq, meta, memory }
    }

    /// ### English
    /// Production sequence number (monotonic per producer).
    ///
    /// ### 中文
    /// 生产序号（每个生产者内单调递增）。
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    pub fn memory(&self) -> &FrameMemory {
        &self.memory
    }

    pub fn memory_kind(&self) -> MemoryKind {
        self.memory.kind()
    }

    /// ### English
    /// Returns the attached GPU memory, or `None` if the frame carries another memory kind.
    ///
    /// ### 中文
    /// 返回附加的 GPU 内存；若帧携带其它内存类型则返回 `None`。
    pub fn gl_memory(&self) -> Option<&GlMemory> {
        match &self.memory {
            FrameMemory::Gl(memory) => Some(memory),
            FrameMemory::System(_) => None,
        }
    }

    /// ### English
    /// Reuses this frame's buffer for a new image (producer side, after reclaiming it).
    ///
    /// ### 中文
    /// 复用该帧的缓冲区承载新图像（生产者侧，回收之后调用）。
    pub fn recycle(mut self, seq: u64, meta: VideoMeta) -> Self {
        self.seq = seq;
        self.meta = meta;
        self
    }

    pub fn into_memory(self) -> FrameMemory {
        self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingContext {
        flushes: AtomicUsize,
        released: Mutex<Vec<u32>>,
    }

    impl FlushContext for CountingContext {
        fn flush(&self) {
            self.flushes.fetch_add(1, Ordering::Relaxed);
        }

        fn release_texture(&self, texture_id: u32) {
            self.released.lock().push(texture_id);
        }
    }

    fn meta() -> VideoMeta {
        VideoMeta::new(VideoFormat::Rgba, PhysicalSize::new(4, 2))
    }

    #[test]
    fn gl_frame_exposes_texture_and_flushes_owner() {
        let ctx = Arc::new(CountingContext::default());
        let frame = Frame::new(1, meta(), FrameMemory::Gl(GlMemory::new(7, ctx.clone())));

        assert_eq!(frame.memory_kind(), MemoryKind::Gl);
        let memory = frame.gl_memory().expect("gl memory");
        assert_eq!(memory.texture_id(), 7);

        memory.flush_owner();
        assert_eq!(ctx.flushes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn system_frame_has_no_gl_memory() {
        let frame = Frame::new(1, meta(), FrameMemory::System(vec![0; 32]));
        assert_eq!(frame.memory_kind(), MemoryKind::System);
        assert!(frame.gl_memory().is_none());
    }

    #[test]
    fn recycle_keeps_memory_and_replaces_metadata() {
        let ctx = Arc::new(CountingContext::default());
        let frame = Frame::new(1, meta(), FrameMemory::Gl(GlMemory::new(9, ctx)));

        let bigger = VideoMeta::new(VideoFormat::Rgba, PhysicalSize::new(8, 8));
        let frame = frame.recycle(5, bigger);

        assert_eq!(frame.seq(), 5);
        assert_eq!(frame.meta().size(), PhysicalSize::new(8, 8));
        assert_eq!(frame.gl_memory().map(GlMemory::texture_id), Some(9));
    }

    #[test]
    fn texture_is_released_once_when_the_last_holder_drops_it() {
        let ctx = Arc::new(CountingContext::default());
        let frame = Frame::new(1, meta(), FrameMemory::Gl(GlMemory::new(11, ctx.clone())));

        let frame = frame.recycle(2, meta());
        assert!(ctx.released.lock().is_empty());

        drop(frame);
        assert_eq!(*ctx.released.lock(), vec![11]);
    }
}
