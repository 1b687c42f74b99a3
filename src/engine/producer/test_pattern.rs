//! ### English
//! Animated test-pattern source rendering into textures of a shared producer context.
//!
//! ### 中文
//! 动画测试图源：向共享生产者上下文中的纹理写入图像。

use std::sync::Arc;

use dpi::PhysicalSize;
use gleam::gl;
use tracing::{debug, info};

use super::{FrameSource, SourceError};
use crate::engine::config::clamp_frame_size;
use crate::engine::frame::{Frame, FrameMemory, GlMemory, VideoFormat, VideoMeta};
use crate::engine::rendering::{
    ContextBootstrap, ContextError, FlushContext, GlContextThread, GlError, SharedGlContext,
};

const GL_THREAD_NAME: &str = "cube-share-producer-gl";

/// ### English
/// Scrolling color bars with a moving marker, `width * height * 4` RGBA bytes.
///
/// ### 中文
/// 滚动彩条加移动标记，共 `width * height * 4` 字节 RGBA。
pub fn pattern_pixels(size: PhysicalSize<u32>, seq: u64) -> Vec<u8> {
    const BARS: [[u8; 3]; 7] = [
        [192, 192, 192],
        [192, 192, 0],
        [0, 192, 192],
        [0, 192, 0],
        [192, 0, 192],
        [192, 0, 0],
        [0, 0, 192],
    ];

    let (width, height) = (size.width as usize, size.height as usize);
    let shift = (seq as usize * 2) % width.max(1);
    let marker_x = (seq as usize * 4) % width.max(1);
    let marker_half = (width / 32).max(1);

    let mut pixels = Vec::with_capacity(width * height * 4);
    for _y in 0..height {
        for x in 0..width {
            let rgb = if x.abs_diff(marker_x) < marker_half {
                [255, 255, 255]
            } else {
                BARS[((x + shift) % width) * BARS.len() / width]
            };
            pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
    }
    pixels
}

/// ### English
/// Producer-side GL target the pattern is uploaded into.
///
/// Textures it hands out are owned by frames: each one is released through
/// [`FlushContext::release_texture`] when its frame is dropped.
///
/// ### 中文
/// 图案上传到的生产者侧 GL 目标。
///
/// 其分配的纹理归帧所有：帧被 drop 时通过 [`FlushContext::release_texture`] 释放。
pub trait UploadTarget: FlushContext + Sized + 'static {
    type Bootstrap: Send + 'static;

    /// ### English
    /// Opens the target on the media thread.
    ///
    /// ### 中文
    /// 在媒体线程上打开目标。
    fn open(bootstrap: &Self::Bootstrap) -> Result<Self, SourceError>;

    /// ### English
    /// Writes `pixels` into `existing`, or into a newly allocated texture when `None`, and returns
    /// the texture name.
    ///
    /// ### 中文
    /// 把 `pixels` 写入 `existing`（为 `None` 时写入新分配的纹理），返回纹理名。
    fn upload(
        &self,
        existing: Option<u32>,
        size: PhysicalSize<u32>,
        pixels: Vec<u8>,
    ) -> Result<u32, SourceError>;
}

impl UploadTarget for GlContextThread<SharedGlContext> {
    type Bootstrap = ContextBootstrap;

    fn open(bootstrap: &ContextBootstrap) -> Result<Self, SourceError> {
        let bootstrap = *bootstrap;
        Ok(GlContextThread::spawn(GL_THREAD_NAME, move || {
            bootstrap.create()
        })?)
    }

    fn upload(
        &self,
        existing: Option<u32>,
        size: PhysicalSize<u32>,
        pixels: Vec<u8>,
    ) -> Result<u32, SourceError> {
        Ok(self.thread_add(move |ctx| upload(ctx, existing, size, &pixels))??)
    }
}

/// ### English
/// Frame source generating an animated pattern into GL textures of its own shared context.
///
/// The target is opened in [`FrameSource::start`]; frames carry it as their owning context so the
/// consumer can flush it before sampling. A recycled frame with matching metadata keeps its
/// texture, so once the handoff depth is reached no further textures are allocated.
///
/// ### 中文
/// 在自有共享上下文的 GL 纹理中生成动画图案的帧源。
///
/// 目标在 [`FrameSource::start`] 中打开；帧以其作为所属上下文，使消费者能够在采样前对其 flush。
/// 元数据一致的回收帧沿用原纹理，因此达到交接深度后不再分配新纹理。
pub struct TestPatternSource<T: UploadTarget = GlContextThread<SharedGlContext>> {
    bootstrap: T::Bootstrap,
    size: PhysicalSize<u32>,
    target: Option<Arc<T>>,
    allocated: usize,
}

impl TestPatternSource {
    pub fn new(bootstrap: ContextBootstrap, size: PhysicalSize<u32>) -> Self {
        Self::with_target(bootstrap, size)
    }
}

impl<T: UploadTarget> TestPatternSource<T> {
    pub fn with_target(bootstrap: T::Bootstrap, size: PhysicalSize<u32>) -> Self {
        Self {
            bootstrap,
            size: clamp_frame_size(size),
            target: None,
            allocated: 0,
        }
    }

    /// ### English
    /// Number of textures allocated so far.
    ///
    /// ### 中文
    /// 迄今分配的纹理数量。
    pub fn allocated_textures(&self) -> usize {
        self.allocated
    }

    fn meta(&self) -> VideoMeta {
        VideoMeta::new(VideoFormat::Rgba, self.size)
    }
}

impl<T: UploadTarget> FrameSource for TestPatternSource<T> {
    fn start(&mut self) -> Result<(), SourceError> {
        self.target = Some(Arc::new(T::open(&self.bootstrap)?));
        info!(
            width = self.size.width,
            height = self.size.height,
            "test pattern source started"
        );
        Ok(())
    }

    fn next_frame(
        &mut self,
        seq: u64,
        recycled: Option<Frame>,
    ) -> Result<Option<Frame>, SourceError> {
        let target = self.target.clone().ok_or(SourceError::NotStarted)?;
        let meta = self.meta();
        let pixels = pattern_pixels(self.size, seq);

        // a mismatched frame is dropped here, which releases its texture
        let reusable = recycled.filter(|frame| frame.gl_memory().is_some() && frame.meta() == &meta);
        let existing = reusable
            .as_ref()
            .and_then(Frame::gl_memory)
            .map(GlMemory::texture_id);

        let texture_id = target.upload(existing, self.size, pixels)?;

        let frame = match reusable {
            Some(frame) => frame.recycle(seq, meta),
            None => {
                debug!(texture_id, frame_seq = seq, "allocated producer texture");
                self.allocated += 1;
                let owner: Arc<dyn FlushContext> = target;
                Frame::new(seq, meta, FrameMemory::Gl(GlMemory::new(texture_id, owner)))
            }
        };
        Ok(Some(frame))
    }

    /// ### English
    /// Drops the source's handle on the target. Textures still attached to frames (queued or held
    /// by the consumer) stay valid; the producer context lives until the last of them is dropped.
    ///
    /// ### 中文
    /// 释放帧源对目标的引用。仍附着在帧上的纹理（排队中或被消费者持有）保持有效；
    /// 生产者上下文会一直存活到最后一帧被 drop。
    fn stop(&mut self) {
        if self.target.take().is_some() {
            debug!(allocated = self.allocated, "test pattern source stopped");
        }
    }
}

/// ### English
/// Runs on the GL thread: uploads `pixels` into `existing` or a freshly allocated texture.
///
/// ### 中文
/// 在 GL 线程上运行：把 `pixels` 上传到 `existing` 或新分配的纹理中。
fn upload(
    ctx: &SharedGlContext,
    existing: Option<u32>,
    size: PhysicalSize<u32>,
    pixels: &[u8],
) -> Result<u32, ContextError> {
    let gl = ctx.gl();
    let (width, height) = (size.width as gl::GLsizei, size.height as gl::GLsizei);

    let texture_id = match existing {
        Some(texture_id) => {
            gl.bind_texture(gl::TEXTURE_2D, texture_id);
            texture_id
        }
        None => {
            let texture_id = gl.gen_textures(1)[0];
            gl.bind_texture(gl::TEXTURE_2D, texture_id);
            gl.tex_image_2d(
                gl::TEXTURE_2D,
                0,
                gl::RGBA as gl::GLint,
                width,
                height,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                None,
            );
            gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as gl::GLint);
            gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as gl::GLint);
            texture_id
        }
    };

    gl.pixel_store_i(gl::UNPACK_ALIGNMENT, 1);
    gl.tex_sub_image_2d(
        gl::TEXTURE_2D,
        0,
        0,
        0,
        width,
        height,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        pixels,
    );
    gl.bind_texture(gl::TEXTURE_2D, 0);

    match gl.get_error() {
        gl::NO_ERROR => Ok(texture_id),
        code => Err(GlError::new("upload_frame", code).into()),
    }
}

#[cfg(test)]
pub(crate) mod fake_target {
    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// ### English
    /// Shared bookkeeping of a [`FakeTarget`]: uploads as `(existing, written)` and released names.
    ///
    /// ### 中文
    /// [`FakeTarget`] 的共享记录：上传记录为 `(existing, written)`，以及已释放的纹理名。
    #[derive(Default)]
    pub(crate) struct FakeGpu {
        next_texture: AtomicU32,
        pub(crate) uploads: Mutex<Vec<(Option<u32>, u32)>>,
        pub(crate) released: Mutex<Vec<u32>>,
    }

    impl FakeGpu {
        pub(crate) fn allocations(&self) -> usize {
            self.uploads
                .lock()
                .iter()
                .filter(|(existing, _)| existing.is_none())
                .count()
        }

        pub(crate) fn is_released(&self, texture_id: u32) -> bool {
            self.released.lock().contains(&texture_id)
        }
    }

    pub(crate) struct FakeTarget {
        gpu: Arc<FakeGpu>,
    }

    impl FlushContext for FakeTarget {
        fn flush(&self) {}

        fn release_texture(&self, texture_id: u32) {
            self.gpu.released.lock().push(texture_id);
        }
    }

    impl UploadTarget for FakeTarget {
        type Bootstrap = Arc<FakeGpu>;

        fn open(bootstrap: &Arc<FakeGpu>) -> Result<Self, SourceError> {
            Ok(Self {
                gpu: bootstrap.clone(),
            })
        }

        fn upload(
            &self,
            existing: Option<u32>,
            size: PhysicalSize<u32>,
            pixels: Vec<u8>,
        ) -> Result<u32, SourceError> {
            assert_eq!(pixels.len(), (size.width * size.height * 4) as usize);
            let written = existing
                .unwrap_or_else(|| self.gpu.next_texture.fetch_add(1, Ordering::SeqCst) + 1);
            self.gpu.uploads.lock().push((existing, written));
            Ok(written)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_has_one_rgba_pixel_per_texel_and_moves() {
        let size = PhysicalSize::new(64, 8);
        let first = pattern_pixels(size, 0);
        let later = pattern_pixels(size, 5);
        assert_eq!(first.len(), 64 * 8 * 4);
        assert!(first.chunks(4).all(|px| px[3] == 255));
        assert_ne!(first, later);
    }

    #[test]
    fn next_frame_before_start_is_rejected() {
        let mut source = TestPatternSource::new(
            ContextBootstrap::GlfwShared(crate::engine::rendering::GlfwSharedBootstrap {
                host_window: 0,
                api: Default::default(),
            }),
            PhysicalSize::new(4, 4),
        );
        assert!(matches!(
            source.next_frame(0, None),
            Err(SourceError::NotStarted)
        ));
        assert!(matches!(
            source.start(),
            Err(SourceError::Context(ContextError::NullHandle(_)))
        ));
    }

    use std::time::Duration;

    use super::fake_target::{FakeGpu, FakeTarget};
    use crate::engine::handoff::Pipeline;
    use crate::engine::notify::{ViewEvent, mailbox};
    use crate::engine::producer::MediaThread;

    fn fake_source(gpu: &Arc<FakeGpu>) -> TestPatternSource<FakeTarget> {
        let mut source = TestPatternSource::with_target(gpu.clone(), PhysicalSize::new(4, 4));
        source.start().unwrap();
        source
    }

    fn texture_of(frame: &Frame) -> u32 {
        frame.gl_memory().map(GlMemory::texture_id).unwrap()
    }

    #[test]
    fn recycled_frame_keeps_its_texture() {
        let gpu = Arc::new(FakeGpu::default());
        let mut source = fake_source(&gpu);

        let a = source.next_frame(0, None).unwrap().unwrap();
        let b = source.next_frame(1, None).unwrap().unwrap();
        let a_texture = texture_of(&a);

        let c = source.next_frame(2, Some(a)).unwrap().unwrap();
        assert_eq!(c.seq(), 2);
        assert_eq!(texture_of(&c), a_texture);
        assert_ne!(texture_of(&b), a_texture);
        assert_eq!(source.allocated_textures(), 2);
        assert_eq!(*gpu.uploads.lock().last().unwrap(), (Some(a_texture), a_texture));
        assert!(gpu.released.lock().is_empty());
    }

    #[test]
    fn recycled_frame_with_other_metadata_is_released_and_replaced() {
        let gpu = Arc::new(FakeGpu::default());
        let mut source = fake_source(&gpu);

        let stale_owner: Arc<dyn FlushContext> = Arc::new(FakeTarget::open(&gpu).unwrap());
        let stale = Frame::new(
            0,
            VideoMeta::new(VideoFormat::Rgba, PhysicalSize::new(2, 2)),
            FrameMemory::Gl(GlMemory::new(77, stale_owner)),
        );

        let frame = source.next_frame(1, Some(stale)).unwrap().unwrap();
        assert_ne!(texture_of(&frame), 77);
        assert_eq!(*gpu.released.lock(), vec![77]);
        assert_eq!(source.allocated_textures(), 1);
    }

    #[test]
    fn stop_leaves_textures_owned_by_live_frames() {
        let gpu = Arc::new(FakeGpu::default());
        let mut source = fake_source(&gpu);

        let held = source.next_frame(0, None).unwrap().unwrap();
        let texture = texture_of(&held);
        source.stop();
        assert!(!gpu.is_released(texture));

        drop(held);
        assert!(gpu.is_released(texture));
    }

    #[test]
    fn allocation_stops_at_the_handoff_depth() {
        const FRAMES: u64 = 20;
        let gpu = Arc::new(FakeGpu::default());
        let pipeline = Arc::new(Pipeline::new(2));
        let (notifier, inbox) = mailbox(None);
        let source =
            TestPatternSource::<FakeTarget>::with_target(gpu.clone(), PhysicalSize::new(4, 4));
        let mut media = MediaThread::start(source, pipeline.clone(), notifier, None).unwrap();

        let mut held: Option<Frame> = None;
        let mut seen = 0;
        while seen < FRAMES {
            match inbox.recv_timeout(Duration::from_secs(5)).expect("event") {
                ViewEvent::FrameReady { .. } => {
                    held = Some(pipeline.exchange(held.take()).unwrap());
                    seen += 1;
                }
                ViewEvent::ProducerFinished { error } => panic!("finished early: {error:?}"),
            }
        }
        media.stop();
        media.join();

        assert_eq!(gpu.allocations(), 2);
        drop(media);
        drop(held);
        drop(pipeline);
        let mut released = gpu.released.lock().clone();
        released.sort_unstable();
        assert_eq!(released, vec![1, 2]);
    }
}
