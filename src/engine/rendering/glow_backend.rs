//! ### English
//! [`RenderBackend`] over the host's GUI context via `glow`.
//!
//! ### 中文
//! 基于 `glow`、作用于宿主 GUI 上下文的 [`RenderBackend`]。

use std::ffi::c_void;
use std::num::NonZeroU32;
use std::path::Path;

use dpi::PhysicalSize;
use glam::Mat4;
use glow::HasContext as _;
use tracing::debug;

use super::backend::{GlError, RenderBackend};
use super::geometry::{CubeGeometry, supports_vertex_arrays};
use super::shader::{RendererError, ShaderProgram};
use crate::engine::resources::{ShaderDialect, load_shader_sources};

/// ### English
/// Upper bound of queued error codes drained after one step.
///
/// ### 中文
/// 单个步骤之后最多读取的排队错误码数量。
const MAX_DRAINED_ERRORS: usize = 8;

/// ### English
/// Cube renderer backend for a context that is current on the calling (GUI) thread.
///
/// ### 中文
/// 面向调用（GUI）线程上 current 上下文的立方体渲染后端。
pub struct GlowBackend {
    gl: glow::Context,
    program: ShaderProgram,
    geometry: CubeGeometry,
    destroyed: bool,
}

impl GlowBackend {
    /// ### English
    /// Builds the backend on an already loaded context: compiles the program and uploads the mesh.
    ///
    /// The shader dialect and the vertex-array path follow the context version, so an OpenGL ES
    /// GUI context gets the GLSL ES pair and, on ES 2, a mesh without VAO.
    ///
    /// ### 中文
    /// 在已加载的上下文上构建后端：编译着色器程序并上传网格。
    ///
    /// 着色器方言与顶点数组路径取决于上下文版本：OpenGL ES GUI 上下文使用 GLSL ES 着色器，
    /// 在 ES 2 上网格不使用 VAO。
    pub fn new(gl: glow::Context, resources_dir: Option<&Path>) -> Result<Self, RendererError> {
        let version = gl.version();
        let dialect = ShaderDialect::for_context(version.is_embedded);
        let use_vertex_array = supports_vertex_arrays(version.major, version.is_embedded);
        debug!(
            major = version.major,
            minor = version.minor,
            gles = version.is_embedded,
            ?dialect,
            use_vertex_array,
            "GUI context detected"
        );

        let sources = load_shader_sources(resources_dir, dialect);
        let program = ShaderProgram::new(&gl, &sources)?;
        let geometry = match CubeGeometry::new(&gl, use_vertex_array) {
            Ok(geometry) => geometry,
            Err(err) => {
                program.delete(&gl);
                return Err(err);
            }
        };
        debug!("glow cube backend ready");
        Ok(Self {
            gl,
            program,
            geometry,
            destroyed: false,
        })
    }

    /// ### English
    /// Loads GL entry points through `get_proc_address` and builds the backend.
    ///
    /// #### Safety
    /// The GUI context must be current on the calling thread, and `get_proc_address` must resolve
    /// entry points for that context.
    ///
    /// ### 中文
    /// 通过 `get_proc_address` 加载 GL 函数入口并构建后端。
    ///
    /// #### 安全性
    /// GUI 上下文必须在调用线程上 current，且 `get_proc_address` 必须为该上下文解析函数入口。
    pub unsafe fn from_loader(
        get_proc_address: impl FnMut(&str) -> *const c_void,
        resources_dir: Option<&Path>,
    ) -> Result<Self, RendererError> {
        let gl = unsafe { glow::Context::from_loader_function(get_proc_address) };
        Self::new(gl, resources_dir)
    }

    /// ### English
    /// Returns the first error raised since the last check, draining the rest of the queue.
    ///
    /// ### 中文
    /// 返回上次检查以来的第一个错误，并清空其余排队错误。
    fn check(&self, op: &'static str) -> Result<(), GlError> {
        let mut first = None;
        for _ in 0..MAX_DRAINED_ERRORS {
            let code = unsafe { self.gl.get_error() };
            if code == glow::NO_ERROR {
                break;
            }
            first.get_or_insert(code);
        }
        match first {
            Some(code) => Err(GlError::new(op, code)),
            None => Ok(()),
        }
    }
}

impl RenderBackend for GlowBackend {
    fn set_viewport(&mut self, size: PhysicalSize<u32>) {
        unsafe {
            self.gl
                .viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    fn enable_depth_test(&mut self) -> Result<(), GlError> {
        unsafe { self.gl.enable(glow::DEPTH_TEST) };
        self.check("enable_depth_test")
    }

    fn bind_texture(&mut self, texture_id: u32) -> Result<(), GlError> {
        let Some(name) = NonZeroU32::new(texture_id) else {
            return Err(GlError::new("bind_texture", glow::INVALID_VALUE));
        };
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl
                .bind_texture(glow::TEXTURE_2D, Some(glow::NativeTexture(name)));
        }
        self.check("bind_texture")
    }

    fn set_sampling(&mut self) -> Result<(), GlError> {
        unsafe {
            let gl = &self.gl;
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
        self.check("set_sampling")
    }

    fn clear(&mut self, [r, g, b, a]: [f32; 4]) -> Result<(), GlError> {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        self.check("clear")
    }

    fn draw_cube(&mut self, mvp: &Mat4) -> Result<(), GlError> {
        self.program.bind(&self.gl);
        self.program.set_mvp(&self.gl, &mvp.to_cols_array());
        self.program.set_texture_unit(&self.gl, 0);
        self.geometry.draw(&self.gl);
        self.check("draw_cube")
    }

    fn unbind_texture(&mut self) -> Result<(), GlError> {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, None) };
        self.check("unbind_texture")
    }

    fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        self.geometry.delete(&self.gl);
        self.program.delete(&self.gl);
        debug!("glow cube backend destroyed");
    }
}
