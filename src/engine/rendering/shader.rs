use glow::HasContext as _;
use tracing::debug;

use crate::engine::resources::ShaderSources;

/// ### English
/// Attribute slots shared by the program and the cube mesh.
///
/// ### 中文
/// 着色器程序与立方体网格共用的顶点属性槽位。
pub const POSITION_ATTRIB: u32 = 0;
pub const TEXCOORD_ATTRIB: u32 = 1;

const POSITION_NAME: &str = "a_position";
const TEXCOORD_NAME: &str = "a_texcoord";
pub const MVP_UNIFORM: &str = "mvp_matrix";
pub const TEXTURE_UNIFORM: &str = "frame_texture";

/// ### English
/// Consumer renderer setup failures. Any of them ends the view session.
///
/// ### 中文
/// 消费者渲染器初始化失败；任何一种都会结束 view 会话。
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to compile {stage} shader: {log}")]
    Compile { stage: &'static str, log: String },
    #[error("failed to link shader program: {0}")]
    Link(String),
    #[error("failed to create GL {what}: {reason}")]
    Create { what: &'static str, reason: String },
}

/// ### English
/// Linked cube program with its uniform locations resolved.
///
/// ### 中文
/// 已链接的立方体着色器程序，以及解析好的 uniform 位置。
pub struct ShaderProgram {
    program: glow::Program,
    mvp: Option<glow::UniformLocation>,
    texture: Option<glow::UniformLocation>,
}

impl ShaderProgram {
    pub fn new(gl: &glow::Context, sources: &ShaderSources) -> Result<Self, RendererError> {
        let vertex = compile(gl, glow::VERTEX_SHADER, "vertex", &sources.vertex)?;
        let fragment = match compile(gl, glow::FRAGMENT_SHADER, "fragment", &sources.fragment) {
            Ok(shader) => shader,
            Err(err) => {
                unsafe { gl.delete_shader(vertex) };
                return Err(err);
            }
        };

        let linked = unsafe { link(gl, vertex, fragment) };
        unsafe {
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
        }
        let program = linked?;

        let (mvp, texture) = unsafe {
            (
                gl.get_uniform_location(program, MVP_UNIFORM),
                gl.get_uniform_location(program, TEXTURE_UNIFORM),
            )
        };
        debug!(
            has_mvp = mvp.is_some(),
            has_texture = texture.is_some(),
            "cube shader program linked"
        );
        Ok(Self {
            program,
            mvp,
            texture,
        })
    }

    pub fn bind(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) };
    }

    pub fn set_mvp(&self, gl: &glow::Context, mvp: &[f32; 16]) {
        unsafe { gl.uniform_matrix_4_f32_slice(self.mvp.as_ref(), false, mvp) };
    }

    pub fn set_texture_unit(&self, gl: &glow::Context, unit: i32) {
        unsafe { gl.uniform_1_i32(self.texture.as_ref(), unit) };
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe {
            gl.use_program(None);
            gl.delete_program(self.program);
        }
    }
}

fn compile(
    gl: &glow::Context,
    kind: u32,
    stage: &'static str,
    source: &str,
) -> Result<glow::Shader, RendererError> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(|reason| RendererError::Create {
            what: "shader",
            reason,
        })?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            return Ok(shader);
        }
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        Err(RendererError::Compile { stage, log })
    }
}

unsafe fn link(
    gl: &glow::Context,
    vertex: glow::Shader,
    fragment: glow::Shader,
) -> Result<glow::Program, RendererError> {
    unsafe {
        let program = gl.create_program().map_err(|reason| RendererError::Create {
            what: "program",
            reason,
        })?;
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.bind_attrib_location(program, POSITION_ATTRIB, POSITION_NAME);
        gl.bind_attrib_location(program, TEXCOORD_ATTRIB, TEXCOORD_NAME);
        gl.link_program(program);
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);

        if gl.get_program_link_status(program) {
            return Ok(program);
        }
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        Err(RendererError::Link(log))
    }
}
