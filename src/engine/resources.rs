//! ### English
//! Shader source loading.
//!
//! A view may be configured with a resources directory holding `vshader.glsl` and
//! `fshader.glsl` (desktop GLSL 3.30) or `vshader_es.glsl` and `fshader_es.glsl` (GLSL ES 1.00);
//! anything missing falls back to the built-in pair of the same dialect.
//!
//! ### 中文
//! 着色器源码加载。
//!
//! view 可以配置一个资源目录，其中包含 `vshader.glsl` 与 `fshader.glsl`（桌面 GLSL 3.30），
//! 或 `vshader_es.glsl` 与 `fshader_es.glsl`（GLSL ES 1.00）；缺失的部分回退到同一方言的内置源码。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub const VERTEX_SHADER_FILE: &str = "vshader.glsl";
pub const FRAGMENT_SHADER_FILE: &str = "fshader.glsl";
pub const VERTEX_SHADER_ES_FILE: &str = "vshader_es.glsl";
pub const FRAGMENT_SHADER_ES_FILE: &str = "fshader_es.glsl";

const BUILTIN_VERTEX: &str = r#"#version 330 core
uniform mat4 mvp_matrix;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec2 a_texcoord;

out vec2 v_texcoord;

void main() {
    gl_Position = mvp_matrix * vec4(a_position, 1.0);
    v_texcoord = a_texcoord;
}
"#;

const BUILTIN_FRAGMENT: &str = r#"#version 330 core
uniform sampler2D frame_texture;

in vec2 v_texcoord;
out vec4 frag_color;

void main() {
    frag_color = texture(frame_texture, v_texcoord);
}
"#;

const BUILTIN_VERTEX_ES: &str = r#"#version 100
uniform mat4 mvp_matrix;

attribute vec3 a_position;
attribute vec2 a_texcoord;

varying vec2 v_texcoord;

void main() {
    gl_Position = mvp_matrix * vec4(a_position, 1.0);
    v_texcoord = a_texcoord;
}
"#;

const BUILTIN_FRAGMENT_ES: &str = r#"#version 100
precision mediump float;

uniform sampler2D frame_texture;

varying vec2 v_texcoord;

void main() {
    gl_FragColor = texture2D(frame_texture, v_texcoord);
}
"#;

/// ### English
/// Shading language accepted by the GUI context.
///
/// ### 中文
/// GUI 上下文接受的着色语言。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderDialect {
    /// ### English
    /// Desktop GLSL 3.30 core.
    ///
    /// ### 中文
    /// 桌面 GLSL 3.30 core。
    Glsl330,
    /// ### English
    /// GLSL ES 1.00, accepted by every OpenGL ES 2.0+ context.
    ///
    /// ### 中文
    /// GLSL ES 1.00，所有 OpenGL ES 2.0+ 上下文均可接受。
    GlslEs100,
}

impl ShaderDialect {
    pub fn for_context(is_embedded: bool) -> Self {
        if is_embedded {
            Self::GlslEs100
        } else {
            Self::Glsl330
        }
    }

    fn builtin(self) -> (&'static str, &'static str) {
        match self {
            Self::Glsl330 => (BUILTIN_VERTEX, BUILTIN_FRAGMENT),
            Self::GlslEs100 => (BUILTIN_VERTEX_ES, BUILTIN_FRAGMENT_ES),
        }
    }

    fn file_names(self) -> (&'static str, &'static str) {
        match self {
            Self::Glsl330 => (VERTEX_SHADER_FILE, FRAGMENT_SHADER_FILE),
            Self::GlslEs100 => (VERTEX_SHADER_ES_FILE, FRAGMENT_SHADER_ES_FILE),
        }
    }
}

/// ### English
/// Vertex and fragment shader sources for the cube program.
///
/// ### 中文
/// 立方体着色器程序的顶点与片元源码。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn builtin(dialect: ShaderDialect) -> Self {
        let (vertex, fragment) = dialect.builtin();
        Self {
            vertex: vertex.to_owned(),
            fragment: fragment.to_owned(),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::builtin(ShaderDialect::Glsl330)
    }
}

/// ### English
/// Reads the `dialect` shader pair from `dir`, using the built-in source for any file that cannot
/// be read.
///
/// ### 中文
/// 从 `dir` 读取 `dialect` 对应的着色器源码；任何无法读取的文件使用内置源码代替。
pub fn load_shader_sources(dir: Option<&Path>, dialect: ShaderDialect) -> ShaderSources {
    let Some(dir) = dir else {
        return ShaderSources::builtin(dialect);
    };

    let (vertex_file, fragment_file) = dialect.file_names();
    let (vertex, fragment) = dialect.builtin();
    ShaderSources {
        vertex: read_or_builtin(dir.join(vertex_file), vertex),
        fragment: read_or_builtin(dir.join(fragment_file), fragment),
    }
}

fn read_or_builtin(path: PathBuf, builtin: &str) -> String {
    match std::fs::read_to_string(&path) {
        Ok(source) => {
            debug!(path = %path.display(), "loaded shader source");
            source
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "shader source unavailable, using built-in");
            builtin.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!(
            "cube-share-{tag}-{}-{nanos}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn no_directory_uses_builtin() {
        assert_eq!(
            load_shader_sources(None, ShaderDialect::Glsl330),
            ShaderSources::default()
        );
    }

    #[test]
    fn embedded_contexts_get_the_es_pair() {
        assert_eq!(ShaderDialect::for_context(true), ShaderDialect::GlslEs100);
        assert_eq!(ShaderDialect::for_context(false), ShaderDialect::Glsl330);

        let es = load_shader_sources(None, ShaderDialect::GlslEs100);
        assert!(es.vertex.starts_with("#version 100"));
        assert!(es.fragment.contains("precision mediump float;"));
        assert!(es.fragment.contains("uniform sampler2D frame_texture;"));
        assert!(!es.vertex.contains("layout("));
    }

    #[test]
    fn files_in_directory_override_builtin() {
        let dir = scratch_dir("override");
        std::fs::write(dir.join(VERTEX_SHADER_FILE), "void main() {}").unwrap();

        let sources = load_shader_sources(Some(&dir), ShaderDialect::Glsl330);
        assert_eq!(sources.vertex, "void main() {}");
        assert_eq!(sources.fragment, BUILTIN_FRAGMENT);

        let es = load_shader_sources(Some(&dir), ShaderDialect::GlslEs100);
        assert_eq!(es, ShaderSources::builtin(ShaderDialect::GlslEs100));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
