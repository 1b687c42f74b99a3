//! ### English
//! Cube mesh owned by one renderer instance.
//!
//! ### 中文
//! 由单个渲染器实例持有的立方体网格。

use glow::HasContext as _;

use super::shader::{POSITION_ATTRIB, RendererError, TEXCOORD_ATTRIB};

/// ### English
/// Interleaved vertex: position followed by texture coordinate.
///
/// ### 中文
/// 交错顶点：位置后接纹理坐标。
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

const fn v(position: [f32; 3], texcoord: [f32; 2]) -> Vertex {
    Vertex { position, texcoord }
}

/// ### English
/// Four vertices per face so every face samples the whole frame.
///
/// ### 中文
/// 每个面四个顶点，使每个面都采样整帧图像。
pub const CUBE_VERTICES: [Vertex; 24] = [
    // front
    v([-1.0, -1.0, 1.0], [0.0, 0.0]),
    v([1.0, -1.0, 1.0], [1.0, 0.0]),
    v([-1.0, 1.0, 1.0], [0.0, 1.0]),
    v([1.0, 1.0, 1.0], [1.0, 1.0]),
    // right
    v([1.0, -1.0, 1.0], [0.0, 0.0]),
    v([1.0, -1.0, -1.0], [1.0, 0.0]),
    v([1.0, 1.0, 1.0], [0.0, 1.0]),
    v([1.0, 1.0, -1.0], [1.0, 1.0]),
    // back
    v([1.0, -1.0, -1.0], [0.0, 0.0]),
    v([-1.0, -1.0, -1.0], [1.0, 0.0]),
    v([1.0, 1.0, -1.0], [0.0, 1.0]),
    v([-1.0, 1.0, -1.0], [1.0, 1.0]),
    // left
    v([-1.0, -1.0, -1.0], [0.0, 0.0]),
    v([-1.0, -1.0, 1.0], [1.0, 0.0]),
    v([-1.0, 1.0, -1.0], [0.0, 1.0]),
    v([-1.0, 1.0, 1.0], [1.0, 1.0]),
    // bottom
    v([-1.0, -1.0, -1.0], [0.0, 0.0]),
    v([1.0, -1.0, -1.0], [1.0, 0.0]),
    v([-1.0, -1.0, 1.0], [0.0, 1.0]),
    v([1.0, -1.0, 1.0], [1.0, 1.0]),
    // top
    v([-1.0, 1.0, 1.0], [0.0, 0.0]),
    v([1.0, 1.0, 1.0], [1.0, 0.0]),
    v([-1.0, 1.0, -1.0], [0.0, 1.0]),
    v([1.0, 1.0, -1.0], [1.0, 1.0]),
];

/// ### English
/// One triangle strip; repeated indices form degenerate triangles joining the faces.
///
/// ### 中文
/// 单条三角形带；重复的索引构成连接各面的退化三角形。
pub const CUBE_INDICES: [u16; 34] = [
    0, 1, 2, 3, 3, //
    4, 4, 5, 6, 7, 7, //
    8, 8, 9, 10, 11, 11, //
    12, 12, 13, 14, 15, 15, //
    16, 16, 17, 18, 19, 19, //
    20, 20, 21, 22, 23,
];

/// ### English
/// Whether the context has vertex array objects (desktop GL 3+, OpenGL ES 3+).
///
/// ### 中文
/// 上下文是否支持顶点数组对象（桌面 GL 3+、OpenGL ES 3+）。
pub fn supports_vertex_arrays(major: u32, is_embedded: bool) -> bool {
    !is_embedded || major >= 3
}

/// ### English
/// GL objects holding the cube mesh (vertex buffer + index buffer, plus a VAO when available).
///
/// Without a VAO the attribute layout is re-applied on every draw.
///
/// ### 中文
/// 持有立方体网格的 GL 对象（顶点缓冲 + 索引缓冲，可用时另有 VAO）。
///
/// 没有 VAO 时，每次绘制都会重新设置属性布局。
pub struct CubeGeometry {
    vao: Option<glow::VertexArray>,
    vbo: glow::Buffer,
    ibo: glow::Buffer,
}

impl CubeGeometry {
    pub fn new(gl: &glow::Context, use_vertex_array: bool) -> Result<Self, RendererError> {
        let create_err = |what| move |reason| RendererError::Create { what, reason };
        unsafe {
            let vao = if use_vertex_array {
                Some(gl.create_vertex_array().map_err(create_err("vertex array"))?)
            } else {
                None
            };
            let vbo = gl.create_buffer().map_err(create_err("vertex buffer"))?;
            let ibo = gl.create_buffer().map_err(create_err("index buffer"))?;

            if vao.is_some() {
                gl.bind_vertex_array(vao);
            }

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&CUBE_VERTICES),
                glow::STATIC_DRAW,
            );

            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&CUBE_INDICES),
                glow::STATIC_DRAW,
            );

            if vao.is_some() {
                set_vertex_layout(gl);
                gl.bind_vertex_array(None);
            } else {
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            }
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self { vao, vbo, ibo })
        }
    }

    pub fn draw(&self, gl: &glow::Context) {
        unsafe {
            match self.vao {
                Some(vao) => gl.bind_vertex_array(Some(vao)),
                None => {
                    gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
                    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ibo));
                    set_vertex_layout(gl);
                }
            }
            gl.draw_elements(
                glow::TRIANGLE_STRIP,
                CUBE_INDICES.len() as i32,
                glow::UNSIGNED_SHORT,
                0,
            );
            match self.vao {
                Some(_) => gl.bind_vertex_array(None),
                None => {
                    gl.disable_vertex_attrib_array(POSITION_ATTRIB);
                    gl.disable_vertex_attrib_array(TEXCOORD_ATTRIB);
                    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
                    gl.bind_buffer(glow::ARRAY_BUFFER, None);
                }
            }
        }
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe {
            if let Some(vao) = self.vao {
                gl.delete_vertex_array(vao);
            }
            gl.delete_buffer(self.vbo);
            gl.delete_buffer(self.ibo);
        }
    }
}

/// ### English
/// Points the position/texcoord attributes at the bound vertex buffer.
///
/// ### 中文
/// 让 position/texcoord 属性指向当前绑定的顶点缓冲。
unsafe fn set_vertex_layout(gl: &glow::Context) {
    let stride = size_of::<Vertex>() as i32;
    unsafe {
        gl.enable_vertex_attrib_array(POSITION_ATTRIB);
        gl.vertex_attrib_pointer_f32(POSITION_ATTRIB, 3, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(TEXCOORD_ATTRIB);
        gl.vertex_attrib_pointer_f32(
            TEXCOORD_ATTRIB,
            2,
            glow::FLOAT,
            false,
            stride,
            size_of::<[f32; 3]>() as i32,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_indices_reference_every_vertex() {
        let mut used = [false; CUBE_VERTICES.len()];
        for &index in &CUBE_INDICES {
            used[index as usize] = true;
        }
        assert!(used.iter().all(|&u| u));
    }

    #[test]
    fn every_face_spans_the_full_texture() {
        for face in CUBE_VERTICES.chunks(4) {
            let mut uvs: Vec<[f32; 2]> = face.iter().map(|v| v.texcoord).collect();
            uvs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(uvs, vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
        }
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 5 * size_of::<f32>());
        assert_eq!(bytemuck::cast_slice::<u16, u8>(&CUBE_INDICES).len(), 68);
    }

    #[test]
    fn vertex_arrays_only_where_the_api_has_them() {
        assert!(supports_vertex_arrays(3, false));
        assert!(supports_vertex_arrays(3, true));
        assert!(!supports_vertex_arrays(2, true));
    }
}
