//! Geometry uploaded to GPU buffers behind a vertex array object.

use crate::error::WebError;
use crate::shader::Attributes;
use gllab_core::IndexedGeometry;
use js_sys::{Float32Array, Uint32Array};
use web_sys::{WebGl2RenderingContext as Gl, WebGlBuffer, WebGlVertexArrayObject};

pub struct GpuModel {
    vao: WebGlVertexArrayObject,
    buffers: Vec<WebGlBuffer>,
    /// Attribute slots with no stream, fed a constant at draw time
    constant_slots: Vec<u32>,
    index_count: i32,
    has_tex_coords: bool,
}

impl GpuModel {
    /// Validate `geometry` and copy it into fresh buffers.
    pub fn upload(
        gl: &Gl,
        attributes: &Attributes,
        geometry: &IndexedGeometry,
    ) -> Result<Self, WebError> {
        geometry.validate()?;

        let vao = gl
            .create_vertex_array()
            .ok_or(WebError::Allocation("vertex array"))?;
        gl.bind_vertex_array(Some(&vao));

        let mut buffers = Vec::with_capacity(5);
        let mut constant_slots = Vec::new();
        let streams = [
            (attributes.position, 3, &geometry.positions),
            (attributes.normal, 3, &geometry.normals),
            (attributes.tex_coord, 2, &geometry.tex_coords),
            (attributes.color, 4, &geometry.colors),
        ];

        for (location, size, data) in streams {
            let Some(location) = location else {
                continue;
            };

            if data.is_empty() {
                gl.disable_vertex_attrib_array(location);
                constant_slots.push(location);
                continue;
            }

            let buffer = gl
                .create_buffer()
                .ok_or(WebError::Allocation("vertex buffer"))?;
            gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
            gl.buffer_data_with_array_buffer_view(
                Gl::ARRAY_BUFFER,
                &Float32Array::from(data.as_slice()),
                Gl::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_with_i32(location, size, Gl::FLOAT, false, 0, 0);
            buffers.push(buffer);
        }

        let index_buffer = gl
            .create_buffer()
            .ok_or(WebError::Allocation("index buffer"))?;
        gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&index_buffer));
        gl.buffer_data_with_array_buffer_view(
            Gl::ELEMENT_ARRAY_BUFFER,
            &Uint32Array::from(geometry.indices.as_slice()),
            Gl::STATIC_DRAW,
        );
        buffers.push(index_buffer);

        gl.bind_vertex_array(None);

        let index_count = i32::try_from(geometry.indices.len())
            .map_err(|_| WebError::Allocation("index buffer larger than i32::MAX"))?;

        tracing::debug!(
            vertices = geometry.vertex_count(),
            triangles = geometry.triangle_count(),
            "geometry uploaded"
        );

        Ok(Self {
            vao,
            buffers,
            constant_slots,
            index_count,
            has_tex_coords: geometry.has_tex_coords(),
        })
    }

    /// Whether a bound texture has coordinates to sample with.
    pub fn has_tex_coords(&self) -> bool {
        self.has_tex_coords
    }

    pub fn draw(&self, gl: &Gl) {
        // Constant attribute values are context state, not VAO state
        for &location in &self.constant_slots {
            gl.vertex_attrib4f(location, 1.0, 1.0, 1.0, 1.0);
        }
        gl.bind_vertex_array(Some(&self.vao));
        gl.draw_elements_with_i32(Gl::TRIANGLES, self.index_count, Gl::UNSIGNED_INT, 0);
        gl.bind_vertex_array(None);
    }

    /// Free the GPU objects; the model must not be drawn afterwards.
    pub fn release(self, gl: &Gl) {
        for buffer in &self.buffers {
            gl.delete_buffer(Some(buffer));
        }
        gl.delete_vertex_array(Some(&self.vao));
    }
}
