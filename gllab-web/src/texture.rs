//! Image textures and the filter modes the `F` key cycles through.

use crate::error::WebError;
use gllab_core::TextureFilter;
use web_sys::{HtmlImageElement, WebGl2RenderingContext as Gl, WebGlTexture};

/// (min, mag) filter pair for a mode.
pub fn filter_params(filter: TextureFilter) -> (u32, u32) {
    match filter {
        TextureFilter::Nearest => (Gl::NEAREST, Gl::NEAREST),
        TextureFilter::Linear => (Gl::LINEAR, Gl::LINEAR),
        TextureFilter::Mipmap => (Gl::LINEAR_MIPMAP_NEAREST, Gl::LINEAR),
    }
}

pub struct Texture {
    handle: WebGlTexture,
    filter: TextureFilter,
}

impl Texture {
    /// Upload a loaded image. Mipmaps are always built so any filter can be
    /// selected later without re-uploading.
    pub fn from_image(
        gl: &Gl,
        image: &HtmlImageElement,
        filter: TextureFilter,
    ) -> Result<Self, WebError> {
        let handle = gl
            .create_texture()
            .ok_or(WebError::Allocation("texture"))?;
        gl.bind_texture(Gl::TEXTURE_2D, Some(&handle));
        gl.pixel_storei(Gl::UNPACK_FLIP_Y_WEBGL, 1);
        gl.tex_image_2d_with_u32_and_u32_and_html_image_element(
            Gl::TEXTURE_2D,
            0,
            Gl::RGBA as i32,
            Gl::RGBA,
            Gl::UNSIGNED_BYTE,
            image,
        )
        .map_err(WebError::js)?;
        gl.generate_mipmap(Gl::TEXTURE_2D);

        let mut texture = Self { handle, filter };
        texture.apply_filter(gl, filter);
        gl.bind_texture(Gl::TEXTURE_2D, None);

        tracing::debug!(
            width = image.natural_width(),
            height = image.natural_height(),
            ?filter,
            "texture uploaded"
        );
        Ok(texture)
    }

    /// Bind to unit 0, switching filter parameters if the mode changed.
    pub fn bind(&mut self, gl: &Gl, filter: TextureFilter) {
        gl.active_texture(Gl::TEXTURE0);
        gl.bind_texture(Gl::TEXTURE_2D, Some(&self.handle));
        if filter != self.filter {
            self.apply_filter(gl, filter);
        }
    }

    fn apply_filter(&mut self, gl: &Gl, filter: TextureFilter) {
        let (min, mag) = filter_params(filter);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, min as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, mag as i32);
        self.filter = filter;
    }

    pub fn release(self, gl: &Gl) {
        gl.delete_texture(Some(&self.handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_params() {
        assert_eq!(filter_params(TextureFilter::Nearest), (Gl::NEAREST, Gl::NEAREST));
        assert_eq!(filter_params(TextureFilter::Linear), (Gl::LINEAR, Gl::LINEAR));
        assert_eq!(
            filter_params(TextureFilter::Mipmap),
            (Gl::LINEAR_MIPMAP_NEAREST, Gl::LINEAR)
        );
    }
}
