//! GLSL sources and program setup for the lesson scenes.

use crate::error::WebError;
use web_sys::{WebGl2RenderingContext as Gl, WebGlProgram, WebGlShader, WebGlUniformLocation};

pub const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 aVertexPosition;
in vec3 aVertexNormal;
in vec2 aTextureCoord;
in vec4 aVertexColor;

uniform mat4 uMVMatrix;
uniform mat4 uPMatrix;
uniform mat3 uNMatrix;

uniform bool uUseLighting;
uniform vec3 uAmbientColor;
uniform vec3 uLightingDirection;
uniform vec3 uDirectionalColor;

out vec2 vTextureCoord;
out vec4 vColor;
out vec3 vLightWeighting;

void main() {
    gl_Position = uPMatrix * uMVMatrix * vec4(aVertexPosition, 1.0);
    vTextureCoord = aTextureCoord;
    vColor = aVertexColor;

    if (!uUseLighting) {
        vLightWeighting = vec3(1.0, 1.0, 1.0);
    } else {
        vec3 transformedNormal = normalize(uNMatrix * aVertexNormal);
        float directionalWeighting = max(dot(transformedNormal, uLightingDirection), 0.0);
        vLightWeighting = uAmbientColor + uDirectionalColor * directionalWeighting;
    }
}
"#;

pub const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;

in vec2 vTextureCoord;
in vec4 vColor;
in vec3 vLightWeighting;

uniform bool uUseTexture;
uniform sampler2D uSampler;

out vec4 fragColor;

void main() {
    vec4 base = uUseTexture ? texture(uSampler, vTextureCoord) : vColor;
    fragColor = vec4(base.rgb * vLightWeighting, base.a);
}
"#;

/// Attribute slots; `None` when the driver optimized the input away.
#[derive(Debug, Clone, Copy)]
pub struct Attributes {
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub tex_coord: Option<u32>,
    pub color: Option<u32>,
}

pub struct Uniforms {
    pub model_view: Option<WebGlUniformLocation>,
    pub projection: Option<WebGlUniformLocation>,
    pub normal_matrix: Option<WebGlUniformLocation>,
    pub use_lighting: Option<WebGlUniformLocation>,
    pub ambient: Option<WebGlUniformLocation>,
    pub light_direction: Option<WebGlUniformLocation>,
    pub directional: Option<WebGlUniformLocation>,
    pub use_texture: Option<WebGlUniformLocation>,
    pub sampler: Option<WebGlUniformLocation>,
}

/// Linked program plus the locations the renderer feeds every frame.
pub struct ShaderProgram {
    pub program: WebGlProgram,
    pub attributes: Attributes,
    pub uniforms: Uniforms,
}

impl ShaderProgram {
    pub fn new(gl: &Gl) -> Result<Self, WebError> {
        let vertex = compile_shader(gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
        let fragment = compile_shader(gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
        let program = link_program(gl, &vertex, &fragment)?;

        // Shaders are owned by the program once linked
        gl.delete_shader(Some(&vertex));
        gl.delete_shader(Some(&fragment));

        let attribute = |name: &str| u32::try_from(gl.get_attrib_location(&program, name)).ok();
        let attributes = Attributes {
            position: attribute("aVertexPosition"),
            normal: attribute("aVertexNormal"),
            tex_coord: attribute("aTextureCoord"),
            color: attribute("aVertexColor"),
        };

        let uniform = |name: &str| gl.get_uniform_location(&program, name);
        let uniforms = Uniforms {
            model_view: uniform("uMVMatrix"),
            projection: uniform("uPMatrix"),
            normal_matrix: uniform("uNMatrix"),
            use_lighting: uniform("uUseLighting"),
            ambient: uniform("uAmbientColor"),
            light_direction: uniform("uLightingDirection"),
            directional: uniform("uDirectionalColor"),
            use_texture: uniform("uUseTexture"),
            sampler: uniform("uSampler"),
        };

        if attributes.position.is_none() {
            return Err(WebError::ProgramLink(
                "aVertexPosition is not an active attribute".to_string(),
            ));
        }

        tracing::debug!(?attributes, "shader program linked");
        Ok(Self {
            program,
            attributes,
            uniforms,
        })
    }
}

pub fn compile_shader(gl: &Gl, shader_type: u32, source: &str) -> Result<WebGlShader, WebError> {
    let shader = gl
        .create_shader(shader_type)
        .ok_or(WebError::Allocation("shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let log = gl
            .get_shader_info_log(&shader)
            .unwrap_or_else(|| "unknown error".to_string());
        gl.delete_shader(Some(&shader));
        Err(WebError::ShaderCompile(log))
    }
}

pub fn link_program(
    gl: &Gl,
    vertex: &WebGlShader,
    fragment: &WebGlShader,
) -> Result<WebGlProgram, WebError> {
    let program = gl
        .create_program()
        .ok_or(WebError::Allocation("program"))?;
    gl.attach_shader(&program, vertex);
    gl.attach_shader(&program, fragment);
    gl.link_program(&program);

    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let log = gl
            .get_program_info_log(&program)
            .unwrap_or_else(|| "unknown error".to_string());
        gl.delete_program(Some(&program));
        Err(WebError::ProgramLink(log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_declare_glsl_300_es() {
        assert!(VERTEX_SHADER.starts_with("#version 300 es"));
        assert!(FRAGMENT_SHADER.starts_with("#version 300 es"));
    }

    #[test]
    fn test_sources_reference_lighting_uniforms() {
        for name in [
            "uUseLighting",
            "uAmbientColor",
            "uLightingDirection",
            "uDirectionalColor",
            "uNMatrix",
        ] {
            assert!(VERTEX_SHADER.contains(name), "missing {name}");
        }
        assert!(FRAGMENT_SHADER.contains("uSampler"));
    }
}
