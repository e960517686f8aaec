//! Wavefront OBJ parser producing flat, GPU-ready attribute arrays.
//!
//! Recognised statements:
//!
//! ```text
//! v  x y z [w]      vertex position
//! vt u v [w]        texture coordinate
//! vn x y z          normal
//! vp u [v] [w]      parameter space vertex (only u is kept)
//! f  a b c ...      face; each corner is v, v/vt, v/vt/vn or v//vn
//! ```
//!
//! Every face corner is expanded into the `*_map` arrays and gets its own
//! entry in `triangles`, so the maps can be uploaded as-is and drawn with the
//! index list.
use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{i64 as signed_index, space1},
    combinator::{all_consuming, eof, value},
    number::complete::float,
    sequence::terminated,
    IResult,
};
use nalgebra::{Point2, Point3, Vector3};
use thiserror::Error;

use crate::geometry::{IndexedGeometry, Mesh};

/// Statements that carry no geometry and are skipped in every mode.
const IGNORED_STATEMENTS: &[&str] = &["o", "g", "s", "l", "usemtl", "mtllib"];

/// Which list a face index points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Vertex,
    Texture,
    Normal,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attribute::Vertex => "vertex",
            Attribute::Texture => "texture",
            Attribute::Normal => "normal",
        })
    }
}

/// Errors reported in [`Strictness::Strict`] mode. Line numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObjError {
    #[error("line {line}: malformed number `{token}`")]
    MalformedNumber { line: usize, token: String },

    #[error("line {line}: malformed face corner `{token}`")]
    MalformedIndex { line: usize, token: String },

    #[error("line {line}: `{statement}` needs {expected} components, found {found}")]
    MissingComponent {
        line: usize,
        statement: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {attribute} index {index} out of range ({len} defined)")]
    IndexOutOfRange {
        line: usize,
        attribute: Attribute,
        index: i64,
        len: usize,
    },

    #[error("line {line}: face has {corners} corners, at least 3 required")]
    DegenerateFace { line: usize, corners: usize },

    #[error("line {line}: unsupported statement `{keyword}`")]
    UnsupportedStatement { line: usize, keyword: String },
}

/// How malformed input is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Bad numbers and dangling indices become `NaN`, unknown statements are
    /// dropped. Parsing never fails.
    #[default]
    Lenient,
    /// The first problem aborts parsing with an [`ObjError`].
    Strict,
}

/// How face corners are turned into triangle indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaceMode {
    /// Every corner is appended as the next index. Only correct for input
    /// that is already triangulated; a quad yields four indices.
    #[default]
    Sequential,
    /// An n-corner face becomes n - 2 triangles sharing its first corner.
    Fan,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub strictness: Strictness,
    pub face_mode: FaceMode,
}

impl ParseOptions {
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_face_mode(mut self, face_mode: FaceMode) -> Self {
        self.face_mode = face_mode;
        self
    }
}

/// Parsed OBJ contents.
///
/// `vertices`, `textures`, `normals` and `parameter_points` hold the records
/// in document order. The `*_map` arrays hold one entry per face corner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub vertices: Vec<Point3<f32>>,
    pub textures: Vec<Point2<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub parameter_points: Vec<f32>,
    pub triangles: Vec<u32>,
    /// xyz per corner
    pub vertex_map: Vec<f32>,
    /// uv per corner that names a texture index
    pub texture_map: Vec<f32>,
    /// xyz per corner that names a normal index
    pub normal_map: Vec<f32>,
}

impl ObjMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.triangles.is_empty()
    }

    pub fn corner_count(&self) -> usize {
        self.vertex_map.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Flat buffers for upload. Texture and normal maps are only carried over
    /// when every corner has an entry. Indices past the last whole triangle
    /// are dropped, as a GPU draw call would.
    pub fn to_geometry(&self) -> IndexedGeometry {
        let corners = self.corner_count();
        let whole = self.triangle_count() * 3;
        if whole < self.triangles.len() {
            tracing::debug!(
                dropped = self.triangles.len() - whole,
                "trailing indices do not form a triangle"
            );
        }
        IndexedGeometry {
            positions: self.vertex_map.clone(),
            normals: if self.normal_map.len() == corners * 3 {
                self.normal_map.clone()
            } else {
                Vec::new()
            },
            tex_coords: if self.texture_map.len() == corners * 2 {
                self.texture_map.clone()
            } else {
                Vec::new()
            },
            colors: Vec::new(),
            indices: self.triangles[..whole].to_vec(),
        }
    }

    /// Standalone triangles for software rendering.
    pub fn to_mesh(&self) -> Mesh {
        self.to_geometry().to_mesh()
    }
}

/// Parse with the default, lenient options. Never fails.
pub fn parse_obj_lenient(input: &str) -> ObjMesh {
    let mut parser = ObjParser::new(ParseOptions::default());
    for (number, line) in input.lines().enumerate() {
        // Lenient mode has no error path.
        let _ = parser.line(number + 1, line);
    }
    parser.finish()
}

/// Parse OBJ text.
pub fn parse_obj(input: &str, options: ParseOptions) -> Result<ObjMesh, ObjError> {
    let mut parser = ObjParser::new(options);
    for (number, line) in input.lines().enumerate() {
        parser.line(number + 1, line)?;
    }
    Ok(parser.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Vertex,
    TexCoord,
    Normal,
    Param,
    Face,
}

impl Statement {
    fn keyword(self) -> &'static str {
        match self {
            Statement::Vertex => "v",
            Statement::TexCoord => "vt",
            Statement::Normal => "vn",
            Statement::Param => "vp",
            Statement::Face => "f",
        }
    }
}

fn statement(input: &str) -> IResult<&str, Statement> {
    terminated(
        alt((
            value(Statement::TexCoord, tag("vt")),
            value(Statement::Normal, tag("vn")),
            value(Statement::Param, tag("vp")),
            value(Statement::Vertex, tag("v")),
            value(Statement::Face, tag("f")),
        )),
        alt((space1, eof)),
    )(input)
}

fn parse_number(token: &str) -> Option<f32> {
    let parsed: IResult<&str, f32> = all_consuming(float)(token);
    parsed.ok().map(|(_, value)| value)
}

fn parse_index(token: &str) -> Option<i64> {
    let parsed: IResult<&str, i64> = all_consuming(signed_index)(token);
    parsed.ok().map(|(_, value)| value)
}

/// Map a 1-based (or negative, end-relative) OBJ index onto `0..len`.
fn resolve(raw: i64, len: usize) -> Option<usize> {
    let resolved = match raw {
        0 => return None,
        r if r > 0 => r - 1,
        r => len as i64 + r,
    };
    usize::try_from(resolved).ok().filter(|&i| i < len)
}

/// One face corner before lookup. `None` means the slot was present but
/// could not be read.
struct Corner {
    vertex: Option<i64>,
    texture: Option<Option<i64>>,
    normal: Option<Option<i64>>,
}

struct ObjParser {
    options: ParseOptions,
    mesh: ObjMesh,
    next_index: u32,
    substitutions: usize,
}

impl ObjParser {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            mesh: ObjMesh::default(),
            next_index: 0,
            substitutions: 0,
        }
    }

    fn strict(&self) -> bool {
        self.options.strictness == Strictness::Strict
    }

    fn finish(self) -> ObjMesh {
        if self.substitutions > 0 {
            tracing::warn!(
                substitutions = self.substitutions,
                "OBJ input had unreadable values, NaN substituted"
            );
        }
        tracing::debug!(
            vertices = self.mesh.vertices.len(),
            textures = self.mesh.textures.len(),
            normals = self.mesh.normals.len(),
            indices = self.mesh.triangles.len(),
            "parsed OBJ"
        );
        self.mesh
    }

    fn line(&mut self, number: usize, raw: &str) -> Result<(), ObjError> {
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            return Ok(());
        }

        let Ok((rest, kind)) = statement(content) else {
            return self.unknown(number, content);
        };
        let tokens: Vec<&str> = rest.split_whitespace().collect();

        match kind {
            Statement::Vertex => {
                let [x, y, z] = self.components::<3>(number, kind, &tokens)?;
                self.mesh.vertices.push(Point3::new(x, y, z));
            }
            Statement::TexCoord => {
                let [u, v] = self.components::<2>(number, kind, &tokens)?;
                self.mesh.textures.push(Point2::new(u, v));
            }
            Statement::Normal => {
                let [x, y, z] = self.components::<3>(number, kind, &tokens)?;
                self.mesh.normals.push(Vector3::new(x, y, z));
            }
            Statement::Param => {
                let [u] = self.components::<1>(number, kind, &tokens)?;
                self.mesh.parameter_points.push(u);
            }
            Statement::Face => self.face(number, &tokens)?,
        }
        Ok(())
    }

    fn unknown(&mut self, number: usize, content: &str) -> Result<(), ObjError> {
        let keyword = content.split_whitespace().next().unwrap_or(content);
        if IGNORED_STATEMENTS.contains(&keyword) {
            return Ok(());
        }
        if self.strict() {
            return Err(ObjError::UnsupportedStatement {
                line: number,
                keyword: keyword.to_string(),
            });
        }
        tracing::debug!(line = number, keyword, "skipping unsupported OBJ statement");
        Ok(())
    }

    /// Read the first `N` numbers of a statement.
    fn components<const N: usize>(
        &mut self,
        number: usize,
        kind: Statement,
        tokens: &[&str],
    ) -> Result<[f32; N], ObjError> {
        if tokens.len() < N && self.strict() {
            return Err(ObjError::MissingComponent {
                line: number,
                statement: kind.keyword(),
                expected: N,
                found: tokens.len(),
            });
        }

        let mut values = [f32::NAN; N];
        for (slot, token) in values.iter_mut().zip(tokens) {
            match parse_number(token) {
                Some(value) => *slot = value,
                None if self.strict() => {
                    return Err(ObjError::MalformedNumber {
                        line: number,
                        token: token.to_string(),
                    })
                }
                None => self.substitutions += 1,
            }
        }
        self.substitutions += N.saturating_sub(tokens.len());
        Ok(values)
    }

    fn face(&mut self, number: usize, groups: &[&str]) -> Result<(), ObjError> {
        if groups.len() < 3 && self.strict() {
            return Err(ObjError::DegenerateFace {
                line: number,
                corners: groups.len(),
            });
        }

        let corners = groups
            .iter()
            .map(|group| self.corner(number, group))
            .collect::<Result<Vec<_>, _>>()?;

        let first = self.next_index;
        for corner in &corners {
            self.emit(number, corner)?;
        }
        self.next_index += corners.len() as u32;

        match self.options.face_mode {
            FaceMode::Sequential => self.mesh.triangles.extend(first..self.next_index),
            FaceMode::Fan => {
                for i in 1..corners.len().saturating_sub(1) as u32 {
                    self.mesh
                        .triangles
                        .extend_from_slice(&[first, first + i, first + i + 1]);
                }
            }
        }
        Ok(())
    }

    fn corner(&self, number: usize, group: &str) -> Result<Corner, ObjError> {
        let parts: Vec<&str> = group.split('/').collect();
        let malformed = || ObjError::MalformedIndex {
            line: number,
            token: group.to_string(),
        };

        if parts.len() > 3 && self.strict() {
            return Err(malformed());
        }

        let read = |part: &str| -> Result<Option<i64>, ObjError> {
            match parse_index(part) {
                Some(value) => Ok(Some(value)),
                None if self.strict() => Err(malformed()),
                None => Ok(None),
            }
        };

        let vertex = read(parts[0])?;
        let texture = match parts.get(1) {
            Some(part) if !part.is_empty() => Some(read(part)?),
            _ => None,
        };
        let normal = match parts.get(2) {
            Some(part) if !part.is_empty() => Some(read(part)?),
            _ => None,
        };

        Ok(Corner {
            vertex,
            texture,
            normal,
        })
    }

    fn lookup(
        &mut self,
        number: usize,
        attribute: Attribute,
        raw: Option<i64>,
        len: usize,
    ) -> Result<Option<usize>, ObjError> {
        let resolved = raw.and_then(|raw| resolve(raw, len));
        if resolved.is_none() {
            if let (Some(index), true) = (raw, self.strict()) {
                return Err(ObjError::IndexOutOfRange {
                    line: number,
                    attribute,
                    index,
                    len,
                });
            }
            self.substitutions += 1;
        }
        Ok(resolved)
    }

    fn emit(&mut self, number: usize, corner: &Corner) -> Result<(), ObjError> {
        let vertex = self.lookup(
            number,
            Attribute::Vertex,
            corner.vertex,
            self.mesh.vertices.len(),
        )?;
        let position = vertex.map_or([f32::NAN; 3], |i| {
            let p = self.mesh.vertices[i];
            [p.x, p.y, p.z]
        });
        self.mesh.vertex_map.extend_from_slice(&position);

        if let Some(texture) = corner.texture {
            let slot = self.lookup(number, Attribute::Texture, texture, self.mesh.textures.len())?;
            let uv = slot.map_or([f32::NAN; 2], |i| {
                let t = self.mesh.textures[i];
                [t.x, t.y]
            });
            self.mesh.texture_map.extend_from_slice(&uv);
        }

        if let Some(normal) = corner.normal {
            let slot = self.lookup(number, Attribute::Normal, normal, self.mesh.normals.len())?;
            let n = slot.map_or([f32::NAN; 3], |i| {
                let n = self.mesh.normals[i];
                [n.x, n.y, n.z]
            });
            self.mesh.normal_map.extend_from_slice(&n);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    const TEXTURED_QUAD: &str = "\
# quad with uvs and a shared normal
o quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
s off
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    fn strict() -> ParseOptions {
        ParseOptions::default().with_strictness(Strictness::Strict)
    }

    #[test]
    fn test_single_triangle() {
        let mesh = parse_obj_lenient(TRIANGLE);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangles, vec![0, 1, 2]);
        assert_eq!(
            mesh.vertex_map,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert!(mesh.texture_map.is_empty());
        assert!(mesh.normal_map.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let mesh = parse_obj_lenient("");
        assert!(mesh.is_empty());
        assert!(!parse_obj_lenient(TRIANGLE).is_empty());
        assert_eq!(mesh, ObjMesh::default());
        assert_eq!(parse_obj("", strict()), Ok(ObjMesh::default()));
    }

    #[test]
    fn test_out_of_range_index_lenient_yields_nan() {
        let mesh = parse_obj_lenient("v 0 0 0\nv 1 0 0\nf 1 2 7\n");
        assert_eq!(mesh.triangles, vec![0, 1, 2]);
        assert_eq!(&mesh.vertex_map[..6], &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert!(mesh.vertex_map[6..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_out_of_range_index_strict_errors() {
        let result = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 7\n", strict());
        assert_eq!(
            result,
            Err(ObjError::IndexOutOfRange {
                line: 3,
                attribute: Attribute::Vertex,
                index: 7,
                len: 2,
            })
        );
    }

    #[test]
    fn test_malformed_number() {
        let mesh = parse_obj_lenient("v 1 abc 3\n");
        let v = mesh.vertices[0];
        assert_eq!(v.x, 1.0);
        assert!(v.y.is_nan());
        assert_eq!(v.z, 3.0);

        assert_eq!(
            parse_obj("v 1 abc 3\n", strict()),
            Err(ObjError::MalformedNumber {
                line: 1,
                token: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_missing_component() {
        let mesh = parse_obj_lenient("vn 0 1\n");
        assert!(mesh.normals[0].z.is_nan());

        assert!(matches!(
            parse_obj("vn 0 1\n", strict()),
            Err(ObjError::MissingComponent {
                statement: "vn",
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_statement() {
        let mesh = parse_obj_lenient("bogus 1 2\nv 1 2 3\n");
        assert_eq!(mesh.vertices.len(), 1);

        assert_eq!(
            parse_obj("bogus 1 2\n", strict()),
            Err(ObjError::UnsupportedStatement {
                line: 1,
                keyword: "bogus".to_string()
            })
        );
    }

    #[test]
    fn test_textured_quad_sequential() {
        let mesh = parse_obj(TEXTURED_QUAD, strict()).unwrap();
        assert_eq!(mesh.triangles, vec![0, 1, 2, 3]);
        assert_eq!(mesh.texture_map, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert_eq!(mesh.normal_map.len(), 12);
    }

    #[test]
    fn test_untriangulated_faces_still_upload() {
        let input = format!("{TEXTURED_QUAD}f 3\n");
        let mesh = parse_obj_lenient(&input);
        assert_eq!(mesh.triangles, vec![0, 1, 2, 3, 4]);

        let geometry = mesh.to_geometry();
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.validate(), Ok(()));
        assert_eq!(geometry.vertex_count(), 5);
    }

    #[test]
    fn test_textured_quad_fan() {
        let options = strict().with_face_mode(FaceMode::Fan);
        let mesh = parse_obj(TEXTURED_QUAD, options).unwrap();
        assert_eq!(mesh.triangles, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.corner_count(), 4);

        let geometry = mesh.to_geometry();
        assert!(geometry.validate().is_ok());
        assert!(geometry.has_tex_coords());
        assert!(geometry.has_normals());

        let mesh = mesh.to_mesh();
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.triangles[1].vertices[2].normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_fan_offsets_across_faces() {
        let input = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        let options = ParseOptions::default().with_face_mode(FaceMode::Fan);
        let mesh = parse_obj(input, options).unwrap();
        assert_eq!(mesh.triangles, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_vertex_normal_without_texture() {
        let mesh = parse_obj_lenient("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n");
        assert!(mesh.texture_map.is_empty());
        assert_eq!(mesh.normal_map, [0.0, 0.0, 1.0].repeat(3));
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let mesh = parse_obj_lenient("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");
        assert_eq!(
            mesh.vertex_map,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_parameter_points_keep_u() {
        let mesh = parse_obj_lenient("vp 0.25 0.5\nvp 0.75\n");
        assert_eq!(mesh.parameter_points, vec![0.25, 0.75]);
    }

    #[test]
    fn test_crlf_and_trailing_comments() {
        let mesh = parse_obj(
            "v 0 0 0 # origin\r\nv 1 0 0\r\nv 0 1 0\r\nf 1 2 3\r\n",
            strict(),
        )
        .unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_degenerate_face_strict() {
        assert_eq!(
            parse_obj("v 0 0 0\nf 1 1\n", strict()),
            Err(ObjError::DegenerateFace { line: 2, corners: 2 })
        );
    }

    #[test]
    fn test_keyword_needs_separator() {
        let mesh = parse_obj_lenient("vx 1 2 3\n");
        assert!(mesh.vertices.is_empty());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(1, 3), Some(0));
        assert_eq!(resolve(3, 3), Some(2));
        assert_eq!(resolve(4, 3), None);
        assert_eq!(resolve(0, 3), None);
        assert_eq!(resolve(-1, 3), Some(2));
        assert_eq!(resolve(-4, 3), None);
    }
}
