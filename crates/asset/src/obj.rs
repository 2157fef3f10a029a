//! Parser for the triangulated subset of the OBJ mesh text format.
//!
//! Recognized lines: `v x y z`, `vn x y z`, `vt u v` (V is flipped on
//! ingest) and `f p/t/n p/t/n p/t/n` with 1-based indices. `#` starts a
//! comment; any other keyword is reported to the diagnostic sink and skipped.
//! Fields are separated by spaces only, so a tab outside a comment is an error.
//!
//! Parsing makes two passes over the tokenized lines. The first counts each
//! line kind, then every array is allocated at its final size and the second
//! pass fills it.

use std::{fs, path::Path};

use crate::{
    diagnostics::{DiagnosticSink, LogSink},
    error::{AssetError, AssetResult},
    mesh::{Corner, MeshSource, ObjectVertexData, Triangle},
    tokenizer,
};

/// Load and de-index an OBJ mesh from a file path, reporting skipped lines
/// to `sink`.
pub fn load_obj_from_path(
    path: impl AsRef<Path>,
    sink: &mut dyn DiagnosticSink,
) -> AssetResult<ObjectVertexData> {
    Ok(read_mesh_source(path, sink)?.to_vertex_data())
}

/// Convenience helper to parse and de-index OBJ text. Skipped lines go to
/// the logger.
pub fn load_obj_from_str(contents: &str) -> AssetResult<ObjectVertexData> {
    Ok(parse_mesh_source(contents, &mut LogSink)?.to_vertex_data())
}

/// Read a mesh file into its indexed form.
pub fn read_mesh_source(
    path: impl AsRef<Path>,
    sink: &mut dyn DiagnosticSink,
) -> AssetResult<MeshSource> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
    parse_mesh_source(&text, sink)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword {
    Position,
    Normal,
    TexCoord,
    Face,
    Comment,
    Unknown,
}

impl Keyword {
    fn classify(tag: &str) -> Self {
        match tag {
            "v" => Keyword::Position,
            "vn" => Keyword::Normal,
            "vt" => Keyword::TexCoord,
            "f" => Keyword::Face,
            _ if tag.starts_with('#') => Keyword::Comment,
            _ => Keyword::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Counts {
    positions: usize,
    normals: usize,
    texcoords: usize,
    faces: usize,
}

/// Parse OBJ text into a [`MeshSource`], reporting skipped lines to `sink`.
pub fn parse_mesh_source(text: &str, sink: &mut dyn DiagnosticSink) -> AssetResult<MeshSource> {
    let lines = tokenizer::split_lines(text);
    let rows: Vec<Vec<&str>> = lines.iter().map(|line| tokenizer::split_fields(line)).collect();

    // Pass 1: count.
    let mut counts = Counts::default();
    for (line, fields) in lines.iter().zip(&rows) {
        let Some(&tag) = fields.first() else {
            continue;
        };
        let keyword = Keyword::classify(tag);
        if keyword != Keyword::Comment && line.contains('\t') {
            return Err(AssetError::format(
                line_number(text, line),
                "fields must be separated by spaces, found a tab",
            ));
        }
        match keyword {
            Keyword::Position => counts.positions += 1,
            Keyword::Normal => counts.normals += 1,
            Keyword::TexCoord => counts.texcoords += 1,
            Keyword::Face => counts.faces += 1,
            Keyword::Comment => {}
            Keyword::Unknown => sink.warn(&format!(
                "ignoring '{}' on line {} while loading mesh",
                tag,
                line_number(text, line)
            )),
        }
    }

    if counts.faces == 0 {
        return Err(AssetError::malformed("mesh contains no faces"));
    }
    if counts.faces > u32::MAX as usize / 3 {
        return Err(AssetError::malformed(format!(
            "too many faces ({}) for 32-bit indices",
            counts.faces
        )));
    }

    // Pass 2: fill exactly-sized arrays.
    let mut mesh = MeshSource {
        positions: Vec::with_capacity(counts.positions),
        normals: Vec::with_capacity(counts.normals),
        texcoords: Vec::with_capacity(counts.texcoords),
        triangles: Vec::with_capacity(counts.faces),
    };

    for (line, fields) in lines.iter().zip(&rows) {
        let Some(&tag) = fields.first() else {
            continue;
        };
        let line_no = || line_number(text, line);
        let args = &fields[1..];
        match Keyword::classify(tag) {
            Keyword::Position => mesh.positions.push(parse_vec3(args, line_no)?),
            Keyword::Normal => mesh.normals.push(parse_vec3(args, line_no)?),
            Keyword::TexCoord => {
                let u = parse_f32(args.first(), line_no, "u coordinate")?;
                let v = parse_f32(args.get(1), line_no, "v coordinate")?;
                mesh.texcoords.push([u, 1.0 - v]);
            }
            Keyword::Face => mesh.triangles.push(parse_face(args, &counts, line_no)?),
            Keyword::Comment | Keyword::Unknown => {}
        }
    }

    Ok(mesh)
}

/// 1-based number of `line` within `text`. `line` must be a subslice of `text`.
fn line_number(text: &str, line: &str) -> usize {
    let offset = (line.as_ptr() as usize).saturating_sub(text.as_ptr() as usize);
    text[..offset.min(text.len())].matches('\n').count() + 1
}

fn parse_vec3(args: &[&str], line_no: impl Fn() -> usize) -> AssetResult<[f32; 3]> {
    let x = parse_f32(args.first(), &line_no, "x coordinate")?;
    let y = parse_f32(args.get(1), &line_no, "y coordinate")?;
    let z = parse_f32(args.get(2), &line_no, "z coordinate")?;
    Ok([x, y, z])
}

/// Numbers always use `.` as decimal separator, whatever the host locale.
fn parse_f32(value: Option<&&str>, line_no: impl Fn() -> usize, what: &str) -> AssetResult<f32> {
    let token = value.ok_or_else(|| AssetError::format(line_no(), format!("missing {what}")))?;
    match token.parse::<f32>() {
        Ok(n) if n.is_finite() => Ok(n),
        Ok(_) => Err(AssetError::format(line_no(), format!("non-finite {what} '{token}'"))),
        Err(_) => Err(AssetError::format(line_no(), format!("invalid {what} '{token}'"))),
    }
}

fn parse_face(
    args: &[&str],
    counts: &Counts,
    line_no: impl Fn() -> usize,
) -> AssetResult<Triangle> {
    match args.len() {
        3 => {}
        n if n < 3 => {
            return Err(AssetError::format(
                line_no(),
                format!("face has {n} corners, expected 3"),
            ));
        }
        n => {
            return Err(AssetError::format(
                line_no(),
                format!("face has {n} corners; polygons must be triangulated before export"),
            ));
        }
    }

    let mut triangle = [Corner::default(); 3];
    for (corner, token) in triangle.iter_mut().zip(args) {
        *corner = parse_corner(token, counts, &line_no)?;
    }
    Ok(triangle)
}

/// Parse a `position/uv/normal` corner. All three indices are required.
fn parse_corner(token: &str, counts: &Counts, line_no: impl Fn() -> usize) -> AssetResult<Corner> {
    let mut parts = token.split('/');
    let mut next = |what: &str| match parts.next() {
        Some(part) if !part.is_empty() => Ok(part),
        _ => Err(AssetError::format(
            line_no(),
            format!("corner '{token}' is missing its {what} index (expected position/uv/normal)"),
        )),
    };
    let position = next("position")?;
    let uv = next("uv")?;
    let normal = next("normal")?;
    if parts.next().is_some() {
        return Err(AssetError::format(
            line_no(),
            format!("corner '{token}' has more than three indices"),
        ));
    }

    Ok(Corner {
        position: resolve_index(position, counts.positions, "position", &line_no)?,
        uv: resolve_index(uv, counts.texcoords, "uv", &line_no)?,
        normal: resolve_index(normal, counts.normals, "normal", &line_no)?,
    })
}

/// Convert a 1-based index into a checked 0-based one.
fn resolve_index(
    token: &str,
    len: usize,
    what: &str,
    line_no: impl Fn() -> usize,
) -> AssetResult<usize> {
    let raw = token.parse::<i64>().map_err(|_| {
        AssetError::format(line_no(), format!("invalid {what} index '{token}'"))
    })?;
    if raw < 1 {
        return Err(AssetError::format(
            line_no(),
            format!("{what} indices are 1-based and positive; found {raw}"),
        ));
    }

    let idx = (raw - 1) as u64;
    if idx >= len as u64 {
        return Err(AssetError::format(
            line_no(),
            format!("{what} index {raw} out of range (count={len})"),
        ));
    }
    Ok(idx as usize)
}
