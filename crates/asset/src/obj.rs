//! OBJ mesh parser: attribute pools, fan triangulation and geometry
//! segmentation by object/group/material.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result};
use corelib::{ErrorKind, ParseError, ParseResult};

use crate::{
    mesh::{Channel, Geometry},
    pool::AttributePool,
    text::{self, Diagnostic, Line, NumberMode, ParseOptions},
};

const DEFAULT_LABEL: &str = "default";

/// Result of parsing one OBJ text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjData {
    pub geometries: Vec<Geometry>,
    /// `mtllib` references in file order, duplicates kept.
    pub material_libs: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>, options: &ParseOptions) -> Result<ObjData> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.as_ref().display()))?;
    load_obj_from_reader(BufReader::new(file), options)
        .with_context(|| format!("Failed to parse OBJ file: {}", path.as_ref().display()))
}

/// Load an OBJ mesh from any reader. The whole input is buffered before parsing.
pub fn load_obj_from_reader<R: Read>(mut reader: R, options: &ParseOptions) -> Result<ObjData> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .context("Failed to read OBJ text")?;
    Ok(parse_obj_with(&contents, options)?)
}

/// Convenience helper to parse an OBJ string literal with default options.
pub fn load_obj_from_str(contents: &str) -> ParseResult<ObjData> {
    parse_obj(contents)
}

pub fn parse_obj(contents: &str) -> ParseResult<ObjData> {
    parse_obj_with(contents, &ParseOptions::default())
}

pub fn parse_obj_with(contents: &str, options: &ParseOptions) -> ParseResult<ObjData> {
    let mut ctx = ObjContext::new(options.numbers);
    for line in text::lines(contents) {
        ctx.apply(&line)
            .map_err(|kind| ParseError::new(line.number, kind))?;
    }
    Ok(ctx.finish())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword<'a> {
    Vertex,
    Normal,
    Texcoord,
    Face,
    Group,
    Object,
    UseMtl,
    MtlLib,
    Smoothing,
    Unknown(&'a str),
}

impl<'a> Keyword<'a> {
    fn from_token(token: &'a str) -> Self {
        match token {
            "v" => Keyword::Vertex,
            "vn" => Keyword::Normal,
            "vt" => Keyword::Texcoord,
            "f" => Keyword::Face,
            "g" => Keyword::Group,
            "o" => Keyword::Object,
            "usemtl" => Keyword::UseMtl,
            "mtllib" => Keyword::MtlLib,
            "s" => Keyword::Smoothing,
            other => Keyword::Unknown(other),
        }
    }
}

/// Which geometry face vertices currently land in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GeometrySlot {
    /// Nothing open; the next face creates a geometry with the current labels.
    Empty,
    /// Index into `geometries`.
    Open(usize),
}

/// One resolved face-vertex.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: [f32; 3],
    color: [f32; 3],
    texcoord: Option<[f32; 2]>,
    normal: Option<[f32; 3]>,
}

struct ObjContext {
    numbers: NumberMode,

    positions: AttributePool<3>,
    texcoords: AttributePool<2>,
    normals: AttributePool<3>,
    // Kept parallel to `positions`; uncolored vertices hold zeros.
    colors: AttributePool<3>,
    colors_present: bool,

    object: String,
    groups: Vec<String>,
    material: String,
    slot: GeometrySlot,

    geometries: Vec<Geometry>,
    material_libs: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ObjContext {
    fn new(numbers: NumberMode) -> Self {
        Self {
            numbers,
            positions: AttributePool::new("position"),
            texcoords: AttributePool::new("texcoord"),
            normals: AttributePool::new("normal"),
            colors: AttributePool::new("color"),
            colors_present: false,
            object: DEFAULT_LABEL.to_string(),
            groups: vec![DEFAULT_LABEL.to_string()],
            material: DEFAULT_LABEL.to_string(),
            slot: GeometrySlot::Empty,
            geometries: Vec::new(),
            material_libs: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn apply(&mut self, line: &Line<'_>) -> Result<(), ErrorKind> {
        match Keyword::from_token(line.keyword) {
            Keyword::Vertex => self.vertex(line),
            Keyword::Normal => {
                let n =
                    text::parse_floats::<3>(line.data_args(), "normal", line.number, self.numbers)?;
                self.normals.push(n);
                Ok(())
            }
            Keyword::Texcoord => {
                let uv = text::parse_floats::<2>(
                    line.data_args(),
                    "texcoord",
                    line.number,
                    self.numbers,
                )?;
                self.texcoords.push(uv);
                Ok(())
            }
            Keyword::Face => self.face(line.data_args()),
            Keyword::Group => {
                let names = line.data_args();
                self.groups = if names.is_empty() {
                    vec![DEFAULT_LABEL.to_string()]
                } else {
                    names.iter().map(|g| g.to_string()).collect()
                };
                self.state_changed();
                Ok(())
            }
            Keyword::Object => {
                self.object = required(line.rest, "object name")?;
                self.state_changed();
                Ok(())
            }
            Keyword::UseMtl => {
                self.material = required(line.rest, "material name")?;
                self.state_changed();
                Ok(())
            }
            Keyword::MtlLib => {
                if line.args.is_empty() {
                    return Err(ErrorKind::MissingField("material library name"));
                }
                self.material_libs.push(line.args.join(" "));
                Ok(())
            }
            // Smoothing groups are not modeled.
            Keyword::Smoothing => Ok(()),
            Keyword::Unknown(keyword) => {
                log::warn!("OBJ line {}: unhandled keyword '{}'", line.number, keyword);
                self.diagnostics.push(Diagnostic::UnknownKeyword {
                    line: line.number,
                    keyword: keyword.to_string(),
                });
                Ok(())
            }
        }
    }

    /// `v x y z [w]` or `v x y z r g b`.
    fn vertex(&mut self, line: &Line<'_>) -> Result<(), ErrorKind> {
        let args = line.data_args();
        let position = text::parse_floats::<3>(args, "vertex position", line.number, self.numbers)?;
        let color = match args.len() {
            3 | 4 => None,
            5 => return Err(ErrorKind::MissingField("vertex color component")),
            _ => Some(text::parse_floats::<3>(
                &args[3..],
                "vertex color",
                line.number,
                self.numbers,
            )?),
        };

        self.positions.push(position);
        match color {
            Some(rgb) => {
                self.colors.push(rgb);
                self.colors_present = true;
            }
            None => self.colors.push([0.0; 3]),
        }
        Ok(())
    }

    /// Fan-triangulate the polygon around its first corner.
    fn face(&mut self, tokens: &[&str]) -> Result<(), ErrorKind> {
        if tokens.len() < 3 {
            return Err(ErrorKind::InvalidFace(format!(
                "{} vertices, at least 3 required",
                tokens.len()
            )));
        }
        let corners = tokens
            .iter()
            .map(|token| self.corner(token))
            .collect::<Result<Vec<_>, _>>()?;

        let idx = self.open_geometry();
        let with_color = self.colors_present;
        let geometry = &mut self.geometries[idx];
        for tri in 0..corners.len() - 2 {
            for corner in [&corners[0], &corners[tri + 1], &corners[tri + 2]] {
                emit(geometry, corner, with_color);
            }
        }
        Ok(())
    }

    /// Resolve a `pos[/tex][/norm]` token.
    fn corner(&self, token: &str) -> Result<Corner, ErrorKind> {
        let fields: Vec<&str> = token.split('/').collect();
        if fields.len() > 3 {
            return Err(ErrorKind::InvalidFace(format!(
                "face vertex '{}' has more than 3 fields",
                token
            )));
        }
        let pos_raw = match fields[0] {
            "" => {
                return Err(ErrorKind::InvalidFace(format!(
                    "face vertex '{}' has no position index",
                    token
                )));
            }
            raw => parse_index(raw, "position index")?,
        };

        let texcoord = match fields.get(1) {
            Some(raw) if !raw.is_empty() => {
                Some(self.texcoords.fetch(parse_index(raw, "texcoord index")?)?)
            }
            _ => None,
        };
        let normal = match fields.get(2) {
            Some(raw) if !raw.is_empty() => {
                Some(self.normals.fetch(parse_index(raw, "normal index")?)?)
            }
            _ => None,
        };

        Ok(Corner {
            position: self.positions.fetch(pos_raw)?,
            color: self.colors.fetch(pos_raw)?,
            texcoord,
            normal,
        })
    }

    /// Close the open geometry so the next face starts one under the new
    /// labels. Geometries are only opened by faces, so an open one always
    /// holds vertices.
    fn state_changed(&mut self) {
        self.slot = GeometrySlot::Empty;
    }

    fn open_geometry(&mut self) -> usize {
        match self.slot {
            GeometrySlot::Open(idx) => idx,
            GeometrySlot::Empty => {
                self.geometries.push(Geometry::new(
                    self.object.clone(),
                    self.groups.clone(),
                    self.material.clone(),
                ));
                let idx = self.geometries.len() - 1;
                self.slot = GeometrySlot::Open(idx);
                idx
            }
        }
    }

    fn finish(mut self) -> ObjData {
        for geometry in &mut self.geometries {
            geometry.drop_empty_channels();
        }
        log::debug!(
            "Parsed OBJ: {} geometries, {} positions, {} texcoords, {} normals, colors={}, {} mtllibs",
            self.geometries.len(),
            self.positions.len() - 1,
            self.texcoords.len() - 1,
            self.normals.len() - 1,
            self.colors_present,
            self.material_libs.len()
        );
        ObjData {
            geometries: self.geometries,
            material_libs: self.material_libs,
            diagnostics: self.diagnostics,
        }
    }
}

fn emit(geometry: &mut Geometry, corner: &Corner, with_color: bool) {
    geometry.push(Channel::Position, &corner.position);
    if let Some(uv) = corner.texcoord {
        geometry.push(Channel::Texcoord, &uv);
    }
    if let Some(n) = corner.normal {
        geometry.push(Channel::Normal, &n);
    }
    if with_color {
        geometry.push(Channel::Color, &corner.color);
    }
}

fn parse_index(raw: &str, field: &'static str) -> Result<i64, ErrorKind> {
    raw.parse::<i64>()
        .map_err(|_| ErrorKind::MalformedNumericField {
            field,
            token: raw.to_string(),
        })
}

fn required(rest: &str, field: &'static str) -> Result<String, ErrorKind> {
    if rest.is_empty() {
        Err(ErrorKind::MissingField(field))
    } else {
        Ok(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"
        v 0 0 0
        v 1 0 0
        v 0 1 0
        vt 0 0
        vt 1 0
        vt 0 1
        f 1/1 2/2 3/3
    "#;

    #[test]
    fn parse_simple_triangle() {
        let obj = load_obj_from_str(TRIANGLE).expect("parse triangle");
        assert_eq!(obj.geometries.len(), 1);
        let geo = &obj.geometries[0];
        assert_eq!(
            geo.channel(Channel::Position),
            Some(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0][..])
        );
        assert_eq!(
            geo.channel(Channel::Texcoord),
            Some(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0][..])
        );
        assert_eq!(geo.channel(Channel::Normal), None);
        assert_eq!(geo.channel(Channel::Color), None);
        assert_eq!(geo.object, "default");
        assert_eq!(geo.groups, vec!["default".to_string()]);
        assert_eq!(geo.material, "default");
    }

    #[test]
    fn fan_triangulates_polygons() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 2 1 0
            v 1 2 0
            v 0 1 0
            f 1 2 3 4 5
        "#;
        let obj = parse_obj(src).unwrap();
        let pos = obj.geometries[0].position();
        // 5 corners -> 3 triangles -> 9 vertices.
        assert_eq!(pos.len(), 9 * 3);
        for tri in pos.chunks_exact(9) {
            assert_eq!(&tri[0..3], &[0.0, 0.0, 0.0]);
        }
        assert_eq!(&pos[3..9], &[1.0, 0.0, 0.0, 2.0, 1.0, 0.0]);
        assert_eq!(&pos[21..27], &[1.0, 2.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn negative_indices_are_relative_to_pool_end() {
        let src = r#"
            v 5 5 5
            v 0 0 0
            v 1 0 0
            v 0 1 0
            vn 0 0 1
            f -3//-1 -2//-1 -1//-1
        "#;
        let obj = parse_obj(src).unwrap();
        let geo = &obj.geometries[0];
        assert_eq!(
            geo.position(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(
            geo.channel(Channel::Normal),
            Some(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0][..])
        );
        assert_eq!(geo.channel(Channel::Texcoord), None);
    }

    #[test]
    fn vertex_colors_latch_file_wide() {
        let src = r#"
            v 0 0 0
            v 1 0 0 1 0.5 0.25
            v 0 1 0
            f 1 2 3
        "#;
        let obj = parse_obj(src).unwrap();
        let geo = &obj.geometries[0];
        assert_eq!(
            geo.channel(Channel::Color),
            Some(&[0.0, 0.0, 0.0, 1.0, 0.5, 0.25, 0.0, 0.0, 0.0][..])
        );
    }

    #[test]
    fn faces_before_first_color_carry_none() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            f 1 2 3
            v 0 0 1 1 1 1
            f 1 2 4
        "#;
        let obj = parse_obj(src).unwrap();
        let geo = &obj.geometries[0];
        assert_eq!(geo.vertex_count(), 6);
        assert_eq!(geo.channel_vertices(Channel::Color), 3);
    }

    #[test]
    fn four_field_vertex_ignores_weight() {
        let obj = parse_obj("v 0 0 0 1\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();
        assert_eq!(obj.geometries[0].channel(Channel::Color), None);
    }

    #[test]
    fn state_changes_split_geometries() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            o ship
            usemtl hull
            f 1 2 3
            g deck rail
            f 1 2 3
            usemtl sail
            f 3 2 1
        "#;
        let obj = parse_obj(src).unwrap();
        let labels: Vec<_> = obj
            .geometries
            .iter()
            .map(|g| (g.object.as_str(), g.groups.join(","), g.material.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("ship", "default".to_string(), "hull"),
                ("ship", "deck,rail".to_string(), "hull"),
                ("ship", "deck,rail".to_string(), "sail"),
            ]
        );
        assert!(obj.geometries.iter().all(|g| g.vertex_count() == 3));
    }

    #[test]
    fn repeated_usemtl_without_faces_makes_no_empty_geometry() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            usemtl a
            f 1 2 3
            usemtl b
            usemtl c
            f 1 2 3
        "#;
        let obj = parse_obj(src).unwrap();
        assert_eq!(obj.geometries.len(), 2);
        assert_eq!(obj.geometries[1].material, "c");
        assert!(obj.geometries.iter().all(Geometry::has_vertices));
    }

    #[test]
    fn trailing_comments_end_data_but_not_names() {
        let src = r#"
            # whole-line comment
            v 0 0 0 # origin
            v 1 0 0
            v 0 1 0
            usemtl brick#2
            f 1 2 3 # first face
        "#;
        let obj = parse_obj(src).unwrap();
        assert_eq!(obj.geometries.len(), 1);
        assert_eq!(obj.geometries[0].material, "brick#2");
        assert_eq!(obj.geometries[0].vertex_count(), 3);
        assert_eq!(obj.geometries[0].channel(Channel::Color), None);
    }

    #[test]
    fn mtllib_entries_are_collected_in_order() {
        let src = "mtllib a.mtl\nmtllib my  scene.mtl\nmtllib a.mtl\n";
        let obj = parse_obj(src).unwrap();
        assert_eq!(obj.material_libs, vec!["a.mtl", "my scene.mtl", "a.mtl"]);
        assert!(obj.geometries.is_empty());
    }

    #[test]
    fn unknown_keyword_is_diagnosed_and_skipped() {
        let src = format!("curv 0 1 2\ns off\n{}", TRIANGLE);
        let obj = parse_obj(&src).unwrap();
        assert_eq!(obj.geometries.len(), 1);
        assert_eq!(
            obj.diagnostics,
            vec![Diagnostic::UnknownKeyword {
                line: 1,
                keyword: "curv".into()
            }]
        );
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 3").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(matches!(
            err.kind,
            ErrorKind::IndexOutOfRange {
                channel: "position",
                raw: 3,
                ..
            }
        ));
    }

    #[test]
    fn zero_index_hits_sentinel_and_fails() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::IndexOutOfRange { raw: 0, .. }));
    }

    #[test]
    fn malformed_numbers_strict_and_lenient() {
        let src = "v 0 zero 0\nv 1 0 0\nv 0 1 0\nf 1 2 3";
        let err = parse_obj(src).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, ErrorKind::MalformedNumericField { .. }));

        let obj = parse_obj_with(src, &ParseOptions::lenient()).unwrap();
        assert!(obj.geometries[0].position()[1].is_nan());
    }

    #[test]
    fn degenerate_faces_are_rejected() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidFace(_)));
        let err = parse_obj("v 0 0 0\nf /1/1 1 1").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidFace(_)));
    }

    #[test]
    fn reader_input_matches_str_input() {
        let from_reader =
            load_obj_from_reader(std::io::Cursor::new(TRIANGLE), &ParseOptions::default())
                .unwrap();
        assert_eq!(from_reader, parse_obj(TRIANGLE).unwrap());
    }
}
