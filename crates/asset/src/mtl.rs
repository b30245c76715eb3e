//! MTL material-library parser.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use corelib::{ErrorKind, ParseError, ParseResult};

use crate::text::{self, Diagnostic, Line, NumberMode, ParseOptions};

/// Reflectance terms and texture references of one named material.
/// Map fields hold the raw filename text; resolving them is up to the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub ambient: Option<[f32; 3]>,
    pub diffuse: Option<[f32; 3]>,
    pub specular: Option<[f32; 3]>,
    pub emissive: Option<[f32; 3]>,
    pub shininess: Option<f32>,
    pub opacity: Option<f32>,
    pub optical_density: Option<f32>,
    /// `illum` model number.
    pub illum: Option<i32>,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub normal_map: Option<String>,
}

impl Material {
    /// Values used for any term a material leaves unset.
    pub fn fallback() -> Self {
        Self {
            ambient: Some([0.0, 0.0, 0.0]),
            diffuse: Some([1.0, 1.0, 1.0]),
            specular: Some([1.0, 1.0, 1.0]),
            shininess: Some(400.0),
            opacity: Some(1.0),
            ..Default::default()
        }
    }

    /// Fill every unset field of `self` from `base`.
    pub fn overlay(&self, base: &Material) -> Material {
        Material {
            ambient: self.ambient.or(base.ambient),
            diffuse: self.diffuse.or(base.diffuse),
            specular: self.specular.or(base.specular),
            emissive: self.emissive.or(base.emissive),
            shininess: self.shininess.or(base.shininess),
            opacity: self.opacity.or(base.opacity),
            optical_density: self.optical_density.or(base.optical_density),
            illum: self.illum.or(base.illum),
            diffuse_map: self.diffuse_map.clone().or_else(|| base.diffuse_map.clone()),
            specular_map: self
                .specular_map
                .clone()
                .or_else(|| base.specular_map.clone()),
            normal_map: self.normal_map.clone().or_else(|| base.normal_map.clone()),
        }
    }

    /// Texture filenames referenced by this material.
    pub fn texture_refs(&self) -> impl Iterator<Item = &str> {
        [&self.diffuse_map, &self.specular_map, &self.normal_map]
            .into_iter()
            .filter_map(|m| m.as_deref())
    }
}

/// Materials keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialTable {
    materials: HashMap<String, Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// The named material laid over [`Material::fallback`]; unknown names get the fallback.
    pub fn resolve(&self, name: &str) -> Material {
        let base = Material::fallback();
        self.get(name).map_or(base.clone(), |m| m.overlay(&base))
    }

    /// Insert or replace a material, returning the previous record.
    pub fn insert(&mut self, name: impl Into<String>, material: Material) -> Option<Material> {
        self.materials.insert(name.into(), material)
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn merge(&mut self, other: MaterialTable) {
        self.materials.extend(other.materials);
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Material)> {
        self.materials.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Material> {
        self.materials.get_mut(name)
    }
}

/// Result of parsing one MTL text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MtlData {
    pub materials: MaterialTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Load a material library from a file path.
pub fn load_mtl_from_path(path: impl AsRef<Path>, options: &ParseOptions) -> Result<MtlData> {
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to open MTL file: {}", path.as_ref().display()))?;
    parse_mtl_with(&contents, options)
        .with_context(|| format!("Failed to parse MTL file: {}", path.as_ref().display()))
}

pub fn parse_mtl(contents: &str) -> ParseResult<MtlData> {
    parse_mtl_with(contents, &ParseOptions::default())
}

pub fn parse_mtl_with(contents: &str, options: &ParseOptions) -> ParseResult<MtlData> {
    let mut ctx = MtlContext {
        numbers: options.numbers,
        current: None,
        data: MtlData::default(),
    };
    for line in text::lines(contents) {
        ctx.apply(&line)
            .map_err(|kind| ParseError::new(line.number, kind))?;
    }
    log::debug!("Parsed MTL: {} materials", ctx.data.materials.len());
    Ok(ctx.data)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword<'a> {
    NewMtl,
    Shininess,
    Ambient,
    Diffuse,
    Specular,
    Emissive,
    DiffuseMap,
    SpecularMap,
    BumpMap,
    OpticalDensity,
    Dissolve,
    Illum,
    Unknown(&'a str),
}

impl<'a> Keyword<'a> {
    fn from_token(token: &'a str) -> Self {
        match token {
            "newmtl" => Keyword::NewMtl,
            "Ns" => Keyword::Shininess,
            "Ka" => Keyword::Ambient,
            "Kd" => Keyword::Diffuse,
            "Ks" => Keyword::Specular,
            "Ke" => Keyword::Emissive,
            "map_Kd" => Keyword::DiffuseMap,
            "map_Ns" => Keyword::SpecularMap,
            "map_Bump" => Keyword::BumpMap,
            "Ni" => Keyword::OpticalDensity,
            "d" => Keyword::Dissolve,
            "illum" => Keyword::Illum,
            other => Keyword::Unknown(other),
        }
    }
}

struct MtlContext {
    numbers: NumberMode,
    current: Option<String>,
    data: MtlData,
}

impl MtlContext {
    fn apply(&mut self, line: &Line<'_>) -> Result<(), ErrorKind> {
        let keyword = Keyword::from_token(line.keyword);
        match keyword {
            Keyword::NewMtl => {
                if line.rest.is_empty() {
                    return Err(ErrorKind::MissingField("material name"));
                }
                self.data
                    .materials
                    .insert(line.rest, Material::default());
                self.current = Some(line.rest.to_string());
                return Ok(());
            }
            Keyword::Unknown(name) => {
                log::warn!("MTL line {}: unhandled keyword '{}'", line.number, name);
                self.data.diagnostics.push(Diagnostic::UnknownKeyword {
                    line: line.number,
                    keyword: name.to_string(),
                });
                return Ok(());
            }
            _ => {}
        }

        let numbers = self.numbers;
        let material = self
            .current
            .as_deref()
            .and_then(|name| self.data.materials.get_mut(name))
            .ok_or_else(|| ErrorKind::UndefinedCurrentMaterial {
                keyword: line.keyword.to_string(),
            })?;

        let scalar = |field| -> Result<f32, ErrorKind> {
            let token = line.args.first().ok_or(ErrorKind::MissingField(field))?;
            text::parse_float(token, field, line.number, numbers)
        };
        let rgb = |field| text::parse_floats::<3>(&line.args, field, line.number, numbers);
        let map = |field| -> Result<String, ErrorKind> {
            if line.rest.is_empty() {
                Err(ErrorKind::MissingField(field))
            } else {
                Ok(line.rest.to_string())
            }
        };

        match keyword {
            Keyword::Shininess => material.shininess = Some(scalar("Ns")?),
            Keyword::Ambient => material.ambient = Some(rgb("Ka")?),
            Keyword::Diffuse => material.diffuse = Some(rgb("Kd")?),
            Keyword::Specular => material.specular = Some(rgb("Ks")?),
            Keyword::Emissive => material.emissive = Some(rgb("Ke")?),
            Keyword::DiffuseMap => material.diffuse_map = Some(map("map_Kd")?),
            Keyword::SpecularMap => material.specular_map = Some(map("map_Ns")?),
            Keyword::BumpMap => material.normal_map = Some(map("map_Bump")?),
            Keyword::OpticalDensity => material.optical_density = Some(scalar("Ni")?),
            Keyword::Dissolve => material.opacity = Some(scalar("d")?),
            Keyword::Illum => {
                let token = line.args.first().ok_or(ErrorKind::MissingField("illum"))?;
                material.illum = text::parse_int(token, "illum", line.number, numbers)?;
            }
            Keyword::NewMtl | Keyword::Unknown(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"
        # exported
        newmtl stone
        Ns 96.078431
        Ka 1.000000 1.000000 1.000000
        Kd 0.640000 0.640000 0.640000
        Ks 0.500000 0.500000 0.500000
        Ke 0.0 0.0 0.0
        Ni 1.000000
        d 1.000000
        illum 2
        map_Kd textures/stone wall.png
        map_Ns stone_spec.png
        map_Bump stone_normal.png

        newmtl glass
        d 0.25
    "#;

    #[test]
    fn parses_all_properties() {
        let mtl = parse_mtl(LIBRARY).expect("parse library");
        assert_eq!(mtl.materials.len(), 2);
        let stone = mtl.materials.get("stone").unwrap();
        assert_eq!(stone.shininess, Some(96.078431));
        assert_eq!(stone.ambient, Some([1.0, 1.0, 1.0]));
        assert_eq!(stone.diffuse, Some([0.64, 0.64, 0.64]));
        assert_eq!(stone.specular, Some([0.5, 0.5, 0.5]));
        assert_eq!(stone.emissive, Some([0.0, 0.0, 0.0]));
        assert_eq!(stone.optical_density, Some(1.0));
        assert_eq!(stone.opacity, Some(1.0));
        assert_eq!(stone.illum, Some(2));
        assert_eq!(stone.diffuse_map.as_deref(), Some("textures/stone wall.png"));
        assert_eq!(stone.specular_map.as_deref(), Some("stone_spec.png"));
        assert_eq!(stone.normal_map.as_deref(), Some("stone_normal.png"));
        assert_eq!(stone.texture_refs().count(), 3);

        let glass = mtl.materials.get("glass").unwrap();
        assert_eq!(glass.opacity, Some(0.25));
        assert_eq!(glass.diffuse, None);
    }

    #[test]
    fn property_before_newmtl_is_an_error() {
        let err = parse_mtl("Kd 1 1 1\nnewmtl late").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(
            err.kind,
            ErrorKind::UndefinedCurrentMaterial {
                keyword: "Kd".into()
            }
        );
    }

    #[test]
    fn unknown_keywords_are_diagnosed() {
        let mtl = parse_mtl("newmtl a\nTf 1 1 1\nKd 0 0 1").unwrap();
        assert_eq!(mtl.diagnostics.len(), 1);
        assert_eq!(mtl.materials.get("a").unwrap().diffuse, Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn hash_in_names_and_maps_is_kept() {
        let mtl = parse_mtl("newmtl a\nmap_Kd tex#1.png\nnewmtl b#2\nd 0.5\n").unwrap();
        let a = mtl.materials.get("a").unwrap();
        assert_eq!(a.diffuse_map.as_deref(), Some("tex#1.png"));
        assert_eq!(mtl.materials.get("b#2").map(|m| m.opacity), Some(Some(0.5)));
        assert!(mtl.materials.get("b").is_none());
    }

    #[test]
    fn redefinition_starts_a_fresh_record() {
        let mtl = parse_mtl("newmtl a\nNs 10\nnewmtl a\nd 0.5").unwrap();
        let a = mtl.materials.get("a").unwrap();
        assert_eq!(a.shininess, None);
        assert_eq!(a.opacity, Some(0.5));
    }

    #[test]
    fn malformed_numbers_strict_and_lenient() {
        let src = "newmtl a\nNs shiny\nillum two";
        let err = parse_mtl(src).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ErrorKind::MalformedNumericField { .. }));

        let mtl = parse_mtl_with(src, &ParseOptions::lenient()).unwrap();
        let a = mtl.materials.get("a").unwrap();
        assert!(a.shininess.unwrap().is_nan());
        assert_eq!(a.illum, None);
    }

    #[test]
    fn resolve_overlays_fallback() {
        let mtl = parse_mtl("newmtl red\nKd 1 0 0").unwrap();
        let red = mtl.materials.resolve("red");
        assert_eq!(red.diffuse, Some([1.0, 0.0, 0.0]));
        assert_eq!(red.shininess, Some(400.0));
        assert_eq!(red.opacity, Some(1.0));
        assert_eq!(mtl.materials.resolve("missing"), Material::fallback());
    }

    #[test]
    fn merge_prefers_later_tables() {
        let mut first = parse_mtl("newmtl a\nd 0.1\nnewmtl b\nd 0.2").unwrap().materials;
        let second = parse_mtl("newmtl a\nd 0.9").unwrap().materials;
        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("a").unwrap().opacity, Some(0.9));
        assert_eq!(first.get("b").unwrap().opacity, Some(0.2));
    }
}
