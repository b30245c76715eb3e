//! Mesh file plus the material libraries it references.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use corelib::GeometryResult;

use crate::{
    finalize::{RenderGeometry, finalize_all},
    mesh::{Extents, Geometry, extents_of},
    mtl::{Material, MaterialTable, load_mtl_from_path},
    obj::load_obj_from_path,
    text::{Diagnostic, ParseOptions},
};

/// A parsed mesh file with its merged material table.
#[derive(Clone, Debug)]
pub struct Model {
    pub path: PathBuf,
    pub geometries: Vec<Geometry>,
    pub material_libs: Vec<String>,
    pub materials: MaterialTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Load a mesh file and every `mtllib` it names, resolved against the mesh
/// file's directory. Libraries that cannot be read are logged and skipped;
/// libraries that fail to parse abort the load.
pub fn load_model_from_path(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Model> {
    let path = path.as_ref();
    log::info!("Loading model from {:?}", path);

    let obj = load_obj_from_path(path, options)?;
    let base = base_dir(path);

    let mut materials = MaterialTable::new();
    let mut diagnostics = obj.diagnostics;
    for lib in &obj.material_libs {
        let lib_path = base.join(lib);
        if !lib_path.is_file() {
            log::warn!("Material library {:?} not found, skipping", lib_path);
            continue;
        }
        let mtl = load_mtl_from_path(&lib_path, options)
            .with_context(|| format!("Failed to load material library '{}'", lib))?;
        diagnostics.extend(mtl.diagnostics);
        materials.merge(mtl.materials);
    }

    log::info!(
        "Loaded {:?}: {} geometries, {} materials",
        path,
        obj.geometries.len(),
        materials.len()
    );

    Ok(Model {
        path: path.to_path_buf(),
        geometries: obj.geometries,
        material_libs: obj.material_libs,
        materials,
        diagnostics,
    })
}

fn base_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

impl Model {
    /// Directory that relative library and texture references resolve against.
    pub fn base_dir(&self) -> PathBuf {
        base_dir(&self.path)
    }

    /// Resolve a raw texture filename from a material.
    pub fn texture_path(&self, file: &str) -> PathBuf {
        self.base_dir().join(file)
    }

    pub fn extents(&self) -> Option<Extents> {
        extents_of(&self.geometries)
    }

    /// Material for a geometry, with fallback values for anything unset.
    pub fn material_for(&self, geometry: &Geometry) -> Material {
        self.materials.resolve(&geometry.material)
    }

    /// Finalize all geometries for upload.
    pub fn render_geometries(&self) -> GeometryResult<Vec<RenderGeometry>> {
        finalize_all(self.geometries.clone())
    }
}
