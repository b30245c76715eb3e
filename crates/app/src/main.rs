//! Entry point: load OBJ models, derive render attributes and log a summary.
//! Usage: app [--numbers=strict|lenient] [--extents[=on|off]] <file.obj>...

use std::{path::PathBuf, thread};

use anyhow::{Result, bail};
use asset::{
    NumberMode, ParseOptions,
    model::{Model, load_model_from_path},
};

fn parse_numbers_arg() -> NumberMode {
    // Accept: --numbers=strict|lenient
    let mut mode = NumberMode::Strict;
    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--numbers=") {
            mode = match val.to_ascii_lowercase().as_str() {
                "strict" => NumberMode::Strict,
                "lenient" | "nan" => NumberMode::Lenient,
                other => {
                    log::warn!("Unknown number mode '{}', falling back to strict.", other);
                    NumberMode::Strict
                }
            };
        }
    }
    mode
}

fn parse_extents_arg() -> bool {
    for arg in std::env::args().skip(1) {
        if arg == "--extents" {
            return true;
        }
        if let Some(val) = arg.strip_prefix("--extents=") {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

fn parse_paths() -> Vec<PathBuf> {
    std::env::args()
        .skip(1)
        .filter(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .collect()
}

fn summarize(model: &Model, show_extents: bool) -> Result<()> {
    let rendered = model.render_geometries()?;
    let vertices: usize = rendered.iter().map(|g| g.vertex_count).sum();
    log::info!(
        "{}: {} geometries, {} vertices, {} materials, {} diagnostics",
        model.path.display(),
        rendered.len(),
        vertices,
        model.materials.len(),
        model.diagnostics.len()
    );

    for geo in &rendered {
        log::info!(
            "  [{}] groups={} material={} vertices={} uv={} normal={} color={} tangent={}",
            geo.object,
            geo.groups.join(","),
            geo.material,
            geo.vertex_count,
            !geo.texcoord.is_constant(),
            !geo.normal.is_constant(),
            !geo.color.is_constant(),
            !geo.tangent.is_constant()
        );
        if model.materials.get(&geo.material).is_none() {
            log::debug!("  material '{}' not defined, using fallback", geo.material);
        }
    }

    for (name, material) in model.materials.iter() {
        for texture in material.texture_refs() {
            log::debug!("  {} -> {}", name, model.texture_path(texture).display());
        }
    }

    if show_extents {
        match model.extents() {
            Some(ext) => log::info!(
                "  extents min={:?} max={:?} size={:?} center={:?}",
                ext.min,
                ext.max,
                ext.size(),
                ext.center()
            ),
            None => log::info!("  extents: empty"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = ParseOptions {
        numbers: parse_numbers_arg(),
    };
    let show_extents = parse_extents_arg();
    let paths = parse_paths();
    if paths.is_empty() {
        bail!("Usage: app [--numbers=strict|lenient] [--extents] <file.obj>...");
    }
    log::info!(
        "Loading {} model(s). numbers={:?}, extents={}",
        paths.len(),
        options.numbers,
        show_extents
    );

    // Parses share no state, one thread per file.
    let models: Vec<Result<Model>> = thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| scope.spawn(move || load_model_from_path(path, &options)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("Loader thread panicked")))
            })
            .collect()
    });

    let mut failed = 0;
    for model in models {
        match model.and_then(|m| summarize(&m, show_extents)) {
            Ok(()) => {}
            Err(e) => {
                log::error!("{:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} model(s) failed to load", failed, paths.len());
    }
    log::info!("Done.");
    Ok(())
}
