// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod datalayer;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod model;
pub mod registry;
pub mod types;

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::{ConfigFile, build_catalog};
use crate::dag::CatalogState;
use crate::model::WindowTypeKey;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the manifest (which compiles every window type's
/// DAG), then prints the dispatch plan.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    info!(
        config = %config_path.display(),
        processors = cfg.registrations.len(),
        "manifest validated"
    );

    let (_registry, catalog, _) = build_catalog(cfg.registrations.clone())?;
    let snapshot = catalog.snapshot();

    print!("{}", format_plan(&cfg, &snapshot, args.window.as_ref())?);
    Ok(())
}

/// Render coordinator settings, processors, and the topological layers of
/// each window type's DAG. With `window`, only that window type is shown.
pub fn format_plan(
    cfg: &ConfigFile,
    catalog: &CatalogState,
    window: Option<&WindowTypeKey>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_plan(&mut out, cfg, catalog, window)?;
    debug!("plan rendered");
    Ok(out)
}

fn write_plan(
    out: &mut impl fmt::Write,
    cfg: &ConfigFile,
    catalog: &CatalogState,
    window: Option<&WindowTypeKey>,
) -> fmt::Result {
    let settings = cfg.engine_settings();

    writeln!(out, "orca plan")?;
    writeln!(
        out,
        "  heartbeat: every {:?}, timeout {:?}, lost after {} misses",
        settings.heartbeat.interval, settings.heartbeat.timeout, settings.heartbeat.max_missed
    )?;
    writeln!(out)?;

    writeln!(out, "processors ({}):", cfg.registrations.len())?;
    for registration in cfg.registrations.iter() {
        writeln!(
            out,
            "  - {} [{}] at {} ({} algorithm(s))",
            registration.name,
            registration.runtime,
            registration.connection_str,
            registration.supported_algorithms.len()
        )?;
    }
    writeln!(out)?;

    let graphs: Vec<_> = match window {
        Some(key) => match catalog.graph(key) {
            Some(graph) => vec![graph],
            None => return writeln!(out, "window type {key}: NO_TRIGGERED_ALGORITHMS"),
        },
        None => catalog.graphs().cloned().collect(),
    };

    for graph in graphs {
        writeln!(
            out,
            "window type {} ({} algorithm(s)):",
            graph.window_type(),
            graph.len()
        )?;
        for (index, layer) in graph.layers().iter().enumerate() {
            let names: Vec<String> = layer
                .iter()
                .map(|key| match graph.node(key) {
                    Some(node) => format!("{key} on {}", node.processor),
                    None => key.to_string(),
                })
                .collect();
            writeln!(out, "  layer {index}: {}", names.join(", "))?;
        }
    }
    Ok(())
}
