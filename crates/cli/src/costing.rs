//! `reqcost run` / `reqcost validate` — config-driven cost allocation.

use std::path::{Path, PathBuf};

use serde::Serialize;

use reqcost_engine::engine::{load_invoice_csv, load_requisition_csv};
use reqcost_engine::model::{CostInput, CostReport, Divergence};
use reqcost_engine::CostingConfig;

use crate::exit_codes::{
    EXIT_COST_DIVERGENCE, EXIT_COST_INVALID_CONFIG, EXIT_COST_LINE_ERRORS, EXIT_COST_RUNTIME,
    EXIT_ERROR,
};
use crate::export::{products_to_csv, rows_to_csv};
use crate::CliError;

/// Options for `reqcost run`.
pub struct RunOptions {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub products: Option<PathBuf>,
    pub strict: bool,
}

/// JSON document written by `--json` / `--output`.
#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    report: &'a CostReport,
    run_at: String,
}

fn cost_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn load_config(config_path: &Path) -> Result<CostingConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        cost_err(EXIT_COST_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    CostingConfig::from_toml(&config_str).map_err(|e| cost_err(EXIT_COST_INVALID_CONFIG, e.to_string()))
}

/// Resolve file paths relative to the config file's directory.
fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn read_input(base: &Path, file: &str) -> Result<String, CliError> {
    let path = base.join(file);
    log::debug!("reading {}", path.display());
    std::fs::read_to_string(&path)
        .map_err(|e| cost_err(EXIT_COST_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|e| {
        cost_err(EXIT_COST_RUNTIME, format!("cannot write {}: {e}", path.display()))
    })?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_run(opts: RunOptions) -> Result<(), CliError> {
    let config = load_config(&opts.config)?;
    let base = base_dir(&opts.config);

    let requisition_csv = read_input(base, &config.requisition.file)?;
    let invoice_csv = read_input(base, &config.invoice.file)?;

    let input = CostInput {
        requisition: load_requisition_csv(&requisition_csv, &config.requisition, &config.markers)
            .map_err(|e| cost_err(EXIT_COST_RUNTIME, e.to_string()))?,
        invoice: load_invoice_csv(&invoice_csv, &config.invoice, &config.units)
            .map_err(|e| cost_err(EXIT_COST_RUNTIME, e.to_string()))?,
    };

    let report = reqcost_engine::run(&config, &input);
    let places = (config.rounding.unit_cost_places, config.rounding.total_cost_places);

    // Output
    let json_path = opts.output.or_else(|| config.output.json.as_ref().map(|f| base.join(f)));
    if opts.json || json_path.is_some() {
        let doc = RunOutput {
            report: &report,
            run_at: chrono::Utc::now().to_rfc3339(),
        };
        let json_str = serde_json::to_string_pretty(&doc)
            .map_err(|e| cost_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = json_path {
            write_output(path, &json_str)?;
        }
        if opts.json {
            println!("{json_str}");
        }
    }

    let csv_path = opts.csv.or_else(|| config.output.csv.as_ref().map(|f| base.join(f)));
    if let Some(ref path) = csv_path {
        let csv = rows_to_csv(&report.rows, places.0, places.1)
            .map_err(|e| cost_err(EXIT_ERROR, format!("CSV serialization error: {e}")))?;
        write_output(path, &csv)?;
    }

    if let Some(ref path) = opts.products {
        let csv = products_to_csv(&report.products, places.0, places.1)
            .map_err(|e| cost_err(EXIT_ERROR, format!("CSV serialization error: {e}")))?;
        write_output(path, &csv)?;
    }

    // Human summary to stderr
    let s = &report.summary;
    let count = |d: Divergence| reqcost_engine::evidence::count_divergence(s, d);
    eprintln!(
        "{}: {} lines, {} allocated, {} unit-priced, {} stock/scrap, {} not invoiced, {} quantity divergences, {} unit conflicts, {} invalid",
        report.meta.config_name,
        s.total_rows,
        s.allocated_rows,
        count(Divergence::UnitPriced),
        count(Divergence::StockOrScrap),
        count(Divergence::MissingMaterial),
        count(Divergence::QuantityDivergence),
        count(Divergence::UnitConflict),
        s.error_rows,
    );
    let r = &s.reconciliation;
    eprintln!(
        "reconciliation: allocated {:.2} of invoiced {:.2} (difference {:.2}){}",
        r.allocated_total,
        r.invoiced_total,
        r.difference,
        if r.balanced { "" } else { ", UNBALANCED" },
    );
    if !s.unreferenced_materials.is_empty() {
        eprintln!("not requisitioned: {}", s.unreferenced_materials.join(", "));
    }

    if s.error_rows > 0 {
        return Err(cost_err(
            EXIT_COST_LINE_ERRORS,
            format!("{} requisition line(s) could not be allocated", s.error_rows),
        ));
    }

    if opts.strict {
        let divergent = count(Divergence::QuantityDivergence)
            + count(Divergence::UnitConflict)
            + count(Divergence::MissingMaterial);
        if divergent > 0 || !r.balanced {
            return Err(cost_err(EXIT_COST_DIVERGENCE, "divergences found (--strict)"));
        }
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base = base_dir(&config_path);

    let missing: Vec<String> = [&config.requisition.file, &config.invoice.file]
        .into_iter()
        .map(|f| base.join(f))
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(cost_err(
            EXIT_COST_RUNTIME,
            format!("config is valid but input file(s) not found: {}", missing.join(", ")),
        )
        .with_hint("input paths are resolved relative to the config file"));
    }

    eprintln!("{}: config valid", config.name);
    Ok(())
}
