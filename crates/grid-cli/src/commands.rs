//! Command implementations. Each returns the text to print.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use grid_model::{
    Field, FieldSourceDefinition, FieldSourceDefinitionCache, FieldSourceTypeId,
    GridLayoutDefinition, ResolvedColumn,
};
use tracing::{info, warn};

use crate::render::{
    TableStyle, counts_table, fields_table, grid_table, layout_table, sources_table,
};
use crate::settings::Settings;
use crate::simulation::{SimulationConfig, SimulationReport, run_simulation};

/// Columns the simulated grid shows when no layout file is given. Columns of
/// inactive field sources resolve to nothing.
const WATCHLIST_COLUMNS: &[&str] = &[
    "Symbol_Code",
    "Symbol_Name",
    "Security_Last",
    "Security_Bid",
    "Security_Ask",
    "Security_High",
    "Security_Low",
    "Security_Volume",
    "Security_TradingState",
];

pub fn run_sources(cache: &FieldSourceDefinitionCache, style: TableStyle) -> String {
    sources_table(cache, style).to_string()
}

pub fn run_fields(
    cache: &FieldSourceDefinitionCache,
    sources: &[FieldSourceTypeId],
    style: TableStyle,
) -> String {
    let definitions: Vec<Rc<FieldSourceDefinition>> =
        sources.iter().map(|&type_id| cache.get(type_id)).collect();
    fields_table(&definitions, style).to_string()
}

/// Outcome of loading a persisted layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutReport {
    pub layout: GridLayoutDefinition,
    /// Persisted columns no allowed field source declares.
    pub dropped: Vec<String>,
    /// The file was missing or malformed and the default layout was used.
    pub defaulted: bool,
    pub columns: Vec<ResolvedColumn>,
    pub fields: Vec<Field>,
}

/// Load `path`, drop unknown columns and resolve the rest against `sources`.
///
/// # Errors
///
/// Returns an error if no field source is given.
pub fn load_layout(
    cache: &FieldSourceDefinitionCache,
    path: &Path,
    sources: &[FieldSourceTypeId],
) -> Result<LayoutReport> {
    if sources.is_empty() {
        bail!("a layout needs at least one field source");
    }
    let fallback = || cache.create_default_layout_definition(&sources[..1]);
    let (mut layout, defaulted) = match fs::read_to_string(path) {
        Ok(text) => match GridLayoutDefinition::from_json(&text) {
            Ok(layout) => (layout, false),
            Err(error) => {
                warn!(path = %path.display(), %error, "malformed layout, using default");
                (fallback(), true)
            }
        },
        Err(error) => {
            warn!(path = %path.display(), %error, "unreadable layout, using default");
            (fallback(), true)
        }
    };

    let dropped = layout.retain_known(|name| cache.find_field(sources, name).is_some());
    let fields: Vec<Field> = sources
        .iter()
        .flat_map(|&type_id| cache.get(type_id).fields().to_vec())
        .collect();
    let names: Vec<&str> = fields.iter().map(Field::name).collect();
    let columns = layout.resolve(&names);
    Ok(LayoutReport {
        layout,
        dropped,
        defaulted,
        columns,
        fields,
    })
}

/// # Errors
///
/// Returns an error if `write` is set and the layout cannot be saved.
pub fn run_layout(
    cache: &FieldSourceDefinitionCache,
    path: &Path,
    sources: &[FieldSourceTypeId],
    write: bool,
    settings: &Settings,
    style: TableStyle,
) -> Result<String> {
    let report = load_layout(cache, path, sources)?;
    let mut out = String::new();
    if report.defaulted {
        out.push_str("Layout file unusable; showing the default layout.\n");
    }
    for name in &report.dropped {
        out.push_str(&format!("Dropped unknown column: {name}\n"));
    }
    out.push_str(
        &layout_table(
            &report.columns,
            &report.fields,
            settings.display.default_column_width,
            style,
        )
        .to_string(),
    );

    if write {
        let json = report.layout.to_json().context("serialize layout")?;
        fs::write(path, json).with_context(|| format!("write layout {}", path.display()))?;
        info!(path = %path.display(), columns = report.layout.len(), "layout written");
        out.push_str(&format!("\nWrote {}\n", path.display()));
    }
    Ok(out)
}

/// Run the simulation and render the resulting grid and event counts.
///
/// # Errors
///
/// Returns an error if the simulation cannot run or the layout is unusable.
pub fn run_simulate(
    cache: &Rc<FieldSourceDefinitionCache>,
    config: &SimulationConfig,
    layout: Option<&Path>,
    settings: &Settings,
    style: TableStyle,
) -> Result<(SimulationReport, String)> {
    let report = run_simulation(cache, config).context("run simulation")?;

    let columns = match layout {
        Some(path) => load_layout(cache, path, &config.field_sources)?.columns,
        None => {
            let names: Vec<&str> = report.fields.iter().map(Field::name).collect();
            GridLayoutDefinition::from_field_names(WATCHLIST_COLUMNS.iter().copied())
                .resolve(&names)
        }
    };
    let columns: Vec<ResolvedColumn> = columns
        .into_iter()
        .filter(|column| column.visible || settings.display.show_hidden)
        .collect();

    let mut out = String::new();
    out.push_str(
        &grid_table(
            &report.rows,
            &report.fields,
            &columns,
            settings.display.max_rows,
            settings.display.default_column_width,
            style,
        )
        .to_string(),
    );
    if report.rows.len() > settings.display.max_rows {
        out.push_str(&format!(
            "\n... {} more rows\n",
            report.rows.len() - settings.display.max_rows
        ));
    }
    out.push('\n');
    out.push_str(&counts_table(&report.counts, &report.badness, style).to_string());
    if report.leaked_subscriptions > 0 {
        warn!(
            leaked = report.leaked_subscriptions,
            "subscriptions outlived the record source"
        );
    }
    Ok((report, out))
}
