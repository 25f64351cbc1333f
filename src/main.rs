use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ids_inspector::config::ValidatorConfig;
use ids_inspector::export::{export_csv, export_json, export_xlsx};
use ids_inspector::ids::{parse_ids_file, parse_workbook, write_ids_file, Workbook};
use ids_inspector::ui::App;
use ids_inspector::validation::{IdsSource, IfcSource, Orchestrator, ValidationEvent};

#[derive(Parser, Debug)]
#[command(name = "ids-inspector")]
#[command(about = "IDS Inspector - validate IFC models against IDS requirements")]
#[command(version)]
struct Args {
    /// IFC files to validate
    files: Vec<PathBuf>,

    /// IDS XML documents to validate against
    #[arg(long, value_name = "IDS")]
    ids: Vec<PathBuf>,

    /// Tabular IDS workbook (.xlsx/.ods spreadsheet, directory of CSV sheets or a JSON file)
    #[arg(long, value_name = "XLSX|DIR|JSON")]
    workbook: Option<PathBuf>,

    /// Export results as CSV sheets into this directory
    #[arg(long, value_name = "DIR")]
    csv: Option<PathBuf>,

    /// Export results as one XLSX workbook
    #[arg(long, value_name = "FILE")]
    xlsx: Option<PathBuf>,

    /// Export results as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Write the loaded IDS (e.g. from a workbook) as IDS XML
    #[arg(long, value_name = "FILE")]
    write_ids: Option<PathBuf>,

    /// Validator configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Size in MiB from which a model counts as large
    #[arg(long, value_name = "N")]
    large_file_mb: Option<u64>,
}

impl Args {
    fn exports(&self) -> bool {
        self.csv.is_some() || self.xlsx.is_some() || self.json.is_some() || self.write_ids.is_some()
    }
}

fn init_logging(tui: bool) {
    let default = if tui { "off" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
        .to_string()
}

fn load_config(args: &Args) -> Result<ValidatorConfig> {
    let mut config = match &args.config {
        Some(path) => ValidatorConfig::load(path)?,
        None => ValidatorConfig::default(),
    };
    if let Some(mb) = args.large_file_mb {
        config.large_file_threshold_bytes = mb * 1024 * 1024;
    }
    Ok(config)
}

fn load_ids(args: &Args) -> Result<Vec<IdsSource>> {
    let mut sources = Vec::new();
    for path in &args.ids {
        let document = parse_ids_file(path)?;
        tracing::info!(file = %path.display(), specifications = document.specifications.len(), "IDS loaded");
        sources.push(IdsSource::new(display_name(path), document));
    }

    if let Some(path) = &args.workbook {
        let workbook = Workbook::load(path)?;
        let import = parse_workbook(&workbook)?;
        for warning in &import.warnings {
            eprintln!("warning: {warning}");
        }
        sources.push(IdsSource::new(display_name(path), import.document));
    }

    if sources.is_empty() {
        bail!("no IDS input: pass --ids or --workbook");
    }
    Ok(sources)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(!args.exports());

    let config = load_config(&args)?;
    let ids_files = load_ids(&args)?;

    if let Some(path) = &args.write_ids {
        let [source] = ids_files.as_slice() else {
            bail!("--write-ids needs exactly one IDS input, got {}", ids_files.len());
        };
        write_ids_file(&source.document, path)?;
        println!("Written IDS: {}", path.display());
    }

    if args.files.is_empty() {
        if args.write_ids.is_some() {
            return Ok(());
        }
        bail!("no IFC files given");
    }

    let ifc_files = args
        .files
        .iter()
        .map(|path| IfcSource::from_path(path).wrap_err_with(|| format!("loading {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let mut orchestrator = Orchestrator::new(config);
    let report = orchestrator.validate(&ifc_files, &ids_files, |event| match event {
        ValidationEvent::Started { strategy, files } => {
            tracing::info!(?strategy, files, "validating");
        }
        ValidationEvent::Progress {
            file,
            overall_percent,
            ..
        } => tracing::debug!(%file, overall_percent, "progress"),
        ValidationEvent::Complete { .. } => tracing::info!("validation complete"),
    });

    if let Some(dir) = &args.csv {
        let written = export_csv(&report, dir)?;
        println!("Exported {} CSV sheets to: {}", written.len(), dir.display());
    }

    if let Some(xlsx_path) = &args.xlsx {
        export_xlsx(&report, xlsx_path)?;
        println!("Exported to XLSX: {}", xlsx_path.display());
    }

    if let Some(json_path) = &args.json {
        export_json(&report, json_path)?;
        println!("Exported to JSON: {}", json_path.display());
    }

    if args.exports() {
        let summary = report.summary();
        println!(
            "{} entities checked: {} passed, {} failed ({:.1}%)",
            summary.total,
            summary.passed,
            summary.failed,
            summary.pass_rate()
        );
        return Ok(());
    }

    let terminal = ratatui::init();
    let result = App::new(report).run(terminal);
    ratatui::restore();
    result
}
