use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config;
use crate::error::ReportError;
use crate::filter;
use crate::ingest::{self, mapper::RowMapper};
use crate::report;
use crate::util::time::validate_strftime;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub user: Option<String>,
    pub output: Option<String>,
    pub help: bool,
}

/// Load config, read every enabled export, filter, and write the workbook.
pub async fn run(args: CliArgs) -> Result<()> {
    let started = chrono::Local::now();

    let config_path = config::config_path(args.config.as_deref())?;
    let mut config = config::load_config(&config_path)?;
    info!(config = %config_path.display(), "loaded config");

    if let Some(user) = args.user {
        config.filters.filter_user = user;
    }
    if let Some(output) = args.output {
        validate_strftime("--output", &output)?;
        config.global.output_filename = output;
    }

    let mapper = RowMapper::new(config.allow_list(), config.normalizer()?);
    let sources = ingest::create_sources(&config)?;
    if sources.is_empty() {
        warn!("no sources enabled; check read_from_files/read_from_links and [files]/[links]");
    }

    let records = ingest::collect_records(&sources, &mapper).await?;
    let total = records.len();
    let (records, suffix) = filter::apply_filters(records, &config.filter_config());
    info!(total, kept = records.len(), "filtered records");

    let out_path = report::output_path(
        &config.global.output_filename,
        &started,
        &suffix,
        config.global.output_dir.as_deref(),
    )?;

    match report::write_report(&records, &out_path) {
        Ok(rows) => {
            println!("Saved {rows} records to {}", out_path.display());
            Ok(())
        }
        Err(ReportError::EmptyResultSet) => {
            warn!("no records left after filtering; skipping report");
            println!("Nothing to save!");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to write {}", out_path.display())),
    }
}

/// Parse command-line arguments (without the program name).
///
/// Supported forms:
///   taiga-report
///   taiga-report -c reports/taiga.toml
///   taiga-report --user alice --output "alice_%Y-%m"
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut i = 0;

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => parsed.help = true,
            "-c" | "--config" | "-u" | "--user" | "-o" | "--output" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for {flag} flag");
                };
                match flag {
                    "-c" | "--config" => parsed.config = Some(PathBuf::from(value)),
                    "-u" | "--user" => parsed.user = Some(value.clone()),
                    _ => parsed.output = Some(value.clone()),
                }
            }
            other => bail!("Unknown argument: {other}\n\nRun `taiga-report --help` for usage."),
        }
        i += 1;
    }

    Ok(parsed)
}

pub fn print_help() {
    println!("taiga-report — build an XLSX report from Taiga CSV exports\n");
    println!("USAGE:");
    println!("  taiga-report [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -c, --config <path>      Config file (default: ./taiga.toml, then the user config dir)");
    println!("  -u, --user <name>        Only keep records assigned to <name>");
    println!("  -o, --output <template>  Output filename template (strftime, no extension)");
    println!("  -h, --help               Show this help");
    println!();
    println!("Set RUST_LOG=debug for detailed logs.");
}
