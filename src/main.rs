use std::fs::{create_dir_all, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_clean::diagnostics::AuditCounters;
use osm_clean::errors::{Error, Result};
use osm_clean::etl::audit_streets::AuditStreetsEtl;
use osm_clean::etl::osm_to_csv::{self, OsmToCsvEtl};
use osm_clean::etl::Etl;
use osm_clean::UserConfig;

/// Cleans an OpenStreetMap extract into CSV tables.
#[derive(Parser, Debug)]
#[command(name = "osm_clean", version, about)]
struct Cli {
    /// JSON config file
    #[arg(long, default_value = "config/sample.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the nodes, nodes_tags, ways, ways_nodes and ways_tags tables
    Process {
        /// Check every element against the schema before writing it
        #[arg(long)]
        validate: bool,
        /// Remove existing tables instead of treating them as cached
        #[arg(long)]
        force: bool,
    },
    /// Report street names with an unexpected street type
    Audit {
        /// Remove an existing street_audit.json instead of treating it as cached
        #[arg(long)]
        force: bool,
    },
}

fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path)
        .map_err(|err| Error::from(format!("could not open config file {}: {}", path.display(), err)))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| Error::from(format!("could not parse config {}: {}", path.display(), err)))
}

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = PathBuf::from(&config.dest_path);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut user_config = load_user_config(&cli.config)?;
    setup_logging(&user_config.log_level);

    let output_dir = create_output_dir(&user_config)?;
    let command = cli.command.unwrap_or(Command::Process { validate: false, force: false });

    match command {
        Command::Process { validate, force } => {
            user_config.validate |= validate;
            let mut counters = AuditCounters::new();
            let mut etl = OsmToCsvEtl::new(&user_config, &mut counters)?;
            if force {
                etl.clean(&output_dir)?;
            }
            if etl.process(&output_dir)? {
                counters.log_report(osm_to_csv::ETL_NAME, user_config.report_top_keys);
            }
        },
        Command::Audit { force } => {
            let mut etl = AuditStreetsEtl::new(&user_config);
            if force {
                etl.clean(&output_dir)?;
            }
            etl.process(&output_dir)?;
        },
    }

    let output_name = output_dir.display().to_string();
    info!(output_dir = output_name.as_str(); "Done");
    Ok(())
}
