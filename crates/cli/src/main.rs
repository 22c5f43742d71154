use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use niak_core::{
    config, pipeline_script, read_tune_config, unroll_numbers, CoreConfig, DemoCatalogue,
    SelectEvent,
};
use niak_opt::{files_in, octave, options, FilesIn, PipelineOptions};
use niak_types::Label;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "niak")]
#[command(about = "NIAK fMRI preprocessing demo inputs and options")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Yaml,
    Octave,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the files_in record of a demo case
    FilesIn {
        /// Case identifier ("1" or "2")
        id: String,
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
        /// Subject field name, required for octave output
        #[arg(long)]
        subject: Option<String>,
    },
    /// Select a demo case from an event document, e.g. {"params":{"data":{"id":"1"}}}
    Event {
        /// Event JSON
        json: String,
    },
    /// Print the demo options
    Options {
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
        /// Resolve the options one subject runs with
        #[arg(long)]
        subject: Option<String>,
        /// Tune configuration applied before resolving
        #[arg(long)]
        tune_config: Option<PathBuf>,
    },
    /// Expand a subject number specification such as 1-3,7
    Unroll {
        spec: String,
    },
    /// Translate a tune configuration file
    TuneConfig {
        path: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Print the Octave pipeline script for a demo case
    Script {
        /// Case identifier ("1" or "2")
        id: String,
        /// Subject field name used under files_in
        #[arg(long)]
        subject: String,
        /// Tune configuration applied to the demo options
        #[arg(long)]
        tune_config: Option<PathBuf>,
    },
}

/// Resolve configuration from the environment once, at startup.
///
/// # Environment Variables
/// - `NIAK_DEMO_ROOT`: directory holding the demo scans (default: "/home/pbellec/demo_niak")
/// - `NIAK_FOLDER_OUT`: pipeline output directory (default: "<demo root>/fmri_preprocess/")
/// - `NIAK_SUBJECT_ID_WIDTH`: zero padding of generated subject names (default: 4)
fn core_config_from_env() -> anyhow::Result<CoreConfig> {
    let cfg = CoreConfig::new(
        config::demo_root_from_env_value(std::env::var("NIAK_DEMO_ROOT").ok()),
        config::folder_out_from_env_value(std::env::var("NIAK_FOLDER_OUT").ok()),
        config::subject_id_width_from_env_value(std::env::var("NIAK_SUBJECT_ID_WIDTH").ok())?,
    )?;
    tracing::debug!("resolved configuration: {:?}", cfg);
    Ok(cfg)
}

fn octave_block(statements: Vec<String>) -> String {
    format!("{};", statements.join(";\n"))
}

fn render_files_in(
    record: &FilesIn,
    format: Format,
    subject: Option<&str>,
) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => files_in::write_json(record)?,
        Format::Yaml => files_in::write_yaml(record)?,
        Format::Octave => {
            let subject = subject.context("--subject is required for octave output")?;
            octave_block(octave::files_in_assignments(&Label::new(subject)?, record)?)
        }
    })
}

fn render_options(opt: &PipelineOptions, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => options::write_json(opt)?,
        Format::Yaml => options::write_yaml(opt)?,
        Format::Octave => octave_block(octave::options_assignments(opt)?),
    })
}

fn demo_options(
    catalogue: &DemoCatalogue,
    tune_config: Option<&Path>,
) -> anyhow::Result<PipelineOptions> {
    let opt = catalogue.options();
    match tune_config {
        Some(path) => {
            let config = read_tune_config(path, catalogue.config().subject_id_width())
                .with_context(|| format!("tune configuration {}", path.display()))?;
            Ok(config.apply(&opt)?)
        }
        None => Ok(opt),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("niak=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let catalogue = DemoCatalogue::new(Arc::new(core_config_from_env()?));

    match cli.command {
        Some(Commands::FilesIn {
            id,
            format,
            subject,
        }) => {
            let record = catalogue.files_in(&id)?;
            println!("{}", render_files_in(&record, format, subject.as_deref())?);
        }
        Some(Commands::Event { json }) => {
            let event = SelectEvent::from_json(&json)?;
            let record = catalogue.files_in_for_event(&event)?;
            println!("{}", files_in::write_json(&record)?);
        }
        Some(Commands::Options {
            format,
            subject,
            tune_config,
        }) => {
            let mut opt = demo_options(&catalogue, tune_config.as_deref())?;
            if let Some(subject) = subject {
                opt = opt.for_subject(&Label::new(subject)?)?;
            }
            println!("{}", render_options(&opt, format)?);
        }
        Some(Commands::Unroll { spec }) => {
            let numbers: Vec<String> = unroll_numbers(&spec)?
                .iter()
                .map(u32::to_string)
                .collect();
            println!("{}", numbers.join(" "));
        }
        Some(Commands::TuneConfig { path, format }) => {
            let config = read_tune_config(&path, catalogue.config().subject_id_width())?;
            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(&config)?,
                Format::Yaml => serde_yaml::to_string(&config)?,
                Format::Octave => octave_block(config.octave_statements()?),
            };
            println!("{rendered}");
        }
        Some(Commands::Script {
            id,
            subject,
            tune_config,
        }) => {
            let record = catalogue.files_in(&id)?;
            let opt = demo_options(&catalogue, tune_config.as_deref())?;
            print!("{}", pipeline_script(&Label::new(subject)?, &record, &opt)?);
        }
        None => {
            println!("Use 'niak --help' for commands");
        }
    }

    Ok(())
}
