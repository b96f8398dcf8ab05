use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use kepub_converter::{
    config::Config,
    error::{ConfigError, ConverterError, PipelineError},
    logger::ConsoleLogger,
    pipeline::Pipeline,
    reveal::reveal_directory,
};
use log::{LevelFilter, debug, error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Converts an EPUB book to Kobo kepub
///
/// Books whose language metadata marks them as Simplified Chinese are
/// transliterated to Traditional Chinese before conversion.
#[derive(Parser, Debug)]
#[command(name = "kepub-converter", version, about)]
struct CommandLineOptions {
    /// EPUB file to convert
    #[arg(value_name = "EPUB_FILE")]
    input: PathBuf,

    /// Configuration file, defaults to kepub_converter.toml next to the executable
    #[arg(short, long, env = "KEPUB_CONVERTER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Do not open the output folder after converting
    #[arg(long)]
    no_reveal: bool,
}

fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::MissingKey { .. } => 1,
        ConfigError::Parse { .. } => 2,
        ConfigError::Io { .. } | ConfigError::InvalidValue { .. } => 3,
    }
}

fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::InvalidInput { .. } => 4,
        PipelineError::Rewrite { .. }
        | PipelineError::WriteRewritten { .. }
        | PipelineError::ScratchSpace { .. } => 5,
        PipelineError::Converter(ConverterError::Unavailable { .. }) => 6,
        PipelineError::Converter(ConverterError::Failed { .. } | ConverterError::Io { .. }) => 7,
    }
}

fn main() -> ExitCode {
    let options = CommandLineOptions::parse();

    if let Err(err) = ConsoleLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", err);
    }

    let config_path = options.config.clone().unwrap_or_else(Config::default_path);
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(config_exit_code(&err));
        }
    };

    let level = options
        .log_level
        .map(LevelFilter::from)
        .unwrap_or(config.log_level);
    ConsoleLogger::configure(level, &config.log_format);
    debug!("Loaded configuration from {}", config_path.display());

    let pipeline = Pipeline::from_config(&config);
    match pipeline.run(&options.input) {
        Ok(report) => {
            info!(
                "Converted \"{}\" to \"{}\"",
                report.source.display(),
                report.output_file.display()
            );
            if config.reveal_output && !options.no_reveal {
                reveal_directory(pipeline.output_dir());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::from(pipeline_exit_code(&err))
        }
    }
}
