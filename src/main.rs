//! lazy-image-io - inspect, check and convert images from the command line.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lazy_image_io::{
    config::{Cli, Command},
    configure, copy, open, sanity, set_progress, ImageError,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = configure(cli.tuning.to_settings()) {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Header { file, json } => run_header(&file, json),
        Command::Copy {
            input,
            output,
            progress,
        } => run_copy(&input, &output, progress),
        Command::Check { file } => run_check(&file),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "lazy_image_io=debug"
    } else {
        "lazy_image_io=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Header Command
// =============================================================================

fn run_header(file: &str, json: bool) -> Result<ExitCode, ImageError> {
    let image = open(file, "r")?;
    let header = image.header();

    if json {
        match serde_json::to_string_pretty(&header) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("can't serialize header: {}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        println!("{}", file);
        println!("{}", header);
    }

    image.close()?;
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// Copy Command
// =============================================================================

fn run_copy(input: &str, output: &str, progress: bool) -> Result<ExitCode, ImageError> {
    let source = open(input, "r")?;

    set_progress(progress);
    let target = open(output, "w");
    set_progress(false);
    let target = target?;

    debug!("copying {} to {}", input, output);

    let copied = copy(&source, &target);
    let closed = target.close();
    let released = source.close();
    copied.and(closed).and(released)?;

    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(file: &str) -> Result<ExitCode, ImageError> {
    let image = open(file, "r")?;

    let code = match sanity::check(Some(&image)) {
        None => {
            println!("✓ {}: ok", file);
            ExitCode::SUCCESS
        }
        Some(message) => {
            sanity::image_sanity(&image);
            println!("✗ {}: {}", file, message);
            ExitCode::FAILURE
        }
    };

    image.close()?;
    Ok(code)
}
