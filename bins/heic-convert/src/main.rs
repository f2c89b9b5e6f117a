//! heic-convert: convert HEIC images to JPEG, flattening transparency onto white.

use anyhow::Result;
use clap::{ArgAction, Parser};
use heic_cli::output::{format_count, format_duration, format_size, report_error, Status};
use heic_cli::progress::{file_progress, finish_error, finish_success};
use heic_core::config::Config;
use heic_core::error::exit_codes;
use heic_image::{DecoderRegistry, JpegTargetEncoder, SourceFormat};
use heic_pipeline::{
    check_exif, collect_inputs, collect_jpegs, convert_batch, read_source_exif, BatchReport,
    ConvertOptions, ExifListing, ExifStatus,
};
use heic_telemetry::TelemetryConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tags listed under "other tags" before the rest is summarised.
const MAX_OTHER_TAGS: usize = 10;

#[derive(Parser)]
#[command(name = "heic-convert")]
#[command(about = "Convert HEIC images to JPEG, flattening transparency onto white")]
struct Cli {
    /// File or directory to process (directories are searched recursively)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Remove EXIF from the converted JPEGs
    #[arg(long)]
    remove_exif: bool,

    /// Show EXIF of the source files (converts too when combined with --remove-exif)
    #[arg(long)]
    show_exif: bool,

    /// Check whether JPEG files still carry EXIF
    #[arg(long)]
    check_exif: bool,

    /// Print results as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Source formats to convert, comma separated (heif, png, webp, gif)
    #[arg(long, value_delimiter = ',', value_name = "FORMATS")]
    from: Vec<SourceFormat>,

    /// Configuration file (default: .heic-convert.toml in the working directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Convert one file at a time
    #[arg(long)]
    sequential: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            std::process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    heic_telemetry::init_with_config(TelemetryConfig {
        ansi: !cli.no_color,
        ..TelemetryConfig::from_verbosity(&config.schema.logging.level, cli.verbose, cli.quiet)
            .with_json(config.schema.logging.json)
    })?;
    debug!(config = ?config.path, "configuration loaded");

    let code = if cli.check_exif {
        run_check(&cli, config.schema.scan.skip_hidden)
    } else {
        match resolve(&cli, &config) {
            Ok((options, registry)) if cli.show_exif && !cli.remove_exif => {
                run_show(&cli, &options, &registry)
            }
            Ok((options, registry)) => run_convert(&cli, &options, &registry),
            Err(e) => {
                report_error(&e);
                exit_codes::CONFIG_ERROR
            }
        }
    };

    std::process::exit(code);
}

/// Config file values with command-line flags on top.
fn resolve(cli: &Cli, config: &Config) -> heic_core::Result<(ConvertOptions, DecoderRegistry)> {
    let mut options = ConvertOptions::from_config(&config.schema)?;
    if cli.remove_exif {
        options.remove_metadata = true;
    }
    if cli.sequential {
        options.parallel = false;
    }
    if !cli.from.is_empty() {
        options.sources = cli.from.clone();
    }
    let registry = options.registry()?;
    Ok((options, registry))
}

fn run_check(cli: &Cli, skip_hidden: bool) -> i32 {
    let files = match collect_jpegs(&cli.path, skip_hidden) {
        Ok(files) => files,
        Err(e) => {
            report_error(&e);
            return exit_codes::FAILURE;
        }
    };

    let report = check_exif(&files);

    if cli.json {
        return match serde_json::to_string_pretty(&report) {
            Ok(out) => {
                println!("{}", out);
                check_exit_code(report.summary.errors)
            }
            Err(e) => {
                Status::error(&format!("Could not serialize report: {}", e));
                exit_codes::FAILURE
            }
        };
    }

    if files.is_empty() {
        Status::info(&format!("No JPEG files found in {}", cli.path.display()));
        return exit_codes::SUCCESS;
    }

    for entry in &report.entries {
        let path = entry.path.display();
        match &entry.status {
            ExifStatus::Absent => Status::success(&format!("No EXIF: {}", path)),
            ExifStatus::Present { tags } => {
                Status::flagged(&format!("EXIF present: {}", path));
                if let Some(first) = tags.first() {
                    Status::detail(&format!("first tag: {}", first));
                }
                if tags.len() > 1 {
                    Status::detail(&format!("(+{} more)", format_count(tags.len() - 1, "tag", "tags")));
                }
            }
            ExifStatus::Error { error } => {
                Status::warning(&format!("Could not check {}: [{}] {}", path, error.code_str, error.message))
            }
        }
    }

    let summary = report.summary;
    Status::header("Check summary");
    println!("  Files:        {}", report.entries.len());
    println!("  Without EXIF: {}", summary.clean);
    println!("  With EXIF:    {}", summary.with_metadata);
    println!("  Errors:       {}", summary.errors);

    check_exit_code(summary.errors)
}

fn check_exit_code(errors: usize) -> i32 {
    if errors == 0 {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    }
}

fn run_show(cli: &Cli, options: &ConvertOptions, registry: &DecoderRegistry) -> i32 {
    let inputs = match collect_inputs(&cli.path, registry, options.skip_hidden) {
        Ok(inputs) => inputs,
        Err(e) => {
            report_error(&e);
            return exit_codes::FAILURE;
        }
    };

    if inputs.is_empty() {
        Status::info(&format!(
            "No source files found in {} ({})",
            cli.path.display(),
            registry.extensions().join(", ")
        ));
        return exit_codes::SUCCESS;
    }

    let failed = inputs
        .iter()
        .filter(|input| !show_exif(input, registry))
        .count();

    if inputs.len() > 1 {
        Status::header("Summary");
        println!("  Shown:  {}", inputs.len() - failed);
        println!("  Failed: {}", failed);
    }

    exit_codes::SUCCESS
}

/// Print the EXIF of one source file. Failures are warnings.
fn show_exif(path: &Path, registry: &DecoderRegistry) -> bool {
    match read_source_exif(path, registry) {
        Ok(listing) => {
            print_listing(path, listing.as_ref());
            true
        }
        Err(e) => {
            Status::warning(&format!(
                "Could not read EXIF of {}: [{}] {}",
                path.display(),
                e.code,
                e.message
            ));
            false
        }
    }
}

fn print_listing(path: &Path, listing: Option<&ExifListing>) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Status::header(&format!("EXIF: {}", name));

    let Some(listing) = listing.filter(|l| !l.is_empty()) else {
        println!("  no EXIF data");
        return;
    };

    for tag in &listing.priority {
        println!("  {}: {}", tag.name, tag.value);
    }

    if !listing.others.is_empty() {
        println!("  Other tags ({}):", listing.others.len());
        for tag in listing.others.iter().take(MAX_OTHER_TAGS) {
            println!("    {}: {}", tag.name, tag.value);
        }
        if listing.others.len() > MAX_OTHER_TAGS {
            println!("    ... {} more", listing.others.len() - MAX_OTHER_TAGS);
        }
    }
}

fn run_convert(cli: &Cli, options: &ConvertOptions, registry: &DecoderRegistry) -> i32 {
    let inputs = match collect_inputs(&cli.path, registry, options.skip_hidden) {
        Ok(inputs) => inputs,
        Err(e) => {
            report_error(&e);
            return exit_codes::FAILURE;
        }
    };

    if inputs.is_empty() && !cli.json {
        Status::info(&format!(
            "No source files found in {} ({})",
            cli.path.display(),
            registry.extensions().join(", ")
        ));
        return exit_codes::SUCCESS;
    }

    if cli.show_exif && !cli.json {
        for input in &inputs {
            show_exif(input, registry);
        }
    }

    let pb = file_progress(inputs.len() as u64, !cli.quiet && !cli.json);
    let report = convert_batch(&inputs, registry, &JpegTargetEncoder, options, |outcome| {
        if !cli.json {
            pb.suspend(|| match &outcome.result {
                Ok(c) => {
                    if !cli.quiet {
                        Status::success(&format!(
                            "{} -> {} ({})",
                            c.input.display(),
                            c.output.display(),
                            format_size(c.bytes_written)
                        ));
                    }
                    for warning in &c.warnings {
                        Status::warning(&format!("{}: {}", c.output.display(), warning));
                    }
                }
                Err(e) => report_error(e),
            });
        }
        pb.inc(1);
    });

    if report.is_success() {
        finish_success(&pb, "done");
    } else {
        finish_error(&pb, &format_count(report.failed(), "failure", "failures"));
    }

    if cli.json {
        println!("{}", batch_json(&report));
    } else if report.total() > 1 {
        Status::header("Summary");
        println!("  Converted: {}", report.succeeded());
        println!("  Failed:    {}", report.failed());
        println!("  Time:      {}", format_duration(report.elapsed));
    }

    if report.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    }
}

fn batch_json(report: &BatchReport) -> String {
    let files: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(c) => json!({
                "input": c.input,
                "output": c.output,
                "bytes_written": c.bytes_written,
                "metadata_stripped": c.metadata_stripped,
                "warnings": c.warnings,
            }),
            Err(e) => json!({
                "input": o.input,
                "error": e.to_report(),
            }),
        })
        .collect();

    let value = json!({
        "files": files,
        "summary": {
            "total": report.total(),
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "elapsed_ms": report.elapsed.as_millis() as u64,
        },
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
