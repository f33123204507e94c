//! Featline CLI - build feature tables from CSV files
//!
//! ```bash
//! featline inspect data.csv                                  # Show encoding, delimiter, columns
//! featline run data.csv --id ID --threshold Amount:500:High  # Apply units, print features
//! featline functions                                         # Show available feature functions
//! ```
//!
//! Units from `run` flags are registered in this order: thresholds, day
//! differences, ratios, sums, date parts. Within one flag kind, command-line
//! order is kept.

use clap::{Parser, Subcommand};
use featline::diagnostics::drain;
use featline::{
    functions, load_file, ApplyOptions, CallingConvention, Diagnostics, FeaturePipeline, LoadOptions, Params,
    Scalar, UnitSpec,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "featline")]
#[command(about = "Apply ordered feature transforms to a CSV file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file and describe it
    Inspect {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Build a pipeline from flags, apply it and print the feature table
    Run {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Keep cells as text instead of inferring types
        #[arg(long)]
        no_infer: bool,

        /// Identity column (repeatable, order matters)
        #[arg(long = "id")]
        identity: Vec<String>,

        /// Separator between identity values (default: $FEATLINE_KEY_SEPARATOR or empty)
        #[arg(long)]
        key_separator: Option<String>,

        /// IN:VALUE:OUT - 1 where IN > VALUE, else 0
        #[arg(long, value_parser = parse_threshold)]
        threshold: Vec<ThresholdSpec>,

        /// START:END:OUT - whole days from START to END, clipped at 0
        #[arg(long, value_parser = parse_days)]
        days: Vec<PairSpec>,

        /// NUM:DEN:OUT - NUM / DEN
        #[arg(long, value_parser = parse_ratio)]
        ratio: Vec<PairSpec>,

        /// COL,COL,...:OUT - row-wise sum
        #[arg(long, value_parser = parse_sum)]
        sum: Vec<SumSpec>,

        /// COL:PREFIX - PREFIX_year, PREFIX_month, PREFIX_day
        #[arg(long = "date-parts", value_parser = parse_date_parts)]
        date_parts: Vec<DatePartsSpec>,

        /// Print diagnostics as JSON lines on stderr instead of text
        #[arg(long)]
        json_events: bool,
    },

    /// Show available feature functions
    Functions,
}

#[derive(Debug, Clone)]
struct ThresholdSpec {
    input: String,
    value: Scalar,
    output: String,
}

#[derive(Debug, Clone)]
struct PairSpec {
    left: String,
    right: String,
    output: String,
}

#[derive(Debug, Clone)]
struct SumSpec {
    inputs: Vec<String>,
    output: String,
}

#[derive(Debug, Clone)]
struct DatePartsSpec {
    input: String,
    prefix: String,
}

/// Split `raw` on `:` into exactly `N` non-empty parts.
fn split_parts<const N: usize>(raw: &str, shape: &str) -> Result<[String; N], String> {
    let parts: Vec<String> = raw.split(':').map(|s| s.trim().to_string()).collect();
    if parts.iter().any(String::is_empty) {
        return Err(format!("expected {}, got '{}'", shape, raw));
    }
    parts
        .try_into()
        .map_err(|_| format!("expected {}, got '{}'", shape, raw))
}

fn parse_threshold(raw: &str) -> Result<ThresholdSpec, String> {
    let [input, value, output] = split_parts(raw, "IN:VALUE:OUT")?;
    let value = Scalar::parse_inferred(&value);
    if value.as_f64().is_none() {
        return Err(format!("threshold '{}' is not a number", value));
    }
    Ok(ThresholdSpec { input, value, output })
}

fn parse_days(raw: &str) -> Result<PairSpec, String> {
    let [left, right, output] = split_parts(raw, "START:END:OUT")?;
    Ok(PairSpec { left, right, output })
}

fn parse_ratio(raw: &str) -> Result<PairSpec, String> {
    let [left, right, output] = split_parts(raw, "NUM:DEN:OUT")?;
    Ok(PairSpec { left, right, output })
}

fn parse_sum(raw: &str) -> Result<SumSpec, String> {
    let [inputs, output] = split_parts(raw, "COL,COL:OUT")?;
    let inputs: Vec<String> = inputs.split(',').map(|s| s.trim().to_string()).collect();
    if inputs.iter().any(String::is_empty) {
        return Err(format!("empty column name in '{}'", raw));
    }
    Ok(SumSpec { inputs, output })
}

fn parse_date_parts(raw: &str) -> Result<DatePartsSpec, String> {
    let [input, prefix] = split_parts(raw, "COL:PREFIX")?;
    Ok(DatePartsSpec { input, prefix })
}

/// Units requested by `run` flags.
struct RunUnits {
    threshold: Vec<ThresholdSpec>,
    days: Vec<PairSpec>,
    ratio: Vec<PairSpec>,
    sum: Vec<SumSpec>,
    date_parts: Vec<DatePartsSpec>,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { input, delimiter } => cmd_inspect(&input, delimiter),

        Commands::Run {
            input,
            delimiter,
            no_infer,
            identity,
            key_separator,
            threshold,
            days,
            ratio,
            sum,
            date_parts,
            json_events,
        } => {
            let load = LoadOptions {
                delimiter,
                infer_types: !no_infer,
            };
            let mut options = ApplyOptions::from_env().with_identity(identity);
            if let Some(separator) = key_separator {
                options = options.with_key_separator(separator);
            }
            let units = RunUnits {
                threshold,
                days,
                ratio,
                sum,
                date_parts,
            };
            cmd_run(&input, &load, &options, units, json_events)
        }

        Commands::Functions => cmd_functions(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_inspect(input: &Path, delimiter: Option<char>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading CSV: {}", input.display());

    let options = LoadOptions {
        delimiter,
        ..LoadOptions::default()
    };
    let loaded = load_file(input, &options)?;

    println!("Encoding: {}", loaded.encoding);
    println!(
        "Delimiter: '{}'{}",
        format_delimiter(loaded.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    println!("Rows: {}", loaded.table.row_count());
    println!("Columns:");
    for column in loaded.table.columns() {
        let kind = column
            .values
            .iter()
            .find(|v| !v.is_null())
            .map(Scalar::type_name)
            .unwrap_or("null");
        println!("  {} ({})", column.name, kind);
    }
    Ok(())
}

fn cmd_run(
    input: &Path,
    load: &LoadOptions,
    options: &ApplyOptions,
    units: RunUnits,
    json_events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());
    let loaded = load_file(input, load)?;
    eprintln!("   Encoding: {}", loaded.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(loaded.delimiter));
    eprintln!("   Rows: {}", loaded.table.row_count());

    let diagnostics = Diagnostics::new().with_echo(!json_events);
    let mut rx = diagnostics.subscribe();

    let mut pipeline = FeaturePipeline::new();
    build_pipeline(&mut pipeline, units, &diagnostics);
    if pipeline.is_empty() {
        eprintln!("   ⚠️ No units requested, the feature table will be empty");
    }

    let result = pipeline.apply(&loaded.table, options, &diagnostics);

    if json_events {
        for entry in drain(&mut rx) {
            eprintln!("{}", serde_json::to_string(&entry)?);
        }
    }

    let features = result?;
    println!("{}", features);
    Ok(())
}

fn build_pipeline(pipeline: &mut FeaturePipeline, units: RunUnits, diagnostics: &Diagnostics) {
    for spec in units.threshold {
        pipeline.register(
            UnitSpec::new(spec.input, functions::threshold())
                .output(spec.output)
                .params(Params::new().with("threshold", spec.value)),
            diagnostics,
        );
    }
    for spec in units.days {
        pipeline.register(
            UnitSpec::new(vec![spec.left, spec.right], functions::days_between())
                .output(spec.output)
                .convention(CallingConvention::PositionalSeries),
            diagnostics,
        );
    }
    for spec in units.ratio {
        pipeline.register(
            UnitSpec::new(vec![spec.left, spec.right], functions::ratio()).output(spec.output),
            diagnostics,
        );
    }
    for spec in units.sum {
        pipeline.register(
            UnitSpec::new(spec.inputs, functions::row_sum())
                .output(spec.output)
                .convention(CallingConvention::SubTable),
            diagnostics,
        );
    }
    for spec in units.date_parts {
        pipeline.register(
            UnitSpec::new(spec.input, functions::date_parts()).output(spec.prefix),
            diagnostics,
        );
    }
}

fn cmd_functions() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", functions::functions_description());
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
