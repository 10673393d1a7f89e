//! Forcing file inspector.
//!
//! Opens a surface model file, reports its geometry and, when a variable is
//! given, extracts it and optionally remaps it onto a point set.

mod config_loader;
mod report;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use clap::Parser;
use forcing_io::{
    parse_file_pattern, ContainerFormat, ContentKind, InterpolationMethod, OpenOptions,
    ReaderConfig, SurfexFile, VariableDescriptor, WeightCache,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config_loader::{load_reader_config, load_target_points};
use report::{FieldReport, InterpolationReport, Report};

#[derive(Parser, Debug)]
#[command(name = "forcing-inspect")]
#[command(about = "Inspect and extract fields from surface model forcing files")]
struct Args {
    /// File to open (omit when using --pattern)
    file: Option<PathBuf>,

    /// File-name pattern with @YYYY@ @MM@ @DD@ @HH@ @LLL@ placeholders
    #[arg(long, requires = "basetime")]
    pattern: Option<String>,

    /// Variable to extract
    #[arg(short, long)]
    variable: Option<String>,

    /// Content kind (surf, ts, forcing); detected from the name by default
    #[arg(long)]
    kind: Option<String>,

    /// Container format (ascii, netcdf, fa, texte); detected by default
    #[arg(long)]
    format: Option<String>,

    /// Tile for card-deck and native binary lookups
    #[arg(long)]
    tile: Option<String>,

    /// Requested valid times (RFC 3339 or YYYYMMDDHH), comma separated
    #[arg(long, value_delimiter = ',')]
    valid_time: Vec<String>,

    /// Patch indices, comma separated
    #[arg(long, value_delimiter = ',')]
    patches: Vec<usize>,

    /// Layer indices, comma separated
    #[arg(long, value_delimiter = ',')]
    layers: Vec<usize>,

    /// Base time of a time series (RFC 3339 or YYYYMMDDHH)
    #[arg(long)]
    basetime: Option<String>,

    /// Output interval of a time series, in seconds
    #[arg(long)]
    interval: Option<i64>,

    /// Take the geometry from this file (usually the PGD)
    #[arg(long)]
    geometry_from: Option<PathBuf>,

    /// YAML file with target `lons`/`lats` to interpolate to
    #[arg(long)]
    points: Option<PathBuf>,

    /// Interpolation method (nearest, linear, none)
    #[arg(long, default_value = "linear")]
    interpolation: String,

    /// Reader configuration YAML (defaults to FORCING_* environment variables)
    #[arg(long, env = "FORCING_CONFIG")]
    config: Option<PathBuf>,

    /// Include the extracted values in the report
    #[arg(long)]
    values: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // The report goes to stdout, logs to stderr
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS` (UTC) or a
/// compact `YYYYMMDDHH`.
fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&t));
    }
    if s.len() == 10 && s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(t) = NaiveDateTime::parse_from_str(&format!("{}0000", s), "%Y%m%d%H%M%S") {
            return Ok(Utc.from_utc_datetime(&t));
        }
    }
    Err(anyhow!("invalid timestamp '{}'", s))
}

fn resolve_path(args: &Args, basetime: Option<DateTime<Utc>>) -> Result<PathBuf> {
    match (&args.file, &args.pattern) {
        (Some(file), _) => Ok(file.clone()),
        (None, Some(pattern)) => {
            let basetime = basetime.context("--pattern needs --basetime")?;
            let validtime = match args.valid_time.first() {
                Some(t) => parse_time(t)?,
                None => basetime,
            };
            Ok(PathBuf::from(parse_file_pattern(pattern, basetime, validtime)))
        }
        (None, None) => Err(anyhow!("either a file or --pattern is required")),
    }
}

fn build_descriptor(
    args: &Args,
    name: &str,
    basetime: Option<DateTime<Utc>>,
) -> Result<VariableDescriptor> {
    let mut var = VariableDescriptor::new(name)
        .with_patches(args.patches.clone())
        .with_layers(args.layers.clone());
    if let Some(tile) = &args.tile {
        var = var.with_tile(tile.clone());
    }
    let times = args
        .valid_time
        .iter()
        .map(|t| parse_time(t))
        .collect::<Result<Vec<_>>>()?;
    var = var.with_valid_times(times);
    if let Some(basetime) = basetime {
        var = var.with_basetime(basetime);
    }
    if let Some(seconds) = args.interval {
        var = var.with_interval(Duration::seconds(seconds));
    }
    Ok(var)
}

fn open_options(args: &Args, config: &ReaderConfig) -> Result<OpenOptions> {
    let mut options = OpenOptions::new().config(config.clone());
    if let Some(kind) = &args.kind {
        let kind = ContentKind::from_str(kind).ok_or_else(|| anyhow!("unknown kind '{}'", kind))?;
        options = options.kind(kind);
    }
    if let Some(format) = &args.format {
        let format = ContainerFormat::from_str(format)
            .ok_or_else(|| anyhow!("unknown format '{}'", format))?;
        options = options.format(format);
    }
    if let Some(source) = &args.geometry_from {
        let geometry_file =
            SurfexFile::open(source, OpenOptions::new().config(config.clone()))
                .with_context(|| format!("Failed to read geometry from {:?}", source))?;
        options = options.geometry(geometry_file.geometry().clone());
        geometry_file.close();
    }
    Ok(options)
}

fn run(args: &Args) -> Result<Report> {
    let config = match &args.config {
        Some(path) => load_reader_config(path)?,
        None => ReaderConfig::from_env(),
    };
    let basetime = args.basetime.as_deref().map(parse_time).transpose()?;
    let path = resolve_path(args, basetime)?;
    let options = open_options(args, &config)?;

    let mut file = SurfexFile::open(&path, options)
        .with_context(|| format!("Failed to open {:?}", path))?;
    info!(
        file = %path.display(),
        kind = %file.kind(),
        format = %file.format(),
        geometry = %file.geometry(),
        "Opened file"
    );
    let mut report = Report::new(&file);

    let name = match &args.variable {
        Some(name) => name,
        None => return Ok(report),
    };
    let var = build_descriptor(args, name, basetime)?;

    match &args.points {
        Some(points) => {
            let target = load_target_points(points)?.geometry()?;
            let method: InterpolationMethod = args.interpolation.parse()?;
            let mut cache = WeightCache::new(config.weight_cache_entries);
            let (field, interpolator) = file
                .points(&var, &target, method, Some(&mut cache))
                .with_context(|| format!("Failed to interpolate {}", name))?;
            report.field = Some(FieldReport::new(name, &field, args.values));
            report.interpolation = Some(InterpolationReport::new(&interpolator, cache.stats()));
        }
        None => {
            let (field, _) = file
                .field(&var)
                .with_context(|| format!("Failed to extract {}", name))?;
            report.field = Some(FieldReport::new(name, &field, args.values));
        }
    }

    file.close();
    Ok(report)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let report = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
