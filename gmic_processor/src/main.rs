//! Runs G'MIC filters over image files

#![warn(missing_docs)]

mod error;
mod image_io;

use clap::Parser;
use error::AppError;
use gmic_runner::bridge::Outcome;
use gmic_runner::{GmicLibrary, HostBuffer, PixelBuffer, Rect, filters, output_format, process_buffer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Runs G'MIC filters over image files", long_about = None)]
struct Cli {
    #[arg(required_unless_present = "list_filters")]
    input: Option<PathBuf>,
    #[arg(required_unless_present = "list_filters")]
    output: Option<PathBuf>,
    /// Filter name, e.g. `cartoon` or `gmic:fx_tk_metallic`
    #[arg(required_unless_present = "list_filters")]
    filter: Option<String>,

    /// JSON object with parameter values; omitted ones keep their defaults
    #[arg(long)]
    params: Option<PathBuf>,

    /// Second image passed to the filter
    #[arg(long)]
    aux: Option<PathBuf>,

    #[arg(long, default_value = "/usr/lib")]
    engine_path: PathBuf,

    #[arg(long, default_value = "gmic")]
    engine_name: String,

    /// Region to write, as `x,y,width,height`; defaults to the whole result
    #[arg(long, value_parser = parse_rect)]
    roi: Option<Rect>,

    /// Resize the result back to the input size
    #[arg(long)]
    resample: bool,

    /// Keep G'MIC from merging result layers
    #[arg(long)]
    no_merge: bool,

    /// Print the filter catalog as JSON and exit
    #[arg(long)]
    list_filters: bool,
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid region {s:?}: {e}"))?;
    match parts[..] {
        [x, y, width, height] if width > 0 && height > 0 => {
            if x.checked_add(width).is_none() || y.checked_add(height).is_none() {
                return Err(format!("region {s:?} extends past the coordinate range"));
            }
            Ok(Rect::new(x, y, width, height))
        }
        _ => Err(format!("expected x,y,width,height with a positive size, got {s:?}")),
    }
}

fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.list_filters {
        println!("{}", serde_json::to_string_pretty(filters::ALL)?);
        return Ok(());
    }

    let input = cli.input.ok_or(AppError::MissingArgument("input"))?;
    let output = cli.output.ok_or(AppError::MissingArgument("output"))?;
    let filter = cli.filter.ok_or(AppError::MissingArgument("filter"))?;

    if !input.exists() {
        return Err(AppError::InputImageNotFound(input));
    }
    let params = match cli.params {
        Some(path) if !path.exists() => return Err(AppError::ParamsFileNotFound(path)),
        Some(path) => serde_json::from_str(&fs::read_to_string(&path)?)?,
        None => serde_json::Value::Null,
    };
    let aux = match cli.aux {
        Some(path) if !path.exists() => return Err(AppError::AuxImageNotFound(path)),
        Some(path) => Some(image_io::load(&path)?),
        None => None,
    };

    let schema = filters::find(&filter)?;
    let values = schema.values_from_json(&params)?;
    let command = schema
        .command(&values)
        .merge_layers(schema.merge_layers && !cli.no_merge)
        .resample(cli.resample);

    let source = image_io::load(&input)?;
    let engine = GmicLibrary::load(&cli.engine_path, &cli.engine_name)?;
    if let Some(version) = engine.version() {
        info!(%version, "loaded G'MIC");
    }

    let mut result = PixelBuffer::new(source.extent(), output_format());
    let roi = cli.roi.unwrap_or(Rect::UNBOUNDED);
    let outcome = process_buffer(
        &engine,
        Some(&source as &dyn HostBuffer),
        aux.as_ref().map(|a| a as &dyn HostBuffer),
        &mut result,
        roi,
        0,
        &command,
    )?;

    match outcome {
        Outcome::Processed { width, height } => info!(width, height, "filter applied"),
        Outcome::EngineFailed { message } => warn!(%message, "filter failed, saving annotated input"),
    }

    image_io::save(&result, &output)?;
    info!(output = %output.display(), "image saved");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_region() {
        assert_eq!(parse_rect("1, 2,30,40"), Ok(Rect::new(1, 2, 30, 40)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("0,0,0,5").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
        assert!(parse_rect("0,2147483647,1,10").is_err());
        assert!(parse_rect("2147483600,0,100,1").is_err());
        assert_eq!(parse_rect("-5,0,5,1"), Ok(Rect::new(-5, 0, 5, 1)));
    }

    #[test]
    fn list_filters_needs_no_positionals() {
        let cli = Cli::try_parse_from(["gmic_processor", "--list-filters"]).unwrap();
        assert!(cli.list_filters);
        assert!(cli.input.is_none());
    }

    #[test]
    fn positionals_are_required_otherwise() {
        assert!(Cli::try_parse_from(["gmic_processor", "in.png"]).is_err());
        let cli = Cli::try_parse_from([
            "gmic_processor",
            "in.png",
            "out.png",
            "cartoon",
            "--roi",
            "0,0,8,8",
            "--resample",
        ])
        .unwrap();
        assert_eq!(cli.filter.as_deref(), Some("cartoon"));
        assert_eq!(cli.roi, Some(Rect::new(0, 0, 8, 8)));
        assert!(cli.resample);
        assert_eq!(cli.engine_path, PathBuf::from("/usr/lib"));
    }
}
