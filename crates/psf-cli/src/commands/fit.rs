use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use psf_core::analysis::analyze_frame;
use psf_core::fit::{FitEngine, FitSettings};
use psf_core::io::export::save_curves_csv;
use psf_core::io::ser::SerReader;
use psf_core::roi::Roi;

use super::config::load_parameters;
use super::parse_roi;
use crate::summary::print_fit_summary;

#[derive(Args)]
pub struct FitArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Frame to analyze
    #[arg(short, long, default_value = "0")]
    pub frame: usize,

    /// Region of interest as x,y,w,h (overrides the config)
    #[arg(long, value_parser = parse_roi)]
    pub roi: Option<Roi>,

    /// Analysis parameters TOML
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Save the averaged line and fitted curve as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Solver evaluation cap
    #[arg(long, default_value_t = FitSettings::default().max_evaluations)]
    pub max_evaluations: usize,
}

pub fn run(args: &FitArgs) -> Result<()> {
    let params = load_parameters(args.config.as_deref())?;
    let roi = args.roi.unwrap_or(params.roi);

    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let geometry = reader.header.geometry()?;
    let bytes = reader.buffer_le(args.frame, 1)?;

    let engine = FitEngine::new(FitSettings {
        max_evaluations: args.max_evaluations,
        ..FitSettings::default()
    });
    let output = analyze_frame(&engine, &bytes, &geometry, &roi)?;

    print_fit_summary(&args.file, args.frame, &roi, &output);

    if let Some(ref path) = args.csv {
        let rows = save_curves_csv(path, &output.line.x, &output.line.y, &output.fit_x, &output.fit_y)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {} rows to {}", rows, path.display());
    }

    Ok(())
}
