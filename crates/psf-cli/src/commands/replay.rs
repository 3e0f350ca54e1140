use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use psf_core::analysis::{AnalysisEvent, Analyzer, FrameOutcome};
use psf_core::fit::{FitEngine, FitSettings};
use psf_core::frame::{AcquiredFrame, BufferSource};
use psf_core::io::export::save_curves_csv;
use psf_core::io::ser::SerReader;
use psf_core::roi::Roi;

use super::config::load_parameters;
use super::parse_roi;
use crate::summary::print_replay_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Raw,
    Processed,
}

impl From<SourceArg> for BufferSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Raw => BufferSource::Raw,
            SourceArg::Processed => BufferSource::Processed,
        }
    }
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Analysis parameters TOML
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Region of interest as x,y,w,h (overrides the config)
    #[arg(long, value_parser = parse_roi)]
    pub roi: Option<Roi>,

    /// Analyze every Nth buffer (overrides the config)
    #[arg(long)]
    pub nth: Option<u32>,

    /// Recorded frames grouped into one delivered buffer
    #[arg(long, default_value = "1")]
    pub frames_per_buffer: usize,

    /// Buffers per volume; the buffer index wraps at this count
    #[arg(long, default_value = "1")]
    pub buffers_per_volume: usize,

    /// Stream the buffers are delivered on
    #[arg(long, value_enum, default_value = "processed")]
    pub source: SourceArg,

    /// Disable auto-fetch and analyze only the first eligible buffer
    #[arg(long)]
    pub single_shot: bool,

    /// Delay between delivered buffers in milliseconds
    #[arg(long, default_value = "0")]
    pub pace_ms: u64,

    /// Save the last averaged line and fitted curve as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(args: &ReplayArgs, verbose: bool) -> Result<()> {
    let mut params = load_parameters(args.config.as_deref())?;
    if let Some(roi) = args.roi {
        params.roi = roi;
    }
    if let Some(nth) = args.nth {
        params.nth_buffer = nth;
    }
    if args.single_shot {
        params.auto_fetch = false;
    }

    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let geometry = reader.header.geometry()?;
    let buffers = reader.buffer_count(args.frames_per_buffer);
    let buffers_per_volume = args.buffers_per_volume.max(1);

    let (tx, rx) = mpsc::channel();
    let mut analyzer = Analyzer::spawn(params, FitEngine::new(FitSettings::default()), tx)?;
    if args.single_shot {
        analyzer.request_single_shot();
    }

    let pb = ProgressBar::new(buffers as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Replaying buffers");

    let mut tally = ReplayTally::default();
    for index in 0..buffers {
        let data = reader.buffer_le(index, args.frames_per_buffer)?;
        let frame = AcquiredFrame {
            data: &data,
            bit_depth: geometry.bit_depth,
            samples_per_line: geometry.width,
            lines_per_frame: geometry.height,
            frames_per_buffer: args.frames_per_buffer,
            buffers_per_volume,
            current_buffer: index % buffers_per_volume,
            source: args.source.into(),
        };

        match analyzer.on_frame(&frame) {
            Ok(FrameOutcome::Queued { .. }) => {}
            Ok(FrameOutcome::Skipped(reason)) => {
                tracing::trace!(index, %reason, "Buffer skipped");
            }
            Err(e) => pb.println(format!("Buffer {index}: {e}")),
        }

        for event in rx.try_iter() {
            tally.record(event, |line| if verbose { pb.println(line) });
        }

        pb.inc(1);
        if args.pace_ms > 0 {
            std::thread::sleep(Duration::from_millis(args.pace_ms));
        }
    }
    pb.finish_with_message("Replay done");

    let stats = analyzer.stats();
    analyzer.shutdown();
    for event in rx.iter() {
        tally.record(event, |line| if verbose { println!("{line}") });
    }

    print_replay_summary(&args.file, &stats, &tally);

    if let Some(ref path) = args.csv {
        let rows = save_curves_csv(
            path,
            &tally.line.0,
            &tally.line.1,
            &tally.fit.0,
            &tally.fit.1,
        )
        .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {} rows to {}", rows, path.display());
    }

    Ok(())
}

/// Results collected from the analyzer's event stream.
#[derive(Default)]
pub struct ReplayTally {
    pub cycles: u64,
    pub errors: u64,
    pub peak_position: Option<f64>,
    pub fwhm: Option<f64>,
    pub line: (Vec<f64>, Vec<f64>),
    pub fit: (Vec<f64>, Vec<f64>),
}

impl ReplayTally {
    fn record(&mut self, event: AnalysisEvent, mut log: impl FnMut(String)) {
        match event {
            AnalysisEvent::AveragedLine { x, y } => {
                self.cycles += 1;
                self.line = (x, y);
            }
            AnalysisEvent::FittedCurve { x, y } => self.fit = (x, y),
            AnalysisEvent::PeakPosition(p) => {
                self.peak_position = Some(p);
                log(format!("Cycle {}: peak {:.3} px", self.cycles, p));
            }
            AnalysisEvent::Fwhm(w) => {
                self.fwhm = Some(w);
                log(format!("Cycle {}: FWHM {:.3} px", self.cycles, w));
            }
            AnalysisEvent::MaxFrameIndex(i) => log(format!("Max frame index: {i}")),
            AnalysisEvent::MaxBufferIndex(i) => log(format!("Max buffer index: {i}")),
            AnalysisEvent::Info(msg) => log(msg),
            AnalysisEvent::Error(msg) => {
                self.errors += 1;
                log(format!("Error: {msg}"));
            }
        }
    }
}
