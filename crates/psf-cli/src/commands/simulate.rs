use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use psf_core::fit::GaussianModel;
use psf_core::frame::{encode_samples, SampleFormat};
use psf_core::io::ser::SerHeader;
use psf_core::io::ser_writer::SerWriter;

#[derive(Args)]
pub struct SimulateArgs {
    /// Output SER file
    pub output: PathBuf,

    #[arg(long, default_value = "512")]
    pub width: u32,

    #[arg(long, default_value = "256")]
    pub height: u32,

    #[arg(long, default_value = "20")]
    pub frames: u32,

    /// 8 or 16
    #[arg(long, default_value = "16")]
    pub bit_depth: u32,

    /// Peak height above the baseline
    #[arg(long, default_value = "1000")]
    pub amplitude: f64,

    #[arg(long, default_value = "100")]
    pub baseline: f64,

    /// Peak column of the first frame (defaults to the frame center)
    #[arg(long)]
    pub center: Option<f64>,

    #[arg(long, default_value = "8")]
    pub sigma: f64,

    /// Peak shift per frame in pixels
    #[arg(long, default_value = "0")]
    pub drift: f64,
}

/// Write a recording whose rows all carry the same Gaussian profile along x.
pub fn run(args: &SimulateArgs) -> Result<()> {
    if args.bit_depth != 8 && args.bit_depth != 16 {
        bail!("SER recordings hold 8- or 16-bit samples, got {}", args.bit_depth);
    }
    let format = SampleFormat::from_bit_depth(args.bit_depth)?;
    let max_value = ((1u64 << args.bit_depth) - 1) as f64;
    let center = args.center.unwrap_or(args.width as f64 / 2.0);

    let header = SerHeader::mono(args.width, args.height, args.bit_depth, args.frames);
    let mut writer = SerWriter::create(&args.output, &header)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let pb = ProgressBar::new(args.frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Writing frames");

    for i in 0..args.frames {
        let model = GaussianModel::new(
            args.amplitude,
            args.baseline,
            center + args.drift * i as f64,
            args.sigma,
        );
        let row: Vec<u32> = (0..args.width)
            .map(|x| model.value(x as f64).round().clamp(0.0, max_value) as u32)
            .collect();
        let samples = row.repeat(args.height as usize);
        writer.write_raw_frame(&encode_samples(&samples, format))?;
        pb.inc(1);
    }

    let timestamps: Vec<u64> = (0..args.frames as u64).map(|i| i * 10_000).collect();
    writer.write_timestamps(&timestamps)?;
    writer.finalize()?;
    pb.finish_with_message("Frames written");

    println!(
        "Wrote {} frame(s) of {}x{} ({}-bit) to {}",
        args.frames,
        args.width,
        args.height,
        args.bit_depth,
        args.output.display()
    );
    Ok(())
}
