use std::path::Path;

use console::Style;
use psf_core::analysis::{AdmissionStats, CycleOutput};
use psf_core::roi::Roi;

use crate::commands::replay::ReplayTally;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            warning: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

fn print_metrics(s: &Styles, peak_position: f64, fwhm: f64) {
    let peak = if peak_position.is_nan() {
        s.warning.apply_to("no peak".to_string())
    } else {
        s.value.apply_to(format!("{peak_position:.3} px"))
    };
    let width = if fwhm < 0.0 {
        s.warning.apply_to("fit not possible".to_string())
    } else {
        s.value.apply_to(format!("{fwhm:.3} px"))
    };
    println!("    {:<12}{}", s.label.apply_to("Peak"), peak);
    println!("    {:<12}{}", s.label.apply_to("FWHM"), width);
}

pub fn print_fit_summary(file: &Path, frame: usize, roi: &Roi, output: &CycleOutput) {
    let s = Styles::new();
    print_title(&s, "PSF Fit");

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(file.display()));
    println!("  {:<14}{}", s.label.apply_to("Frame"), s.value.apply_to(frame));
    println!("  {:<14}{}", s.label.apply_to("ROI"), s.value.apply_to(roi));
    println!("  {:<14}{}", s.label.apply_to("Columns"), s.value.apply_to(output.line.len()));
    println!();

    println!("  {}", s.header.apply_to("Gaussian"));
    if let Some(ref report) = output.report {
        let m = &report.model;
        println!("    {:<12}{}", s.label.apply_to("Amplitude"), s.value.apply_to(format!("{:.3}", m.amplitude)));
        println!("    {:<12}{}", s.label.apply_to("Baseline"), s.value.apply_to(format!("{:.3}", m.baseline)));
        println!("    {:<12}{}", s.label.apply_to("Sigma"), s.value.apply_to(format!("{:.3}", m.sigma)));
        println!("    {:<12}{}", s.label.apply_to("Evaluations"), s.value.apply_to(report.evaluations));
        println!("    {:<12}{}", s.label.apply_to("Termination"), s.value.apply_to(&report.termination));
    }
    print_metrics(&s, output.metrics.peak_position, output.metrics.fwhm);
    if let Some(ref error) = output.error {
        println!("    {:<12}{}", s.label.apply_to("Error"), s.warning.apply_to(error));
    } else if let Some(ref warning) = output.warning {
        println!("    {:<12}{}", s.label.apply_to("Warning"), s.warning.apply_to(warning));
    }
    println!();
}

pub fn print_replay_summary(file: &Path, stats: &AdmissionStats, tally: &ReplayTally) {
    let s = Styles::new();
    print_title(&s, "PSF Replay");

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(file.display()));
    println!();

    println!("  {}", s.header.apply_to("Admission"));
    println!("    {:<12}{}", s.label.apply_to("Delivered"), s.value.apply_to(stats.delivered));
    println!("    {:<12}{}", s.label.apply_to("Queued"), s.value.apply_to(stats.queued));
    println!("    {:<12}{}", s.label.apply_to("Skipped"), s.value.apply_to(stats.skipped));
    println!("    {:<12}{}", s.label.apply_to("Busy drops"), s.value.apply_to(stats.dropped_busy));
    println!("    {:<12}{}", s.label.apply_to("Errors"), s.value.apply_to(stats.errors));
    println!();

    println!("  {}", s.header.apply_to("Fits"));
    println!("    {:<12}{}", s.label.apply_to("Cycles"), s.value.apply_to(tally.cycles));
    println!("    {:<12}{}", s.label.apply_to("Warnings"), s.value.apply_to(tally.errors));
    match (tally.peak_position, tally.fwhm) {
        (Some(peak), Some(fwhm)) => print_metrics(&s, peak, fwhm),
        _ => println!("    {}", s.warning.apply_to("no fit completed")),
    }
    println!();
}
