/// Notifications published by the analysis core to display collaborators.
///
/// A completed fit cycle emits `AveragedLine`, `FittedCurve`, `PeakPosition`
/// and `Fwhm`, in that order.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisEvent {
    /// Column-averaged line over the ROI span, x = column index.
    AveragedLine { x: Vec<f64>, y: Vec<f64> },
    /// Fitted Gaussian sampled 10x denser than the averaged line.
    FittedCurve { x: Vec<f64>, y: Vec<f64> },
    /// Fitted mean; NaN when no peak was detected.
    PeakPosition(f64),
    /// Fitted FWHM in pixels; negative when no fit was possible.
    Fwhm(f64),
    /// Highest selectable frame index, sent when frames per buffer changes.
    MaxFrameIndex(i64),
    /// Highest selectable buffer index, sent when buffers per volume changes.
    MaxBufferIndex(i64),
    Info(String),
    /// Advisory, non-fatal error message.
    Error(String),
}

impl AnalysisEvent {
    /// True for the four per-cycle result events.
    pub fn is_result(&self) -> bool {
        matches!(
            self,
            Self::AveragedLine { .. } | Self::FittedCurve { .. } | Self::PeakPosition(_) | Self::Fwhm(_)
        )
    }
}
