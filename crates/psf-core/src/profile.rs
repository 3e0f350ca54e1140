use ndarray::parallel::prelude::*;
use ndarray::{s, ArrayView1, ArrayView2, Axis};
use num_traits::AsPrimitive;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::frame::FrameSamples;
use crate::roi::Roi;

/// Column-averaged intensity profile restricted to a column range.
///
/// `x` holds absolute column indices, `y` the averaged intensities. This is
/// exactly what the Gaussian fit sees.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClampedLine {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ClampedLine {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// True when the intensities are not all equal.
    pub fn has_variation(&self) -> bool {
        let mut values = self.y.iter().copied().filter(|v| v.is_finite());
        let Some(first) = values.next() else {
            return false;
        };
        values.any(|v| v != first)
    }
}

/// Reduce a frame to one value per column: the mean over the ROI's rows.
///
/// The profile always spans the full frame width. Columns outside the
/// (clamped) ROI stay zero, and an ROI without overlap yields all zeros.
pub fn averaged_line(samples: &FrameSamples<'_>, roi: &Roi) -> Vec<f64> {
    match samples {
        FrameSamples::U8(view) => average_columns(view.view(), roi),
        FrameSamples::U16(array) => average_columns(array.view(), roi),
        FrameSamples::U32(array) => average_columns(array.view(), roi),
    }
}

fn average_columns<T>(frame: ArrayView2<'_, T>, roi: &Roi) -> Vec<f64>
where
    T: AsPrimitive<f64> + Send + Sync,
{
    let (height, width) = frame.dim();
    let mut line = vec![0.0f64; width];

    let clamped = roi.clamped(width, height);
    if clamped.is_empty() {
        return line;
    }

    let x0 = clamped.x as usize;
    let y0 = clamped.y as usize;
    let x1 = x0 + clamped.width as usize;
    let y1 = y0 + clamped.height as usize;
    let region = frame.slice(s![y0..y1, x0..x1]);
    let rows = (y1 - y0) as f64;

    let column_mean =
        |column: ArrayView1<'_, T>| column.iter().map(|&v| v.as_()).sum::<f64>() / rows;

    let means: Vec<f64> = if region.len() >= PARALLEL_PIXEL_THRESHOLD {
        region
            .axis_iter(Axis(1))
            .into_par_iter()
            .map(column_mean)
            .collect()
    } else {
        region.axis_iter(Axis(1)).map(column_mean).collect()
    };

    line[x0..x1].copy_from_slice(&means);
    line
}

/// Restrict `profile` to the inclusive index range `[start, end]`.
///
/// Both indices are clamped to the profile and swapped when reversed.
pub fn clamp_line(profile: &[f64], start: i64, end: i64) -> ClampedLine {
    if profile.is_empty() {
        return ClampedLine::default();
    }

    let last = profile.len() as i64 - 1;
    let mut start = start.clamp(0, last);
    let mut end = end.clamp(0, last);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }

    let range = start as usize..=end as usize;
    ClampedLine {
        x: range.clone().map(|i| i as f64).collect(),
        y: profile[range].to_vec(),
    }
}

/// Index of the first maximum in `profile`, `None` if it is empty.
pub fn find_max_position(profile: &[f64]) -> Option<usize> {
    let (first, rest) = profile.split_first()?;
    let mut max = *first;
    let mut max_pos = 0;
    for (i, &v) in rest.iter().enumerate() {
        if v > max {
            max = v;
            max_pos = i + 1;
        }
    }
    Some(max_pos)
}
