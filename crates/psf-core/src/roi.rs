use serde::{Deserialize, Serialize};

/// Axis-aligned region of interest in frame pixel coordinates.
///
/// Width and height may be negative while the user drags a selection;
/// [`Roi::normalized`] flips such a rectangle around its anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Roi {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Same area with non-negative width and height.
    pub fn normalized(&self) -> Roi {
        let (x, width) = if self.width < 0 {
            (self.x.saturating_add(self.width), self.width.saturating_neg())
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0 {
            (self.y.saturating_add(self.height), self.height.saturating_neg())
        } else {
            (self.y, self.height)
        };
        Roi::new(x, y, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Clamp to a `frame_width` x `frame_height` frame.
    ///
    /// The result is normalized and fully inside the frame. A region with no
    /// overlap collapses to `Roi(0, 0, 0, 0)`.
    pub fn clamped(&self, frame_width: usize, frame_height: usize) -> Roi {
        let roi = self.normalized();
        let frame_w = frame_extent(frame_width);
        let frame_h = frame_extent(frame_height);

        let x = i64::from(roi.x);
        let y = i64::from(roi.y);
        let w = i64::from(roi.width);
        let h = i64::from(roi.height);

        if x >= frame_w || y >= frame_h || x + w < 0 || y + h < 0 {
            return Roi::default();
        }

        let end_x = (x + w).min(frame_w);
        let end_y = (y + h).min(frame_h);
        let clamped_x = x.max(0);
        let clamped_y = y.max(0);

        // Every value is within [0, frame extent] and the extent fits in i32.
        Roi::new(
            clamped_x as i32,
            clamped_y as i32,
            (end_x - clamped_x) as i32,
            (end_y - clamped_y) as i32,
        )
    }

    /// Inclusive column range `[x, x + width - 1]` of the normalized ROI.
    ///
    /// Not clamped: the line clamp bounds it against the profile length.
    pub fn column_span(&self) -> (i64, i64) {
        let roi = self.normalized();
        let start = i64::from(roi.x);
        (start, start + i64::from(roi.width) - 1)
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}, {}", self.x, self.y, self.width, self.height)
    }
}

fn frame_extent(extent: usize) -> i64 {
    i64::try_from(extent)
        .unwrap_or(i64::MAX)
        .min(i64::from(i32::MAX))
}
