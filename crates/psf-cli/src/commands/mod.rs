pub mod config;
pub mod fit;
pub mod info;
pub mod replay;
pub mod simulate;

use psf_core::roi::Roi;

/// Parse `x,y,w,h` into a region of interest.
pub fn parse_roi(s: &str) -> Result<Roi, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected x,y,w,h, got '{s}'"));
    }
    let mut values = [0i32; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .map_err(|e| format!("invalid ROI component '{part}': {e}"))?;
    }
    Ok(Roi::new(values[0], values[1], values[2], values[3]))
}
