//! Pure size arithmetic for the downscale step.

/// The size an image of `width × height` should be scaled to so that it fits
/// inside `max_width × max_height`, or `None` when it already fits.
///
/// Only ever shrinks. The aspect ratio is kept: both sides use the smaller
/// of the two per-axis factors, floored, and never go below one pixel.
pub fn target_size(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<(u32, u32)> {
    if width <= max_width && height <= max_height {
        return None;
    }
    // Exact rational arithmetic: compare max_w/w with max_h/h by cross
    // multiplication and scale by whichever is smaller.
    let (w, h, mw, mh) = (width as u64, height as u64, max_width as u64, max_height as u64);
    let (num, den) = if mw * h <= mh * w { (mw, w) } else { (mh, h) };
    let scaled = |side: u64| ((side * num / den) as u32).max(1);
    Some((scaled(w), scaled(h)))
}
