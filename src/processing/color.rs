/// Perceptual brightness (ITU-R BT.601 weights) of an 8-bit RGB triple, in `0.0..=255.0`.
///
/// Every filter uses this single convention.
#[inline]
#[must_use]
pub fn luminance(rgb: [u8; 3]) -> f32 {
    0.299 * f32::from(rgb[0]) + 0.587 * f32::from(rgb[1]) + 0.114 * f32::from(rgb[2])
}

/// Component-wise interpolation between two colours, `t` clamped to `0..=1`.
#[must_use]
pub fn lerp_rgb(from: [u8; 3], to: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
    [mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])]
}

/// Walk a colour ramp of evenly spaced stops.
#[must_use]
pub fn ramp(stops: &[[u8; 3]], t: f32) -> [u8; 3] {
    match stops {
        [] => [0, 0, 0],
        [only] => *only,
        _ => {
            let segments = (stops.len() - 1) as f32;
            let scaled = t.clamp(0.0, 1.0) * segments;
            let idx = (scaled.floor() as usize).min(stops.len() - 2);
            lerp_rgb(stops[idx], stops[idx + 1], scaled - idx as f32)
        }
    }
}
