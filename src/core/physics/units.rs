//=========================================================================
// Unit Conversion
//=========================================================================
//
// The game addresses everything in screen pixels (top-left origin, +y
// down); the simulator works in meters. The scale is fixed at 50 pixels
// per meter and both directions go through these helpers so the rest of
// the crate never multiplies by a raw constant.
//
// Pixel read-back floors to an integer, so a full round trip may lose up
// to one pixel. Callers that care (tests do) treat ≤1px as equal.
//
//=========================================================================

pub const PIXELS_PER_METER: f32 = 50.0;
pub const METERS_PER_PIXEL: f32 = 1.0 / PIXELS_PER_METER;

/// Pixel coordinate → simulator meters.
#[inline]
pub fn pixels_to_meters(pixels: i32) -> f32 {
    pixels as f32 * METERS_PER_PIXEL
}

/// Fractional pixel coordinate → simulator meters.
#[inline]
pub fn pixels_to_meters_f(pixels: f32) -> f32 {
    pixels * METERS_PER_PIXEL
}

/// Simulator meters → whole pixels (floored).
#[inline]
pub fn meters_to_pixels(meters: f32) -> i32 {
    (meters * PIXELS_PER_METER).floor() as i32
}

/// Simulator meters → fractional pixels, for drawing.
#[inline]
pub fn meters_to_pixels_f(meters: f32) -> f32 {
    meters * PIXELS_PER_METER
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_constants_are_inverse() {
        assert!((PIXELS_PER_METER * METERS_PER_PIXEL - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn round_trip_loses_at_most_one_pixel() {
        for pixels in [-960, -1, 0, 1, 37, 100, 576, 10_000] {
            let back = meters_to_pixels(pixels_to_meters(pixels));
            assert!((back - pixels).abs() <= 1, "{} -> {}", pixels, back);
        }
    }

    #[test]
    fn fractional_round_trip_is_exact_enough_for_drawing() {
        let m = pixels_to_meters_f(123.5);
        assert!((meters_to_pixels_f(m) - 123.5).abs() < 1e-3);
    }
}
