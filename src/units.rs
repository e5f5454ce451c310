//! Unit-conversion helpers for displaying decoded signal values in a
//! different unit than the database declares.
//!
//! Conversions are affine: `converted = value * factor + offset`. The
//! offset only matters for temperatures; everything else is a plain
//! multiplier.

/// (from, to, factor, offset)
const CONVERSIONS: &[(&str, &str, f64, f64)] = &[
    // --- Temperature
    ("C", "F", 1.8, 32.0),
    ("F", "C", 1.0 / 1.8, -32.0 / 1.8),
    ("C", "K", 1.0, 273.15),
    ("K", "C", 1.0, -273.15),
    // --- Pressure
    ("kPa", "psi", 0.145038, 0.0),
    ("kPa", "bar", 0.01, 0.0),
    ("kPa", "Pa", 1000.0, 0.0),
    ("bar", "psi", 14.5038, 0.0),
    ("bar", "kPa", 100.0, 0.0),
    ("bar", "Pa", 100000.0, 0.0),
    ("psi", "kPa", 6.89476, 0.0),
    ("psi", "bar", 0.0689476, 0.0),
    ("psi", "Pa", 6894.76, 0.0),
    ("Pa", "psi", 0.000145038, 0.0),
    ("Pa", "kPa", 0.001, 0.0),
    ("Pa", "bar", 1e-5, 0.0),
    // --- Speed
    ("km/h", "mph", 0.621371, 0.0),
    ("km/h", "ft/s", 0.911344, 0.0),
    ("km/h", "m/s", 0.277778, 0.0),
    ("mph", "km/h", 1.60934, 0.0),
    ("mph", "ft/s", 1.46667, 0.0),
    ("mph", "m/s", 0.44704, 0.0),
    ("ft/s", "mph", 0.681818, 0.0),
    ("ft/s", "km/h", 1.09728, 0.0),
    ("ft/s", "m/s", 0.3048, 0.0),
    ("m/s", "km/h", 3.6, 0.0),
    ("m/s", "mph", 2.23694, 0.0),
    ("m/s", "ft/s", 3.28084, 0.0),
    // --- Distance
    ("km", "mi", 0.621371, 0.0),
    ("mi", "km", 1.60934, 0.0),
    ("m", "ft", 3.28084, 0.0),
    ("ft", "m", 0.3048, 0.0),
    // --- Volume
    ("l", "gal", 0.264172, 0.0),
    ("gal", "l", 3.78541, 0.0),
];

/// Converts `value` between two units, or `None` when the pair is not
/// in the table. Identical units pass through.
pub fn convert(value: f64, from: &str, to: &str) -> Option<f64> {
    if from == to {
        return Some(value);
    }
    CONVERSIONS
        .iter()
        .find(|(source, target, _, _)| *source == from && *target == to)
        .map(|(_, _, factor, offset)| value * factor + offset)
}
