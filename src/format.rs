use std::convert::TryFrom;

use byte_unit::{Byte, Unit, UnitType};

use crate::error::AppError;

/// Marker rendered in place of a size that is negative or could not be measured.
pub const UNKNOWN_SIZE: &str = "?";

const PIB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0;

/// Format a possibly-unknown byte count the way `du -h` does: `512B`, `1.5K`, `300M`.
pub fn humanize(size: i64) -> String {
    match u64::try_from(size) {
        Ok(size) => humanize_bytes(size),
        Err(_) => UNKNOWN_SIZE.to_string(),
    }
}

/// Format bytes into a human-readable string using binary (1024-based) units.
///
/// Values below ten of a unit keep one decimal place, larger ones none.
pub fn humanize_bytes(size: u64) -> String {
    let adjusted = Byte::from_u64(size).get_appropriate_unit(UnitType::Binary);
    let (value, suffix) = match adjusted.get_unit() {
        Unit::B => return format!("{size}B"),
        Unit::KiB => (adjusted.get_value(), "K"),
        Unit::MiB => (adjusted.get_value(), "M"),
        Unit::GiB => (adjusted.get_value(), "G"),
        Unit::TiB => (adjusted.get_value(), "T"),
        Unit::PiB => (adjusted.get_value(), "P"),
        // Anything past petabytes is still reported in P.
        _ => (size as f64 / PIB, "P"),
    };

    if value >= 10.0 { format!("{value:.0}{suffix}") } else { format!("{value:.1}{suffix}") }
}

/// Parse a size such as `200MiB`, `1.5 GB` or `4096` into bytes.
pub fn parse_size(value: &str) -> Result<u64, AppError> {
    let trimmed = value.trim();
    let byte =
        Byte::parse_str(trimmed, true).map_err(|_| AppError::InvalidSize(value.to_string()))?;
    u64::try_from(byte.as_u128()).map_err(|_| AppError::InvalidSize(value.to_string()))
}
