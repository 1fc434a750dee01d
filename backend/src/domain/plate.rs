//! License plate validation and vehicle classification.
//!
//! Two plate formats are recognized: three letters followed by three digits
//! (`ABC123`) for cars, and three letters, two digits, and a trailing letter
//! (`ABC12A`) for motorcycles. Format validation belongs at the boundary;
//! classification here tolerates anything it is handed.
use shared::VehicleType;

/// Normalize a plate the way it is stored: trimmed and uppercased.
pub fn normalize(plate: &str) -> String {
    plate.trim().to_ascii_uppercase()
}

/// Whether `plate` matches one of the recognized formats.
pub fn is_valid(plate: &str) -> bool {
    classify(plate).is_some()
}

/// Derive the vehicle class from the plate format, if recognized.
pub fn classify(plate: &str) -> Option<VehicleType> {
    let normalized = normalize(plate);
    let b = normalized.as_bytes();
    if b.len() != 6 || !b[..3].iter().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    if b[3..].iter().all(|c| c.is_ascii_digit()) {
        return Some(VehicleType::Car);
    }
    if b[3].is_ascii_digit() && b[4].is_ascii_digit() && b[5].is_ascii_uppercase() {
        return Some(VehicleType::Motorcycle);
    }
    None
}

/// Classification that never fails: unrecognized-but-accepted input is
/// treated as a car so billing can proceed.
pub fn classify_or_default(plate: &str) -> VehicleType {
    classify(plate).unwrap_or(VehicleType::Car)
}
