use crate::error::ValidationError;

pub const MIN_SECTOR_LEN: usize = 3;

/// Accepts alphabetic sector names of at least three letters and returns
/// the canonical lowercased form.
pub fn validate_sector(raw: &str) -> Result<String, ValidationError> {
    let long_enough = raw.chars().count() >= MIN_SECTOR_LEN;
    if !long_enough || !raw.chars().all(char::is_alphabetic) {
        return Err(ValidationError::InvalidSector {
            min_len: MIN_SECTOR_LEN,
        });
    }
    Ok(raw.to_lowercase())
}
