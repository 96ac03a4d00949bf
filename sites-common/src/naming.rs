//! Hierarchical naming scheme
//!
//! Normalized names are built from parent codes, a type code, and a
//! per-parent-per-type sequence number:
//!
//! - Platform: `{STATION}_{ECOSYSTEM|VENDOR}_{MOUNT}{NN}` (e.g. `LON_AGR_TWR01`)
//! - Instrument: `{PLATFORM}_{TYPE}{NN}` (e.g. `LON_AGR_TWR01_PHE03`)
//! - ROI: `ROI_{NN}`, scoped to one instrument
//!
//! Everything here is pure. Reading siblings to pick `NN` is the job of the
//! sequence allocator in the service crate.

/// Minimum rendered width of a sequence suffix.
///
/// Suffixes widen past this instead of wrapping, so `99` is followed by `100`.
pub const MIN_SEQUENCE_WIDTH: usize = 2;

/// Prefix shared by every ROI name
pub const ROI_PREFIX: &str = "ROI_";

/// Render a sequence number as a zero-padded suffix
pub fn format_sequence(sequence: u32) -> String {
    format!("{:0width$}", sequence, width = MIN_SEQUENCE_WIDTH)
}

/// Sibling scope for platforms: everything before the sequence suffix
pub fn platform_prefix(station_acronym: &str, ecosystem_code: &str, mount_type_code: &str) -> String {
    format!("{}_{}_{}", station_acronym, ecosystem_code, mount_type_code)
}

/// Full platform normalized name
pub fn platform_name(
    station_acronym: &str,
    ecosystem_code: &str,
    mount_type_code: &str,
    sequence: u32,
) -> String {
    format!(
        "{}{}",
        platform_prefix(station_acronym, ecosystem_code, mount_type_code),
        format_sequence(sequence)
    )
}

/// Sibling scope for instruments on one platform
pub fn instrument_prefix(platform_name: &str, type_code: &str) -> String {
    format!("{}_{}", platform_name, type_code)
}

/// Full instrument normalized name
pub fn instrument_name(platform_name: &str, type_code: &str, sequence: u32) -> String {
    format!(
        "{}{}",
        instrument_prefix(platform_name, type_code),
        format_sequence(sequence)
    )
}

/// ROI name for a sequence number
pub fn roi_name(sequence: u32) -> String {
    format!("{}{}", ROI_PREFIX, format_sequence(sequence))
}

/// Extract the sequence number from `name` if it is `prefix` followed by digits only.
///
/// Returns `None` for names outside the scope (different prefix, trailing
/// text, zero, or overflow). Any digit count is accepted.
pub fn parse_sequence(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Uppercase ASCII letters and digits, starting with a letter, within length bounds
pub fn is_valid_code(code: &str, min_len: usize, max_len: usize) -> bool {
    let len = code.len();
    len >= min_len
        && len <= max_len
        && code.starts_with(|c: char| c.is_ascii_uppercase())
        && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Station acronyms are short uppercase codes (`SVB`, `LON`, `ANS`)
pub fn is_valid_station_acronym(acronym: &str) -> bool {
    is_valid_code(acronym, 2, 6)
}
