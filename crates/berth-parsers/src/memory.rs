//! Memory parsing utilities for scheduler output.

/// Parse a SLURM memory string to megabytes.
///
/// Handles "4G", "1000M", "4096K", "2T" and bare numbers (MB). A trailing
/// per-node/per-core marker as printed by sacct ("4Gn", "1000Mc") is ignored.
///
/// Returns None for empty strings, placeholders, "UNLIMITED" and sizes that
/// overflow.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "-" || s.eq_ignore_ascii_case("UNLIMITED") {
        return None;
    }

    let s = s.trim_end_matches(['n', 'c']);

    let (digits, factor) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024 * 1024)
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024)
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1)
    } else if let Some(stripped) = s.strip_suffix('K') {
        return stripped.parse::<u64>().ok().map(|v| v / 1024);
    } else {
        // Assume MB if no suffix
        (s, 1)
    };
    digits.parse::<u64>().ok()?.checked_mul(factor)
}
