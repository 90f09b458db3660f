//! Human readable sizes for summary lines

const SIZES: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Render a byte count with binary prefixes and two decimals
///
/// `8589930496` becomes `8.00 GiB`. Values are reduced while they are at
/// least 1024, so the number part is always below 1024.
pub fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut reductions = 0;
    while reductions < SIZES.len() - 1 && value >= 1024.0 {
        value /= 1024.0;
        reductions += 1;
    }
    format!("{:.2} {}", value, SIZES[reductions])
}

/// The same, for the kilobyte counts found in /proc
pub fn human_kb(kb: u64) -> String {
    human_bytes(kb.saturating_mul(1024))
}
