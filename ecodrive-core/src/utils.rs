//! Module containing miscellaneous utility functions.

use crate::imports::*;

/// Returns true if `data` is strictly increasing, i.e. sorted without repeats
pub fn is_strictly_increasing(data: &[f64]) -> bool {
    data.windows(2).all(|w| w[0] < w[1])
}

/// Ensures that all of the supplied columns have the length of the first one
pub fn check_same_len(cols: &[(&str, usize)]) -> anyhow::Result<()> {
    if let Some((first_name, first_len)) = cols.first() {
        for (name, len) in cols.iter().skip(1) {
            ensure!(
                len == first_len,
                "{}\n`{name}` has length {len} but `{first_name}` has length {first_len}",
                format_dbg!()
            );
        }
    }
    Ok(())
}
