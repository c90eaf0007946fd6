// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compact human-readable durations for job listings.

/// Format whole seconds as the largest fitting unit: `5s`, `2m`, `1h`, `3d`.
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m", secs / 60),
        3_600..=86_399 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Format milliseconds, keeping sub-second precision below one minute.
pub fn format_elapsed_ms(ms: u64) -> String {
    match ms {
        0..=999 => format!("{ms}ms"),
        1_000..=59_999 => format!("{:.1}s", ms as f64 / 1_000.0),
        _ => format_elapsed(ms / 1_000),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
