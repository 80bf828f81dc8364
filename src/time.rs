//! Time allocation for a single `go` call: translates clock state into a
//! millisecond budget, or `None` for an unbounded search (the caller is
//! expected to bound depth itself in that case).

/// Clock state reported by the protocol adapter for the side to move.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockReport {
    pub infinite: bool,
    pub fixed_depth: Option<u8>,
    pub movetime_ms: Option<u64>,
    pub remaining_ms: Option<u64>,
    pub increment_ms: Option<u64>,
    pub movestogo: Option<u32>,
}

/// Translate a clock report (plus the configured fallback default) into a
/// soft millisecond budget. `None` means unbounded — `max_depth` is the only
/// limit in that case.
pub fn allocate(report: &ClockReport, default_time_ms: u64) -> Option<u64> {
    if report.infinite {
        return None;
    }
    if report.fixed_depth.is_some() {
        return None;
    }
    if let Some(movetime) = report.movetime_ms {
        return Some(movetime.saturating_sub(50).max(1));
    }

    if let Some(remaining) = report.remaining_ms {
        let inc = report.increment_ms.unwrap_or(0);
        let raw = if let Some(movestogo) = report.movestogo {
            remaining / (movestogo as u64 + 2) + inc
        } else {
            remaining / 30 + inc
        };
        let cap = remaining / 2;
        return Some(raw.min(cap).max(10));
    }

    Some(default_time_ms)
}
