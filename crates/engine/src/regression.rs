//! Regression detector.
//!
//! Compares a freshly loaded snapshot's summary against the device
//! metadata record. The record is only a summary of what this device
//! last observed; a mismatch means a *suspicious* rollback, not a
//! certain one, which is why the outcome is a user choice rather than an
//! automatic restore.

use keepsake_core::{
    DeviceMetadataRecord, RegressionReason, RegressionReport, RegressionTolerances, SlotSummary,
};
use tracing::info;

/// Compare `loaded` against `record` and report a regression if any
/// tolerance is exceeded.
///
/// Conditions are evaluated in fixed priority order (playtime drop,
/// completion drop, timestamp rollback); the first that triggers becomes
/// the primary reason, but all computed deltas are retained for display.
pub fn detect_regression(
    tolerances: &RegressionTolerances,
    record: &DeviceMetadataRecord,
    loaded: &SlotSummary,
) -> Option<RegressionReport> {
    let playtime_drop_seconds = record.playtime_seconds - loaded.playtime_seconds;
    let completion_drop_percent = record.completion_percent - loaded.completion_percent;
    let minutes_newer_previously = match (record.last_quit_utc, loaded.last_quit_utc) {
        (Some(recorded), Some(loaded_ts)) => (recorded - loaded_ts).num_minutes(),
        _ => 0,
    };

    let mut reasons = Vec::new();
    if playtime_drop_seconds > tolerances.playtime_drop_secs {
        reasons.push(RegressionReason::PlaytimeDrop);
    }
    if completion_drop_percent > tolerances.completion_drop_pct {
        reasons.push(RegressionReason::CompletionDrop);
    }
    if minutes_newer_previously > tolerances.clock_grace_mins {
        reasons.push(RegressionReason::OlderThanLastSeen);
    }

    if reasons.is_empty() {
        return None;
    }

    let report = RegressionReport {
        playtime_drop_seconds,
        completion_drop_percent,
        minutes_newer_previously,
        reasons,
    };
    if let Some(primary) = report.primary() {
        info!(%primary, "save regression detected");
    }
    Some(report)
}
