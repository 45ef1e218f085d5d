//! Prometheus metrics.
//!
//! Round and phase names come from staff input, so labels derived from them
//! are truncated and restricted to a safe character set.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::RostrumError;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Maximum length of a label derived from a name.
const MAX_LABEL_LEN: usize = 64;

/// Installs the global metrics recorder.
///
/// With `Some(port)` a Prometheus listener is started on
/// `127.0.0.1:<port>`; with `None` metrics are only recorded in-process.
/// Later calls are no-ops.
///
/// # Errors
///
/// Returns `RostrumError::Io` if the recorder or listener cannot be
/// installed.
pub fn init_metrics(port: Option<u16>) -> Result<(), RostrumError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| RostrumError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "rostrum_submissions_aggregated_total",
        "Score submissions counted by aggregation"
    );
    describe_counter!("rostrum_scores_recorded_total", "Judge submissions stored");
    describe_counter!("rostrum_ties_detected_total", "Tie-break sessions opened");
    describe_counter!("rostrum_dice_rolls_total", "Tie-break throws");
    describe_counter!(
        "rostrum_tie_breaks_confirmed_total",
        "Tie-break decisions persisted"
    );
    describe_counter!("rostrum_byes_confirmed_total", "Byes recorded");
    describe_counter!(
        "rostrum_duplicate_writes_rejected_total",
        "Bye or tie-break writes refused because one already exists"
    );
    describe_counter!("rostrum_round_activations_total", "Active round changes");
    describe_gauge!("rostrum_current_round", "Active round (1 = active)");
}

/// Records submissions counted for a round.
pub fn record_aggregation(submissions: usize) {
    counter!("rostrum_submissions_aggregated_total").increment(submissions as u64);
}

/// Records a stored judge submission.
pub fn record_score() {
    counter!("rostrum_scores_recorded_total").increment(1);
}

/// Records a newly opened tie-break.
pub fn record_tie_detected() {
    counter!("rostrum_ties_detected_total").increment(1);
}

/// Records one throw of the dice.
pub fn record_dice_roll(resolved: bool) {
    let outcome = if resolved { "resolved" } else { "tied" };
    counter!("rostrum_dice_rolls_total", "outcome" => outcome).increment(1);
}

/// Records a persisted tie-break.
pub fn record_tie_break_confirmed() {
    counter!("rostrum_tie_breaks_confirmed_total").increment(1);
}

/// Records a persisted bye.
pub fn record_bye_confirmed() {
    counter!("rostrum_byes_confirmed_total").increment(1);
}

/// Records a refused duplicate system write.
pub fn record_duplicate_rejected(kind: &'static str) {
    counter!("rostrum_duplicate_writes_rejected_total", "kind" => kind).increment(1);
}

/// Records a change of active round.
///
/// The previous round's gauge is zeroed so only one round reads `1`.
pub fn record_round_activation(round: &str, previous: Option<&str>) {
    counter!("rostrum_round_activations_total").increment(1);
    if let Some(prev) = previous {
        gauge!("rostrum_current_round", "round" => sanitize_label(prev)).set(0.0);
    }
    gauge!("rostrum_current_round", "round" => sanitize_label(round)).set(1.0);
}

/// Truncates a name and replaces characters outside `[A-Za-z0-9_-]`.
fn sanitize_label(name: &str) -> String {
    name.chars()
        .take(MAX_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
