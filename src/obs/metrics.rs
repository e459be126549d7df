// self
use crate::obs::{ResolveOutcome, ResolveStage};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_resolve_outcome(stage: ResolveStage, outcome: ResolveOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"ecp_idp_resolve_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Records the number of entries in a freshly parsed directory (when enabled).
pub fn record_directory_entries(entries: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("ecp_idp_directory_entries").record(entries as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = entries;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_resolve_outcome_noop_without_metrics() {
		record_resolve_outcome(ResolveStage::MatchInstitution, ResolveOutcome::Failure);
	}

	#[test]
	fn record_directory_entries_accepts_empty_lists() {
		record_directory_entries(0);
		record_directory_entries(412);
	}
}
