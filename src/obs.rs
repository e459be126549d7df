//! Optional observability helpers for resolution stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ecp_idp.resolve` with the `stage` and
//!   `subject` (URL, query, or selector) fields. Directory fetches fill in `entries`, institution
//!   matches fill in `widened` when the wildcard retry runs, and matches and formatted
//!   endpoints fill in `resolved`.
//! - Enable `metrics` to increment the `ecp_idp_resolve_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`, and to record directory sizes in
//!   the `ecp_idp_directory_entries` histogram.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Resolution stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolveStage {
	/// Directory download + parse.
	FetchDirectory,
	/// Institution name matching.
	MatchInstitution,
	/// Endpoint reference formatting.
	FormatEndpoint,
	/// XML value extraction.
	ExtractXml,
}
impl ResolveStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResolveStage::FetchDirectory => "fetch_directory",
			ResolveStage::MatchInstitution => "match_institution",
			ResolveStage::FormatEndpoint => "format_endpoint",
			ResolveStage::ExtractXml => "extract_xml",
		}
	}
}
impl Display for ResolveStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolveOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl ResolveOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResolveOutcome::Attempt => "attempt",
			ResolveOutcome::Success => "success",
			ResolveOutcome::Failure => "failure",
		}
	}

	/// Maps a finished result onto [`ResolveOutcome::Success`] or [`ResolveOutcome::Failure`].
	pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { ResolveOutcome::Success } else { ResolveOutcome::Failure }
	}
}
impl Display for ResolveOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
