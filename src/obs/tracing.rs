// self
use crate::{_prelude::*, obs::ResolveStage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedResolve<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedResolve<F> = F;

/// A span builder used by resolution stages.
#[derive(Clone, Debug)]
pub struct ResolveSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl ResolveSpan {
	/// Creates a new span tagged with the stage and the value being resolved.
	pub fn new(stage: ResolveStage, subject: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"ecp_idp.resolve",
				stage = stage.as_str(),
				subject,
				entries = tracing::field::Empty,
				widened = tracing::field::Empty,
				resolved = tracing::field::Empty
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, subject);

			Self {}
		}
	}

	/// Records how many entries a downloaded directory held.
	pub fn record_entries(&self, entries: usize) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("entries", entries as u64);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = entries;
		}
	}

	/// Records the pattern used by the wildcard retry of an institution query.
	pub fn record_widened(&self, pattern: &str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("widened", pattern);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = pattern;
		}
	}

	/// Records the institution name or endpoint URL the stage settled on.
	pub fn record_resolved(&self, value: &str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("resolved", value);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = value;
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> ResolveSpanGuard {
		#[cfg(feature = "tracing")]
		{
			ResolveSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			ResolveSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedResolve<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`ResolveSpan::entered`].
pub struct ResolveSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for ResolveSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ResolveSpanGuard(..)")
	}
}
