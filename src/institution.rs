//! Institution matching against an [`IdpDirectory`].
//!
//! A query is compiled into the anchored pattern `^<query>($| \()` and tested against every
//! directory name with its ` (Kerberos)` suffix removed. Exactly one base name must match. When
//! nothing matches, the query is widened once to `<query>.*` before giving up.
//!
//! In [`PatternMode::Permissive`] the query is used as a regular-expression fragment, so
//! metacharacters such as `.`, `|`, or `(` act as pattern syntax rather than literal text. Use
//! [`PatternMode::Literal`] to match the query verbatim.

// crates.io
use regex::Regex;
// self
use crate::{
	_prelude::*,
	config::PatternMode,
	directory::IdpDirectory,
	error::InstitutionError,
	obs::{self, ResolveOutcome, ResolveSpan, ResolveStage},
};

/// Suffix marking the Kerberos variant of an institution's entry.
pub const KERBEROS_SUFFIX: &str = " (Kerberos)";

const WIDEN: &str = ".*";

/// Endpoints published for one canonical institution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInstitution {
	/// Institution name without the Kerberos suffix.
	pub name: String,
	/// Username/password SAML endpoint; absent for Kerberos-only institutions.
	pub standard: Option<String>,
	/// Kerberos endpoint, falling back to `standard` when no dedicated entry exists.
	pub kerberos: String,
}
impl ResolvedInstitution {
	/// Picks the Kerberos or standard endpoint.
	///
	/// Asking a Kerberos-only institution for its standard endpoint is an error rather than an
	/// empty value.
	pub fn endpoint(&self, kerberos: bool) -> Result<&str, InstitutionError> {
		if kerberos {
			return Ok(&self.kerberos);
		}

		self.standard.as_deref().ok_or_else(|| InstitutionError::MissingStandardEndpoint {
			institution: self.name.clone(),
		})
	}
}

/// Strips a trailing [`KERBEROS_SUFFIX`] from a directory name.
pub fn base_name(name: &str) -> &str {
	name.strip_suffix(KERBEROS_SUFFIX).unwrap_or(name)
}

/// Resolves `query` to exactly one canonical (suffix-free) institution name.
pub fn match_institution(
	query: &str,
	directory: &IdpDirectory,
	mode: PatternMode,
) -> Result<String, InstitutionError> {
	const STAGE: ResolveStage = ResolveStage::MatchInstitution;

	let span = ResolveSpan::new(STAGE, query);
	let _guard = span.clone().entered();

	obs::record_resolve_outcome(STAGE, ResolveOutcome::Attempt);

	let candidates = directory.names().map(base_name).collect::<BTreeSet<_>>();
	let fragment = match mode {
		PatternMode::Permissive => query.to_owned(),
		PatternMode::Literal => regex::escape(query),
	};
	let result = match_fragment(query, &fragment, &candidates, &span);

	obs::record_resolve_outcome(STAGE, ResolveOutcome::from_result(&result));

	if let Ok(name) = &result {
		span.record_resolved(name);
	}

	result
}

/// Matches `query` and collects its standard and Kerberos endpoints.
pub fn resolve_institution(
	query: &str,
	directory: &IdpDirectory,
	mode: PatternMode,
) -> Result<ResolvedInstitution, InstitutionError> {
	let name = match_institution(query, directory, mode)?;
	let standard = directory.get(&name).map(str::to_owned);
	let kerberos = directory.get(&format!("{name}{KERBEROS_SUFFIX}")).map(str::to_owned);
	let kerberos = match (kerberos, &standard) {
		(Some(url), _) => url,
		(None, Some(url)) => url.clone(),
		// Every candidate comes from a directory key, so one of the two lookups hits.
		(None, None) => return Err(InstitutionError::Unknown { query: query.to_owned() }),
	};

	Ok(ResolvedInstitution { name, standard, kerberos })
}

fn match_fragment(
	query: &str,
	fragment: &str,
	candidates: &BTreeSet<&str>,
	span: &ResolveSpan,
) -> Result<String, InstitutionError> {
	let pattern = Regex::new(&format!("^(?:{fragment}($| \\())")).map_err(|source| {
		InstitutionError::InvalidPattern { query: query.to_owned(), source }
	})?;
	let mut matches = candidates.iter().filter(|name| pattern.is_match(name));

	match (matches.next(), matches.next()) {
		(Some(name), None) => Ok((*name).to_owned()),
		(None, _) if !fragment.ends_with(WIDEN) => {
			let widened = format!("{fragment}{WIDEN}");

			span.record_widened(&widened);

			match_fragment(query, &widened, candidates, span).map_err(|_e| {
				#[cfg(feature = "tracing")]
				tracing::debug!(error = %_e, %widened, "widened institution query failed");

				InstitutionError::Unknown { query: query.to_owned() }
			})
		},
		(None, _) => Err(InstitutionError::Unknown { query: query.to_owned() }),
		(Some(first), Some(second)) => {
			let candidates = [*first, *second]
				.into_iter()
				.chain(matches.copied())
				.map(str::to_owned)
				.collect::<Vec<_>>();

			Err(InstitutionError::Ambiguous { query: query.to_owned(), candidates })
		},
	}
}
