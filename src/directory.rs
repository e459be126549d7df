//! IdP directory model and the plaintext wire format it is published in.
//!
//! The directory is a list of `<url> <institution name>` lines. Institutions that also accept
//! Kerberos appear a second time with a literal ` (Kerberos)` suffix on their name.

pub mod source;

pub use source::*;

// self
use crate::{
	_prelude::*,
	error::DirectoryFormatError,
	obs::{self, ResolveOutcome, ResolveSpan, ResolveStage},
};

/// Mapping of institution display name to IdP SOAP endpoint URL.
///
/// Built fresh on every fetch; nothing is cached between calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpDirectory(HashMap<String, String>);
impl IdpDirectory {
	/// Parses a directory body, failing on the first malformed line.
	///
	/// Duplicate institution names keep the last URL seen.
	pub fn parse(body: &[u8]) -> Result<Self, DirectoryFormatError> {
		let mut entries = HashMap::new();
		// A terminating newline does not open another entry.
		let body = body.strip_suffix(b"\n").unwrap_or(body);

		if body.is_empty() {
			return Ok(Self(entries));
		}

		for (idx, raw) in body.split(|b| *b == b'\n').enumerate() {
			let line = idx + 1;
			let text =
				std::str::from_utf8(raw).map_err(|_| DirectoryFormatError::InvalidUtf8 { line })?;
			let (url, name) = split_line(line, text)?;

			entries.insert(name.to_owned(), url.to_owned());
		}

		Ok(Self(entries))
	}

	/// Returns the URL registered for an exact institution name.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// Returns true if the exact institution name is present.
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	/// Adds or replaces an entry.
	pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Option<String> {
		self.0.insert(name.into(), url.into())
	}

	/// Number of entries, counting Kerberos variants separately.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if the directory has no entries.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over institution names (in no particular order).
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	/// Iterator over `(name, url)` pairs (in no particular order).
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, url)| (name.as_str(), url.as_str()))
	}
}
impl FromIterator<(String, String)> for IdpDirectory {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (String, String)>,
	{
		Self(iter.into_iter().collect())
	}
}
impl IntoIterator for IdpDirectory {
	type IntoIter = std::collections::hash_map::IntoIter<String, String>;
	type Item = (String, String);

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
impl FromStr for IdpDirectory {
	type Err = DirectoryFormatError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s.as_bytes())
	}
}

/// Downloads and parses the directory published at `url`.
///
/// Performs exactly one read through `source`; retries are left to the caller.
pub async fn fetch_directory<S>(source: &S, url: &Url) -> Result<IdpDirectory>
where
	S: ?Sized + DirectorySource,
{
	const STAGE: ResolveStage = ResolveStage::FetchDirectory;

	let span = ResolveSpan::new(STAGE, url.as_str());

	obs::record_resolve_outcome(STAGE, ResolveOutcome::Attempt);

	let result = span
		.instrument(async move {
			let body = source.fetch(url).await?;
			let directory = IdpDirectory::parse(&body)?;

			#[cfg(feature = "tracing")]
			tracing::debug!(entries = directory.len(), "parsed IdP list");

			Ok::<_, Error>(directory)
		})
		.await;

	obs::record_resolve_outcome(STAGE, ResolveOutcome::from_result(&result));

	if let Ok(directory) = &result {
		span.record_entries(directory.len());
		obs::record_directory_entries(directory.len());
	}

	result
}

fn split_line(line: usize, text: &str) -> Result<(&str, &str), DirectoryFormatError> {
	let trimmed = text.trim();

	match trimmed.split_once(' ') {
		Some((url, name)) if !url.is_empty() && !name.is_empty() => Ok((url, name)),
		_ => Err(DirectoryFormatError::MalformedLine { line, content: trimmed.to_owned() }),
	}
}
