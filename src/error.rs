//! Crate-level error types shared by the directory, matcher, formatter, and XML helpers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Directory could not be downloaded.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Directory body contains a malformed line.
	#[error(transparent)]
	Format(#[from] DirectoryFormatError),
	/// Institution query did not resolve to exactly one directory entry.
	#[error(transparent)]
	Institution(#[from] InstitutionError),
	/// Literal endpoint reference is not a usable URL.
	#[error(transparent)]
	Endpoint(#[from] EndpointError),
	/// XML selector failed to produce a value.
	#[error(transparent)]
	Xml(#[from] XmlError),
}

/// Configuration failures raised while building resolvers.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration file could not be read.
	#[error("Failed to read configuration file {path}.")]
	Read {
		/// Path that failed to load.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Built-in or configured URL does not parse.
	#[error("Configured URL {value} is invalid.")]
	InvalidUrl {
		/// Rejected URL text.
		value: String,
		/// Parser failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration document is not valid JSON for [`crate::config::ResolverConfig`].
	#[error("Configuration document is invalid.")]
	Parse(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures while downloading the IdP directory.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while downloading the IdP list from {url}.")]
	Network {
		/// Directory URL being fetched.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Server answered with a non-success status.
	#[error("IdP list request to {url} returned HTTP {status}.")]
	Status {
		/// Directory URL being fetched.
		url: String,
		/// HTTP status code.
		status: u16,
	},
	/// No body is registered for the URL (in-memory sources only).
	#[error("No IdP list is available at {url}.")]
	Unavailable {
		/// Directory URL being fetched.
		url: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}

/// Malformed IdP directory content; aborts the whole fetch.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DirectoryFormatError {
	/// Line is not valid UTF-8.
	#[error("IdP list line {line} is not valid UTF-8.")]
	InvalidUtf8 {
		/// 1-based line number.
		line: usize,
	},
	/// Line cannot be split into a URL token and an institution name.
	#[error("IdP list line {line} is not of the form `<url> <institution>`: {content:?}.")]
	MalformedLine {
		/// 1-based line number.
		line: usize,
		/// Offending line with surrounding whitespace removed.
		content: String,
	},
}

/// Institution queries that cannot be resolved to exactly one entry.
#[derive(Debug, ThisError)]
pub enum InstitutionError {
	/// No directory entry matched, even after widening the query.
	#[error("Failed to identify IdP URLs for {query:?}: no institution matches.")]
	Unknown {
		/// Query as supplied by the caller.
		query: String,
	},
	/// More than one directory entry matched.
	#[error("Failed to identify IdP URLs for {query:?}: ambiguous between {candidates:?}.")]
	Ambiguous {
		/// Query as supplied by the caller.
		query: String,
		/// Matching base names, sorted.
		candidates: Vec<String>,
	},
	/// Query does not compile as a regular expression.
	#[error("Institution query {query:?} is not a valid pattern.")]
	InvalidPattern {
		/// Query as supplied by the caller.
		query: String,
		/// Regex compilation failure.
		#[source]
		source: regex::Error,
	},
	/// Institution only publishes a Kerberos endpoint but the standard one was requested.
	#[error("Institution {institution:?} has no standard (non-Kerberos) IdP endpoint.")]
	MissingStandardEndpoint {
		/// Canonical institution name.
		institution: String,
	},
}

/// Literal endpoint references that cannot be turned into a URL.
#[derive(Debug, ThisError)]
pub enum EndpointError {
	/// Formatted value does not parse as an absolute URL.
	#[error("Endpoint {value:?} is not a valid URL.")]
	InvalidUrl {
		/// Formatted value that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Failures raised by the XML value extractor.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum XmlError {
	/// Selector matched nothing.
	#[error("No XML node matches {path:?}.")]
	NotFound {
		/// Selector that was evaluated.
		path: String,
	},
	/// Selector uses syntax outside the supported subset.
	#[error("XML path {path:?} is invalid: {reason}.")]
	InvalidPath {
		/// Selector that failed to parse.
		path: String,
		/// Short description of the problem.
		reason: &'static str,
	},
	/// Selector references a prefix missing from the namespace map.
	#[error("XML namespace prefix {prefix:?} is not declared.")]
	UnknownPrefix {
		/// Undeclared prefix.
		prefix: String,
	},
}
