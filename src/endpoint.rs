//! ECP endpoint formatting and the resolver facade.
//!
//! An endpoint reference is either a literal URL/hostname or an institution name. Plain strings
//! are classified by [`EndpointReference::classify`]: two or more `.` characters mean a URL or
//! hostname, anything else is an institution name. The rule is a heuristic (a dotted institution
//! name such as `St. Mary's Univ. Lab` is taken for a hostname), so callers that already know what
//! they hold should construct the variant directly.

// self
use crate::{
	_prelude::*,
	config::ResolverConfig,
	directory::{self, DirectorySource, IdpDirectory},
	error::EndpointError,
	institution::{self, ResolvedInstitution},
	obs::{self, ResolveOutcome, ResolveSpan, ResolveStage},
};
#[cfg(feature = "reqwest")] use crate::{directory::ReqwestDirectorySource, error::ConfigError};

/// Path of the SAML2 SOAP ECP profile on Shibboleth identity providers.
pub const ECP_PROFILE_PATH: &str = "/idp/profile/SAML2/SOAP/ECP";

/// Something that names an IdP endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointReference {
	/// Literal URL or hostname, formatted without consulting the directory.
	Url(String),
	/// Institution name (or pattern) resolved through the directory.
	Institution(String),
}
impl EndpointReference {
	/// Classifies a raw string: two or more `.` characters make it a URL/hostname.
	pub fn classify(raw: &str) -> Self {
		if raw.matches('.').count() >= 2 {
			Self::Url(raw.to_owned())
		} else {
			Self::Institution(raw.to_owned())
		}
	}

	/// Returns the raw text of the reference.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Url(value) | Self::Institution(value) => value,
		}
	}
}
impl From<&str> for EndpointReference {
	fn from(value: &str) -> Self {
		Self::classify(value)
	}
}
impl From<String> for EndpointReference {
	fn from(value: String) -> Self {
		Self::classify(&value)
	}
}
impl From<&String> for EndpointReference {
	fn from(value: &String) -> Self {
		Self::classify(value)
	}
}
impl Display for EndpointReference {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Formats a literal URL or hostname as an ECP endpoint URL.
///
/// `https://` is prefixed when no `<scheme>://` is present, and [`ECP_PROFILE_PATH`] is
/// inserted when the URL has no path, ahead of any query or fragment. Anything that already
/// has a path is returned as given, so applying the function to its own output is a no-op.
pub fn format_literal_endpoint(raw: &str) -> Result<String, EndpointError> {
	let value = if has_scheme(raw) { raw.to_owned() } else { format!("https://{raw}") };
	let value = if path_of(&value).is_empty() { with_profile_path(&value) } else { value };

	match Url::parse(&value) {
		Ok(_) => Ok(value),
		Err(source) => Err(EndpointError::InvalidUrl { value, source }),
	}
}

/// Resolves endpoint references against a directory served by `S`.
///
/// Every institution lookup downloads the directory afresh; the resolver keeps no state
/// between calls and can be shared across tasks.
#[derive(Clone, Debug)]
pub struct EndpointResolver<S>
where
	S: ?Sized + DirectorySource,
{
	/// Directory location, timeout, and matching mode.
	pub config: ResolverConfig,
	/// Transport used to download the directory.
	pub source: Arc<S>,
}
impl<S> EndpointResolver<S>
where
	S: ?Sized + DirectorySource,
{
	/// Creates a resolver that reads the directory through `source`.
	pub fn with_source(config: ResolverConfig, source: impl Into<Arc<S>>) -> Self {
		Self { config, source: source.into() }
	}

	/// Downloads the configured directory.
	pub async fn fetch_directory(&self) -> Result<IdpDirectory> {
		self.fetch_directory_from(&self.config.idp_list_url).await
	}

	/// Downloads the directory published at `url`.
	pub async fn fetch_directory_from(&self, url: &Url) -> Result<IdpDirectory> {
		directory::fetch_directory(&*self.source, url).await
	}

	/// Returns the standard and Kerberos endpoints for `institution` using the configured
	/// directory.
	pub async fn idp_urls(&self, institution: &str) -> Result<ResolvedInstitution> {
		self.idp_urls_from(institution, &self.config.idp_list_url).await
	}

	/// Returns the standard and Kerberos endpoints for `institution` using the directory at
	/// `url`.
	pub async fn idp_urls_from(&self, institution: &str, url: &Url) -> Result<ResolvedInstitution> {
		let directory = self.fetch_directory_from(url).await?;

		Ok(institution::resolve_institution(institution, &directory, self.config.pattern_mode)?)
	}

	/// Formats `reference` as an ECP endpoint URL using the configured directory.
	pub async fn format_endpoint_url(
		&self,
		reference: impl Into<EndpointReference>,
		kerberos: bool,
	) -> Result<String> {
		self.format_endpoint_url_from(reference, kerberos, &self.config.idp_list_url).await
	}

	/// Formats `reference` as an ECP endpoint URL, resolving institution names against the
	/// directory at `url`.
	///
	/// Literal references never touch the directory. Institution names return the directory's
	/// URL verbatim: the Kerberos one when `kerberos` is set, otherwise the standard one.
	pub async fn format_endpoint_url_from(
		&self,
		reference: impl Into<EndpointReference>,
		kerberos: bool,
		url: &Url,
	) -> Result<String> {
		const STAGE: ResolveStage = ResolveStage::FormatEndpoint;

		let reference = reference.into();
		let span = ResolveSpan::new(STAGE, reference.as_str());

		obs::record_resolve_outcome(STAGE, ResolveOutcome::Attempt);

		let result = span
			.instrument(async move {
				let endpoint = match reference {
					EndpointReference::Url(raw) => format_literal_endpoint(&raw)?,
					EndpointReference::Institution(name) => {
						let resolved = self.idp_urls_from(&name, url).await?;

						resolved.endpoint(kerberos)?.to_owned()
					},
				};

				Ok::<_, Error>(endpoint)
			})
			.await;

		obs::record_resolve_outcome(STAGE, ResolveOutcome::from_result(&result));

		if let Ok(endpoint) = &result {
			span.record_resolved(endpoint);
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl EndpointResolver<ReqwestDirectorySource> {
	/// Creates a resolver that downloads the directory over HTTPS with the configured timeout.
	pub fn reqwest(config: ResolverConfig) -> Result<Self, ConfigError> {
		let source = ReqwestDirectorySource::new(config.timeout)?;

		Ok(Self::with_source(config, source))
	}
}

fn has_scheme(raw: &str) -> bool {
	let Some((scheme, _)) = raw.split_once("://") else {
		return false;
	};
	let mut chars = scheme.chars();

	chars.next().is_some_and(|c| c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

// Only called when the path is empty, so the authority ends at the first `?` or `#`.
fn with_profile_path(url: &str) -> String {
	let scheme_end = url.find("://").map_or(0, |idx| idx + 3);
	let (head, tail) = match url[scheme_end..].find(['?', '#']) {
		Some(idx) => url.split_at(scheme_end + idx),
		None => (url, ""),
	};

	format!("{head}{ECP_PROFILE_PATH}{tail}")
}

/// Path component of a URL that has a `<scheme>://` prefix: everything after the authority up
/// to the query or fragment.
fn path_of(url: &str) -> &str {
	let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
	let rest = rest.split(['?', '#']).next().unwrap_or_default();

	rest.find('/').map_or("", |idx| &rest[idx..])
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{MEMORY_IDP_LIST_URL, memory_resolver},
		error::{InstitutionError, TransportError},
	};

	const LIST: &str = "\
https://login.ligo.org/idp/profile/SAML2/SOAP/ECP LIGO Laboratory
https://login.ligo.org/idp/profile/SAML2/SOAP/ECP-krb LIGO Laboratory (Kerberos)
https://krb.example.org/ecp Kerberos Only Lab (Kerberos)
https://idp.cf.ac.uk/idp/profile/SAML2/SOAP/ECP Cardiff University
";

	#[test]
	fn classify_counts_dots() {
		assert_eq!(
			EndpointReference::classify("login.ligo.org"),
			EndpointReference::Url("login.ligo.org".into())
		);
		assert_eq!(
			EndpointReference::classify("ligo.org"),
			EndpointReference::Institution("ligo.org".into())
		);
		assert_eq!(
			EndpointReference::from("LIGO Laboratory"),
			EndpointReference::Institution("LIGO Laboratory".into())
		);
	}

	#[test]
	fn bare_hostname_gets_scheme_and_profile_path() {
		assert_eq!(
			format_literal_endpoint("login.ligo.org").expect("Hostnames should format."),
			"https://login.ligo.org/idp/profile/SAML2/SOAP/ECP"
		);
		assert_eq!(
			format_literal_endpoint("http://idp.example.org:8080").expect("URLs should format."),
			"http://idp.example.org:8080/idp/profile/SAML2/SOAP/ECP"
		);
	}

	#[test]
	fn existing_path_is_kept() {
		assert_eq!(
			format_literal_endpoint("https://login.example.com/custom/path")
				.expect("Full URLs should format."),
			"https://login.example.com/custom/path"
		);
		assert_eq!(
			format_literal_endpoint("login.example.com/custom").expect("Paths should be kept."),
			"https://login.example.com/custom"
		);
	}

	#[test]
	fn formatting_is_idempotent() {
		for raw in [
			"login.ligo.org",
			"https://a.b.example/x",
			"idp.example.org:8443",
			"login.example.org?x=1",
			"https://login.example.org#frag",
		] {
			let once = format_literal_endpoint(raw).expect("First pass should format.");
			let twice = format_literal_endpoint(&once).expect("Second pass should format.");

			assert_eq!(once, twice, "Formatting {raw:?} twice should be stable.");
		}
	}

	#[test]
	fn profile_path_goes_before_query_and_fragment() {
		assert_eq!(
			format_literal_endpoint("login.example.org?x=1").expect("Query URL should format."),
			"https://login.example.org/idp/profile/SAML2/SOAP/ECP?x=1"
		);
		assert_eq!(
			format_literal_endpoint("https://login.example.org?x=1#f")
				.expect("Query and fragment URL should format."),
			"https://login.example.org/idp/profile/SAML2/SOAP/ECP?x=1#f"
		);
	}

	#[test]
	fn garbage_literals_are_rejected() {
		assert!(matches!(
			format_literal_endpoint("https://bad host.example.org"),
			Err(EndpointError::InvalidUrl { .. })
		));
	}

	#[test]
	fn path_of_ignores_query_and_fragment() {
		assert_eq!(path_of("https://a.example"), "");
		assert_eq!(path_of("https://a.example?x=/y"), "");
		assert_eq!(path_of("https://a.example/p?q#f"), "/p");
	}

	#[tokio::test]
	async fn institution_name_picks_standard_or_kerberos() {
		let resolver = memory_resolver(LIST);

		assert_eq!(
			resolver.format_endpoint_url("LIGO", true).await.expect("LIGO should resolve."),
			"https://login.ligo.org/idp/profile/SAML2/SOAP/ECP-krb"
		);
		assert_eq!(
			resolver.format_endpoint_url("LIGO", false).await.expect("LIGO should resolve."),
			"https://login.ligo.org/idp/profile/SAML2/SOAP/ECP"
		);
		assert_eq!(
			resolver.format_endpoint_url("Cardiff", true).await.expect("Cardiff should resolve."),
			"https://idp.cf.ac.uk/idp/profile/SAML2/SOAP/ECP"
		);
		assert_eq!(resolver.source.fetch_count(), 3);
	}

	#[tokio::test]
	async fn literal_references_skip_the_directory() {
		let resolver = memory_resolver(LIST);
		let url = resolver
			.format_endpoint_url(EndpointReference::Url("idp".into()), false)
			.await
			.expect("Forced literal should format.");

		assert_eq!(url, "https://idp/idp/profile/SAML2/SOAP/ECP");
		assert_eq!(resolver.source.fetch_count(), 0);
	}

	#[tokio::test]
	async fn kerberos_only_institution_rejects_standard_request() {
		let resolver = memory_resolver(LIST);

		assert_eq!(
			resolver
				.format_endpoint_url("Kerberos Only", true)
				.await
				.expect("Kerberos URL exists."),
			"https://krb.example.org/ecp"
		);

		let err = resolver
			.format_endpoint_url("Kerberos Only", false)
			.await
			.expect_err("Standard endpoint is missing.");

		assert!(matches!(
			err,
			Error::Institution(InstitutionError::MissingStandardEndpoint { .. })
		));
	}

	#[tokio::test]
	async fn unknown_institution_propagates() {
		let resolver = memory_resolver(LIST);
		let err = resolver
			.format_endpoint_url("Nonexistent Org", false)
			.await
			.expect_err("Unknown institutions must fail.");

		assert!(matches!(err, Error::Institution(InstitutionError::Unknown { .. })));
	}

	#[tokio::test]
	async fn per_call_directory_override() {
		let resolver = memory_resolver(LIST);
		let other = Url::parse("https://elsewhere.test/list.txt").expect("URL should parse.");
		let err = resolver
			.format_endpoint_url_from("LIGO", false, &other)
			.await
			.expect_err("Unregistered directory URL must fail.");

		assert!(matches!(
			err,
			Error::Transport(TransportError::Unavailable { ref url }) if url == other.as_str()
		));

		let directory = resolver
			.fetch_directory_from(&Url::parse(MEMORY_IDP_LIST_URL).expect("URL should parse."))
			.await
			.expect("Default directory should load.");

		assert_eq!(directory.len(), 4);
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn reqwest_resolver_reads_served_directory() {
		// crates.io
		use httpmock::prelude::*;

		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(GET).path("/ecpidps.txt");
				then.status(200).body(LIST);
			})
			.await;
		let url = Url::parse(&server.url("/ecpidps.txt")).expect("Mock URL should parse.");
		let resolver = crate::_preludet::test_reqwest_resolver(
			crate::_preludet::test_config().with_idp_list_url(url),
		);
		let endpoint = resolver
			.format_endpoint_url("Cardiff", false)
			.await
			.expect("Served directory should resolve Cardiff.");

		assert_eq!(endpoint, "https://idp.cf.ac.uk/idp/profile/SAML2/SOAP/ECP");

		mock.assert_calls_async(1).await;
	}
}
