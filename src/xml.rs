//! Value extraction from the SOAP envelopes exchanged during the ECP flow.
//!
//! The SOAP/ECP handshake parses each message with [`roxmltree`] and asks this module for the
//! first node or attribute matching a selector, e.g. `S:Header/paos:Request/@responseConsumerURL`
//! or `//ecp:RelayState`. Selectors are resolved against an [`XmlNamespaces`] map that defaults
//! to the `ecp`, `S`, and `paos` prefixes.

pub mod path;

pub use path::*;

// crates.io
use roxmltree::Node;
// self
use crate::{
	_prelude::*,
	error::XmlError,
	obs::{self, ResolveOutcome, ResolveSpan, ResolveStage},
};

/// SAML2 ECP profile namespace.
pub const ECP_NS: &str = "urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp";
/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// Liberty PAOS binding namespace.
pub const PAOS_NS: &str = "urn:liberty:paos:2003-08";

/// Prefix to namespace URI map used when compiling selectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlNamespaces(BTreeMap<String, String>);
impl XmlNamespaces {
	/// Map without any prefixes.
	pub fn empty() -> Self {
		Self(BTreeMap::new())
	}

	/// Adds or replaces a prefix binding.
	pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
		self.0.insert(prefix.into(), uri.into());

		self
	}

	/// Looks up the URI bound to `prefix`.
	pub fn get(&self, prefix: &str) -> Option<&str> {
		self.0.get(prefix).map(String::as_str)
	}
}
impl Default for XmlNamespaces {
	fn default() -> Self {
		Self::empty().with("ecp", ECP_NS).with("S", SOAP_ENV_NS).with("paos", PAOS_NS)
	}
}

/// Returns the first node or attribute matching `path`, evaluated from `context`.
///
/// Absolute selectors start at the document root regardless of `context`. Only the first
/// match in document order is returned, so selectors should be specific enough to identify a
/// single value.
pub fn extract<'a, 'input>(
	context: Node<'a, 'input>,
	path: &str,
	namespaces: &XmlNamespaces,
) -> Result<XmlMatch<'a, 'input>, XmlError> {
	const STAGE: ResolveStage = ResolveStage::ExtractXml;

	let _span = ResolveSpan::new(STAGE, path).entered();

	obs::record_resolve_outcome(STAGE, ResolveOutcome::Attempt);

	let result = XmlPath::parse(path, namespaces).and_then(|compiled| compiled.first(context));

	obs::record_resolve_outcome(STAGE, ResolveOutcome::from_result(&result));

	result
}

/// Like [`extract`], returning the matched value as an owned string.
///
/// Elements without text yield an empty string.
pub fn extract_value(
	context: Node<'_, '_>,
	path: &str,
	namespaces: &XmlNamespaces,
) -> Result<String, XmlError> {
	extract(context, path, namespaces).map(|found| found.value().unwrap_or_default().to_owned())
}

#[cfg(test)]
mod tests {
	// crates.io
	use roxmltree::Document;
	// self
	use super::*;

	const SP_REQUEST: &str = r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/">
  <S:Header>
    <paos:Request xmlns:paos="urn:liberty:paos:2003-08" S:actor="http://schemas.xmlsoap.org/soap/actor/next" S:mustUnderstand="1" responseConsumerURL="https://sp.example.org/Shibboleth.sso/SAML2/ECP" service="urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp"/>
    <ecp:Request xmlns:ecp="urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp" S:actor="http://schemas.xmlsoap.org/soap/actor/next" S:mustUnderstand="1" IsPassive="0"/>
    <ecp:RelayState xmlns:ecp="urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp" S:actor="http://schemas.xmlsoap.org/soap/actor/next" S:mustUnderstand="1">ss:mem:0123abcd</ecp:RelayState>
  </S:Header>
  <S:Body>
    <samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_req1" Version="2.0"/>
  </S:Body>
</S:Envelope>"#;

	fn parse(xml: &str) -> Document<'_> {
		Document::parse(xml).expect("Fixture XML should parse.")
	}

	#[test]
	fn relative_attribute_from_envelope() {
		let doc = parse(SP_REQUEST);
		let url = extract_value(
			doc.root_element(),
			"S:Header/paos:Request/@responseConsumerURL",
			&XmlNamespaces::default(),
		)
		.expect("Consumer URL should be found.");

		assert_eq!(url, "https://sp.example.org/Shibboleth.sso/SAML2/ECP");
	}

	#[test]
	fn descendant_element_text() {
		let doc = parse(SP_REQUEST);
		let found = extract(doc.root_element(), "//ecp:RelayState", &XmlNamespaces::default())
			.expect("Relay state should be found.");

		assert_eq!(found.value(), Some("ss:mem:0123abcd"));
		assert_eq!(found.as_node().map(|node| node.tag_name().name()), Some("RelayState"));
	}

	#[test]
	fn absolute_paths_ignore_context() {
		let doc = parse(SP_REQUEST);
		let body = extract(doc.root_element(), "S:Body", &XmlNamespaces::default())
			.expect("Body should be found.")
			.as_node()
			.expect("Body is an element.");
		let header = extract(body, "/S:Envelope/S:Header", &XmlNamespaces::default())
			.expect("Absolute selector should resolve from the root.");

		assert_eq!(header.as_node().map(|node| node.tag_name().name()), Some("Header"));
	}

	#[test]
	fn namespaced_attribute_and_wildcards() {
		let doc = parse(SP_REQUEST);
		let must_understand = extract_value(
			doc.root_element(),
			"S:Header/ecp:*/@S:mustUnderstand",
			&XmlNamespaces::default(),
		)
		.expect("Namespaced attribute should be found.");

		assert_eq!(must_understand, "1");

		let first = extract(doc.root_element(), "S:Header/*", &XmlNamespaces::default())
			.expect("Wildcard should match the first header child.");

		assert_eq!(first.as_node().map(|node| node.tag_name().name()), Some("Request"));
		assert_eq!(first.as_node().and_then(|node| node.tag_name().namespace()), Some(PAOS_NS));
	}

	#[test]
	fn custom_prefixes_and_text_steps() {
		let doc = parse(SP_REQUEST);
		let namespaces =
			XmlNamespaces::default().with("samlp", "urn:oasis:names:tc:SAML:2.0:protocol");
		let id = extract_value(doc.root_element(), "//samlp:AuthnRequest/@ID", &namespaces)
			.expect("Custom prefix should resolve.");
		let relay = extract(doc.root_element(), "//ecp:RelayState/text()", &namespaces)
			.expect("Text step should match.");

		assert_eq!(id, "_req1");
		assert!(relay.as_node().is_some_and(|node| node.is_text()));
		assert_eq!(relay.value(), Some("ss:mem:0123abcd"));
	}

	#[test]
	fn parent_step_walks_up() {
		let doc = parse(SP_REQUEST);
		let parent = extract(doc.root_element(), "//ecp:RelayState/..", &XmlNamespaces::default())
			.expect("Parent step should match.");

		assert_eq!(parent.as_node().map(|node| node.tag_name().name()), Some("Header"));
	}

	#[test]
	fn unprefixed_names_only_match_unqualified_elements() {
		let doc = parse(SP_REQUEST);
		let err = extract(doc.root_element(), "Header", &XmlNamespaces::default())
			.expect_err("Unprefixed names must not match namespaced elements.");

		assert_eq!(err, XmlError::NotFound { path: "Header".into() });
	}

	#[test]
	fn zero_matches_is_not_found() {
		let doc = parse(SP_REQUEST);
		let err = extract(
			doc.root_element(),
			"//ecp:Response/@AssertionConsumerServiceURL",
			&XmlNamespaces::default(),
		)
		.expect_err("Missing elements must be reported.");

		assert!(matches!(err, XmlError::NotFound { .. }));
	}

	#[test]
	fn undeclared_prefix_and_bad_syntax_are_rejected() {
		let doc = parse(SP_REQUEST);

		assert_eq!(
			extract(doc.root_element(), "//saml:Assertion", &XmlNamespaces::default())
				.expect_err("Unknown prefixes must be rejected."),
			XmlError::UnknownPrefix { prefix: "saml".into() }
		);

		for bad in ["", "S:Header/", "S:Header[1]", "@ID/S:Body", "count(//S:Header)"] {
			assert!(
				matches!(
					extract(doc.root_element(), bad, &XmlNamespaces::default()),
					Err(XmlError::InvalidPath { .. })
				),
				"Selector {bad:?} should be rejected."
			);
		}
	}
}
