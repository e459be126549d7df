//! Resolve institution names (or raw hostnames) to SAML2 ECP identity-provider endpoints, and
//! pull required values out of the SOAP envelopes exchanged during the ECP flow.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod directory;
pub mod endpoint;
pub mod error;
pub mod institution;
pub mod obs;
pub mod xml;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	#[cfg(feature = "reqwest")] use crate::directory::ReqwestDirectorySource;
	use crate::{
		config::ResolverConfig,
		directory::{IdpDirectory, MemoryDirectorySource},
		endpoint::EndpointResolver,
	};

	/// URL under which [`memory_resolver`] serves its directory.
	pub const MEMORY_IDP_LIST_URL: &str = "https://idp-list.test/ecpidps.txt";

	/// Builds a directory from `(name, url)` pairs.
	pub fn directory<'a, I>(entries: I) -> IdpDirectory
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
	{
		entries.into_iter().map(|(name, url)| (name.to_owned(), url.to_owned())).collect()
	}

	/// Constructs an [`EndpointResolver`] whose default directory URL serves `body` from memory.
	pub fn memory_resolver(body: &str) -> EndpointResolver<MemoryDirectorySource> {
		let url = Url::parse(MEMORY_IDP_LIST_URL).expect("Memory directory URL should parse.");
		let source = MemoryDirectorySource::default().with_body(url.clone(), body);

		EndpointResolver::with_source(test_config().with_idp_list_url(url), source)
	}

	/// Environment defaults, failing the test when they do not resolve.
	pub fn test_config() -> ResolverConfig {
		ResolverConfig::from_env().expect("Built-in resolver defaults should parse.")
	}

	/// Builds a reqwest directory source that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_source(timeout: Option<Duration>) -> ReqwestDirectorySource {
		let mut builder = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true);

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		let client = builder.build().expect("Failed to build insecure Reqwest client for tests.");

		ReqwestDirectorySource::with_client(client)
	}

	/// Builds a reqwest-backed resolver for `config`, honoring its timeout, over
	/// [`test_reqwest_source`].
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_resolver(
		config: ResolverConfig,
	) -> EndpointResolver<ReqwestDirectorySource> {
		let source = test_reqwest_source(config.timeout);

		EndpointResolver::with_source(config, source)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use roxmltree;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
