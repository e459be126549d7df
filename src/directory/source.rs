//! Transports that deliver the raw IdP directory body.
//!
//! [`DirectorySource`] is the only dependency the resolver has on an HTTP stack. Sources perform
//! a single read per call and keep no state between calls, so a shared source can serve
//! concurrent resolutions without locking.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Boxed future returned by [`DirectorySource::fetch`].
pub type SourceFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Vec<u8>, TransportError>> + 'a + Send>>;

/// Delivers the raw bytes published at a directory URL.
pub trait DirectorySource
where
	Self: Send + Sync,
{
	/// Reads the full body at `url`.
	fn fetch<'a>(&'a self, url: &'a Url) -> SourceFuture<'a>;
}
impl<T> DirectorySource for Arc<T>
where
	T: ?Sized + DirectorySource,
{
	fn fetch<'a>(&'a self, url: &'a Url) -> SourceFuture<'a> {
		(**self).fetch(url)
	}
}

/// HTTP(S) source backed by [`ReqwestClient`].
///
/// Issues one GET per fetch. Non-success statuses are reported as
/// [`TransportError::Status`]; there is no retry.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestDirectorySource(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestDirectorySource {
	/// Builds a client that gives up after `timeout` (or never, when `None`).
	pub fn new(timeout: Option<Duration>) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestDirectorySource {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl DirectorySource for ReqwestDirectorySource {
	fn fetch<'a>(&'a self, url: &'a Url) -> SourceFuture<'a> {
		Box::pin(async move {
			let response = self
				.0
				.get(url.clone())
				.send()
				.await
				.map_err(|e| TransportError::network(url, e))?;
			let status = response.status();

			if !status.is_success() {
				return Err(TransportError::Status {
					url: url.to_string(),
					status: status.as_u16(),
				});
			}

			let body = response.bytes().await.map_err(|e| TransportError::network(url, e))?;

			Ok(body.to_vec())
		})
	}
}

/// In-process source serving fixed bodies, for tests and offline use.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectorySource {
	bodies: HashMap<Url, Arc<[u8]>>,
	fetches: Arc<AtomicUsize>,
}
impl MemoryDirectorySource {
	/// Registers (or replaces) the body served at `url`.
	pub fn with_body(mut self, url: Url, body: impl AsRef<[u8]>) -> Self {
		self.bodies.insert(url, Arc::from(body.as_ref()));

		self
	}

	/// Number of fetches served or refused so far, shared across clones.
	pub fn fetch_count(&self) -> usize {
		self.fetches.load(Ordering::Relaxed)
	}
}
impl DirectorySource for MemoryDirectorySource {
	fn fetch<'a>(&'a self, url: &'a Url) -> SourceFuture<'a> {
		Box::pin(async move {
			self.fetches.fetch_add(1, Ordering::Relaxed);

			self.bodies
				.get(url)
				.map(|body| body.to_vec())
				.ok_or_else(|| TransportError::Unavailable { url: url.to_string() })
		})
	}
}
