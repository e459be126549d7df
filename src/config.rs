//! Resolver configuration resolved once at process start.
//!
//! [`ResolverConfig::from_env`] is the single place that consults the environment; everything
//! else receives explicit values so integrators can override any default per resolver.

// std
use std::{
	env, fs,
	path::{Path, PathBuf},
};
// crates.io
use serde::{Deserializer, Serializer};
// self
use crate::{_prelude::*, error::ConfigError};

/// Directory of known ECP identity providers published by CILogon.
pub const DEFAULT_IDP_LIST_URL: &str = "https://cilogon.org/include/ecpidps.txt";
/// Service provider that issues certificates after a successful ECP login.
pub const DEFAULT_SP_URL: &str = "https://ecp.cilogon.org/secure/getcert";
/// Directory fetch timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How institution queries are turned into match patterns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternMode {
	/// Query is a regular-expression fragment, so `Fermi.*Lab` or `LIGO|KAGRA` work as patterns.
	#[default]
	Permissive,
	/// Query is escaped and matched literally.
	Literal,
}

/// Default file locations used by the surrounding certificate tooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPaths {
	/// Cookie jar persisted between ECP sessions.
	pub cookie_file: PathBuf,
	/// X.509 proxy certificate written after issuance.
	pub x509_proxy: PathBuf,
}
impl DefaultPaths {
	/// Resolves the platform defaults, honoring `X509_USER_PROXY` when set.
	pub fn from_env() -> Self {
		let (tmpdir, user) = platform_temp_and_user();
		let cookie_file = tmpdir.join(format!("ecpcookie.{user}"));
		let x509_proxy = match env::var_os("X509_USER_PROXY").filter(|v| !v.is_empty()) {
			Some(path) => PathBuf::from(path),
			None => tmpdir.join(format!("x509up_{user}")),
		};

		Self { cookie_file, x509_proxy }
	}
}
impl Default for DefaultPaths {
	fn default() -> Self {
		Self::from_env()
	}
}

/// Everything an [`EndpointResolver`](crate::endpoint::EndpointResolver) needs to know.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolverConfig {
	/// Location of the plaintext IdP directory.
	pub idp_list_url: Url,
	/// Service provider endpoint handed to the ECP handshake.
	pub sp_url: Url,
	/// Directory fetch timeout; `None` waits indefinitely.
	#[serde(rename = "timeout_secs", serialize_with = "timeout_secs::serialize")]
	pub timeout: Option<Duration>,
	/// Interpretation of institution queries.
	pub pattern_mode: PatternMode,
	/// Cookie and proxy certificate defaults.
	pub paths: DefaultPaths,
}
impl ResolverConfig {
	/// Resolves the process-wide defaults from the environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Ok(Self {
			idp_list_url: parse_url(DEFAULT_IDP_LIST_URL)?,
			sp_url: parse_url(DEFAULT_SP_URL)?,
			timeout: Some(DEFAULT_TIMEOUT),
			pattern_mode: PatternMode::default(),
			paths: DefaultPaths::from_env(),
		})
	}

	/// Parses a JSON document; omitted fields fall back to [`ResolverConfig::from_env`].
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let overrides = serde_json::from_str::<ConfigOverrides>(raw)?;

		Ok(overrides.apply(Self::from_env()?))
	}

	/// Loads a JSON configuration file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_json_str(&raw)
	}

	/// Overrides the directory location.
	pub fn with_idp_list_url(mut self, url: Url) -> Self {
		self.idp_list_url = url;

		self
	}

	/// Overrides the service provider endpoint.
	pub fn with_sp_url(mut self, url: Url) -> Self {
		self.sp_url = url;

		self
	}

	/// Overrides the directory fetch timeout.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides how institution queries are matched.
	pub fn with_pattern_mode(mut self, mode: PatternMode) -> Self {
		self.pattern_mode = mode;

		self
	}

	/// Overrides the cookie and proxy certificate paths.
	pub fn with_paths(mut self, paths: DefaultPaths) -> Self {
		self.paths = paths;

		self
	}
}

// Fields present in a JSON document; absent ones keep the environment defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverrides {
	idp_list_url: Option<Url>,
	sp_url: Option<Url>,
	// Outer `None` is absent; `Some(None)` is an explicit `null`.
	#[serde(rename = "timeout_secs", deserialize_with = "timeout_secs::deserialize_override")]
	timeout: Option<Option<Duration>>,
	pattern_mode: Option<PatternMode>,
	paths: Option<DefaultPaths>,
}
impl ConfigOverrides {
	fn apply(self, base: ResolverConfig) -> ResolverConfig {
		ResolverConfig {
			idp_list_url: self.idp_list_url.unwrap_or(base.idp_list_url),
			sp_url: self.sp_url.unwrap_or(base.sp_url),
			timeout: self.timeout.unwrap_or(base.timeout),
			pattern_mode: self.pattern_mode.unwrap_or(base.pattern_mode),
			paths: self.paths.unwrap_or(base.paths),
		}
	}
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { value: raw.to_owned(), source })
}

#[cfg(unix)]
fn platform_temp_and_user() -> (PathBuf, String) {
	let uid = rustix::process::getuid().as_raw();

	(PathBuf::from("/tmp"), format!("u{uid}"))
}

#[cfg(not(unix))]
fn platform_temp_and_user() -> (PathBuf, String) {
	let root = env::var("SYSTEMROOT").unwrap_or_else(|_| "%SYSTEMROOT%".into());
	let user = env::var("USERNAME").unwrap_or_default();

	(PathBuf::from(root).join("Temp"), user)
}

mod timeout_secs {
	// self
	use super::*;

	pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.map(|d| d.as_secs_f64()).serialize(serializer)
	}

	pub fn deserialize_override<'de, D>(
		deserializer: D,
	) -> Result<Option<Option<Duration>>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = <Option<f64>>::deserialize(deserializer)?;
		let timeout = secs
			.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom))
			.transpose()?;

		Ok(Some(timeout))
	}
}
