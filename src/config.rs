//! Declarative client configuration records.
//!
//! The records derive serde traits with the snake_case keys used by scrape and remote-write
//! style configs; picking a concrete format is left to the embedding application. Secrets
//! serialize as `<secret>` so a loaded config can be dumped back for diagnostics.

// self
use crate::{
	_prelude::*,
	digest,
	error::ConfigError,
	runtime::{RuntimeConfig, RuntimeConfigBuilder},
	secret::Secret,
	source::SourceReader,
};

/// Generic `Authorization` header config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorization {
	/// Header scheme; `Bearer` when unset.
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	/// Inline credentials.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub credentials: Option<Secret>,
	/// File holding the credentials, re-read on refresh.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub credentials_file: Option<String>,
}

/// HTTP basic auth config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAuthConfig {
	/// Username; must not be empty.
	pub username: String,
	/// Inline password.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<Secret>,
	/// File holding the password, re-read on refresh.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password_file: Option<String>,
}
impl BasicAuthConfig {
	/// Builds a runtime config that only carries this basic auth.
	pub fn new_config(&self, base_dir: impl AsRef<Path>) -> Result<RuntimeConfig> {
		RuntimeConfig::builder().base_dir(base_dir).basic_auth(self.clone()).build()
	}
}

/// OAuth 2.0 client-credentials config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2Config {
	/// Client identifier; must not be empty.
	pub client_id: String,
	/// Inline client secret.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<Secret>,
	/// File holding the client secret; a changed secret rebuilds the token source.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_secret_file: Option<String>,
	/// Requested scopes, sent in the given order.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub scopes: Vec<String>,
	/// Token endpoint URL; must not be empty.
	pub token_url: String,
	/// Extra form parameters sent to the token endpoint.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub endpoint_params: BTreeMap<String, String>,
	/// TLS material used when talking to the token endpoint.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tls_config: Option<TlsConfig>,
	/// Proxy used when talking to the token endpoint.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub proxy_url: Option<String>,
}
impl OAuth2Config {
	/// Checks the mandatory fields.
	pub fn validate(&self) -> Result<(), ConfigError> {
		const SECTION: &str = "oauth2";

		if self.client_id.is_empty() {
			return Err(ConfigError::MissingField { section: SECTION, field: "client_id" });
		}

		let secret_file = self.client_secret_file.as_deref().filter(|file| !file.is_empty());

		match (&self.client_secret, secret_file) {
			(None, None) =>
				return Err(ConfigError::MissingField { section: SECTION, field: "client_secret" }),
			(Some(_), Some(_)) =>
				return Err(ConfigError::ConflictingSecret {
					section: SECTION,
					inline: "client_secret",
					file: "client_secret_file",
				}),
			_ => {},
		}

		if self.token_url.is_empty() {
			return Err(ConfigError::MissingField { section: SECTION, field: "token_url" });
		}

		Ok(())
	}

	/// Builds a runtime config carrying only the TLS material used for the token endpoint.
	pub fn new_config(&self, base_dir: impl AsRef<Path>) -> Result<RuntimeConfig> {
		let builder = RuntimeConfig::builder().base_dir(base_dir);

		match &self.tls_config {
			Some(tls) => builder.tls_config(tls.clone()).build(),
			None => builder.build(),
		}
	}
}
impl Display for OAuth2Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"client_id={:?}, {}, client_secret_file={:?}, scopes={:?}, token_url={:?}, endpoint_params={:?}, tls_config={{{}}}, proxy_url={:?}",
			self.client_id,
			digest::secret_field("client_secret", self.client_secret.as_ref()),
			self.client_secret_file.as_deref().unwrap_or_default(),
			self.scopes,
			self.token_url,
			self.endpoint_params,
			self.tls_config.as_ref().map(ToString::to_string).unwrap_or_default(),
			self.proxy_url.as_deref().unwrap_or_default(),
		)
	}
}

/// TLS material for a client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
	/// Inline PEM CA bundle.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ca: Option<String>,
	/// CA bundle location, local path or URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ca_file: Option<String>,
	/// Inline PEM client certificate chain.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cert: Option<String>,
	/// Client certificate file, re-read on refresh.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cert_file: Option<String>,
	/// Inline PEM private key.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub key: Option<Secret>,
	/// Private key file, re-read on refresh.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub key_file: Option<String>,
	/// Name verified against the server certificate instead of the URL host.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	/// Disables server certificate verification.
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub insecure_skip_verify: bool,
	/// Lowest accepted protocol version: `TLS10`, `TLS11`, `TLS12`, or `TLS13`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_version: Option<String>,
}
impl Display for TlsConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let bytes = |value: Option<&str>| digest::hash_bytes(value.unwrap_or_default().as_bytes());

		write!(
			f,
			"hash(ca)={}, ca_file={:?}, hash(cert)={}, cert_file={:?}, hash(key)={}, key_file={:?}, server_name={:?}, insecure_skip_verify={}, min_version={:?}",
			bytes(self.ca.as_deref()),
			self.ca_file.as_deref().unwrap_or_default(),
			bytes(self.cert.as_deref()),
			self.cert_file.as_deref().unwrap_or_default(),
			bytes(self.key.as_ref().map(Secret::expose)),
			self.key_file.as_deref().unwrap_or_default(),
			self.server_name.as_deref().unwrap_or_default(),
			self.insecure_skip_verify,
			self.min_version.as_deref().unwrap_or_default(),
		)
	}
}

/// Client config for talking to a target.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
	/// Generic `Authorization` header.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub authorization: Option<Authorization>,
	/// HTTP basic auth.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub basic_auth: Option<BasicAuthConfig>,
	/// Inline bearer token.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bearer_token: Option<Secret>,
	/// File holding the bearer token, re-read on refresh.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bearer_token_file: Option<String>,
	/// OAuth 2.0 client credentials.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub oauth2: Option<OAuth2Config>,
	/// TLS material.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tls_config: Option<TlsConfig>,
	/// Extra `key: value` headers sent with every request.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub headers: Vec<String>,
}
impl HttpClientConfig {
	/// Resolves the config, reading relative files from `base_dir`.
	pub fn new_config(&self, base_dir: impl AsRef<Path>) -> Result<RuntimeConfig> {
		self.builder(base_dir).build()
	}

	/// Resolves the config through a custom [`SourceReader`].
	pub fn new_config_with_reader(
		&self,
		base_dir: impl AsRef<Path>,
		reader: Arc<dyn SourceReader>,
	) -> Result<RuntimeConfig> {
		self.builder(base_dir).reader(reader).build()
	}

	/// Returns a builder preloaded with every section of this config.
	pub fn builder(&self, base_dir: impl AsRef<Path>) -> RuntimeConfigBuilder {
		RuntimeConfigBuilder::from_sections(
			base_dir,
			Sections {
				authorization: self.authorization.clone(),
				basic_auth: self.basic_auth.clone(),
				bearer_token: self.bearer_token.clone(),
				bearer_token_file: self.bearer_token_file.clone(),
				oauth2: self.oauth2.clone(),
				tls_config: self.tls_config.clone(),
				headers: self.headers.clone(),
			},
		)
	}
}

/// Client config for authenticating against a proxy; same shape as [`HttpClientConfig`] with
/// `proxy_`-prefixed keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyClientConfig {
	/// Generic `Authorization` header for the proxy.
	#[serde(rename = "proxy_authorization", skip_serializing_if = "Option::is_none")]
	pub authorization: Option<Authorization>,
	/// HTTP basic auth for the proxy.
	#[serde(rename = "proxy_basic_auth", skip_serializing_if = "Option::is_none")]
	pub basic_auth: Option<BasicAuthConfig>,
	/// Inline bearer token for the proxy.
	#[serde(rename = "proxy_bearer_token", skip_serializing_if = "Option::is_none")]
	pub bearer_token: Option<Secret>,
	/// File holding the proxy bearer token.
	#[serde(rename = "proxy_bearer_token_file", skip_serializing_if = "Option::is_none")]
	pub bearer_token_file: Option<String>,
	/// OAuth 2.0 client credentials for the proxy.
	#[serde(rename = "proxy_oauth2", skip_serializing_if = "Option::is_none")]
	pub oauth2: Option<OAuth2Config>,
	/// TLS material for the proxy.
	#[serde(rename = "proxy_tls_config", skip_serializing_if = "Option::is_none")]
	pub tls_config: Option<TlsConfig>,
	/// Extra headers sent to the proxy.
	#[serde(rename = "proxy_headers", skip_serializing_if = "Vec::is_empty")]
	pub headers: Vec<String>,
}
impl ProxyClientConfig {
	/// Resolves the config, reading relative files from `base_dir`.
	pub fn new_config(&self, base_dir: impl AsRef<Path>) -> Result<RuntimeConfig> {
		RuntimeConfigBuilder::from_sections(
			base_dir,
			Sections {
				authorization: self.authorization.clone(),
				basic_auth: self.basic_auth.clone(),
				bearer_token: self.bearer_token.clone(),
				bearer_token_file: self.bearer_token_file.clone(),
				oauth2: self.oauth2.clone(),
				tls_config: self.tls_config.clone(),
				headers: self.headers.clone(),
			},
		)
		.build()
	}
}

/// Every section a runtime config can be resolved from.
#[derive(Clone, Debug, Default)]
pub(crate) struct Sections {
	pub(crate) authorization: Option<Authorization>,
	pub(crate) basic_auth: Option<BasicAuthConfig>,
	pub(crate) bearer_token: Option<Secret>,
	pub(crate) bearer_token_file: Option<String>,
	pub(crate) oauth2: Option<OAuth2Config>,
	pub(crate) tls_config: Option<TlsConfig>,
	pub(crate) headers: Vec<String>,
}
