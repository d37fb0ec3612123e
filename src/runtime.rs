//! The resolved, long-lived runtime configuration and its builder.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	config::{Authorization, BasicAuthConfig, OAuth2Config, Sections, TlsConfig},
	credential::AuthSource,
	digest::DigestBuilder,
	headers::{self, HeaderEntry, HeaderTarget},
	memo::{DEFAULT_TTL, Memoized},
	obs::{RefreshKind, RefreshSpan},
	secret::Secret,
	source::{LocalReader, SourceReader},
	tls::TlsMaterial,
};

/// Builder for [`RuntimeConfig`].
pub struct RuntimeConfigBuilder {
	base_dir: PathBuf,
	reader: Arc<dyn SourceReader>,
	sections: Sections,
	cache_ttl: StdDuration,
}
impl RuntimeConfigBuilder {
	/// Creates an empty builder reading relative paths from the working directory.
	pub fn new() -> Self {
		Self::from_sections(".", Sections::default())
	}

	pub(crate) fn from_sections(base_dir: impl AsRef<Path>, sections: Sections) -> Self {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			reader: Arc::new(LocalReader),
			sections,
			cache_ttl: DEFAULT_TTL,
		}
	}

	/// Sets the directory relative file paths are resolved against.
	pub fn base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
		self.base_dir = base_dir.as_ref().to_path_buf();

		self
	}

	/// Replaces the default [`LocalReader`].
	pub fn reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
		self.reader = reader;

		self
	}

	/// Sets the generic `Authorization` section.
	pub fn authorization(mut self, authorization: Authorization) -> Self {
		self.sections.authorization = Some(authorization);

		self
	}

	/// Sets the basic auth section.
	pub fn basic_auth(mut self, basic_auth: BasicAuthConfig) -> Self {
		self.sections.basic_auth = Some(basic_auth);

		self
	}

	/// Sets an inline bearer token.
	pub fn bearer_token(mut self, token: impl Into<Secret>) -> Self {
		self.sections.bearer_token = Some(token.into());

		self
	}

	/// Sets a file-backed bearer token.
	pub fn bearer_token_file(mut self, path: impl Into<String>) -> Self {
		self.sections.bearer_token_file = Some(path.into());

		self
	}

	/// Sets the OAuth 2.0 client-credentials section.
	pub fn oauth2(mut self, oauth2: OAuth2Config) -> Self {
		self.sections.oauth2 = Some(oauth2);

		self
	}

	/// Sets the TLS section.
	pub fn tls_config(mut self, tls_config: TlsConfig) -> Self {
		self.sections.tls_config = Some(tls_config);

		self
	}

	/// Sets the extra `key: value` headers.
	pub fn headers<I, S>(mut self, headers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.sections.headers = headers.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the staleness bound of cached headers, certificates, and OAuth 2.0 secrets.
	pub fn cache_ttl(mut self, ttl: StdDuration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Validates every section and resolves the runtime configuration.
	pub fn build(self) -> Result<RuntimeConfig> {
		let headers = headers::parse_headers(&self.sections.headers)?;
		let auth = AuthSource::resolve(&self.sections, &self.base_dir, &self.reader, self.cache_ttl)?;
		let tls = TlsMaterial::build(
			self.sections.tls_config.as_ref(),
			&self.base_dir,
			&self.reader,
			self.cache_ttl,
		)?;
		let digest = DigestBuilder::new().auth(&auth).headers(&headers).tls(&tls).finish();

		Ok(RuntimeConfig {
			auth,
			auth_header: Memoized::with_ttl(self.cache_ttl),
			tls,
			headers,
			digest,
		})
	}
}
impl Default for RuntimeConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for RuntimeConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RuntimeConfigBuilder")
			.field("base_dir", &self.base_dir)
			.field("sections", &self.sections)
			.field("cache_ttl", &self.cache_ttl)
			.finish_non_exhaustive()
	}
}

/// Resolved auth and TLS material handing out bounded-staleness credentials.
///
/// Two configs compare equal when their digests match, which lets callers decide whether a
/// dependent client must be rebuilt after the declarative input was reloaded.
pub struct RuntimeConfig {
	auth: AuthSource,
	auth_header: Memoized<String>,
	tls: TlsMaterial,
	headers: Vec<HeaderEntry>,
	digest: String,
}
impl RuntimeConfig {
	/// Returns a new [`RuntimeConfigBuilder`].
	pub fn builder() -> RuntimeConfigBuilder {
		RuntimeConfigBuilder::new()
	}

	/// Returns the `Authorization` header value, refreshed at most once per cache window.
	///
	/// Failures are logged and yield an empty value for the rest of the window.
	pub async fn auth_header(&self) -> String {
		if self.auth.is_none() {
			return String::new();
		}

		self.auth_header
			.get_or_compute(|_| {
				RefreshSpan::new(RefreshKind::AuthHeader, "auth_header").instrument(self.auth.header())
			})
			.await
	}

	/// Produces a fresh `Authorization` value, bypassing the cache and returning the failure.
	///
	/// Does not update the value served by [`auth_header`](Self::auth_header).
	pub async fn try_auth_header(&self) -> Result<String> {
		Ok(self.auth.try_header().await?)
	}

	/// Applies the extra headers and, when `with_auth` is set, a non-empty `Authorization` value.
	pub async fn set_headers<R>(&self, target: &mut R, with_auth: bool)
	where
		R: ?Sized + HeaderTarget,
	{
		let authorization = if with_auth { Some(self.auth_header().await) } else { None };

		headers::apply_headers(target, &self.headers, authorization.as_deref());
	}

	/// Extra headers, in configured order.
	pub fn headers(&self) -> &[HeaderEntry] {
		&self.headers
	}

	/// Renders the extra headers as `key: value\r\n` lines, without `Authorization`.
	pub fn headers_no_auth_string(&self) -> String {
		headers::headers_string(&self.headers)
	}

	/// Builds a rustls client config from the resolved TLS material.
	pub fn new_tls_config(&self) -> Result<rustls::ClientConfig> {
		Ok(self.tls.client_config()?)
	}

	/// Resolved TLS material.
	pub fn tls(&self) -> &TlsMaterial {
		&self.tls
	}

	/// Active credential mechanism.
	pub fn auth_source(&self) -> &AuthSource {
		&self.auth
	}

	/// Secret-safe equality digest.
	pub fn digest(&self) -> &str {
		&self.digest
	}
}
impl PartialEq for RuntimeConfig {
	fn eq(&self, other: &Self) -> bool {
		self.digest == other.digest
	}
}
impl Eq for RuntimeConfig {}
impl Display for RuntimeConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.digest)
	}
}
impl Debug for RuntimeConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RuntimeConfig")
			.field("auth", &self.auth)
			.field("tls", &self.tls)
			.field("headers", &self.headers)
			.field("digest", &self.digest)
			.finish_non_exhaustive()
	}
}
