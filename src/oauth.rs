//! OAuth 2.0 client-credentials token management with client secret rotation.
//!
//! [`OAuth2TokenManager`] owns a [`TokenSource`] built from the current client secret. When the
//! secret lives in a file, obtaining the source re-reads the file (at most once per cache window)
//! and swaps in a fresh source with an empty token cache as soon as the content changes. Token
//! URL, scopes, and endpoint params are fixed for the lifetime of a manager.

pub use oauth2;

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AccessToken, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RefreshToken, RequestTokenError, Scope, StandardRevocableToken, TokenResponse, TokenType,
	TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse,
	},
};
// self
use crate::{
	_prelude::*,
	config::OAuth2Config,
	credential::SecretValue,
	error::{ConfigError, RefreshError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	memo::Memoized,
	obs::{self, RefreshKind, RefreshOutcome, RefreshSpan},
	secret::Secret,
	source::SourceReader,
	tls::TlsMaterial,
};

type GrantClient<HasTokenUrl = EndpointSet> = Client<
	BasicErrorResponse,
	GrantResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasTokenUrl,
>;

/// Tokens are treated as expired this long before their reported expiry.
pub const EXPIRY_DELTA: Duration = Duration::seconds(10);

// Raw `token_type`; empty when the endpoint omits it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
struct GrantTokenType(String);
impl TokenType for GrantTokenType {}

// Client-credentials response that, unlike `BasicTokenResponse`, accepts a missing `token_type`.
#[derive(Debug, Deserialize, Serialize)]
struct GrantResponse {
	access_token: AccessToken,
	#[serde(default)]
	token_type: GrantTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
}
impl TokenResponse for GrantResponse {
	type TokenType = GrantTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &GrantTokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<StdDuration> {
		self.expires_in.map(StdDuration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

/// Access token returned by the token endpoint.
#[derive(Clone, Debug)]
pub struct Token {
	token_type: String,
	access_token: Secret,
	expires_at: Option<OffsetDateTime>,
}
impl Token {
	/// Creates a token; `expires_at = None` never expires.
	pub fn new(
		token_type: impl AsRef<str>,
		access_token: impl Into<Secret>,
		expires_at: Option<OffsetDateTime>,
	) -> Self {
		Self {
			token_type: normalize_token_type(token_type.as_ref()),
			access_token: access_token.into(),
			expires_at,
		}
	}

	fn from_response(response: &GrantResponse, now: OffsetDateTime) -> Self {
		let expires_at = response
			.expires_in()
			.filter(|expires_in| !expires_in.is_zero())
			.and_then(|expires_in| Duration::try_from(expires_in).ok())
			.and_then(|expires_in| now.checked_add(expires_in));

		Self::new(&response.token_type().0, response.access_token().secret().as_str(), expires_at)
	}

	/// Normalized token type (`Bearer`, `MAC`, `Basic`, or the provider's value).
	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	/// Access token.
	pub fn access_token(&self) -> &Secret {
		&self.access_token
	}

	/// Absolute expiry reported by the provider.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Returns `true` while the token can be sent at `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		!self.access_token.is_empty()
			&& self.expires_at.is_none_or(|expires_at| now < expires_at - EXPIRY_DELTA)
	}

	/// Renders the `Authorization` header value.
	pub fn header_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}

/// Caches tokens obtained with one client secret.
pub struct TokenSource {
	oauth_client: GrantClient,
	client_secret: Secret,
	scopes: Vec<String>,
	endpoint_params: BTreeMap<String, String>,
	http_client: ReqwestHttpClient,
	token: AsyncMutex<Option<Token>>,
}
impl TokenSource {
	fn new(manager: &OAuth2TokenManager, client_secret: Secret) -> Self {
		let oauth_client = GrantClient::<EndpointNotSet>::new(ClientId::new(manager.client_id.clone()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_token_uri(manager.token_url.clone());

		Self {
			oauth_client,
			client_secret,
			scopes: manager.scopes.clone(),
			endpoint_params: manager.endpoint_params.clone(),
			http_client: manager.http_client.clone(),
			token: AsyncMutex::new(None),
		}
	}

	/// Returns the cached token, or runs the grant when it is missing or about to expire.
	///
	/// The lock is held across the token request so concurrent callers share one round trip.
	pub async fn token(&self) -> Result<Token, RefreshError> {
		let mut cached = self.token.lock().await;

		if let Some(token) = cached.as_ref().filter(|token| token.is_valid_at(OffsetDateTime::now_utc()))
		{
			return Ok(token.clone());
		}

		let span = RefreshSpan::new(RefreshKind::OAuth2Token, "client_credentials");
		let result = span.instrument(self.fetch()).await;

		obs::record_refresh_outcome(RefreshKind::OAuth2Token, outcome(&result));

		let token = result?;

		*cached = Some(token.clone());

		Ok(token)
	}

	async fn fetch(&self) -> Result<Token, RefreshError> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}
		for (key, value) in &self.endpoint_params {
			request = request.add_extra_param(key, value);
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		Ok(Token::from_response(&response, OffsetDateTime::now_utc()))
	}
}
impl Debug for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSource").field("scopes", &self.scopes).finish_non_exhaustive()
	}
}

/// Client-credentials token manager bound to one [`OAuth2Config`].
pub struct OAuth2TokenManager {
	summary: String,
	client_id: String,
	secret: SecretValue,
	token_url: TokenUrl,
	scopes: Vec<String>,
	endpoint_params: BTreeMap<String, String>,
	http_client: ReqwestHttpClient,
	sources: Memoized<Arc<TokenSource>>,
}
impl OAuth2TokenManager {
	/// Validates `config`, builds the token endpoint transport, and reads the client secret once.
	pub fn new(
		config: &OAuth2Config,
		base_dir: &Path,
		reader: Arc<dyn SourceReader>,
		ttl: StdDuration,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let token_url =
			TokenUrl::new(config.token_url.clone()).map_err(|source| ConfigError::InvalidUrl {
				field: "token_url",
				url: config.token_url.clone(),
				source,
			})?;
		let proxy = config
			.proxy_url
			.as_deref()
			.filter(|url| !url.is_empty())
			.map(|url| {
				Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
					field: "proxy_url",
					url: url.to_owned(),
					source,
				})
			})
			.transpose()?;
		let tls = TlsMaterial::build(config.tls_config.as_ref(), base_dir, &reader, ttl)?;
		let http_client = ReqwestHttpClient::build(tls.client_config()?, proxy.as_ref())?;
		let secret_file = config.client_secret_file.as_deref().filter(|file| !file.is_empty());
		let (secret, initial_secret) = match secret_file {
			Some(file) if config.client_secret.is_none() => {
				let path = reader.resolve_path(base_dir, file);
				let initial = reader.read_secret(&path).map_err(|source| ConfigError::ReadFile {
					field: "client_secret_file",
					path: path.clone(),
					source,
				})?;

				(SecretValue::File { field: "client_secret_file", path, reader }, Secret::new(initial))
			},
			_ => {
				let secret = config.client_secret.clone().unwrap_or_default();

				(SecretValue::Inline(secret.clone()), secret)
			},
		};
		let mut manager = Self {
			summary: config.to_string(),
			client_id: config.client_id.clone(),
			secret,
			token_url,
			scopes: config.scopes.clone(),
			endpoint_params: config.endpoint_params.clone(),
			http_client,
			sources: Memoized::with_ttl(ttl),
		};
		let initial = Arc::new(TokenSource::new(&manager, initial_secret));

		manager.sources = Memoized::seeded(initial, ttl);

		Ok(manager)
	}

	/// Secret-safe rendering of the config this manager was built from.
	pub fn summary(&self) -> &str {
		&self.summary
	}

	/// Returns the token source for the current client secret.
	///
	/// A changed secret file replaces the source, dropping its cached token.
	pub async fn token_source(&self) -> Result<Arc<TokenSource>, RefreshError> {
		self.sources
			.get_or_refresh(|previous| async move {
				let result = self.secret.read();

				obs::record_refresh_outcome(RefreshKind::OAuth2Secret, outcome(&result));

				let secret = result?;

				match previous {
					Some(source) if source.client_secret.expose() == secret => Ok::<_, RefreshError>(source),
					_ => {
						#[cfg(feature = "tracing")]
						tracing::debug!("OAuth 2.0 client secret changed, rebuilding token source");

						Ok(Arc::new(TokenSource::new(self, Secret::new(secret))))
					},
				}
			})
			.await
	}

	/// Returns a valid access token.
	pub async fn token(&self) -> Result<Token, RefreshError> {
		self.token_source().await?.token().await
	}

	/// Returns the `"{token_type} {access_token}"` header value.
	pub async fn auth_header(&self) -> Result<String, RefreshError> {
		Ok(self.token().await?.header_value())
	}
}
impl Debug for OAuth2TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2TokenManager")
			.field("summary", &self.summary)
			.field("secret", &self.secret)
			.finish_non_exhaustive()
	}
}

fn normalize_token_type(raw: &str) -> String {
	if raw.is_empty() || raw.eq_ignore_ascii_case("bearer") {
		"Bearer".into()
	} else if raw.eq_ignore_ascii_case("mac") {
		"MAC".into()
	} else if raw.eq_ignore_ascii_case("basic") {
		"Basic".into()
	} else {
		raw.to_owned()
	}
}

fn outcome<T, E>(result: &Result<T, E>) -> RefreshOutcome {
	if result.is_ok() { RefreshOutcome::Success } else { RefreshOutcome::Failure }
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> RefreshError {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			RefreshError::TokenEndpoint { message, status }
		},
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Parse(source, _body) => RefreshError::TokenResponseParse { source, status },
		RequestTokenError::Other(message) =>
			RefreshError::TokenEndpoint { message: format!("unexpected response: {message}"), status },
	}
}

fn map_transport_error(status: Option<u16>, err: HttpClientError<ReqwestError>) -> RefreshError {
	match err {
		HttpClientError::Reqwest(inner) => RefreshError::transport(*inner),
		HttpClientError::Http(inner) => RefreshError::transport(inner),
		HttpClientError::Io(inner) => RefreshError::transport(inner),
		HttpClientError::Other(message) =>
			RefreshError::TokenEndpoint { message: format!("HTTP client error: {message}"), status },
		_ => RefreshError::TokenEndpoint { message: "HTTP client error".into(), status },
	}
}
