//! Credential source selection and per-source `Authorization` header producers.

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	config::{Authorization, BasicAuthConfig, Sections},
	error::{ConfigError, RefreshError},
	oauth::OAuth2TokenManager,
	obs::{self, RefreshKind},
	secret::Secret,
	source::SourceReader,
};

/// Secret configured inline or through a file that is re-read on every refresh.
#[derive(Clone)]
pub enum SecretValue {
	/// Secret stored in the config itself.
	Inline(Secret),
	/// Secret stored in a file.
	File {
		/// Config field that referenced the file.
		field: &'static str,
		/// Resolved location.
		path: String,
		/// Reader used to fetch the content.
		reader: Arc<dyn SourceReader>,
	},
}
impl SecretValue {
	fn resolve(
		section: &'static str,
		(inline_field, inline): (&'static str, Option<&Secret>),
		(file_field, file): (&'static str, Option<&str>),
		base_dir: &Path,
		reader: &Arc<dyn SourceReader>,
	) -> Result<Self, ConfigError> {
		match (inline, file.filter(|path| !path.is_empty())) {
			(Some(_), Some(_)) => Err(ConfigError::ConflictingSecret {
				section,
				inline: inline_field,
				file: file_field,
			}),
			(_, Some(path)) => Ok(Self::File {
				field: file_field,
				path: reader.resolve_path(base_dir, path),
				reader: reader.clone(),
			}),
			(inline, None) => Ok(Self::Inline(inline.cloned().unwrap_or_default())),
		}
	}

	/// Returns the current plaintext, reading the file for file-backed values.
	pub fn read(&self) -> Result<String, RefreshError> {
		match self {
			Self::Inline(secret) => Ok(secret.expose().to_owned()),
			Self::File { field, path, reader } => reader
				.read_secret(path)
				.map_err(|source| RefreshError::ReadSecret { field: *field, path: path.clone(), source }),
		}
	}
}
impl Debug for SecretValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Inline(secret) => f.debug_tuple("Inline").field(secret).finish(),
			Self::File { field, path, .. } =>
				f.debug_struct("File").field("field", field).field("path", path).finish_non_exhaustive(),
		}
	}
}

/// The single credential mechanism a runtime config authenticates with.
#[derive(Clone, Debug)]
pub enum AuthSource {
	/// No `Authorization` header.
	None,
	/// Generic `"{kind} {credentials}"` header.
	Authorization {
		/// Header scheme.
		kind: String,
		/// Credentials following the scheme.
		credentials: SecretValue,
	},
	/// HTTP basic auth.
	Basic {
		/// Username sent in cleartext.
		username: String,
		/// Password.
		password: SecretValue,
	},
	/// `Bearer` token.
	Bearer {
		/// Token.
		token: SecretValue,
	},
	/// OAuth 2.0 client credentials.
	OAuth2(Arc<OAuth2TokenManager>),
}
impl AuthSource {
	/// Picks the configured mechanism, rejecting configs that set more than one.
	///
	/// Sections are checked in the order `authorization`, `basic_auth`, `bearer_token_file`,
	/// `bearer_token`, `oauth2`; a conflict names the earlier section first.
	pub(crate) fn resolve(
		sections: &Sections,
		base_dir: &Path,
		reader: &Arc<dyn SourceReader>,
		ttl: StdDuration,
	) -> Result<Self, ConfigError> {
		let mut resolved = Resolved::default();

		if let Some(authorization) = &sections.authorization {
			resolved.set("authorization", || authorization_source(authorization, base_dir, reader))?;
		}
		if let Some(basic) = &sections.basic_auth {
			resolved.set("basic_auth", || basic_source(basic, base_dir, reader))?;
		}
		if let Some(file) = sections.bearer_token_file.as_deref().filter(|file| !file.is_empty()) {
			resolved.set("bearer_token_file", || {
				Ok(Self::Bearer {
					token: SecretValue::File {
						field: "bearer_token_file",
						path: reader.resolve_path(base_dir, file),
						reader: reader.clone(),
					},
				})
			})?;
		}
		if let Some(token) = sections.bearer_token.as_ref().filter(|token| !token.is_empty()) {
			resolved.set("bearer_token", || {
				Ok(Self::Bearer { token: SecretValue::Inline(token.clone()) })
			})?;
		}
		if let Some(oauth2) = &sections.oauth2 {
			resolved.set("oauth2", || {
				let manager = OAuth2TokenManager::new(oauth2, base_dir, reader.clone(), ttl)?;

				Ok(Self::OAuth2(Arc::new(manager)))
			})?;
		}

		Ok(resolved.source.map(|(_, source)| source).unwrap_or(Self::None))
	}

	/// Returns `true` when no header is produced.
	pub fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}

	/// Produces the current header value, surfacing refresh failures.
	pub async fn try_header(&self) -> Result<String, RefreshError> {
		match self {
			Self::None => Ok(String::new()),
			Self::Authorization { kind, credentials } => Ok(format!("{kind} {}", credentials.read()?)),
			Self::Basic { username, password } => {
				let password = password.read()?;

				Ok(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
			},
			Self::Bearer { token } => Ok(format!("Bearer {}", token.read()?)),
			Self::OAuth2(manager) => manager.auth_header().await,
		}
	}

	/// Produces the current header value; failures are logged and yield an empty value.
	pub async fn header(&self) -> String {
		let result = self.try_header().await;

		obs::observe_refresh(RefreshKind::AuthHeader, &result);

		result.unwrap_or_default()
	}
}

#[derive(Default)]
struct Resolved {
	source: Option<(&'static str, AuthSource)>,
}
impl Resolved {
	fn set<F>(&mut self, label: &'static str, build: F) -> Result<(), ConfigError>
	where
		F: FnOnce() -> Result<AuthSource, ConfigError>,
	{
		if let Some((first, _)) = &self.source {
			return Err(ConfigError::ConflictingAuth { first: *first, second: label });
		}

		self.source = Some((label, build()?));

		Ok(())
	}
}

fn authorization_source(
	config: &Authorization,
	base_dir: &Path,
	reader: &Arc<dyn SourceReader>,
) -> Result<AuthSource, ConfigError> {
	let kind = config.kind.as_deref().filter(|kind| !kind.is_empty()).unwrap_or("Bearer");
	let credentials = SecretValue::resolve(
		"authorization",
		("credentials", config.credentials.as_ref()),
		("credentials_file", config.credentials_file.as_deref()),
		base_dir,
		reader,
	)?;

	Ok(AuthSource::Authorization { kind: kind.to_owned(), credentials })
}

fn basic_source(
	config: &BasicAuthConfig,
	base_dir: &Path,
	reader: &Arc<dyn SourceReader>,
) -> Result<AuthSource, ConfigError> {
	if config.username.is_empty() {
		return Err(ConfigError::MissingField { section: "basic_auth", field: "username" });
	}

	let password = SecretValue::resolve(
		"basic_auth",
		("password", config.password.as_ref()),
		("password_file", config.password_file.as_deref()),
		base_dir,
		reader,
	)?;

	Ok(AuthSource::Basic { username: config.username.clone(), password })
}
