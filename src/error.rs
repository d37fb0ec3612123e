//! Error types shared by configuration resolution and lazy refresh paths.

// self
use crate::{_prelude::*, tls::CertificateError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The declarative input cannot be turned into a runtime configuration.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A lazily refreshed credential or certificate could not be produced.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
}

/// Construction-time failures. A runtime configuration is never built partially.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Two credential mechanisms are configured at the same time.
	#[error("Cannot use both `{first}` and `{second}`.")]
	ConflictingAuth {
		/// Mechanism accepted first in validation order.
		first: &'static str,
		/// Mechanism that conflicts with `first`.
		second: &'static str,
	},
	/// A secret is configured both inline and through a file.
	#[error("Both `{inline}` and `{file}` are set in `{section}` section.")]
	ConflictingSecret {
		/// Configuration section holding both fields.
		section: &'static str,
		/// Inline field name.
		inline: &'static str,
		/// File-backed field name.
		file: &'static str,
	},
	/// A mandatory field is missing or empty.
	#[error("Missing `{field}` in `{section}` section.")]
	MissingField {
		/// Configuration section missing the field.
		section: &'static str,
		/// Missing field name.
		field: &'static str,
	},
	/// A referenced file could not be read during construction.
	#[error("Cannot read `{field}` from {path:?}.")]
	ReadFile {
		/// Field that referenced the file.
		field: &'static str,
		/// Resolved file path.
		path: String,
		/// Underlying read failure.
		#[source]
		source: std::io::Error,
	},
	/// CA material does not contain any parsable certificate.
	#[error("Cannot parse CA certificates from {origin}.")]
	InvalidCa {
		/// Human-readable origin of the rejected material.
		origin: String,
	},
	/// Client certificate or key material cannot be loaded.
	#[error("Cannot load TLS certificate from {origin}.")]
	Certificate {
		/// Human-readable origin of the rejected material.
		origin: String,
		/// Parsing failure.
		#[source]
		source: CertificateError,
	},
	/// `min_version` is not one of `TLS10`, `TLS11`, `TLS12`, `TLS13`.
	#[error("Unsupported TLS version {version:?}.")]
	UnsupportedTlsVersion {
		/// Rejected version string.
		version: String,
	},
	/// `server_name` is neither a DNS name nor an IP address.
	#[error("Invalid `server_name` {name:?}.")]
	InvalidServerName {
		/// Rejected server name.
		name: String,
	},
	/// A header entry is malformed.
	#[error("Invalid header {entry:?}: {reason}.")]
	InvalidHeader {
		/// Offending `key: value` entry.
		entry: String,
		/// Why the entry was rejected.
		reason: &'static str,
	},
	/// A URL field cannot be parsed.
	#[error("Cannot parse `{field}` {url:?}.")]
	InvalidUrl {
		/// Field holding the URL.
		field: &'static str,
		/// Rejected URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// rustls rejected the assembled client configuration.
	#[error("TLS client configuration could not be constructed.")]
	TlsBuild {
		/// Underlying rustls failure.
		#[source]
		source: BoxError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a rustls builder failure inside [`ConfigError`].
	pub fn tls_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::TlsBuild { source: Box::new(src) }
	}

	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Recoverable failures raised while refreshing a header value or certificate.
///
/// These never abort the request path: header refreshes degrade to an empty value and
/// certificate refreshes fail the TLS handshake. They are reported through [`crate::obs`].
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// A secret file is missing or unreadable.
	#[error("Cannot read `{field}` from {path:?}.")]
	ReadSecret {
		/// Field that referenced the file.
		field: &'static str,
		/// Resolved file path.
		path: String,
		/// Underlying read failure.
		#[source]
		source: std::io::Error,
	},
	/// Token endpoint answered with an OAuth error or an unexpected response.
	#[error("Token endpoint returned an error: {message}.")]
	TokenEndpoint {
		/// Provider-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Network failure (DNS, TCP, TLS, proxy) while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// A file-backed client certificate could not be reloaded.
	#[error("Cannot reload TLS certificate from {origin}.")]
	Certificate {
		/// Human-readable origin of the rejected material.
		origin: String,
		/// Loading failure.
		#[source]
		source: CertificateError,
	},
}
impl RefreshError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_error_converts_into_error_with_message() {
		let err: Error =
			ConfigError::ConflictingAuth { first: "authorization", second: "basic_auth" }.into();

		assert!(matches!(err, Error::Config(_)));
		assert_eq!(err.to_string(), "Cannot use both `authorization` and `basic_auth`.");
	}

	#[test]
	fn refresh_error_exposes_io_source() {
		let err = RefreshError::ReadSecret {
			field: "bearer_token_file",
			path: "/run/secrets/token".into(),
			source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
		};
		let source =
			StdError::source(&err).expect("Read failures should expose the I/O error as source.");

		assert_eq!(source.to_string(), "gone");
		assert!(err.to_string().contains("/run/secrets/token"));
	}
}
