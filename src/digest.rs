//! Deterministic, secret-safe equality digest over a resolved configuration.
//!
//! Consumers compare digests to decide whether a dependent network client must be rebuilt, so
//! the string is computed once at construction and covers every input that shapes requests.
//! Secrets are replaced by a 64-bit non-cryptographic hash: good enough for change detection,
//! not meant as a commitment. Header order is significant.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	credential::{AuthSource, SecretValue},
	headers::HeaderEntry,
	secret::Secret,
	tls::TlsMaterial,
};

/// Fixed-width (16 hex digits) non-cryptographic hash of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> String {
	let mut hasher = DefaultHasher::new();

	hasher.write(bytes);

	format!("{:016x}", hasher.finish())
}

/// Renders `hash(name)=<hash>` for an optional inline secret.
pub fn secret_field(name: &str, secret: Option<&Secret>) -> String {
	format!("hash({name})={}", hash_bytes(secret.map(Secret::expose).unwrap_or_default().as_bytes()))
}

/// Base64 (no padding) SHA-256 fingerprint over the concatenated `parts`.
pub fn fingerprint(parts: &[&[u8]]) -> String {
	let mut hasher = Sha256::new();

	for part in parts {
		hasher.update(part);
	}

	STANDARD_NO_PAD.encode(hasher.finalize())
}

/// Renders the digest fragment of an auth source.
pub fn auth_digest(source: &AuthSource) -> String {
	match source {
		AuthSource::None => "none".into(),
		AuthSource::Authorization { kind, credentials } =>
			format!("custom(type={kind:?}, {})", secret_value_field("credentials", credentials)),
		AuthSource::Basic { username, password } =>
			format!("basic(username={username:?}, {})", secret_value_field("password", password)),
		AuthSource::Bearer { token } => format!("bearer({})", secret_value_field("token", token)),
		AuthSource::OAuth2(manager) => format!("oauth2({})", manager.summary()),
	}
}

fn secret_value_field(inline_name: &str, value: &SecretValue) -> String {
	match value {
		SecretValue::Inline(secret) => secret_field(inline_name, Some(secret)),
		SecretValue::File { field, path, .. } => format!("{field}={path:?}"),
	}
}

/// Collects the digest fragments of a runtime configuration.
#[derive(Clone, Debug, Default)]
pub struct DigestBuilder {
	auth: String,
	headers: Vec<String>,
	root_ca: Vec<String>,
	cert: String,
	server_name: String,
	insecure_skip_verify: bool,
	min_version: &'static str,
}
impl DigestBuilder {
	/// Creates an empty builder; an unset auth source renders as `none`.
	pub fn new() -> Self {
		Self { auth: "none".into(), ..Default::default() }
	}

	/// Records the active auth source.
	pub fn auth(mut self, source: &AuthSource) -> Self {
		self.auth = auth_digest(source);

		self
	}

	/// Records the extra headers, in order.
	pub fn headers(mut self, entries: &[HeaderEntry]) -> Self {
		self.headers = entries.iter().map(ToString::to_string).collect();

		self
	}

	/// Records the resolved TLS material.
	pub fn tls(mut self, tls: &TlsMaterial) -> Self {
		self.root_ca = tls.root_subjects().to_vec();
		self.cert = tls.cert_digest().to_owned();
		self.server_name = tls.server_name().unwrap_or_default().to_owned();
		self.insecure_skip_verify = tls.insecure_skip_verify();
		self.min_version = tls.min_version().map(|version| version.as_str()).unwrap_or_default();

		self
	}

	/// Renders the digest string.
	pub fn finish(self) -> String {
		format!(
			"auth={}, headers=[{}], tls_root_ca=[{}], tls_cert={}, tls_server_name={:?}, tls_insecure_skip_verify={}, tls_min_version={:?}",
			self.auth,
			self.headers.join(", "),
			self.root_ca.join(", "),
			self.cert,
			self.server_name,
			self.insecure_skip_verify,
			self.min_version,
		)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn hash_bytes_is_fixed_width_and_stable() {
		let a = hash_bytes(b"secret");

		assert_eq!(a.len(), 16);
		assert_eq!(a, hash_bytes(b"secret"));
		assert_ne!(a, hash_bytes(b"secreT"));
	}

	#[test]
	fn fingerprint_covers_all_parts() {
		let split = fingerprint(&[b"key".as_slice(), b"cert".as_slice()]);

		assert_eq!(split, fingerprint(&[b"keycert".as_slice()]));
		assert_ne!(split, fingerprint(&[b"key".as_slice(), b"cerT".as_slice()]));
	}

	#[test]
	fn auth_digest_hashes_inline_secrets_only() {
		let basic = AuthSource::Basic {
			username: "alice".into(),
			password: SecretValue::Inline(Secret::new("hunter2")),
		};
		let rendered = auth_digest(&basic);

		assert!(rendered.starts_with("basic(username=\"alice\", hash(password)="));
		assert!(!rendered.contains("hunter2"));
		assert_eq!(auth_digest(&AuthSource::None), "none");
	}

	#[test]
	fn empty_builder_renders_every_field() {
		assert_eq!(
			DigestBuilder::new().finish(),
			"auth=none, headers=[], tls_root_ca=[], tls_cert=, tls_server_name=\"\", tls_insecure_skip_verify=false, tls_min_version=\"\""
		);
	}
}
