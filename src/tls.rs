//! TLS client material: root CA pool, rotating client certificate, and rustls config assembly.
//!
//! Inline `cert`/`key` pairs are parsed once and served unconditionally. File-backed pairs go
//! through [`ClientCertResolver`], which re-parses them from disk at most once per cache window so
//! a rotated certificate is picked up by the next handshake. Reload failures are logged and the
//! resolver offers no certificate, which fails the handshake at the transport layer.

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use rustls::{
	ClientConfig, DigitallySignedStruct, Error as RustlsError, ProtocolVersion, RootCertStore,
	SignatureScheme, SupportedProtocolVersion,
	client::{
		ResolvesClientCert, Resumption, WebPkiServerVerifier,
		danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
	},
	crypto::CryptoProvider,
	pki_types::{CertificateDer, ServerName, UnixTime},
	sign::CertifiedKey,
};
// self
use crate::{
	_prelude::*,
	config::TlsConfig,
	digest,
	error::{ConfigError, RefreshError},
	memo::Memoized,
	obs::{self, RefreshKind, RefreshSpan},
	source::SourceReader,
};

/// Number of TLS sessions kept for resumption.
pub const SESSION_CACHE_SIZE: usize = 64;

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Client certificate loading failure.
#[derive(Debug, ThisError)]
pub enum CertificateError {
	/// Certificate or key file cannot be read.
	#[error("Cannot read {path:?}.")]
	Read {
		/// Resolved location.
		path: String,
		/// Underlying read failure.
		#[source]
		source: std::io::Error,
	},
	/// PEM input is malformed.
	#[error("Malformed PEM input.")]
	Pem(#[source] std::io::Error),
	/// PEM input holds no certificate.
	#[error("No certificate found in PEM input.")]
	NoCertificates,
	/// PEM input holds no private key.
	#[error("No private key found in PEM input.")]
	NoPrivateKey,
	/// The private key type is not supported by the crypto provider.
	#[error("Private key is not supported.")]
	Key(#[source] RustlsError),
}

/// Lowest accepted TLS protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
	/// TLS 1.0.
	Tls10,
	/// TLS 1.1.
	Tls11,
	/// TLS 1.2.
	Tls12,
	/// TLS 1.3.
	Tls13,
}
impl TlsVersion {
	/// Returns the config spelling of the version.
	pub const fn as_str(self) -> &'static str {
		match self {
			TlsVersion::Tls10 => "TLS10",
			TlsVersion::Tls11 => "TLS11",
			TlsVersion::Tls12 => "TLS12",
			TlsVersion::Tls13 => "TLS13",
		}
	}

	/// Returns the matching wire protocol version.
	pub const fn protocol_version(self) -> ProtocolVersion {
		match self {
			TlsVersion::Tls10 => ProtocolVersion::TLSv1_0,
			TlsVersion::Tls11 => ProtocolVersion::TLSv1_1,
			TlsVersion::Tls12 => ProtocolVersion::TLSv1_2,
			TlsVersion::Tls13 => ProtocolVersion::TLSv1_3,
		}
	}

	/// Protocol versions enabled for this minimum.
	///
	/// rustls only implements TLS 1.2 and 1.3, so every minimum below 1.3 enables both.
	pub fn supported_versions(self) -> &'static [&'static SupportedProtocolVersion] {
		match self {
			TlsVersion::Tls13 => TLS13_ONLY,
			_ => rustls::ALL_VERSIONS,
		}
	}
}
impl FromStr for TlsVersion {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"TLS10" => Ok(Self::Tls10),
			"TLS11" => Ok(Self::Tls11),
			"TLS12" => Ok(Self::Tls12),
			"TLS13" => Ok(Self::Tls13),
			_ => Err(ConfigError::UnsupportedTlsVersion { version: s.to_owned() }),
		}
	}
}
impl Display for TlsVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Serves the client certificate offered during handshakes.
pub struct ClientCertResolver {
	source: CertSource,
}
enum CertSource {
	Static(Arc<CertifiedKey>),
	Reloading {
		cert_path: String,
		key_path: String,
		reader: Arc<dyn SourceReader>,
		provider: Arc<CryptoProvider>,
		cache: Memoized<Arc<CertifiedKey>>,
	},
}
impl ClientCertResolver {
	fn inline(
		cert: &str,
		key: &str,
		provider: &CryptoProvider,
	) -> Result<Self, ConfigError> {
		let key = parse_certified_key(cert.as_bytes(), key.as_bytes(), provider).map_err(|source| {
			ConfigError::Certificate { origin: "inline `cert` and `key`".into(), source }
		})?;

		Ok(Self { source: CertSource::Static(Arc::new(key)) })
	}

	fn reloading(
		cert_path: String,
		key_path: String,
		reader: Arc<dyn SourceReader>,
		provider: Arc<CryptoProvider>,
		ttl: StdDuration,
	) -> Result<Self, ConfigError> {
		let initial = load_certified_key(reader.as_ref(), &cert_path, &key_path, &provider)
			.map_err(|source| ConfigError::Certificate {
				origin: file_origin(&cert_path, &key_path),
				source,
			})?;
		let cache = Memoized::seeded(Arc::new(initial), ttl);

		Ok(Self { source: CertSource::Reloading { cert_path, key_path, reader, provider, cache } })
	}

	/// Returns `true` when the certificate is re-read from files.
	pub fn is_reloading(&self) -> bool {
		matches!(self.source, CertSource::Reloading { .. })
	}

	/// Returns the certificate for the current cache window, reloading files when it elapsed.
	pub fn current(&self) -> Result<Arc<CertifiedKey>, RefreshError> {
		match &self.source {
			CertSource::Static(key) => Ok(key.clone()),
			CertSource::Reloading { cert_path, key_path, reader, provider, cache } =>
				cache.get_or_refresh_blocking(|_| {
					let _span = RefreshSpan::new(RefreshKind::ClientCertificate, "reload").entered();
					let result = load_certified_key(reader.as_ref(), cert_path, key_path, provider)
						.map(Arc::new)
						.map_err(|source| RefreshError::Certificate {
							origin: file_origin(cert_path, key_path),
							source,
						});

					obs::observe_refresh(RefreshKind::ClientCertificate, &result);

					result
				}),
		}
	}
}
impl ResolvesClientCert for ClientCertResolver {
	fn resolve(
		&self,
		_root_hint_subjects: &[&[u8]],
		_sigschemes: &[SignatureScheme],
	) -> Option<Arc<CertifiedKey>> {
		self.current().ok()
	}

	fn has_certs(&self) -> bool {
		true
	}
}
impl Debug for ClientCertResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.source {
			CertSource::Static(_) => f.write_str("ClientCertResolver::Static"),
			CertSource::Reloading { cert_path, key_path, cache, .. } => f
				.debug_struct("ClientCertResolver::Reloading")
				.field("cert_path", cert_path)
				.field("key_path", key_path)
				.field("ttl", &cache.ttl())
				.finish(),
		}
	}
}

#[derive(Debug)]
struct ServerVerifier {
	inner: Arc<WebPkiServerVerifier>,
	server_name: Option<ServerName<'static>>,
	insecure_skip_verify: bool,
}
impl ServerCertVerifier for ServerVerifier {
	fn verify_server_cert(
		&self,
		end_entity: &CertificateDer<'_>,
		intermediates: &[CertificateDer<'_>],
		server_name: &ServerName<'_>,
		ocsp_response: &[u8],
		now: UnixTime,
	) -> Result<ServerCertVerified, RustlsError> {
		if self.insecure_skip_verify {
			return Ok(ServerCertVerified::assertion());
		}

		let server_name = self.server_name.as_ref().unwrap_or(server_name);

		self.inner.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
	}

	fn verify_tls12_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, RustlsError> {
		self.inner.verify_tls12_signature(message, cert, dss)
	}

	fn verify_tls13_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, RustlsError> {
		self.inner.verify_tls13_signature(message, cert, dss)
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		self.inner.supported_verify_schemes()
	}
}

/// Resolved TLS material shared by every client config built from it.
pub struct TlsMaterial {
	provider: Arc<CryptoProvider>,
	roots: Arc<RootCertStore>,
	root_subjects: Vec<String>,
	client_cert: Option<Arc<ClientCertResolver>>,
	cert_digest: String,
	server_name: Option<(String, ServerName<'static>)>,
	insecure_skip_verify: bool,
	min_version: Option<TlsVersion>,
}
impl TlsMaterial {
	/// Resolves `config`; `None` yields the bundled Mozilla roots and no client certificate.
	pub fn build(
		config: Option<&TlsConfig>,
		base_dir: &Path,
		reader: &Arc<dyn SourceReader>,
		cert_ttl: StdDuration,
	) -> Result<Self, ConfigError> {
		const SECTION: &str = "tls_config";

		let provider = Arc::new(rustls::crypto::ring::default_provider());
		let default = TlsConfig::default();
		let config = config.unwrap_or(&default);
		let (roots, root_subjects) = match (non_empty(&config.ca), non_empty(&config.ca_file)) {
			(Some(_), Some(_)) =>
				return Err(ConfigError::ConflictingSecret { section: SECTION, inline: "ca", file: "ca_file" }),
			(Some(ca), None) => custom_roots(ca.as_bytes(), "inline `ca`")?,
			(None, Some(file)) => {
				let path = reader.resolve_path(base_dir, file);
				let pem = reader
					.read_bytes(&path)
					.map_err(|source| ConfigError::ReadFile { field: "ca_file", path: path.clone(), source })?;

				custom_roots(&pem, &format!("{path:?}"))?
			},
			(None, None) => {
				let mut roots = RootCertStore::empty();

				roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

				(roots, Vec::new())
			},
		};
		let inline_key = config.key.as_ref().map(|key| key.expose()).filter(|key| !key.is_empty());
		let (client_cert, cert_digest) = match (
			non_empty(&config.cert),
			inline_key,
			non_empty(&config.cert_file),
			non_empty(&config.key_file),
		) {
			(None, None, None, None) => (None, String::new()),
			(cert, key, None, None) => {
				let cert = cert.unwrap_or_default();
				let key = key.unwrap_or_default();
				let resolver = ClientCertResolver::inline(cert, key, &provider)?;
				let fingerprint = digest::fingerprint(&[key.as_bytes(), cert.as_bytes()]);

				(Some(Arc::new(resolver)), format!("digest(key+cert)={fingerprint}"))
			},
			(None, None, Some(cert_file), Some(key_file)) => {
				let cert_path = reader.resolve_path(base_dir, cert_file);
				let key_path = reader.resolve_path(base_dir, key_file);
				let cert_digest = format!("cert_file={cert_path:?}, key_file={key_path:?}");
				let resolver = ClientCertResolver::reloading(
					cert_path,
					key_path,
					reader.clone(),
					provider.clone(),
					cert_ttl,
				)?;

				(Some(Arc::new(resolver)), cert_digest)
			},
			(None, None, Some(_), None) =>
				return Err(ConfigError::MissingField { section: SECTION, field: "key_file" }),
			(None, None, None, Some(_)) =>
				return Err(ConfigError::MissingField { section: SECTION, field: "cert_file" }),
			(Some(_), _, Some(_), _) | (None, Some(_), Some(_), _) =>
				return Err(ConfigError::ConflictingSecret {
					section: SECTION,
					inline: "cert",
					file: "cert_file",
				}),
			(_, _, None, Some(_)) =>
				return Err(ConfigError::ConflictingSecret {
					section: SECTION,
					inline: "key",
					file: "key_file",
				}),
		};
		let server_name = non_empty(&config.server_name)
			.map(|name| {
				ServerName::try_from(name)
					.map(|parsed| (name.to_owned(), parsed.to_owned()))
					.map_err(|_| ConfigError::InvalidServerName { name: name.to_owned() })
			})
			.transpose()?;
		let min_version = non_empty(&config.min_version).map(TlsVersion::from_str).transpose()?;

		Ok(Self {
			provider,
			roots: Arc::new(roots),
			root_subjects,
			client_cert,
			cert_digest,
			server_name,
			insecure_skip_verify: config.insecure_skip_verify,
			min_version,
		})
	}

	/// Assembles a rustls client config with session resumption enabled.
	pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
		let verifier = self.server_verifier()?;
		let versions = self.min_version.unwrap_or(TlsVersion::Tls12).supported_versions();
		let builder = ClientConfig::builder_with_provider(self.provider.clone())
			.with_protocol_versions(versions)
			.map_err(ConfigError::tls_build)?
			.dangerous()
			.with_custom_certificate_verifier(Arc::new(verifier));
		let mut config = match &self.client_cert {
			Some(resolver) => builder.with_client_cert_resolver(resolver.clone()),
			None => builder.with_no_client_auth(),
		};

		config.resumption = Resumption::in_memory_sessions(SESSION_CACHE_SIZE);

		Ok(config)
	}

	fn server_verifier(&self) -> Result<ServerVerifier, ConfigError> {
		let inner = WebPkiServerVerifier::builder_with_provider(self.roots.clone(), self.provider.clone())
			.build()
			.map_err(ConfigError::tls_build)?;

		Ok(ServerVerifier {
			inner,
			server_name: self.server_name.as_ref().map(|(_, parsed)| parsed.clone()),
			insecure_skip_verify: self.insecure_skip_verify,
		})
	}

	/// Root CA pool used for server verification.
	pub fn roots(&self) -> &Arc<RootCertStore> {
		&self.roots
	}

	/// Base64 subjects of a custom CA pool; empty when the bundled roots are used.
	pub fn root_subjects(&self) -> &[String] {
		&self.root_subjects
	}

	/// Client certificate resolver, when a certificate is configured.
	pub fn client_cert(&self) -> Option<&Arc<ClientCertResolver>> {
		self.client_cert.as_ref()
	}

	/// Digest fragment identifying the client certificate.
	pub fn cert_digest(&self) -> &str {
		&self.cert_digest
	}

	/// Name verified against server certificates instead of the URL host.
	pub fn server_name(&self) -> Option<&str> {
		self.server_name.as_ref().map(|(raw, _)| raw.as_str())
	}

	/// Whether server certificate verification is disabled.
	pub fn insecure_skip_verify(&self) -> bool {
		self.insecure_skip_verify
	}

	/// Configured minimum protocol version.
	pub fn min_version(&self) -> Option<TlsVersion> {
		self.min_version
	}
}
impl Debug for TlsMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TlsMaterial")
			.field("root_subjects", &self.root_subjects)
			.field("client_cert", &self.client_cert)
			.field("server_name", &self.server_name())
			.field("insecure_skip_verify", &self.insecure_skip_verify)
			.field("min_version", &self.min_version)
			.finish_non_exhaustive()
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.is_empty())
}

fn file_origin(cert_path: &str, key_path: &str) -> String {
	format!("{cert_path:?} and {key_path:?}")
}

fn custom_roots(pem: &[u8], origin: &str) -> Result<(RootCertStore, Vec<String>), ConfigError> {
	let invalid = || ConfigError::InvalidCa { origin: origin.to_owned() };
	let certs = rustls_pemfile::certs(&mut &pem[..])
		.collect::<Result<Vec<_>, _>>()
		.map_err(|_| invalid())?;
	let mut roots = RootCertStore::empty();
	let (added, _ignored) = roots.add_parsable_certificates(certs);

	if added == 0 {
		return Err(invalid());
	}

	let subjects =
		roots.subjects().iter().map(|subject| STANDARD_NO_PAD.encode(subject.as_ref())).collect();

	Ok((roots, subjects))
}

fn parse_certified_key(
	cert_pem: &[u8],
	key_pem: &[u8],
	provider: &CryptoProvider,
) -> Result<CertifiedKey, CertificateError> {
	let certs = rustls_pemfile::certs(&mut &cert_pem[..])
		.collect::<Result<Vec<_>, _>>()
		.map_err(CertificateError::Pem)?;

	if certs.is_empty() {
		return Err(CertificateError::NoCertificates);
	}

	let key = rustls_pemfile::private_key(&mut &key_pem[..])
		.map_err(CertificateError::Pem)?
		.ok_or(CertificateError::NoPrivateKey)?;
	let signing_key = provider.key_provider.load_private_key(key).map_err(CertificateError::Key)?;

	Ok(CertifiedKey::new(certs, signing_key))
}

fn load_certified_key(
	reader: &dyn SourceReader,
	cert_path: &str,
	key_path: &str,
	provider: &CryptoProvider,
) -> Result<CertifiedKey, CertificateError> {
	let read = |path: &str| {
		reader
			.read_bytes(path)
			.map_err(|source| CertificateError::Read { path: path.to_owned(), source })
	};
	let cert = read(cert_path)?;
	let key = read(key_path)?;

	parse_certified_key(&cert, &key, provider)
}
