// std
use std::{fs, path::Path, thread, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use rotating_auth::{
	HttpClientConfig, OAuth2Config, Secret, TlsConfig,
	error::{ConfigError, Error},
	rustls::ProtocolVersion,
};

fn write_pair(dir: &Path, name: &str) -> color_eyre::Result<Vec<u8>> {
	let rcgen::CertifiedKey { cert, key_pair } =
		rcgen::generate_simple_self_signed(vec![name.to_owned()])?;

	fs::write(dir.join("client.crt"), cert.pem())?;
	fs::write(dir.join("client.key"), key_pair.serialize_pem())?;

	Ok(cert.der().to_vec())
}

fn file_pair() -> TlsConfig {
	TlsConfig {
		cert_file: Some("client.crt".into()),
		key_file: Some("client.key".into()),
		..Default::default()
	}
}

#[test]
fn client_certificate_rotates_after_cache_window() -> color_eyre::Result<()> {
	let dir = tempfile::tempdir()?;
	let first = write_pair(dir.path(), "first.example.com")?;
	let config = HttpClientConfig { tls_config: Some(file_pair()), ..Default::default() }
		.builder(dir.path())
		.cache_ttl(Duration::from_millis(50))
		.build()?;
	let resolver = config.tls().client_cert().expect("Client certificate should be configured.");

	assert_eq!(resolver.current()?.cert[0].as_ref(), first.as_slice());

	let second = write_pair(dir.path(), "second.example.com")?;

	assert_eq!(resolver.current()?.cert[0].as_ref(), first.as_slice());

	thread::sleep(Duration::from_millis(120));

	assert_eq!(resolver.current()?.cert[0].as_ref(), second.as_slice());

	fs::write(dir.path().join("client.key"), "garbage")?;
	thread::sleep(Duration::from_millis(120));

	assert!(resolver.current().is_err());
	assert!(config.new_tls_config().is_ok());

	Ok(())
}

#[test]
fn missing_certificate_files_fail_fast() {
	let dir = tempfile::tempdir().expect("Temp dir should be created.");
	let err = HttpClientConfig { tls_config: Some(file_pair()), ..Default::default() }
		.new_config(dir.path())
		.expect_err("Missing certificate files should fail construction.");

	assert!(matches!(err, Error::Config(ConfigError::Certificate { .. })));
}

#[test]
fn min_version_restricts_enabled_protocols() -> color_eyre::Result<()> {
	let build = |min_version: &str| {
		HttpClientConfig {
			tls_config: Some(TlsConfig {
				min_version: Some(min_version.into()),
				..Default::default()
			}),
			..Default::default()
		}
		.new_config(".")
	};
	let tls13 = build("TLS13")?.new_tls_config()?;

	assert!(tls13.supports_version(ProtocolVersion::TLSv1_3));
	assert!(!tls13.supports_version(ProtocolVersion::TLSv1_2));

	let tls10 = build("tls10")?.new_tls_config()?;

	assert!(tls10.supports_version(ProtocolVersion::TLSv1_2));
	assert!(tls10.supports_version(ProtocolVersion::TLSv1_3));

	let err = build("TLS09").expect_err("Unknown versions should fail.");

	assert_eq!(err.to_string(), "Unsupported TLS version \"TLS09\".");

	Ok(())
}

#[test]
fn ca_file_must_hold_certificates() -> color_eyre::Result<()> {
	let dir = tempfile::tempdir()?;

	fs::write(dir.path().join("ca.pem"), "-----BEGIN NOTHING-----\n")?;

	let err = HttpClientConfig {
		tls_config: Some(TlsConfig { ca_file: Some("ca.pem".into()), ..Default::default() }),
		..Default::default()
	}
	.new_config(dir.path())
	.expect_err("CA file without certificates should fail.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidCa { .. })));

	Ok(())
}

#[test]
fn oauth2_tls_only_config_carries_token_endpoint_material() -> color_eyre::Result<()> {
	let oauth2 = OAuth2Config {
		tls_config: Some(TlsConfig {
			server_name: Some("auth.internal".into()),
			insecure_skip_verify: true,
			..Default::default()
		}),
		..Default::default()
	};
	let config = oauth2.new_config(".")?;

	assert_eq!(config.tls().server_name(), Some("auth.internal"));
	assert!(config.tls().insecure_skip_verify());
	assert!(config.auth_source().is_none());
	assert!(config.digest().contains("tls_server_name=\"auth.internal\", tls_insecure_skip_verify=true"));

	Ok(())
}

#[tokio::test]
async fn token_endpoint_verification_follows_tls_config() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"abc\",\"token_type\":\"bearer\"}");
		})
		.await;
	let header = |tls_config: TlsConfig| {
		let oauth2 = OAuth2Config {
			client_id: "client".into(),
			client_secret: Some(Secret::new("one")),
			token_url: server.url("/token"),
			tls_config: Some(tls_config),
			..Default::default()
		};

		HttpClientConfig { oauth2: Some(oauth2), ..Default::default() }.new_config(".")
	};
	// The mock endpoint presents a certificate from a CA outside the bundled roots.
	let verified = header(TlsConfig::default()).expect("Verifying config should build.");

	assert!(server.url("/token").starts_with("https://"));
	assert_eq!(verified.auth_header().await, "");

	let mismatched = header(TlsConfig {
		server_name: Some("auth.internal".into()),
		..Default::default()
	})
	.expect("Server name override should build.");

	assert_eq!(mismatched.auth_header().await, "");

	mock.assert_calls_async(0).await;

	let skipped = header(TlsConfig {
		server_name: Some("auth.internal".into()),
		insecure_skip_verify: true,
		..Default::default()
	})
	.expect("Skip-verify config should build.");

	assert_eq!(skipped.auth_header().await, "Bearer abc");

	mock.assert_calls_async(1).await;
}
