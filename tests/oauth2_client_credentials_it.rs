// std
use std::{fs, path::Path, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use rotating_auth::{HttpClientConfig, OAuth2Config, RuntimeConfig, Secret};

const CACHE_TTL: Duration = Duration::from_millis(50);
const PAST_TTL: Duration = Duration::from_millis(120);

fn oauth2_config(server: &MockServer) -> OAuth2Config {
	OAuth2Config {
		client_id: "client".into(),
		client_secret: Some(Secret::new("one")),
		scopes: vec!["metrics.read".into()],
		token_url: format!("http://{}/token", server.address()),
		..Default::default()
	}
}

fn build(config: HttpClientConfig, base_dir: &Path) -> RuntimeConfig {
	config
		.builder(base_dir)
		.cache_ttl(CACHE_TTL)
		.build()
		.expect("Runtime config should build for the mock token endpoint.")
}

fn token_body(token: &str) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"bearer\",\"expires_in\":1800}}")
}

#[tokio::test]
async fn token_is_fetched_once_and_reused_across_header_windows() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("authorization", "Basic Y2xpZW50Om9uZQ==")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(token_body("token-one"));
		})
		.await;
	let config = build(
		HttpClientConfig { oauth2: Some(oauth2_config(&server)), ..Default::default() },
		Path::new("."),
	);

	assert_eq!(config.auth_header().await, "Bearer token-one");
	assert_eq!(config.auth_header().await, "Bearer token-one");

	tokio::time::sleep(PAST_TTL).await;

	assert_eq!(config.auth_header().await, "Bearer token-one");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rotated_secret_file_rebuilds_token_source() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").header("authorization", "Basic Y2xpZW50Om9uZQ==");
			then.status(200).header("content-type", "application/json").body(token_body("token-one"));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").header("authorization", "Basic Y2xpZW50OnR3bw==");
			then.status(200).header("content-type", "application/json").body(token_body("token-two"));
		})
		.await;
	let dir = tempfile::tempdir().expect("Temp dir should be created.");

	fs::write(dir.path().join("client-secret"), "one\n").expect("Secret file should be written.");

	let oauth2 = OAuth2Config {
		client_secret: None,
		client_secret_file: Some("client-secret".into()),
		..oauth2_config(&server)
	};
	let config = build(HttpClientConfig { oauth2: Some(oauth2), ..Default::default() }, dir.path());

	assert_eq!(config.auth_header().await, "Bearer token-one");

	fs::write(dir.path().join("client-secret"), "two\n").expect("Secret file should be rewritten.");
	tokio::time::sleep(PAST_TTL).await;

	assert_eq!(config.auth_header().await, "Bearer token-two");

	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_token_type_defaults_to_bearer() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"abc\",\"expires_in\":60}");
		})
		.await;
	let config = build(
		HttpClientConfig { oauth2: Some(oauth2_config(&server)), ..Default::default() },
		Path::new("."),
	);

	assert_eq!(config.auth_header().await, "Bearer abc");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn endpoint_errors_degrade_to_empty_header() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\",\"error_description\":\"unknown client\"}");
		})
		.await;
	let config = build(
		HttpClientConfig { oauth2: Some(oauth2_config(&server)), ..Default::default() },
		Path::new("."),
	);

	assert_eq!(config.auth_header().await, "");

	let rotating_auth::credential::AuthSource::OAuth2(manager) = config.auth_source() else {
		panic!("OAuth 2.0 source should be active.");
	};
	let err = manager.token().await.expect_err("Token request should fail.");

	assert!(err.to_string().contains("invalid_client: unknown client"));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn oauth2_conflicts_with_other_sources() {
	let server = MockServer::start_async().await;
	let err = HttpClientConfig {
		bearer_token: Some(Secret::new("static")),
		oauth2: Some(oauth2_config(&server)),
		..Default::default()
	}
	.new_config(".")
	.expect_err("Bearer token and OAuth 2.0 should conflict.");

	assert_eq!(err.to_string(), "Cannot use both `bearer_token` and `oauth2`.");
}
