// std
use std::{fs, time::Duration};
// self
use rotating_auth::{
	Authorization, BasicAuthConfig, HttpClientConfig, RuntimeConfig, Secret,
	oauth::oauth2,
	reqwest::{
		Method, Request,
		header::{AUTHORIZATION, HeaderValue},
	},
	url::Url,
};

fn basic(password: &str) -> HttpClientConfig {
	HttpClientConfig {
		basic_auth: Some(BasicAuthConfig {
			username: "alice".into(),
			password: Some(Secret::new(password)),
			..Default::default()
		}),
		headers: vec!["X-Scope-OrgID: tenant-1".into(), "X-Region: eu".into()],
		..Default::default()
	}
}

#[tokio::test]
async fn basic_auth_header_is_base64_of_user_and_password() {
	let config = basic("secret").new_config(".").expect("Basic auth config should build.");

	assert_eq!(config.auth_header().await, "Basic YWxpY2U6c2VjcmV0");
}

#[tokio::test]
async fn bearer_token_file_rotation_is_visible_after_one_second() {
	let dir = tempfile::tempdir().expect("Temp dir should be created.");
	let token_path = dir.path().join("token");

	fs::write(&token_path, "abc\n").expect("Token file should be written.");

	let config = HttpClientConfig { bearer_token_file: Some("token".into()), ..Default::default() }
		.new_config(dir.path())
		.expect("Bearer file config should build.");

	assert_eq!(config.auth_header().await, "Bearer abc");

	fs::write(&token_path, "def\n").expect("Token file should be rewritten.");

	assert_eq!(config.auth_header().await, "Bearer abc");

	tokio::time::sleep(Duration::from_millis(1_100)).await;

	assert_eq!(config.auth_header().await, "Bearer def");
}

#[tokio::test]
async fn custom_authorization_type_is_preserved() {
	let config = HttpClientConfig {
		authorization: Some(Authorization {
			kind: Some("Token".into()),
			credentials: Some(Secret::new("xyz")),
			..Default::default()
		}),
		..Default::default()
	}
	.new_config(".")
	.expect("Authorization config should build.");

	assert_eq!(config.auth_header().await, "Token xyz");
}

#[test]
fn conflicting_sources_name_both() {
	let err = HttpClientConfig {
		authorization: Some(Authorization::default()),
		bearer_token_file: Some("token".into()),
		..basic("secret")
	}
	.new_config(".")
	.expect_err("Authorization and basic auth should conflict.");

	assert_eq!(err.to_string(), "Cannot use both `authorization` and `basic_auth`.");
}

#[tokio::test]
async fn empty_bearer_token_file_does_not_count_as_a_source() {
	let config = HttpClientConfig { bearer_token_file: Some(String::new()), ..basic("secret") }
		.new_config(".")
		.expect("Empty bearer token file should be ignored.");

	assert_eq!(config.auth_header().await, "Basic YWxpY2U6c2VjcmV0");
}

#[tokio::test]
async fn headers_apply_identically_to_both_request_types() {
	let config = basic("secret").new_config(".").expect("Basic auth config should build.");
	let url = Url::parse("https://example.com/api/v1/push").expect("Target URL should parse.");
	let mut request = Request::new(Method::POST, url);
	let mut raw = oauth2::http::Request::builder()
		.uri("https://example.com/api/v1/push")
		.body(Vec::<u8>::new())
		.expect("HTTP request should build.");

	config.set_headers(&mut request, true).await;
	config.set_headers(&mut raw, true).await;

	for headers in [request.headers(), raw.headers()] {
		assert_eq!(
			headers.get(AUTHORIZATION),
			Some(&HeaderValue::from_static("Basic YWxpY2U6c2VjcmV0"))
		);
		assert_eq!(headers.get("x-scope-orgid"), Some(&HeaderValue::from_static("tenant-1")));
		assert_eq!(headers.get("x-region"), Some(&HeaderValue::from_static("eu")));
	}

	assert_eq!(config.headers_no_auth_string(), "X-Scope-OrgID: tenant-1\r\nX-Region: eu\r\n");
}

#[test]
fn digest_tracks_secrets_without_leaking_them() {
	let build = |config: HttpClientConfig| -> RuntimeConfig {
		config.new_config("/etc/app").expect("Config should build.")
	};
	let a = build(basic("hunter2"));
	let b = build(basic("hunter2"));
	let changed_secret = build(basic("hunter3"));
	let mut reordered = basic("hunter2");

	reordered.headers.reverse();

	let reordered = build(reordered);

	assert_eq!(a, b);
	assert_eq!(a.digest(), b.digest());
	assert_ne!(a, changed_secret);
	assert_ne!(a, reordered);
	assert!(!a.digest().contains("hunter2"));
	assert!(a.digest().starts_with("auth=basic(username=\"alice\", hash(password)="));
	assert!(a.digest().contains("headers=[X-Scope-OrgID: tenant-1, X-Region: eu]"));
}

#[test]
fn declarative_config_deserializes_and_resolves() {
	let config: HttpClientConfig = serde_json::from_str(
		r#"{"bearer_token_file": "/run/token", "headers": ["X-Tenant: a"], "tls_config": {"min_version": "tls12"}}"#,
	)
	.expect("Config should deserialize.");
	let runtime = config.new_config(".").expect("Config should resolve.");

	assert_eq!(runtime.tls().min_version().map(|version| version.as_str()), Some("TLS12"));
	assert!(runtime.digest().contains("bearer(bearer_token_file=\"/run/token\")"));
}
