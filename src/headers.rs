//! Extra request headers and the request representations they can be applied to.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError};

/// Request representation that can receive headers.
///
/// Implemented for [`reqwest::Request`] (general purpose), [`oauth2::http::Request`]
/// (low-level `http` requests used by high-throughput clients), and a bare [`HeaderMap`].
/// Every implementation replaces existing values for the same header name.
pub trait HeaderTarget {
	/// Sets `name` to `value`, replacing previous values.
	fn set_header(&mut self, name: HeaderName, value: HeaderValue);
}
impl HeaderTarget for HeaderMap {
	fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
		self.insert(name, value);
	}
}
impl HeaderTarget for reqwest::Request {
	fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
		self.headers_mut().insert(name, value);
	}
}
impl<B> HeaderTarget for oauth2::http::Request<B> {
	fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
		self.headers_mut().insert(name, value);
	}
}

/// A parsed `key: value` header entry.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderEntry {
	key: String,
	value: String,
	name: HeaderName,
	header_value: HeaderValue,
}
impl HeaderEntry {
	/// Parses a `key: value` entry; surrounding whitespace is trimmed from both parts.
	pub fn parse(entry: &str) -> Result<Self, ConfigError> {
		let invalid = |reason| ConfigError::InvalidHeader { entry: entry.to_owned(), reason };
		let (key, value) = entry
			.split_once(':')
			.ok_or_else(|| invalid("missing ':'; expecting \"key: value\" format"))?;
		let key = key.trim();
		let value = value.trim();
		let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid("invalid name"))?;
		let header_value = HeaderValue::from_str(value).map_err(|_| invalid("invalid value"))?;

		Ok(Self { key: key.to_owned(), value: value.to_owned(), name, header_value })
	}

	/// Header key as written in the config.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Header value as written in the config.
	pub fn value(&self) -> &str {
		&self.value
	}

	/// Applies the entry onto `target`.
	pub fn apply<R>(&self, target: &mut R)
	where
		R: ?Sized + HeaderTarget,
	{
		target.set_header(self.name.clone(), self.header_value.clone());
	}
}
impl Debug for HeaderEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.key, self.value)
	}
}
impl Display for HeaderEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.key, self.value)
	}
}

/// Parses every entry, failing on the first malformed one.
pub fn parse_headers<S>(entries: &[S]) -> Result<Vec<HeaderEntry>, ConfigError>
where
	S: AsRef<str>,
{
	entries.iter().map(|entry| HeaderEntry::parse(entry.as_ref())).collect()
}

/// Renders entries as `key: value\r\n` lines, the way they appear on the wire.
pub fn headers_string(entries: &[HeaderEntry]) -> String {
	entries.iter().map(|entry| format!("{}: {}\r\n", entry.key, entry.value)).collect()
}

/// Applies `entries` followed by a non-empty `Authorization` value onto `target`.
pub fn apply_headers<R>(target: &mut R, entries: &[HeaderEntry], authorization: Option<&str>)
where
	R: ?Sized + HeaderTarget,
{
	for entry in entries {
		entry.apply(target);
	}

	let Some(authorization) = authorization.filter(|value| !value.is_empty()) else {
		return;
	};

	match HeaderValue::from_str(authorization) {
		Ok(mut value) => {
			value.set_sensitive(true);
			target.set_header(AUTHORIZATION, value);
		},
		#[cfg(feature = "tracing")]
		Err(err) => tracing::error!(error = %err, "Authorization header value is not a valid header"),
		#[cfg(not(feature = "tracing"))]
		Err(_) => {},
	}
}
