//! Secret string wrapper that never renders its plaintext.

// crates.io
use serde::Serializer;
// self
use crate::_prelude::*;

/// Placeholder printed wherever a secret would otherwise be rendered.
pub const SECRET_PLACEHOLDER: &str = "<secret>";

/// Password, token, or key material loaded from a declarative config.
///
/// `Debug`, `Display`, and `Serialize` all emit [`SECRET_PLACEHOLDER`] so configs can be dumped
/// for diagnostics. Deserialization accepts a plain string.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the plaintext value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` if the secret is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Serialize for Secret {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(SECRET_PLACEHOLDER)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&SECRET_PLACEHOLDER).finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(SECRET_PLACEHOLDER)
	}
}
