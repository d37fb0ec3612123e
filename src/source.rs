//! Path resolution and secret/byte reading contracts.
//!
//! The crate never touches the filesystem directly. Every file-backed field goes through a
//! [`SourceReader`] so embedders can plug in remote fetching, secret managers, or fixtures.
//! [`LocalReader`] is the default and only understands local paths.

// std
use std::{
	collections::HashMap,
	fs,
	io::{Error as IoError, ErrorKind},
};
// self
use crate::_prelude::*;

/// Reads secrets and raw bytes referenced by declarative configs.
///
/// Implementations must be cheap to call repeatedly: secrets are re-read on the request path
/// (bounded to once per cache window) so rotated files are picked up without a restart.
pub trait SourceReader
where
	Self: Send + Sync,
{
	/// Returns the trimmed content of the secret at `path`.
	fn read_secret(&self, path: &str) -> std::io::Result<String>;

	/// Returns the raw bytes stored at `path` (local file or remote URL).
	fn read_bytes(&self, path: &str) -> std::io::Result<Vec<u8>>;

	/// Resolves `path` against the config's base directory.
	fn resolve_path(&self, base_dir: &Path, path: &str) -> String {
		resolve_path(base_dir, path)
	}
}

/// Reads from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalReader;
impl SourceReader for LocalReader {
	fn read_secret(&self, path: &str) -> std::io::Result<String> {
		let data = self.read_bytes(path)?;
		let text = String::from_utf8(data).map_err(|e| IoError::new(ErrorKind::InvalidData, e))?;

		Ok(text.trim().to_owned())
	}

	fn read_bytes(&self, path: &str) -> std::io::Result<Vec<u8>> {
		if is_remote(path) {
			return Err(IoError::new(
				ErrorKind::Unsupported,
				format!("remote source {path:?} requires a custom SourceReader"),
			));
		}

		fs::read(path)
	}
}

/// In-memory reader for tests, demos, and configs sourced from a secret manager.
#[derive(Clone, Debug, Default)]
pub struct MemoryReader(Arc<Mutex<HashMap<String, Vec<u8>>>>);
impl MemoryReader {
	/// Stores or replaces the content served for `path`.
	pub fn insert(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
		self.0.lock().insert(path.into(), content.into());
	}

	/// Removes `path`, making subsequent reads fail with [`ErrorKind::NotFound`].
	pub fn remove(&self, path: &str) {
		self.0.lock().remove(path);
	}
}
impl SourceReader for MemoryReader {
	fn read_secret(&self, path: &str) -> std::io::Result<String> {
		let data = self.read_bytes(path)?;
		let text = String::from_utf8(data).map_err(|e| IoError::new(ErrorKind::InvalidData, e))?;

		Ok(text.trim().to_owned())
	}

	fn read_bytes(&self, path: &str) -> std::io::Result<Vec<u8>> {
		self.0
			.lock()
			.get(path)
			.cloned()
			.ok_or_else(|| IoError::new(ErrorKind::NotFound, format!("{path:?} is not stored")))
	}
}

/// Joins relative `path` onto `base_dir`; absolute paths and HTTP(S) URLs are kept verbatim.
pub fn resolve_path(base_dir: &Path, path: &str) -> String {
	if path.is_empty() || Path::new(path).is_absolute() || is_remote(path) {
		return path.to_owned();
	}

	base_dir.join(path).to_string_lossy().into_owned()
}

/// Returns `true` for `http://` and `https://` locations.
pub fn is_remote(path: &str) -> bool {
	path.starts_with("http://") || path.starts_with("https://")
}

#[cfg(test)]
mod tests {
	// std
	use std::io::Write;
	// self
	use super::*;

	#[test]
	fn resolve_path_joins_only_relative_paths() {
		let base = Path::new("/etc/app");

		assert_eq!(resolve_path(base, "secrets/token"), "/etc/app/secrets/token");
		assert_eq!(resolve_path(base, "/run/token"), "/run/token");
		assert_eq!(resolve_path(base, "https://vault/ca.pem"), "https://vault/ca.pem");
		assert_eq!(resolve_path(base, ""), "");
	}

	#[test]
	fn local_reader_trims_secrets_and_rejects_remote() {
		let mut file = tempfile::NamedTempFile::new().expect("Temp file should be created.");

		write!(file, "  token-value \n").expect("Temp file should be writable.");

		let path = file.path().to_string_lossy().into_owned();

		assert_eq!(
			LocalReader.read_secret(&path).expect("Local secret should be readable."),
			"token-value"
		);

		let err = LocalReader
			.read_bytes("https://example.com/ca.pem")
			.expect_err("Remote sources should be rejected by the local reader.");

		assert_eq!(err.kind(), ErrorKind::Unsupported);
	}

	#[test]
	fn memory_reader_serves_and_forgets_entries() {
		let reader = MemoryReader::default();

		reader.insert("token", "abc\n");

		assert_eq!(reader.read_secret("token").expect("Stored secret should be readable."), "abc");

		reader.remove("token");

		assert_eq!(
			reader.read_secret("token").expect_err("Removed entries should fail.").kind(),
			ErrorKind::NotFound
		);
	}
}
