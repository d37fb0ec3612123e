//! Logging side channel for lazy refreshes.
//!
//! Refresh failures never reach the request path, so this module is where they surface.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `rotating_auth.refresh` with the `kind` and `stage`
//!   fields, plus an `error` event for every failed refresh.
//! - `metrics` increments the `rotating_auth_refresh_total` counter for every refresh, labeled by
//!   `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Lazily refreshed values observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshKind {
	/// `Authorization` header value.
	AuthHeader,
	/// File-backed TLS client certificate.
	ClientCertificate,
	/// OAuth 2.0 client secret file comparison.
	OAuth2Secret,
	/// OAuth 2.0 access token fetched from the token endpoint.
	OAuth2Token,
}
impl RefreshKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshKind::AuthHeader => "auth_header",
			RefreshKind::ClientCertificate => "client_certificate",
			RefreshKind::OAuth2Secret => "oauth2_secret",
			RefreshKind::OAuth2Token => "oauth2_token",
		}
	}
}
impl Display for RefreshKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// A new value was produced.
	Success,
	/// The refresh failed; the caller got a degraded value.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records `result` and reports failures through the logging side channel.
pub fn observe_refresh<T, E>(kind: RefreshKind, result: &Result<T, E>)
where
	E: StdError,
{
	match result {
		Ok(_) => record_refresh_outcome(kind, RefreshOutcome::Success),
		Err(err) => {
			record_refresh_outcome(kind, RefreshOutcome::Failure);
			report_refresh_failure(kind, err);
		},
	}
}
