// self
use crate::{_prelude::*, obs::RefreshKind};

/// Future returned by [`RefreshSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(feature = "tracing")]
pub type InstrumentedRefresh<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`RefreshSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRefresh<F> = F;

/// `rotating_auth.refresh` debug span wrapped around one refresh attempt.
#[derive(Clone, Debug)]
pub struct RefreshSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RefreshSpan {
	/// Opens a span for `kind`; `stage` names the step, such as `client_credentials`.
	pub fn new(kind: RefreshKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::debug_span!("rotating_auth.refresh", kind = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Keeps the span entered until the guard drops. Only for blocking code such as certificate
	/// resolution inside a handshake.
	pub fn entered(self) -> RefreshSpanGuard {
		RefreshSpanGuard {
			#[cfg(feature = "tracing")]
			_entered: self.span.entered(),
		}
	}

	/// Attaches the span to `fut`; it is entered on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRefresh<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Returned by [`RefreshSpan::entered`].
pub struct RefreshSpanGuard {
	#[cfg(feature = "tracing")]
	_entered: tracing::span::EnteredSpan,
}
impl Debug for RefreshSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshSpanGuard").finish_non_exhaustive()
	}
}

/// Emits an `error` event for a refresh whose caller falls back to a degraded value.
pub fn report_refresh_failure(kind: RefreshKind, err: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(kind = kind.as_str(), error = %err, "refresh failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, err);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io::{Error as IoError, ErrorKind};
	// self
	use super::*;

	#[test]
	fn guard_drops_cleanly() {
		let guard = RefreshSpan::new(RefreshKind::ClientCertificate, "load").entered();

		assert_eq!(format!("{guard:?}"), "RefreshSpanGuard { .. }");
	}

	#[tokio::test]
	async fn instrumented_future_keeps_its_output() {
		let span = RefreshSpan::new(RefreshKind::OAuth2Token, "client_credentials");

		assert_eq!(span.instrument(async { "token" }).await, "token");
		assert_eq!(span.instrument(async { 7 }).await, 7);
	}

	#[test]
	fn failure_report_accepts_any_error() {
		report_refresh_failure(
			RefreshKind::AuthHeader,
			&IoError::new(ErrorKind::NotFound, "token file missing"),
		);
	}
}
