//! Bounded-staleness memoization shared by header, certificate, and OAuth 2.0 secret refreshes.
//!
//! [`Memoized`] keeps the last produced value together with a deadline. Reads inside the window
//! return the cached value; the first read after the deadline runs the refresh function while
//! holding the lock, so concurrent readers wait for and observe that single refresh instead of
//! stampeding the producer.

// std
use std::{
	convert::Infallible,
	time::{Duration as StdDuration, Instant},
};
// self
use crate::_prelude::*;

/// Default staleness bound applied to every memoized value.
pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(1);

struct Entry<T> {
	value: T,
	deadline: Instant,
}

/// Value cached for at most `ttl` after it was produced.
pub struct Memoized<T> {
	ttl: StdDuration,
	state: AsyncMutex<Option<Entry<T>>>,
}
impl<T> Memoized<T>
where
	T: Clone,
{
	/// Creates an empty cache with [`DEFAULT_TTL`].
	pub fn new() -> Self {
		Self::with_ttl(DEFAULT_TTL)
	}

	/// Creates an empty cache with a custom time-to-live.
	pub fn with_ttl(ttl: StdDuration) -> Self {
		Self { ttl, state: AsyncMutex::new(None) }
	}

	/// Creates a cache that already holds `value`, fresh for one window.
	pub fn seeded(value: T, ttl: StdDuration) -> Self {
		let deadline = Instant::now() + ttl;

		Self { ttl, state: AsyncMutex::new(Some(Entry { value, deadline })) }
	}

	/// Time-to-live applied after each refresh.
	pub fn ttl(&self) -> StdDuration {
		self.ttl
	}

	/// Returns the cached value or runs `refresh` once the window elapsed.
	///
	/// `refresh` receives the previous value, if any. On error the cache stays untouched, so the
	/// next call retries.
	pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<T, E>
	where
		F: FnOnce(Option<T>) -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let mut state = self.state.lock().await;

		if let Some(entry) = state.as_ref().filter(|entry| Instant::now() <= entry.deadline) {
			return Ok(entry.value.clone());
		}

		let previous = state.as_ref().map(|entry| entry.value.clone());
		let value = refresh(previous).await?;

		*state = Some(Entry { value: value.clone(), deadline: Instant::now() + self.ttl });

		Ok(value)
	}

	/// Infallible flavor of [`get_or_refresh`](Self::get_or_refresh).
	pub async fn get_or_compute<F, Fut>(&self, compute: F) -> T
	where
		F: FnOnce(Option<T>) -> Fut,
		Fut: Future<Output = T>,
	{
		let result = self
			.get_or_refresh(|previous| {
				let fut = compute(previous);

				async move { Ok::<_, Infallible>(fut.await) }
			})
			.await;

		match result {
			Ok(value) => value,
			Err(never) => match never {},
		}
	}

	/// Synchronous flavor for callers that cannot await, such as TLS certificate resolution.
	pub fn get_or_refresh_blocking<F, E>(&self, refresh: F) -> Result<T, E>
	where
		F: FnOnce(Option<T>) -> Result<T, E>,
	{
		let mut state = self.state.lock_blocking();

		if let Some(entry) = state.as_ref().filter(|entry| Instant::now() <= entry.deadline) {
			return Ok(entry.value.clone());
		}

		let previous = state.as_ref().map(|entry| entry.value.clone());
		let value = refresh(previous)?;

		*state = Some(Entry { value: value.clone(), deadline: Instant::now() + self.ttl });

		Ok(value)
	}
}
impl<T> Default for Memoized<T>
where
	T: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<T> Debug for Memoized<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Memoized").field("ttl", &self.ttl).finish_non_exhaustive()
	}
}
