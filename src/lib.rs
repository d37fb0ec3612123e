//! Declarative HTTP client authentication and TLS material that rotates in place.
//!
//! A [`RuntimeConfig`](runtime::RuntimeConfig) is resolved once from a declarative
//! [`HttpClientConfig`](config::HttpClientConfig) and then hands out `Authorization` header values
//! and rustls client configurations whose secrets, OAuth 2.0 tokens, and client certificates are
//! refreshed lazily with a bounded staleness window.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod credential;
pub mod digest;
pub mod error;
pub mod headers;
pub mod http;
pub mod memo;
pub mod oauth;
pub mod obs;
pub mod runtime;
pub mod secret;
pub mod source;
pub mod tls;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hasher,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use rustls;
pub use url;

pub use config::{
	Authorization, BasicAuthConfig, HttpClientConfig, OAuth2Config, ProxyClientConfig, TlsConfig,
};
pub use runtime::{RuntimeConfig, RuntimeConfigBuilder};
pub use secret::Secret;

#[cfg(test)] use {color_eyre as _, httpmock as _, rcgen as _, tempfile as _, tokio as _};
