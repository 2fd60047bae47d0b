//! Session lifecycle and guild aggregation for chat-platform dashboards: exchange authorization
//! codes, validate sessions with a single bounded refresh, and serve TTL-cached mutual guild
//! listings filtered by management permission.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod flows;
pub mod guilds;
pub mod http;
pub mod obs;
pub mod permission;
pub mod provider;
pub mod session;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientCredentials, TokenSecret},
		cache::{CacheSettings, Clock, ManualClock},
		flows::Broker,
		http::ReqwestHttpClient,
		provider::ProviderDescriptor,
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient>;

	/// OAuth client identifier used by test brokers.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// OAuth client secret used by test brokers.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";
	/// Bot credential used by test brokers.
	pub const TEST_BOT_TOKEN: &str = "bot-token-it";
	/// Redirect URI registered for test brokers.
	pub const TEST_REDIRECT_URI: &str = "https://app.example.com/api/auth/callback";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Describes a provider whose endpoints all live under the mock server `base` URL.
	///
	/// Paths mirror the real provider: `/oauth2/authorize`, `/oauth2/token`, `/api/...` and
	/// `/cdn/...`.
	pub fn test_descriptor(base: &str) -> ProviderDescriptor {
		let parse = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Mock provider URL should parse.")
		};

		ProviderDescriptor::builder()
			.authorization_endpoint(parse("/oauth2/authorize"))
			.token_endpoint(parse("/oauth2/token"))
			.api_base(parse("/api/"))
			.cdn_base(parse("/cdn/"))
			.build()
			.expect("Mock provider descriptor should build successfully.")
	}

	/// Client credentials shared by every test broker.
	pub fn test_credentials() -> ClientCredentials {
		ClientCredentials::new(
			TEST_CLIENT_ID,
			TEST_CLIENT_SECRET,
			Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse."),
		)
	}

	/// Constructs a [`Broker`] against `descriptor` with isolated caches driven by `clock`.
	pub fn build_reqwest_test_broker(
		descriptor: ProviderDescriptor,
		clock: Arc<ManualClock>,
	) -> ReqwestTestBroker {
		let clock: Arc<dyn Clock> = clock;

		Broker::with_http_client(
			descriptor,
			test_credentials(),
			TokenSecret::new(TEST_BOT_TOKEN),
			CacheSettings::default(),
			clock,
			test_reqwest_http_client(),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
