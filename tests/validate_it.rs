#![cfg(all(feature = "reqwest", feature = "test"))]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use guild_broker::{
	_preludet::*,
	cache::ManualClock,
	provider::ProviderDescriptor,
	session::{Session, SessionValidation},
};

const PROFILE: &str = r#"{
	"id": "80351110224678912",
	"username": "nelly",
	"discriminator": "0",
	"avatar": null,
	"email": "nelly@example.com"
}"#;
const UNAUTHORIZED: &str = r#"{"message":"401: Unauthorized","code":0}"#;

fn broker(base: &str) -> ReqwestTestBroker {
	build_reqwest_test_broker(test_descriptor(base), Arc::new(ManualClock::default()))
}

fn session(access: &str, refresh: Option<&str>) -> Session {
	Session::from_parts(Some(access), refresh).expect("Session fixture should be valid.")
}

async fn mock_profile<'a>(server: &'a MockServer, token: &str, status: u16) -> httpmock::Mock<'a> {
	let authorization = format!("Bearer {token}");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/users/@me").header("authorization", authorization);

			if status == 200 {
				then.status(200).header("content-type", "application/json").body(PROFILE);
			} else {
				then.status(status).header("content-type", "application/json").body(UNAUTHORIZED);
			}
		})
		.await
}

async fn mock_refresh<'a>(server: &'a MockServer, refresh: &str, body: &str) -> httpmock::Mock<'a> {
	let refresh = refresh.to_owned();
	let body = body.to_owned();

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", refresh)
				.form_urlencoded_tuple("redirect_uri", TEST_REDIRECT_URI);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

#[tokio::test]
async fn missing_session_is_unauthenticated_without_calls() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let profile = mock_profile(&server, "a1", 200).await;

	assert_eq!(broker.validate_session(None).await, SessionValidation::Unauthenticated);
	assert!(Session::from_parts(Some(""), Some("r1")).is_none());

	profile.assert_calls_async(0).await;
}

#[tokio::test]
async fn valid_session_is_returned_unchanged() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let profile = mock_profile(&server, "a1", 200).await;
	let input = session("a1", Some("r1"));
	let outcome = broker.validate_session(Some(&input)).await;
	let authenticated = outcome.authenticated().expect("Valid session should authenticate.");

	profile.assert_calls_async(1).await;

	assert_eq!(authenticated.session, input);
	assert!(!authenticated.refreshed);
	assert_eq!(authenticated.user.username, "nelly");
	assert_eq!(authenticated.user.email.as_deref(), Some("nelly@example.com"));
	assert_eq!(broker.refresh_metrics().attempts(), 0);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_once() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let stale = mock_profile(&server, "a1", 401).await;
	let fresh = mock_profile(&server, "a2", 200).await;
	let refresh = mock_refresh(
		&server,
		"r1",
		r#"{"access_token":"a2","refresh_token":"r2","expires_in":604800}"#,
	)
	.await;
	let outcome = broker.validate_session(Some(&session("a1", Some("r1")))).await;
	let authenticated = outcome.authenticated().expect("Refreshed session should authenticate.");

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert!(authenticated.refreshed);
	assert_eq!(authenticated.session.access_token().expose(), "a2");
	assert_eq!(authenticated.session.refresh_token().map(|secret| secret.expose()), Some("r2"));
	assert_eq!(broker.refresh_metrics().successes(), 1);
}

#[tokio::test]
async fn refresh_without_rotation_keeps_the_refresh_token() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());

	mock_profile(&server, "a1", 401).await;
	mock_profile(&server, "a2", 200).await;
	mock_refresh(&server, "r1", "{\"access_token\":\"a2\"}").await;

	let outcome = broker.validate_session(Some(&session("a1", Some("r1")))).await;
	let authenticated = outcome.authenticated().expect("Refreshed session should authenticate.");

	assert_eq!(authenticated.session.access_token().expose(), "a2");
	assert_eq!(authenticated.session.refresh_token().map(|secret| secret.expose()), Some("r1"));
}

#[tokio::test]
async fn refresh_is_attempted_at_most_once_per_validation() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let first = mock_profile(&server, "a1", 401).await;
	let second = mock_profile(&server, "a2", 401).await;
	let refresh =
		mock_refresh(&server, "r1", "{\"access_token\":\"a2\",\"refresh_token\":\"r2\"}").await;

	assert_eq!(
		broker.validate_session(Some(&session("a1", Some("r1")))).await,
		SessionValidation::Unauthenticated
	);

	refresh.assert_calls_async(1).await;
	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;

	assert_eq!(broker.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn unauthorized_without_refresh_token_skips_refresh() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let profile = mock_profile(&server, "a1", 401).await;
	let refresh = mock_refresh(&server, "r1", "{\"access_token\":\"a2\"}").await;

	assert_eq!(
		broker.validate_session(Some(&session("a1", None))).await,
		SessionValidation::Unauthenticated
	);

	profile.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn non_401_failures_do_not_refresh() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let profile = mock_profile(&server, "a1", 500).await;
	let refresh = mock_refresh(&server, "r1", "{\"access_token\":\"a2\"}").await;

	assert_eq!(
		broker.validate_session(Some(&session("a1", Some("r1")))).await,
		SessionValidation::Unauthenticated
	);

	profile.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_refresh_is_unauthenticated() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());

	mock_profile(&server, "a1", 401).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;

	assert_eq!(
		broker.validate_session(Some(&session("a1", Some("r1")))).await,
		SessionValidation::Unauthenticated
	);

	refresh.assert_calls_async(1).await;

	assert_eq!(broker.refresh_metrics().failures(), 1);
}

#[tokio::test]
async fn transport_failures_are_unauthenticated() {
	// Nothing listens on the discard port.
	let broker = broker("http://127.0.0.1:9");

	assert_eq!(
		broker.validate_session(Some(&session("a1", Some("r1")))).await,
		SessionValidation::Unauthenticated
	);
}

#[tokio::test]
async fn refresh_transport_failure_is_unauthenticated() {
	let server = MockServer::start_async().await;
	let parse = |raw: &str| Url::parse(raw).expect("Descriptor URL should parse.");
	// Nothing listens on the discard port.
	let descriptor = ProviderDescriptor::builder()
		.authorization_endpoint(parse(&server.url("/oauth2/authorize")))
		.token_endpoint(parse("http://127.0.0.1:9/oauth2/token"))
		.api_base(parse(&server.url("/api/")))
		.cdn_base(parse(&server.url("/cdn/")))
		.build()
		.expect("Descriptor should build.");
	let broker = build_reqwest_test_broker(descriptor, Arc::new(ManualClock::default()));
	let stale = mock_profile(&server, "a1", 401).await;
	let fresh = mock_profile(&server, "a2", 200).await;

	assert_eq!(
		broker.validate_session(Some(&session("a1", Some("r1")))).await,
		SessionValidation::Unauthenticated
	);

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(0).await;

	assert_eq!(broker.refresh_metrics().attempts(), 1);
	assert_eq!(broker.refresh_metrics().failures(), 1);
}

#[tokio::test]
async fn refresh_without_access_token_is_unauthenticated() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());
	let stale = mock_profile(&server, "a1", 401).await;
	let fresh = mock_profile(&server, "a2", 200).await;
	let refresh = mock_refresh(&server, "r1", "{\"refresh_token\":\"r2\"}").await;

	assert_eq!(
		broker.validate_session(Some(&session("a1", Some("r1")))).await,
		SessionValidation::Unauthenticated
	);

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(0).await;

	assert_eq!(broker.refresh_metrics().failures(), 1);
	assert_eq!(broker.refresh_metrics().successes(), 0);
}

#[tokio::test]
async fn recent_refresh_is_reused_within_grace_period() {
	let server = MockServer::start_async().await;
	let clock = Arc::new(ManualClock::default());
	let broker = build_reqwest_test_broker(test_descriptor(&server.base_url()), clock.clone());
	let stale = mock_profile(&server, "a1", 401).await;
	let fresh = mock_profile(&server, "a2", 200).await;
	let refresh =
		mock_refresh(&server, "r1", "{\"access_token\":\"a2\",\"refresh_token\":\"r2\"}").await;
	let input = session("a1", Some("r1"));
	let first = broker.validate_session(Some(&input)).await;
	let second = broker.validate_session(Some(&input)).await;
	let first = first.authenticated().expect("First validation should authenticate.");
	let second = second.authenticated().expect("Second validation should authenticate.");

	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(2).await;
	fresh.assert_calls_async(2).await;

	assert!(second.refreshed);
	assert_eq!(first.session, second.session);
	assert_eq!(broker.refresh_metrics().attempts(), 1);
	assert_eq!(broker.refresh_metrics().shared(), 1);

	clock.advance(Duration::seconds(10));

	assert!(broker.validate_session(Some(&input)).await.is_authenticated());

	refresh.assert_calls_async(2).await;

	assert_eq!(broker.refresh_metrics().attempts(), 2);
}

#[tokio::test]
async fn failed_refresh_is_not_reused() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());

	mock_profile(&server, "a1", 401).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let input = session("a1", Some("r1"));

	for _ in 0..2 {
		assert_eq!(
			broker.validate_session(Some(&input)).await,
			SessionValidation::Unauthenticated
		);
	}

	refresh.assert_calls_async(2).await;

	assert_eq!(broker.refresh_metrics().failures(), 2);
	assert_eq!(broker.refresh_metrics().shared(), 0);
}

#[tokio::test]
async fn concurrent_validations_share_one_refresh() {
	let server = MockServer::start_async().await;
	let broker = broker(&server.base_url());

	mock_profile(&server, "a1", 401).await;
	mock_profile(&server, "a2", 200).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").form_urlencoded_tuple("refresh_token", "r1");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(300))
				.body("{\"access_token\":\"a2\",\"refresh_token\":\"r2\"}");
		})
		.await;
	let input = session("a1", Some("r1"));
	let (first, second) =
		tokio::join!(broker.validate_session(Some(&input)), broker.validate_session(Some(&input)));
	let first = first.authenticated().expect("First validation should authenticate.").clone();
	let second = second.authenticated().expect("Second validation should authenticate.").clone();

	refresh.assert_calls_async(1).await;

	assert_eq!(first.session, second.session);
	assert_eq!(first.session.refresh_token().map(|secret| secret.expose()), Some("r2"));
	assert_eq!(broker.refresh_metrics().attempts(), 1);
	assert_eq!(broker.refresh_metrics().shared(), 1);
}
