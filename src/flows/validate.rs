//! Session validation with at most one refresh per call.
//!
//! The validator probes the profile endpoint with the session's access token. Only an HTTP 401
//! with a refresh token present leads to a single refresh grant followed by a single retried
//! probe. Every other failure, including transport errors, ends as
//! [`SessionValidation::Unauthenticated`].
//!
//! Concurrent validations holding the same refresh token share one in-flight grant: the first
//! caller performs it while the others wait on a per-token guard and reuse its outcome. A
//! successful grant stays reusable for the configured grace period, so a request that arrives
//! just after the refresh with the same stale session does not replay a consumed refresh token.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	api::{Credential, ProviderApi},
	auth::TokenSecret,
	cache::{Clock, TtlCache},
	flows::{Broker, TokenExchanger},
	http::ProviderHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{AuthenticatedSession, Session, SessionValidation, TokenGrant, User},
};

const PROFILE_ENDPOINT: &str = "users/@me";

type FlightGuards = Mutex<HashMap<String, Arc<AsyncMutex<RefreshFlight>>>>;

enum RefreshFlight {
	Pending,
	Finished(Option<TokenGrant>),
}

/// Drives the probe / refresh / re-probe state machine.
pub struct SessionValidator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	api: Arc<ProviderApi<C>>,
	exchanger: Arc<TokenExchanger<C>>,
	refresh_metrics: Arc<RefreshMetrics>,
	flights: FlightGuards,
	recent_grants: TtlCache<String, TokenGrant>,
}
impl<C> SessionValidator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a validator sharing `api` and `exchanger`.
	///
	/// Successful refresh grants are reused for `grace` after they complete.
	pub fn new(
		api: Arc<ProviderApi<C>>,
		exchanger: Arc<TokenExchanger<C>>,
		grace: Duration,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			api,
			exchanger,
			refresh_metrics: Default::default(),
			flights: Default::default(),
			recent_grants: TtlCache::new(grace, clock),
		}
	}

	/// Counters for refresh grants issued by this validator.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Validates `session`, refreshing it at most once.
	pub async fn validate(&self, session: Option<&Session>) -> SessionValidation {
		let Some(session) = session else {
			return SessionValidation::Unauthenticated;
		};
		let err = match self.fetch_profile(session.access_token()).await {
			Ok(user) => return authenticated(user, session.clone(), false),
			Err(err) => err,
		};

		if !err.is_unauthorized() {
			tracing::debug!(error = %err, "Profile probe failed without a 401.");

			return SessionValidation::Unauthenticated;
		}

		let Some(refresh_token) = session.refresh_token() else {
			tracing::debug!("Access token rejected and no refresh token is available.");

			return SessionValidation::Unauthenticated;
		};
		let Some(refreshed) = self.refresh_shared(session, refresh_token).await else {
			return SessionValidation::Unauthenticated;
		};

		match self.fetch_profile(refreshed.access_token()).await {
			Ok(user) => authenticated(user, refreshed, true),
			Err(err) => {
				tracing::warn!(error = %err, "Profile probe failed after a successful refresh.");

				SessionValidation::Unauthenticated
			},
		}
	}

	async fn fetch_profile(&self, access_token: &TokenSecret) -> Result<User> {
		let credential = Credential::Bearer(access_token);

		self.api.get_json(PROFILE_ENDPOINT, PROFILE_ENDPOINT, credential).await
	}

	async fn refresh_shared(
		&self,
		session: &Session,
		refresh_token: &TokenSecret,
	) -> Option<Session> {
		let key = refresh_token.fingerprint();
		let flight = self
			.flights
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(RefreshFlight::Pending)))
			.clone();
		let grant = {
			let mut state = flight.lock().await;

			match &*state {
				RefreshFlight::Finished(grant) => {
					self.refresh_metrics.record_shared();

					grant.clone()
				},
				RefreshFlight::Pending => {
					let grant = match self.recent_grants.get(&key) {
						Some(grant) => {
							self.refresh_metrics.record_shared();

							Some(grant)
						},
						None => {
							let grant = self.refresh(refresh_token).await;

							if let Some(grant) = &grant {
								self.recent_grants.set(key.clone(), grant.clone());
							}

							grant
						},
					};

					*state = RefreshFlight::Finished(grant.clone());

					grant
				},
			}
		};

		self.release_flight(&key, &flight);

		grant.map(|grant| grant.into_refreshed_session(session))
	}

	async fn refresh(&self, refresh_token: &TokenSecret) -> Option<TokenGrant> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");
		let redirect_uri = &self.exchanger.credentials().redirect_uri;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		match span.instrument(self.exchanger.refresh(refresh_token, redirect_uri)).await {
			Ok(grant) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.refresh_metrics.record_success();

				Some(grant)
			},
			Err(err) => {
				tracing::warn!(error = %err, "Refresh grant failed.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.refresh_metrics.record_failure();

				None
			},
		}
	}

	fn release_flight(&self, key: &str, flight: &Arc<AsyncMutex<RefreshFlight>>) {
		let mut flights = self.flights.lock();

		if flights.get(key).is_some_and(|current| Arc::ptr_eq(current, flight)) {
			flights.remove(key);
		}
	}
}
impl<C> Debug for SessionValidator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionValidator")
			.field("refresh_metrics", &self.refresh_metrics)
			.field("in_flight_refreshes", &self.flights.lock().len())
			.field("recent_grants", &self.recent_grants)
			.finish()
	}
}

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Checks whether `session` is still usable, repairing it with at most one refresh.
	///
	/// Never fails: transport, grant, and response errors all resolve to
	/// [`SessionValidation::Unauthenticated`]. When the session was refreshed the returned
	/// [`AuthenticatedSession::refreshed`] flag is set and the caller must store the new
	/// session.
	pub async fn validate_session(&self, session: Option<&Session>) -> SessionValidation {
		const KIND: FlowKind = FlowKind::Validate;

		let span = FlowSpan::new(KIND, "validate_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let outcome = span.instrument(self.validator.validate(session)).await;

		obs::record_flow_outcome(
			KIND,
			if outcome.is_authenticated() { FlowOutcome::Success } else { FlowOutcome::Failure },
		);

		outcome
	}

	/// Counters for refresh grants issued during validation.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.validator.refresh_metrics()
	}
}

fn authenticated(user: User, session: Session, refreshed: bool) -> SessionValidation {
	SessionValidation::Authenticated(AuthenticatedSession { user, session, refreshed })
}
