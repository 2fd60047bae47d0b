//! Session credentials, token grants, and validation outcomes.
//!
//! A [`Session`] is owned by the caller (typically a cookie layer). The broker never stores
//! it; every operation that changes credentials returns a new value the caller persists.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret, UserId},
	error::ConfigError,
	provider::ProviderDescriptor,
};

/// Access/refresh credential pair carried by an authenticated client.
///
/// The access token is never empty. Both tokens are replaced together when a grant
/// succeeds.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
	access_token: TokenSecret,
	refresh_token: Option<TokenSecret>,
}
impl Session {
	/// Rebuilds a session from raw stored values.
	///
	/// Returns `None` when the access token is absent or empty. An empty refresh token is
	/// treated as absent.
	pub fn from_parts(access_token: Option<&str>, refresh_token: Option<&str>) -> Option<Self> {
		let access_token = access_token.filter(|token| !token.is_empty())?;
		let refresh_token = refresh_token.filter(|token| !token.is_empty()).map(TokenSecret::new);

		Some(Self { access_token: TokenSecret::new(access_token), refresh_token })
	}

	/// Bearer credential for API calls.
	pub fn access_token(&self) -> &TokenSecret {
		&self.access_token
	}

	/// Refresh credential, when the provider issued one.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("access_token", &self.access_token)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}

/// Successful token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
	/// Newly issued access token; never empty.
	pub access_token: TokenSecret,
	/// Newly issued refresh token, if any.
	pub refresh_token: Option<TokenSecret>,
	/// Access token lifetime reported by the provider.
	pub expires_in: Option<Duration>,
	/// Scopes granted, when echoed back by the provider.
	pub scope: Option<ScopeSet>,
}
impl TokenGrant {
	/// Builds a session from a first-time grant.
	pub fn into_session(self) -> Session {
		Session { access_token: self.access_token, refresh_token: self.refresh_token }
	}

	/// Builds the session replacing `previous` after a refresh grant.
	///
	/// Providers that do not rotate refresh tokens omit `refresh_token`; the previous one is
	/// carried over so the new session can still be refreshed.
	pub fn into_refreshed_session(self, previous: &Session) -> Session {
		let refresh_token = self.refresh_token.or_else(|| previous.refresh_token.clone());

		Session { access_token: self.access_token, refresh_token }
	}
}

/// Profile returned by the provider's "who am I" endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Snowflake identifier.
	pub id: UserId,
	/// Account username.
	pub username: String,
	/// Legacy four-digit discriminator (`"0"` for migrated accounts).
	#[serde(default)]
	pub discriminator: Option<String>,
	/// Display name, when set.
	#[serde(default)]
	pub global_name: Option<String>,
	/// Avatar hash, when the user uploaded one.
	#[serde(default)]
	pub avatar: Option<String>,
	/// Verified email; requires the `email` scope.
	#[serde(default)]
	pub email: Option<String>,
}
impl User {
	/// CDN URL of the user's avatar, falling back to the default avatar set.
	pub fn avatar_url(&self, descriptor: &ProviderDescriptor) -> Result<Url, ConfigError> {
		match self.avatar.as_deref() {
			Some(hash) => descriptor.cdn_url(&format!("avatars/{}/{hash}.png?size=512", self.id)),
			None => {
				let index = self
					.discriminator
					.as_deref()
					.and_then(|raw| raw.parse::<u32>().ok())
					.map_or(0, |discriminator| discriminator % 5);

				descriptor.cdn_url(&format!("embed/avatars/{index}.png"))
			},
		}
	}
}

/// Result of [`Broker::validate_session`](crate::flows::Broker::validate_session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionValidation {
	/// The session is usable.
	Authenticated(AuthenticatedSession),
	/// The session is missing, rejected, or could not be repaired by one refresh.
	Unauthenticated,
}
impl SessionValidation {
	/// Returns `true` for [`SessionValidation::Authenticated`].
	pub fn is_authenticated(&self) -> bool {
		matches!(self, Self::Authenticated(_))
	}

	/// Borrows the authenticated payload, if any.
	pub fn authenticated(&self) -> Option<&AuthenticatedSession> {
		match self {
			Self::Authenticated(authenticated) => Some(authenticated),
			Self::Unauthenticated => None,
		}
	}
}

/// Profile plus the session that proved it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedSession {
	/// Profile of the session owner.
	pub user: User,
	/// Session to keep using; differs from the input when `refreshed` is set.
	pub session: Session,
	/// `true` when the session was repaired by a refresh and must be re-stored.
	pub refreshed: bool,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn grant(access: &str, refresh: Option<&str>) -> TokenGrant {
		TokenGrant {
			access_token: TokenSecret::new(access),
			refresh_token: refresh.map(TokenSecret::new),
			expires_in: None,
			scope: None,
		}
	}

	fn user(avatar: Option<&str>, discriminator: Option<&str>) -> User {
		User {
			id: UserId::new("80351110224678912").expect("User id should be valid."),
			username: "nelly".into(),
			discriminator: discriminator.map(Into::into),
			global_name: None,
			avatar: avatar.map(Into::into),
			email: None,
		}
	}

	#[test]
	fn sessions_require_an_access_token() {
		assert!(Session::from_parts(None, Some("r1")).is_none());
		assert!(Session::from_parts(Some(""), Some("r1")).is_none());

		let session = Session::from_parts(Some("a1"), Some(""))
			.expect("Non-empty access token should build.");

		assert_eq!(session.access_token().expose(), "a1");
		assert!(session.refresh_token().is_none());
	}

	#[test]
	fn refresh_without_rotation_keeps_previous_refresh_token() {
		let previous = grant("a1", Some("r1")).into_session();
		let rotated = grant("a2", Some("r2")).into_refreshed_session(&previous);
		let kept = grant("a3", None).into_refreshed_session(&previous);

		assert_eq!(rotated.refresh_token().map(TokenSecret::expose), Some("r2"));
		assert_eq!(kept.access_token().expose(), "a3");
		assert_eq!(kept.refresh_token().map(TokenSecret::expose), Some("r1"));
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let session = grant("super-secret", Some("also-secret")).into_session();
		let rendered = format!("{session:?}");

		assert!(!rendered.contains("super-secret"));
		assert!(!rendered.contains("also-secret"));
	}

	#[test]
	fn avatar_urls_follow_cdn_layout() {
		let descriptor = ProviderDescriptor::discord().expect("Discord preset should build.");

		let avatar = |profile: User| {
			profile.avatar_url(&descriptor).expect("Avatar URL should resolve.").to_string()
		};

		assert_eq!(
			avatar(user(Some("8342729096ea3675442027381ff50dfe"), Some("0"))),
			concat!(
				"https://cdn.discordapp.com/avatars/80351110224678912/",
				"8342729096ea3675442027381ff50dfe.png?size=512"
			)
		);
		assert_eq!(
			avatar(user(None, Some("1337"))),
			"https://cdn.discordapp.com/embed/avatars/2.png"
		);
		assert_eq!(avatar(user(None, None)), "https://cdn.discordapp.com/embed/avatars/0.png");
	}

	#[test]
	fn user_profile_tolerates_missing_optional_fields() {
		let user: User = serde_json::from_str(r#"{"id":"42","username":"nelly","bot":false}"#)
			.expect("Minimal profile should decode.");

		assert_eq!(&*user.id, "42");
		assert!(user.avatar.is_none());
	}
}
