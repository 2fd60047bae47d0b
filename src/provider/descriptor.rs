//! Provider descriptor data structures and helpers shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant identifiers submitted to the token endpoint.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{_prelude::*, error::ConfigError};

const DISCORD_AUTHORIZATION: &str = "https://discord.com/oauth2/authorize";
const DISCORD_TOKEN: &str = "https://discord.com/api/oauth2/token";
const DISCORD_API: &str = "https://discord.com/api/v10/";
const DISCORD_CDN: &str = "https://cdn.discordapp.com/";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the browser is redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// REST API base; always ends with `/`.
	pub api: Url,
	/// Asset CDN base; always ends with `/`.
	pub cdn: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
}
impl ProviderDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new()
	}

	/// Descriptor for the public Discord deployment (API v10).
	pub fn discord() -> Result<Self, ProviderDescriptorError> {
		let parse = |raw: &str| {
			Url::parse(raw).map_err(|source| ProviderDescriptorError::InvalidUrl { source })
		};

		Self::builder()
			.authorization_endpoint(parse(DISCORD_AUTHORIZATION)?)
			.token_endpoint(parse(DISCORD_TOKEN)?)
			.api_base(parse(DISCORD_API)?)
			.cdn_base(parse(DISCORD_CDN)?)
			.build()
	}

	/// Resolves a relative REST path (e.g. `users/@me`) against the API base.
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		join(&self.endpoints.api, path)
	}

	/// Resolves a relative asset path (e.g. `icons/{id}/{hash}.png`) against the CDN base.
	pub fn cdn_url(&self, path: &str) -> Result<Url, ConfigError> {
		join(&self.endpoints.cdn, path)
	}
}

fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
	base.join(path.trim_start_matches('/'))
		.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn discord_preset_resolves_paths() {
		let descriptor = ProviderDescriptor::discord().expect("Discord preset should build.");

		assert_eq!(
			descriptor.api_url("users/@me/guilds").expect("API path should resolve.").as_str(),
			"https://discord.com/api/v10/users/@me/guilds"
		);
		assert_eq!(
			descriptor
				.api_url("/guilds/1?with_counts=true")
				.expect("API path should resolve.")
				.as_str(),
			"https://discord.com/api/v10/guilds/1?with_counts=true"
		);
		assert_eq!(
			descriptor.cdn_url("icons/1/abc.png").expect("CDN path should resolve.").as_str(),
			"https://cdn.discordapp.com/icons/1/abc.png"
		);
	}
}
