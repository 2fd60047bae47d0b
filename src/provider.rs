//! Provider-facing descriptors.
//!
//! [`ProviderDescriptor`] carries the validated endpoint set the broker talks to: the browser
//! authorization URL, the token endpoint, the REST API base, and the CDN base used to
//! synthesize icon and avatar URLs.

pub mod descriptor;

pub use descriptor::*;
