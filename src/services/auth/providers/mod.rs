//! The ways users can sign in.

use serde::Serialize;
use url::Url;

pub mod google;
pub use google::GoogleProvider;

/// The provider ID of email and password sign-in.
pub const CREDENTIALS: &str = "credentials";

/// Public information about a sign-in provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo
{
	/// The provider's ID.
	pub id: &'static str,

	/// A human-readable name.
	pub name: &'static str,

	/// The kind of provider.
	#[serde(rename = "type")]
	pub kind: ProviderKind,

	/// Where to start signing in.
	pub signin_url: String,

	/// Where the sign-in flow ends.
	pub callback_url: String,
}

/// The kind of a sign-in provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind
{
	/// Email and password.
	Credentials,

	/// An OAuth 2.0 provider.
	Oauth,
}

impl ProviderInfo
{
	/// Describes a provider served under `auth_base`.
	///
	/// `auth_base` is the URL of the `/auth` routes, without a trailing
	/// slash.
	pub fn new(id: &'static str, name: &'static str, kind: ProviderKind, auth_base: &str) -> Self
	{
		let signin_url = match kind {
			ProviderKind::Credentials => format!("{auth_base}/callback/{id}"),
			ProviderKind::Oauth => format!("{auth_base}/signin/{id}"),
		};

		Self {
			id,
			name,
			kind,
			signin_url,
			callback_url: format!("{auth_base}/callback/{id}"),
		}
	}
}

/// The URL of the `/auth` routes, without a trailing slash.
pub fn auth_base(base_url: &str) -> String
{
	format!("{}/auth", base_url.trim_end_matches('/'))
}

/// The URL Google redirects back to.
pub fn google_callback_url(base_url: &str) -> Result<Url, url::ParseError>
{
	Url::parse(&format!("{}/callback/{}", auth_base(base_url), google::ID))
}
