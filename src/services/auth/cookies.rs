//! Cookie names and attributes.
//!
//! Everything about the auth cookies is derived from three deployment
//! settings: the URL the gateway is served under, the origin of the client
//! application, and an optional explicit cookie domain. See
//! [`CookiePolicy::resolve()`].

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;
use url::Url;

/// Name of the session cookie, before prefixing.
const SESSION_TOKEN: &str = "session-token";

/// Name of the callback URL cookie, before prefixing.
const CALLBACK_URL: &str = "callback-url";

/// Name of the CSRF cookie, before prefixing.
const CSRF_TOKEN: &str = "csrf-token";

/// Name of the OAuth state cookie, before prefixing.
const OAUTH_STATE: &str = "oauth-state";

/// The name and attributes of a single cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec
{
	/// The cookie's name, including any `__Secure-` / `__Host-` prefix.
	pub name: String,

	/// Always `true`.
	pub http_only: bool,

	/// `Lax`, or `None` when the client lives on another site.
	pub same_site: SameSite,

	/// Whether the cookie is only sent over HTTPS.
	pub secure: bool,

	/// Always `/`.
	pub path: &'static str,

	/// The `Domain` attribute.
	pub domain: Option<String>,
}

impl CookieSpec
{
	/// Creates a cookie with this spec and the given value.
	pub fn build(&self, value: impl Into<String>) -> Cookie<'static>
	{
		let mut builder = Cookie::build((self.name.clone(), value.into()))
			.http_only(self.http_only)
			.same_site(self.same_site)
			.secure(self.secure)
			.path(self.path);

		if let Some(domain) = &self.domain {
			builder = builder.domain(domain.clone());
		}

		builder.build()
	}

	/// Creates a cookie with this spec that expires after `max_age`.
	pub fn build_with_max_age(&self, value: impl Into<String>, max_age: Duration) -> Cookie<'static>
	{
		let mut cookie = self.build(value);
		cookie.set_max_age(max_age);
		cookie
	}

	/// Creates a cookie that tells the browser to delete this one.
	///
	/// Browsers only delete a cookie if name, path and domain match, so the
	/// removal carries the same attributes.
	pub fn removal(&self) -> Cookie<'static>
	{
		self.build_with_max_age("", Duration::ZERO)
	}
}

/// The full set of auth cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy
{
	/// Carries the signed session token.
	pub session: CookieSpec,

	/// Remembers where to send the user after signing in.
	pub callback_url: CookieSpec,

	/// Carries the CSRF token and its hash.
	pub csrf: CookieSpec,

	/// Carries the signed OAuth state between the sign-in redirect and the
	/// provider callback.
	pub oauth_state: CookieSpec,
}

impl CookiePolicy
{
	/// Derives every cookie's name and attributes.
	///
	/// - Cookies are `Secure` exactly when `auth_url` is `https`.
	/// - They are `SameSite=None` when additionally `cors_origin` is a
	///   different origin than `auth_url`, otherwise `Lax`. Origins that fail
	///   to parse never count as cross-site.
	/// - Secure cookies get the `__Secure-` prefix. The CSRF cookie instead
	///   gets `__Host-` if no `cookie_domain` is set, since a `__Host-`
	///   cookie must not carry a `Domain`.
	pub fn resolve(auth_url: &str, cors_origin: Option<&str>, cookie_domain: Option<&str>) -> Self
	{
		let is_secure = auth_url.starts_with("https://");
		let auth_origin = parse_origin(auth_url);
		let cors_origin = cors_origin.and_then(parse_origin);

		let is_cross_site = match (&auth_origin, &cors_origin) {
			(Some(auth), Some(cors)) => auth != cors,
			_ => false,
		};

		let same_site = if is_secure && is_cross_site { SameSite::None } else { SameSite::Lax };
		let cookie_prefix = if is_secure { "__Secure-" } else { "" };
		let use_host_prefix = is_secure && cookie_domain.is_none();
		let csrf_prefix = if use_host_prefix { "__Host-" } else { cookie_prefix };

		let spec = |prefix: &str, name: &str, domain: Option<&str>| CookieSpec {
			name: format!("{prefix}{name}"),
			http_only: true,
			same_site,
			secure: is_secure,
			path: "/",
			domain: domain.map(ToOwned::to_owned),
		};

		Self {
			session: spec(cookie_prefix, SESSION_TOKEN, cookie_domain),
			callback_url: spec(cookie_prefix, CALLBACK_URL, cookie_domain),
			csrf: spec(csrf_prefix, CSRF_TOKEN, cookie_domain.filter(|_| !use_host_prefix)),
			oauth_state: spec(cookie_prefix, OAUTH_STATE, cookie_domain),
		}
	}
}

/// Parses a URL and returns its serialized origin.
fn parse_origin(url: &str) -> Option<String>
{
	Url::parse(url)
		.ok()
		.map(|url| url.origin().ascii_serialization())
}
