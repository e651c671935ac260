//! Where users may be sent after signing in or out.

/// Resolves a requested redirect target.
///
/// Relative paths are resolved against `base_url`. Absolute URLs are kept if
/// they start with `cors_origin` or `base_url`; anything else falls back to
/// `base_url`.
///
/// The check is a plain string prefix match, so `https://app.example.com`
/// also admits `https://app.example.com.evil.test`. Configure `CORS_ORIGIN`
/// accordingly.
pub fn resolve_redirect(url: &str, base_url: &str, cors_origin: Option<&str>) -> String
{
	if url.starts_with('/') {
		return format!("{base_url}{url}");
	}

	let allowed = cors_origin
		.into_iter()
		.chain([base_url])
		.any(|origin| url.starts_with(origin));

	if allowed { url.to_owned() } else { base_url.to_owned() }
}

#[cfg(test)]
mod tests
{
	use super::*;

	const BASE: &str = "https://api.example.com";
	const CLIENT: Option<&str> = Some("https://app.example.com");

	#[test]
	fn relative_paths_are_joined()
	{
		assert_eq!(resolve_redirect("/dashboard", BASE, CLIENT), "https://api.example.com/dashboard");
		assert_eq!(resolve_redirect("/", BASE, CLIENT), "https://api.example.com/");
	}

	#[test]
	fn known_origins_pass_through()
	{
		assert_eq!(resolve_redirect("https://app.example.com/x", BASE, CLIENT), "https://app.example.com/x");
		assert_eq!(resolve_redirect("https://api.example.com/y?z=1", BASE, CLIENT), "https://api.example.com/y?z=1");
	}

	#[test]
	fn foreign_urls_fall_back_to_base()
	{
		assert_eq!(resolve_redirect("https://evil.test/", BASE, CLIENT), BASE);
		assert_eq!(resolve_redirect("javascript:alert(1)", BASE, CLIENT), BASE);
		assert_eq!(resolve_redirect("", BASE, CLIENT), BASE);
	}

	#[test]
	fn prefix_match_is_textual()
	{
		assert_eq!(
			resolve_redirect("https://app.example.com.evil.test/", BASE, CLIENT),
			"https://app.example.com.evil.test/",
		);
	}

	#[test]
	fn missing_client_origin_only_allows_base()
	{
		assert_eq!(resolve_redirect("https://app.example.com/x", BASE, None), BASE);
		assert_eq!(resolve_redirect("https://api.example.com/x", BASE, None), "https://api.example.com/x");
	}
}
