//! HTTP handlers for this service.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri};
use axum::{routing, Json, Router};
use axum_extra::extract::CookieJar;
use serde::de::DeserializeOwned;

use super::{
	ActionForm,
	ActionResponse,
	AuthErrorCode,
	AuthService,
	ClientSession,
	CredentialAttempt,
	CredentialsForm,
	CsrfResponse,
	Error,
	ErrorQuery,
	ErrorResponse,
	OAuthCallbackQuery,
	ProvidersResponse,
};
use crate::http::ProblemDetails;

impl From<AuthService> for Router
{
	fn from(svc: AuthService) -> Self
	{
		let mut router = Router::new()
			.route("/csrf", routing::get(get_csrf))
			.route("/providers", routing::get(get_providers))
			.route("/session", routing::get(get_session))
			.route("/callback/credentials", routing::post(callback_credentials))
			.route("/signout", routing::post(signout))
			.route("/error", routing::get(get_error));

		if svc.has_google() {
			router = router
				.route("/signin/google", routing::post(signin_google))
				.route("/callback/google", routing::get(callback_google));
		}

		router.fallback(unknown_action).with_state(svc)
	}
}

/// Parses a form body, treating anything malformed as empty.
fn parse_form<T>(body: &[u8]) -> T
where
	T: DeserializeOwned + Default,
{
	serde_urlencoded::from_bytes(body).unwrap_or_else(|error| {
		tracing::debug!(%error, "ignoring malformed form body");
		T::default()
	})
}

/// Returns the value of the cookie called `name`.
fn cookie_value<'jar>(jar: &'jar CookieJar, name: &str) -> Option<&'jar str>
{
	jar.get(name).map(|cookie| cookie.value())
}

/// Fetch a CSRF token.
///
/// The token is also stored in the CSRF cookie, unless a valid one was
/// already present.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/auth/csrf", tag = "Auth", responses(
  (status = OK, body = CsrfResponse),
))]
pub(crate) async fn get_csrf(
	State(svc): State<AuthService>,
	jar: CookieJar,
) -> (CookieJar, Json<CsrfResponse>)
{
	let spec = &svc.cookies().csrf;
	let (token, is_new) = svc.csrf_token(cookie_value(&jar, &spec.name));
	let res = CsrfResponse { csrf_token: token.token().to_owned() };

	let jar = if is_new { jar.add(spec.build(token.cookie_value())) } else { jar };

	(jar, Json(res))
}

/// List the configured sign-in providers.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/auth/providers", tag = "Auth", responses(
  (status = OK, body = BTreeMap<String, ProviderInfo>),
))]
pub(crate) async fn get_providers(State(svc): State<AuthService>) -> Json<ProvidersResponse>
{
	Json(svc.providers())
}

/// Read the current session.
///
/// Responds with `null` if there is no valid session. A valid session is
/// re-issued with a fresh expiry.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/auth/session", tag = "Auth", responses(
  (status = OK, body = Option<ClientSession>),
))]
pub(crate) async fn get_session(
	State(svc): State<AuthService>,
	jar: CookieJar,
) -> (CookieJar, Json<Option<ClientSession>>)
{
	let spec = &svc.cookies().session;
	let Some(token) = cookie_value(&jar, &spec.name).map(ToOwned::to_owned) else {
		return (jar, Json(None));
	};

	match svc.read_session(&token) {
		Some((session, refreshed)) => (jar.add(svc.session_cookie(refreshed)), Json(Some(session))),
		None => (jar.add(spec.removal()), Json(None)),
	}
}

/// Sign in with an email and password.
///
/// Expects a form with `email`, `password`, `csrfToken` and optionally
/// `callbackUrl`.
#[tracing::instrument(skip_all, err(Debug, level = "debug"))]
#[utoipa::path(post, path = "/auth/callback/credentials", tag = "Auth", responses(
  (status = FOUND, description = "Signed in, or redirected to the error page"),
  (status = OK, body = RedirectBody, description = "With `X-Auth-Return-Redirect: 1`"),
))]
pub(crate) async fn callback_credentials(
	State(svc): State<AuthService>,
	headers: HeaderMap,
	jar: CookieJar,
	body: Bytes,
) -> Result<ActionResponse, ProblemDetails>
{
	let form = parse_form::<CredentialsForm>(&body);
	let csrf_cookie = cookie_value(&jar, &svc.cookies().csrf.name);

	if !svc.verify_csrf(csrf_cookie, form.csrf_token.as_deref()) {
		let url = svc.error_url(AuthErrorCode::MissingCsrf);
		return Ok(ActionResponse::new(&headers, jar, url));
	}

	let callback_url = form
		.callback_url
		.clone()
		.or_else(|| cookie_value(&jar, &svc.cookies().callback_url.name).map(ToOwned::to_owned));

	let attempt = CredentialAttempt { email: form.email, password: form.password };

	let Some(identity) = svc.sign_in_with_credentials(&attempt).await else {
		let url = svc.error_url(AuthErrorCode::CredentialsSignin);
		return Ok(ActionResponse::new(&headers, jar, url));
	};

	let token = svc.issue_session(&identity, None)?;
	let target = svc.redirect_target(callback_url.as_deref());
	let jar = jar
		.add(svc.session_cookie(token))
		.add(svc.cookies().callback_url.build(target.clone()));

	Ok(ActionResponse::new(&headers, jar, target))
}

/// Start signing in with Google.
///
/// Expects a form with `csrfToken` and optionally `callbackUrl`.
#[tracing::instrument(skip_all)]
#[utoipa::path(post, path = "/auth/signin/google", tag = "Auth", responses(
  (status = FOUND, description = "Redirect to Google"),
  (status = OK, body = RedirectBody, description = "With `X-Auth-Return-Redirect: 1`"),
))]
pub(crate) async fn signin_google(
	State(svc): State<AuthService>,
	headers: HeaderMap,
	jar: CookieJar,
	body: Bytes,
) -> ActionResponse
{
	let form = parse_form::<ActionForm>(&body);
	let csrf_cookie = cookie_value(&jar, &svc.cookies().csrf.name);

	if !svc.verify_csrf(csrf_cookie, form.csrf_token.as_deref()) {
		let url = svc.error_url(AuthErrorCode::MissingCsrf);
		return ActionResponse::new(&headers, jar, url);
	}

	let callback_url = svc.redirect_target(form.callback_url.as_deref());
	let (url, state) = match svc.start_google_sign_in(callback_url.clone()) {
		Ok(started) => started,
		Err(error) => {
			tracing::warn!(%error, "failed to start google sign-in");
			let url = svc.error_url(AuthErrorCode::OAuthSignin);
			return ActionResponse::new(&headers, jar, url);
		}
	};

	let jar = jar
		.add(svc.oauth_state_cookie(state))
		.add(svc.cookies().callback_url.build(callback_url));

	ActionResponse::new(&headers, jar, url.into())
}

/// Hit by Google after the user signed in.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/auth/callback/google", tag = "Auth", params(OAuthCallbackQuery), responses(
  (status = FOUND, description = "Signed in, or redirected to the error page"),
))]
pub(crate) async fn callback_google(
	State(svc): State<AuthService>,
	headers: HeaderMap,
	jar: CookieJar,
	Query(query): Query<OAuthCallbackQuery>,
) -> ActionResponse
{
	let state_spec = &svc.cookies().oauth_state;
	let state_cookie = cookie_value(&jar, &state_spec.name).map(ToOwned::to_owned);
	let jar = jar.add(state_spec.removal());

	match svc.finish_google_sign_in(query, state_cookie.as_deref()).await {
		Ok((token, target)) => {
			let jar = jar.add(svc.session_cookie(token));
			ActionResponse::new(&headers, jar, target)
		}
		Err(code) => ActionResponse::new(&headers, jar, svc.error_url(code)),
	}
}

/// Sign out.
///
/// Expects a form with `csrfToken` and optionally `callbackUrl`.
#[tracing::instrument(skip_all)]
#[utoipa::path(post, path = "/auth/signout", tag = "Auth", responses(
  (status = FOUND, description = "Signed out"),
  (status = OK, body = RedirectBody, description = "With `X-Auth-Return-Redirect: 1`"),
))]
pub(crate) async fn signout(
	State(svc): State<AuthService>,
	headers: HeaderMap,
	jar: CookieJar,
	body: Bytes,
) -> ActionResponse
{
	let form = parse_form::<ActionForm>(&body);
	let csrf_cookie = cookie_value(&jar, &svc.cookies().csrf.name);

	if !svc.verify_csrf(csrf_cookie, form.csrf_token.as_deref()) {
		let url = svc.error_url(AuthErrorCode::MissingCsrf);
		return ActionResponse::new(&headers, jar, url);
	}

	let session_spec = &svc.cookies().session;

	if let Some(user_id) = cookie_value(&jar, &session_spec.name)
		.and_then(|token| svc.session_user_id(token))
	{
		tracing::info!(target: "auth_gateway::audit_log", { user.id = %user_id }, "user signed out");
	}

	let target = svc.redirect_target(form.callback_url.as_deref());
	let jar = jar.add(session_spec.removal());

	ActionResponse::new(&headers, jar, target)
}

/// Describe an auth error.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/auth/error", tag = "Auth", params(ErrorQuery), responses(
  (status = BAD_REQUEST, body = ErrorResponse),
))]
pub(crate) async fn get_error(Query(query): Query<ErrorQuery>) -> ErrorResponse
{
	let error = query
		.error
		.as_deref()
		.map_or(AuthErrorCode::Default, AuthErrorCode::parse);

	ErrorResponse { error }
}

/// Any path under `/auth` that is not an action.
#[tracing::instrument]
pub(crate) async fn unknown_action(uri: Uri) -> ProblemDetails
{
	ProblemDetails::from(Error::UnknownAction {
		action: uri.path().trim_start_matches('/').to_owned(),
	})
}
