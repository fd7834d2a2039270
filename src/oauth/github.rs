//! GitHub OAuth App flow
//!
//! GitHub speaks plain OAuth 2.0 (no discovery, no ID token), so identity
//! comes from the REST user endpoint instead.

use oauth2::basic::BasicClient;
use oauth2::{
    AccessToken, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use reqwest::header;

use crate::model::config::GithubRegistration;

use super::browser::BrowserLauncher;
use super::callback::CallbackListener;
use super::error::{AuthError, from_token_error};
use super::types::{AuthenticationResult, GithubUser, Principal, claims};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const USER_AGENT: &str = concat!("oidc-console-client/", env!("CARGO_PKG_VERSION"));

pub async fn authenticate(
    provider: &str,
    registration: &GithubRegistration,
    http_client: &reqwest::Client,
    listener: CallbackListener,
    browser: BrowserLauncher,
) -> Result<AuthenticationResult, AuthError> {
    let client = BasicClient::new(ClientId::new(registration.client_id.clone()))
        .set_client_secret(ClientSecret::new(registration.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(AUTHORIZE_URL.to_string())?)
        .set_token_uri(TokenUrl::new(TOKEN_URL.to_string())?)
        .set_redirect_uri(RedirectUrl::new(listener.redirect_uri().to_string())?);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut auth_request = client.authorize_url(CsrfToken::new_random);
    for scope in &registration.scopes {
        auth_request = auth_request.add_scope(Scope::new(scope.clone()));
    }
    let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

    tracing::info!(provider, "Waiting for the user to complete the browser sign-in");
    browser.launch(&auth_url);

    let code = listener.wait_for_code(csrf_token.secret()).await?;

    let token_response = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(http_client)
        .await
        .map_err(from_token_error)?;

    let user = fetch_user(http_client, token_response.access_token()).await?;
    tracing::debug!(provider, login = %user.login, "GitHub login completed");

    Ok(AuthenticationResult {
        principal: principal_from_user(provider, &user),
        access_token: token_response.access_token().clone(),
        expires_in: token_response.expires_in(),
    })
}

async fn fetch_user(
    http_client: &reqwest::Client,
    access_token: &AccessToken,
) -> Result<GithubUser, AuthError> {
    let response = http_client
        .get(USER_URL)
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, "application/vnd.github+json")
        .bearer_auth(access_token.secret())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::UserInfo(format!("status {}: {}", status, body)));
    }

    Ok(response.json().await?)
}

/// Map a GitHub profile onto standard claims
///
/// GitHub profiles often have no display name; the login stands in for it.
fn principal_from_user(provider: &str, user: &GithubUser) -> Principal {
    let display_name = user
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(user.login.as_str());

    let mut principal = Principal::new(provider)
        .with_claim(claims::SUBJECT, user.id.to_string())
        .with_claim(claims::NAME, display_name)
        .with_claim(claims::PREFERRED_USERNAME, user.login.as_str());
    principal.add_claim_if_absent(claims::EMAIL, user.email.as_deref());
    principal
}
