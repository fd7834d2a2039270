//! OpenID Connect authorization code flow
//!
//! Discovery, PKCE, token exchange and ID token verification are all done by
//! the `openidconnect` crate; this module wires them to the loopback listener
//! and the system browser.

use openidconnect::core::{
    CoreAuthenticationFlow, CoreClient, CoreProviderMetadata, CoreUserInfoClaims,
};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, DiscoveryError, IssuerUrl, Nonce,
    OAuth2TokenResponse, PkceCodeChallenge, RedirectUrl, Scope, TokenResponse,
};

use crate::model::config::OidcRegistration;

use super::browser::BrowserLauncher;
use super::callback::CallbackListener;
use super::error::{AuthError, from_token_error};
use super::types::{AuthenticationResult, Principal, claims};

/// `openid` is always requested by the authorization request itself
const OPENID_SCOPE: &str = "openid";

pub async fn authenticate(
    provider: &str,
    registration: &OidcRegistration,
    http_client: &reqwest::Client,
    listener: CallbackListener,
    browser: BrowserLauncher,
) -> Result<AuthenticationResult, AuthError> {
    let issuer = IssuerUrl::new(registration.issuer.clone())?;

    // Use OpenID Connect Discovery to fetch the provider metadata.
    let metadata = CoreProviderMetadata::discover_async(issuer, http_client)
        .await
        .map_err(|e| {
            AuthError::Discovery(match e {
                DiscoveryError::Request(inner) => format!("Request error: {inner}"),
                e => format!("{e}"),
            })
        })?;

    let client = CoreClient::from_provider_metadata(
        metadata,
        ClientId::new(registration.client_id.clone()),
        registration.client_secret.clone().map(ClientSecret::new),
    )
    .set_redirect_uri(RedirectUrl::new(listener.redirect_uri().to_string())?);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut auth_request = client.authorize_url(
        CoreAuthenticationFlow::AuthorizationCode,
        CsrfToken::new_random,
        Nonce::new_random,
    );
    for scope in registration.scopes.iter().filter(|s| s.as_str() != OPENID_SCOPE) {
        auth_request = auth_request.add_scope(Scope::new(scope.clone()));
    }
    let (auth_url, csrf_token, nonce) = auth_request.set_pkce_challenge(pkce_challenge).url();

    tracing::info!(provider, "Waiting for the user to complete the browser sign-in");
    browser.launch(&auth_url);

    let code = listener.wait_for_code(csrf_token.secret()).await?;

    let token_response = client
        .exchange_code(AuthorizationCode::new(code))
        .map_err(|e| AuthError::TokenRequest(e.to_string()))?
        .set_pkce_verifier(pkce_verifier)
        .request_async(http_client)
        .await
        .map_err(from_token_error)?;

    let id_token = token_response.id_token().ok_or(AuthError::NotOidc)?;
    let id_claims = id_token
        .claims(&client.id_token_verifier(), &nonce)
        .map_err(|e| AuthError::IdToken(e.to_string()))?;

    let userinfo: Option<CoreUserInfoClaims> = match client.user_info(
        token_response.access_token().to_owned(),
        Some(id_claims.subject().clone()),
    ) {
        Ok(request) => match request.request_async(http_client).await {
            Ok(userinfo) => Some(userinfo),
            Err(e) => {
                tracing::warn!(provider, "Failed to fetch userinfo: {}", e);
                None
            }
        },
        Err(e) => {
            tracing::debug!(provider, "Skipping userinfo: {}", e);
            None
        }
    };

    // ID token claims win; userinfo only fills the gaps
    macro_rules! get_claim {
        ($method:ident) => {
            id_claims
                .$method()
                .or(userinfo.as_ref().and_then(|x| x.$method()))
        };
    }

    let mut principal =
        Principal::new(provider).with_claim(claims::SUBJECT, id_claims.subject().as_str());
    principal.add_claim_if_absent(
        claims::NAME,
        get_claim!(name).and_then(|x| x.get(None)).map(|x| x.as_str()),
    );
    principal.add_claim_if_absent(
        claims::PREFERRED_USERNAME,
        get_claim!(preferred_username).map(|x| x.as_str()),
    );
    principal.add_claim_if_absent(claims::EMAIL, get_claim!(email).map(|x| x.as_str()));

    tracing::debug!(provider, claims = ?principal.claim_names().collect::<Vec<_>>(), "OIDC login completed");

    Ok(AuthenticationResult {
        principal,
        access_token: token_response.access_token().clone(),
        expires_in: token_response.expires_in(),
    })
}
