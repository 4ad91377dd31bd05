//! Third-party identity providers: the hosted-login userinfo endpoint and
//! Google ID-token verification.

use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum UserInfoError {
    #[error("userinfo returned {0}")]
    Status(StatusCode),
    #[error("userinfo request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Resolves the email behind a provider-issued bearer token via
/// `https://<domain>/userinfo`. Retries only on 429.
pub async fn userinfo_email(
    http: &reqwest::Client,
    domain: &str,
    bearer: &str,
) -> anyhow::Result<String> {
    let policy = RetryPolicy::identity();
    let url = format!("https://{}/userinfo", domain.trim_end_matches('/'));

    let info = policy
        .run(
            |attempt| {
                let mut req = http.get(&url).bearer_auth(bearer);
                if let Some(t) = policy.timeout {
                    req = req.timeout(t);
                }
                async move {
                    debug!(attempt, "fetching userinfo");
                    let res = req.send().await?;
                    if !res.status().is_success() {
                        return Err(UserInfoError::Status(res.status()));
                    }
                    Ok::<_, UserInfoError>(res.json::<UserInfo>().await?)
                }
            },
            |e| matches!(e, UserInfoError::Status(s) if *s == StatusCode::TOO_MANY_REQUESTS),
        )
        .await?;

    info.email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .context("userinfo has no email")
}

/// Claims of a verified Google ID token that sign-in uses.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies a Google ID token with Google's tokeninfo endpoint and checks
/// that it was issued for `client_id`.
pub async fn verify_google_credential(
    http: &reqwest::Client,
    client_id: &str,
    credential: &str,
) -> anyhow::Result<GoogleIdentity> {
    let res = http
        .get("https://oauth2.googleapis.com/tokeninfo")
        .query(&[("id_token", credential)])
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
        .context("google tokeninfo request")?;
    if !res.status().is_success() {
        warn!(status = %res.status(), "google rejected credential");
        anyhow::bail!("invalid Google credential");
    }
    let info: TokenInfo = res.json().await.context("google tokeninfo body")?;
    identity_from_token_info(info, client_id)
}

fn identity_from_token_info(info: TokenInfo, client_id: &str) -> anyhow::Result<GoogleIdentity> {
    if info.aud.as_deref() != Some(client_id) {
        anyhow::bail!("credential issued for another client");
    }
    let email = info
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .context("credential has no email")?;
    Ok(GoogleIdentity {
        sub: info.sub.unwrap_or_default(),
        email,
        name: info.name,
        picture: info.picture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, email: Option<&str>) -> TokenInfo {
        TokenInfo {
            aud: Some(aud.into()),
            sub: Some("1234".into()),
            email: email.map(Into::into),
            name: Some("Purdue Pete".into()),
            picture: None,
        }
    }

    #[test]
    fn token_info_for_our_client_is_accepted() {
        let id = identity_from_token_info(info("client-1", Some("Pete@Purdue.edu")), "client-1")
            .unwrap();
        assert_eq!(id.email, "pete@purdue.edu");
        assert_eq!(id.sub, "1234");
    }

    #[test]
    fn token_info_for_other_client_is_rejected() {
        let err = identity_from_token_info(info("client-2", Some("a@b.edu")), "client-1")
            .unwrap_err();
        assert!(err.to_string().contains("another client"));
    }

    #[test]
    fn token_info_without_email_is_rejected() {
        assert!(identity_from_token_info(info("client-1", None), "client-1").is_err());
    }

    #[test]
    fn userinfo_error_display() {
        let e = UserInfoError::Status(StatusCode::TOO_MANY_REQUESTS);
        assert!(e.to_string().contains("429"));
    }
}
