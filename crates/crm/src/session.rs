//! Challenge/response session management
//!
//! vTiger logins are a two-step handshake: fetch a one-time challenge token,
//! then submit `md5(token + access_key)` as the login key. The server owns
//! session expiry and does not advertise it, so no session is ever cached:
//! each synchronization attempt authenticates fresh and trades a couple of
//! extra round-trips for never reasoning about stale sessions.

use md5::{Digest, Md5};

use crate::client::VtigerClient;
use crate::error::AuthError;

/// An authenticated web-service session. Owned by exactly one
/// synchronization attempt.
#[derive(Debug, Clone)]
pub struct CrmSession {
    session_name: String,
}

impl CrmSession {
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    #[cfg(test)]
    pub(crate) fn for_tests(session_name: &str) -> Self {
        Self {
            session_name: session_name.to_string(),
        }
    }
}

fn derive_login_key(token: &str, access_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(token.as_bytes());
    hasher.update(access_key.as_bytes());
    hex::encode(hasher.finalize())
}

impl VtigerClient {
    /// Run the challenge → login handshake and return the session token.
    ///
    /// Linear, no internal retries. Each step requires the CRM's explicit
    /// `success` flag; a step without it aborts with the server's error
    /// payload attached.
    pub async fn authenticate(&self) -> Result<CrmSession, AuthError> {
        let username = self.config().username.clone();

        let challenge = self
            .get(&[("operation", "getchallenge"), ("username", &username)])
            .await
            .map_err(|source| AuthError::Transport {
                stage: "getchallenge",
                source,
            })?;
        if !challenge.success {
            return Err(AuthError::ChallengeRejected(challenge.error_payload()));
        }
        let token = challenge.result_str("token").ok_or(AuthError::MissingToken)?;

        let login_key = derive_login_key(token, &self.config().access_key);

        let login = self
            .post_form(&[
                ("operation", "login"),
                ("username", &username),
                ("accessKey", &login_key),
            ])
            .await
            .map_err(|source| AuthError::Transport {
                stage: "login",
                source,
            })?;
        if !login.success {
            return Err(AuthError::LoginRejected(login.error_payload()));
        }
        let session_name = login
            .result_str("sessionName")
            .ok_or(AuthError::MissingSession)?;

        tracing::debug!(username = %username, "vTiger session established");

        Ok(CrmSession {
            session_name: session_name.to_string(),
        })
    }
}
