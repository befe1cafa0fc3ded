//! Session Signal: whether a shopper is signed in, and with which credential.
//!
//! The signal is the single owner of the current [`Session`]. Auth flows
//! write to it; the cart and wishlist synchronizers subscribe and react to
//! transitions. Subscribers are woken only when presence or the credential
//! actually changes, so signing in twice with the same token is not a new
//! transition.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use shopmart_core::{UserId, UserRole};

/// Errors raised while building a session from a credential.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The credential is not a three-part JWT.
    #[error("Malformed access token")]
    MalformedToken,

    /// The payload segment is not valid base64 or JSON.
    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    /// The credential's `exp` claim is in the past.
    #[error("Session expired at {0}")]
    Expired(DateTime<Utc>),
}

// =============================================================================
// AccessToken
// =============================================================================

/// Bearer credential issued by the remote API. Redacted from `Debug`.
#[derive(Clone, Debug)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw credential.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw credential, for the `token` header and session persistence.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AccessToken {}

// =============================================================================
// Session
// =============================================================================

/// Claims carried in the credential's payload segment.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// User ID.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Account role.
    #[serde(default)]
    pub role: UserRole,
    /// Issued-at, seconds since the epoch.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode the payload segment of a JWT without verifying its signature.
///
/// The remote API verifies the signature on every request; the client only
/// needs the user ID and expiry.
///
/// # Errors
///
/// Returns [`SessionError`] if the token does not have three segments or the
/// payload is not base64url-encoded JSON claims.
pub fn decode_claims(token: &str) -> Result<TokenClaims, SessionError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::InvalidClaims(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| SessionError::InvalidClaims(e.to_string()))
}

/// Profile of the signed-in shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// User ID from the token claims.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email, known when the session came from a sign-in response.
    pub email: Option<String>,
    /// Account role.
    pub role: UserRole,
}

/// A signed-in shopper: credential plus the identity it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: AccessToken,
    user: SessionUser,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from a raw credential, reading identity from its claims.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the claims cannot be decoded.
    pub fn from_token(token: impl Into<String>, email: Option<String>) -> Result<Self, SessionError> {
        let token = AccessToken::new(token);
        let claims = decode_claims(token.expose())?;
        let expires_at = claims
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single());

        Ok(Self {
            token,
            user: SessionUser {
                id: claims.id,
                name: claims.name,
                email,
                role: claims.role,
            },
            expires_at,
        })
    }

    /// The bearer credential.
    #[must_use]
    pub const fn token(&self) -> &AccessToken {
        &self.token
    }

    /// The signed-in shopper.
    #[must_use]
    pub const fn user(&self) -> &SessionUser {
        &self.user
    }

    /// When the credential stops being accepted, if it says.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the credential has expired as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether the credential has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// =============================================================================
// SessionSignal
// =============================================================================

/// Shared, observable sign-in state.
///
/// Cheap to clone; every clone observes and drives the same session.
#[derive(Clone)]
pub struct SessionSignal {
    sender: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSignal")
            .field("present", &self.is_present())
            .finish()
    }
}

impl SessionSignal {
    /// A signal with no one signed in.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Set the current session. Returns `true` if this was a transition
    /// (previously absent, or a different credential).
    pub fn sign_in(&self, session: Session) -> bool {
        let user_id = session.user().id.clone();
        let changed = self.sender.send_if_modified(|current| {
            if current.as_ref().map(Session::token) == Some(session.token()) {
                return false;
            }
            *current = Some(session);
            true
        });
        if changed {
            info!(user_id = %user_id, "Session present");
        }
        changed
    }

    /// Restore a persisted session, refusing expired credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expired`] if the credential is past its
    /// expiry; the signal is left absent in that case.
    pub fn restore(&self, session: Session) -> Result<bool, SessionError> {
        if let Some(expired_at) = session.expires_at().filter(|_| session.is_expired()) {
            debug!(expired_at = %expired_at, "Discarding expired session");
            self.sign_out();
            return Err(SessionError::Expired(expired_at));
        }
        Ok(self.sign_in(session))
    }

    /// Clear the current session. Returns `true` if one was present.
    pub fn sign_out(&self) -> bool {
        let changed = self.sender.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("Session absent");
        }
        changed
    }

    /// A copy of the current session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    /// The current credential.
    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        self.sender.borrow().as_ref().map(|s| s.token().clone())
    }

    /// Whether someone is signed in.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Observe transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }
}

/// Build a JWT-shaped credential with the given claims. Test helper shared
/// with the synchronizer tests.
#[cfg(test)]
pub(crate) fn test_token(user_id: &str, exp: i64) -> String {
    let payload = serde_json::json!({
        "id": user_id,
        "name": "Test Shopper",
        "role": "user",
        "iat": 1_700_000_000,
        "exp": exp,
    });
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FAR_FUTURE: i64 = 4_102_444_800; // 2100-01-01

    #[test]
    fn test_decode_claims() {
        let claims = decode_claims(&test_token("u1", FAR_FUTURE)).unwrap();
        assert_eq!(claims.id, UserId::new("u1"));
        assert_eq!(claims.name, "Test Shopper");
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.exp, Some(FAR_FUTURE));
    }

    #[test]
    fn test_decode_claims_rejects_garbage() {
        assert!(matches!(
            decode_claims("not-a-jwt"),
            Err(SessionError::MalformedToken)
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(SessionError::MalformedToken)
        ));
        assert!(matches!(
            decode_claims("a.!!!.c"),
            Err(SessionError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_session_expiry() {
        let session = Session::from_token(test_token("u1", 1_000), None).unwrap();
        assert!(session.is_expired());
        let session = Session::from_token(test_token("u1", FAR_FUTURE), None).unwrap();
        assert!(!session.is_expired());
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_signal_notifies_only_on_transitions() {
        let signal = SessionSignal::new();
        let mut rx = signal.subscribe();
        let session = Session::from_token(test_token("u1", FAR_FUTURE), None).unwrap();

        assert!(signal.sign_in(session.clone()));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // Same credential again is not a transition
        assert!(!signal.sign_in(session));
        assert!(!rx.has_changed().unwrap());

        assert!(signal.sign_out());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // Already absent
        assert!(!signal.sign_out());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_restore_rejects_expired() {
        let signal = SessionSignal::new();
        let expired = Session::from_token(test_token("u1", 1_000), None).unwrap();
        assert!(matches!(
            signal.restore(expired),
            Err(SessionError::Expired(_))
        ));
        assert!(!signal.is_present());

        let fresh = Session::from_token(test_token("u1", FAR_FUTURE), None).unwrap();
        assert!(signal.restore(fresh).unwrap());
        assert!(signal.is_present());
        assert_eq!(signal.current().unwrap().user().id, UserId::new("u1"));
    }
}
