//! Held token state for an authenticated session
//!
//! One mutable value per client: the current access token, the refresh
//! token that can renew it, and the absolute expiry computed from the last
//! successful exchange. The state starts empty, is populated on the first
//! authenticated call, and is wiped whenever the server rejects the token.

use chrono::{DateTime, Duration, Utc};
use octoparse_domain::TokenResponse;

/// Lifetime assumed when the token exchange reports an unusable
/// `expires_in` (non-positive or unparsable): 24 hours.
const FALLBACK_TTL_SECS: i64 = 24 * 60 * 60;

/// Token state held by a [`SessionClient`](crate::session::SessionClient).
///
/// Invariant: when `access_token` is present, `expires_at` reflects the
/// expiry reported by the exchange that issued it.
#[derive(Debug, Clone, Default)]
pub struct SessionToken {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    /// Adopt the result of a successful token exchange.
    pub fn store(&mut self, response: TokenResponse) {
        let ttl = if response.expires_in > 0 { response.expires_in } else { FALLBACK_TTL_SECS };
        self.access_token = Some(response.access_token);
        self.refresh_token = response.refresh_token;
        self.expires_at = Some(Utc::now() + Duration::seconds(ttl));
    }

    /// Reset to the unauthenticated state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Whether a token exchange is required before the next request.
    ///
    /// True when no access token is held, or when the current one is within
    /// `margin` of its expiry.
    #[must_use]
    pub fn needs_exchange(&self, margin: Duration) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at - margin,
            None => true,
        }
    }

    /// Whether the held refresh token can still be exchanged.
    ///
    /// The refresh token shares the session's expiry: once `expires_at` has
    /// passed, only a full authentication can recover the session.
    #[must_use]
    pub fn refresh_usable(&self) -> bool {
        if self.refresh_token.is_none() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => Utc::now() < expires_at,
            None => false,
        }
    }

    /// Test hook: pin the expiry to an arbitrary instant.
    #[cfg(test)]
    pub(crate) fn set_expires_at(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = Some(expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: i64, refresh_token: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "A".to_string(),
            token_type: "bearer".to_string(),
            expires_in,
            refresh_token: refresh_token.map(str::to_string),
        }
    }

    #[test]
    fn starts_empty_and_needs_exchange() {
        let token = SessionToken::default();

        assert!(token.access_token().is_none());
        assert!(token.needs_exchange(Duration::seconds(300)));
        assert!(!token.refresh_usable());
    }

    #[test]
    fn fresh_token_outside_margin_needs_no_exchange() {
        let mut token = SessionToken::default();
        token.store(response(3600, Some("R")));

        assert_eq!(token.access_token(), Some("A"));
        assert!(!token.needs_exchange(Duration::seconds(300)));
        assert!(token.refresh_usable());
    }

    #[test]
    fn token_within_margin_needs_exchange() {
        let mut token = SessionToken::default();
        token.store(response(3600, Some("R")));
        token.set_expires_at(Utc::now() + Duration::seconds(120));

        assert!(token.needs_exchange(Duration::seconds(300)));
        // Not yet past expiry, so the refresh token is still usable.
        assert!(token.refresh_usable());
    }

    #[test]
    fn expired_session_cannot_refresh() {
        let mut token = SessionToken::default();
        token.store(response(3600, Some("R")));
        token.set_expires_at(Utc::now() - Duration::seconds(60));

        assert!(token.needs_exchange(Duration::seconds(300)));
        assert!(!token.refresh_usable());
    }

    #[test]
    fn non_positive_expiry_falls_back_to_24_hours() {
        for expires_in in [0, -1] {
            let mut token = SessionToken::default();
            token.store(response(expires_in, None));

            // Well outside any reasonable margin.
            assert!(!token.needs_exchange(Duration::seconds(300)));
        }
    }

    #[test]
    fn clear_resets_to_unauthenticated() {
        let mut token = SessionToken::default();
        token.store(response(3600, Some("R")));
        token.clear();

        assert!(token.access_token().is_none());
        assert!(token.refresh_token().is_none());
        assert!(token.needs_exchange(Duration::seconds(300)));
    }
}
