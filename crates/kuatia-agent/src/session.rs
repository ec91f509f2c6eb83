//! # Session Manager — Authentication Lifecycle
//!
//! Owns the session token lifecycle as a runtime state machine:
//!
//! ```text
//! Unauthenticated → Authenticating → Authenticated
//!        ↑                │                 │
//!        └──── failure ───┘   invalidate ───┘
//! ```
//!
//! No operation requiring a session may proceed while the manager is in
//! `Unauthenticated` or `Authenticating`; the token accessor returns
//! `None` outside `Authenticated`, so callers cannot reach the remote
//! service with a token that does not exist.
//!
//! Authentication failures are always terminal for the call that raised
//! them: the manager returns to `Unauthenticated` and propagates the
//! classified error without retrying.

use kuatia_core::{AgentError, Credentials, Profile, Session, SessionToken};
use kuatia_sifen_client::SifenService;

/// The authentication lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; the next operation must authenticate first.
    Unauthenticated,
    /// A login round trip is in flight.
    Authenticating,
    /// A session token is held and usable.
    Authenticated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
        }
    }
}

/// Owner of the session and the profile retrieved with it.
///
/// The profile is session-scoped state: it is cleared together with the
/// token on invalidation and never outlives the session it arrived with.
pub struct SessionManager {
    state: SessionState,
    session: Option<Session>,
    profile: Option<Profile>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Create a manager in `Unauthenticated`.
    pub fn new() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            session: None,
            profile: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a usable session is held.
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// The session token, available only in `Authenticated`.
    pub fn token(&self) -> Option<&SessionToken> {
        match self.state {
            SessionState::Authenticated => self.session.as_ref().map(|s| &s.token),
            _ => None,
        }
    }

    /// The profile retrieved at login, available only in `Authenticated`.
    pub fn profile(&self) -> Option<&Profile> {
        match self.state {
            SessionState::Authenticated => self.profile.as_ref(),
            _ => None,
        }
    }

    /// Authenticate against the remote service.
    ///
    /// On success the manager holds the session and profile and enters
    /// `Authenticated`. On failure it returns to `Unauthenticated` with
    /// nothing retained and propagates the classified error; no retry is
    /// attempted here.
    pub async fn authenticate(
        &mut self,
        service: &dyn SifenService,
        credentials: &Credentials,
    ) -> Result<(), AgentError> {
        self.state = SessionState::Authenticating;
        tracing::debug!(ruc = %credentials.ruc, "authenticating");

        match service.login(credentials).await {
            Ok(outcome) => {
                tracing::debug!(
                    ruc = %credentials.ruc,
                    business_name = %outcome.profile.business_name,
                    "session established"
                );
                self.session = Some(outcome.session);
                self.profile = Some(outcome.profile);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(err) => {
                self.session = None;
                self.profile = None;
                self.state = SessionState::Unauthenticated;
                Err(err)
            }
        }
    }

    /// Force `Authenticated → Unauthenticated`, dropping the token and
    /// profile. Used whenever a downstream call reports the token as
    /// rejected, so the next operation re-authenticates instead of
    /// reusing a dead token.
    pub fn invalidate(&mut self) {
        if self.state == SessionState::Authenticated {
            tracing::debug!("session invalidated");
        }
        self.session = None;
        self.profile = None;
        self.state = SessionState::Unauthenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuatia_core::{Ruc, SecretKey};
    use kuatia_sifen_client::MockSifenService;

    fn credentials(ruc: &str) -> Credentials {
        Credentials::new(
            Ruc::new(ruc).expect("valid RUC"),
            SecretKey::new("mock-secret"),
        )
    }

    #[test]
    fn starts_unauthenticated_with_no_token() {
        let manager = SessionManager::new();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(manager.token().is_none());
        assert!(manager.profile().is_none());
    }

    #[tokio::test]
    async fn successful_login_reaches_authenticated() {
        let service = MockSifenService::new();
        let mut manager = SessionManager::new();

        manager
            .authenticate(&service, &credentials("5452"))
            .await
            .expect("should authenticate");

        assert_eq!(manager.state(), SessionState::Authenticated);
        assert!(manager.token().is_some());
        assert!(manager.profile().is_some());
    }

    #[tokio::test]
    async fn failed_login_returns_to_unauthenticated() {
        let service = MockSifenService::new();
        let mut manager = SessionManager::new();

        let err = manager
            .authenticate(&service, &credentials("0452"))
            .await
            .expect_err("inactive RUC must fail");
        assert_eq!(err.code(), "RUC_INACTIVE");
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(manager.token().is_none());
        assert!(manager.profile().is_none());
    }

    #[tokio::test]
    async fn invalidate_drops_session_and_profile() {
        let service = MockSifenService::new();
        let mut manager = SessionManager::new();
        manager
            .authenticate(&service, &credentials("5452"))
            .await
            .expect("should authenticate");

        manager.invalidate();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(manager.token().is_none());
        assert!(manager.profile().is_none());
    }

    #[tokio::test]
    async fn invalidate_from_unauthenticated_is_a_no_op() {
        let mut manager = SessionManager::new();
        manager.invalidate();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn reauthentication_replaces_the_session() {
        let service = MockSifenService::new();
        let mut manager = SessionManager::new();
        manager
            .authenticate(&service, &credentials("5452"))
            .await
            .expect("first login");
        manager.invalidate();
        manager
            .authenticate(&service, &credentials("5452"))
            .await
            .expect("second login");
        assert!(manager.is_authenticated());
        assert_eq!(service.login_calls(), 2);
    }
}
