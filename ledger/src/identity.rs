use greenloop_types::UserId;
use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;

/// Authenticated user snapshot yielded by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
}

/// Errors surfaced by the identity provider. Not fatal to the session; the
/// caller reports them and may retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailInUse,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// The external authentication backend.
///
/// Opaque to the ledger: all it guarantees is a stable user id plus basic
/// profile fields after sign-in/sign-up, and a watchable auth state.
pub trait IdentityProvider {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<AuthUser, IdentityError>>;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, IdentityError>>;

    fn sign_out(&self) -> impl Future<Output = ()>;

    /// Current auth state: `Some` while signed in, `None` otherwise.
    /// Receivers observe every transition.
    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Profile fields used to seed a new account on first sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ProfileDefaults {
    pub display_name: String,
    pub email: String,
}

impl ProfileDefaults {
    /// Derive defaults from identity data. Falls back to the email local
    /// part when the provider has no display name.
    pub fn from_auth(user: &AuthUser) -> Self {
        let display_name = if user.display_name.is_empty() {
            user.email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            user.display_name.clone()
        };
        Self {
            display_name,
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prefer_provider_display_name() {
        let user = AuthUser {
            user_id: UserId::from("uid-1"),
            display_name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        assert_eq!(ProfileDefaults::from_auth(&user).display_name, "Alice");
    }

    #[test]
    fn defaults_fall_back_to_email_local_part() {
        let user = AuthUser {
            user_id: UserId::from("uid-1"),
            display_name: String::new(),
            email: "bob@example.com".to_string(),
        };
        assert_eq!(ProfileDefaults::from_auth(&user).display_name, "bob");
    }
}
