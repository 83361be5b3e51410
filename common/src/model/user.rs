use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// A row of `user_profile`. `id` is the id of the matching auth user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {event} while {from}")]
pub struct SessionError {
    pub from: &'static str,
    pub event: &'static str,
}

/// Lifecycle of a client session.
///
/// `SignedOut -> Authenticating -> SignedIn`, with failures and sign-outs
/// returning to `SignedOut`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    SignedOut,
    Authenticating { email: String },
    SignedIn { user: UserProfile },
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::SignedOut => "signed out",
            SessionState::Authenticating { .. } => "authenticating",
            SessionState::SignedIn { .. } => "signed in",
        }
    }

    pub fn begin(self, email: impl Into<String>) -> Result<Self, SessionError> {
        match self {
            SessionState::SignedOut => Ok(SessionState::Authenticating {
                email: email.into(),
            }),
            other => Err(SessionError {
                from: other.name(),
                event: "begin authentication",
            }),
        }
    }

    /// Completes authentication; the user must be the one that started it.
    pub fn complete(self, user: UserProfile) -> Result<Self, SessionError> {
        match self {
            SessionState::Authenticating { ref email }
                if email.eq_ignore_ascii_case(&user.email) =>
            {
                Ok(SessionState::SignedIn { user })
            }
            other => Err(SessionError {
                from: other.name(),
                event: "complete authentication",
            }),
        }
    }

    pub fn fail(self) -> Self {
        SessionState::SignedOut
    }

    pub fn sign_out(self) -> Self {
        SessionState::SignedOut
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::SignedIn { user } => Some(user),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: &str) -> UserProfile {
        UserProfile {
            id: "u1".into(),
            first_name: "Mapula".into(),
            surname: "Mabunda".into(),
            email: email.into(),
            role: Role::Student,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn sign_in_lifecycle() {
        let state = SessionState::default()
            .begin("mapula@example.com")
            .and_then(|s| s.complete(profile("Mapula@example.com")))
            .unwrap();
        assert_eq!(state.user().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(state.sign_out(), SessionState::SignedOut);
    }

    #[test]
    fn completing_for_another_user_is_refused() {
        let state = SessionState::SignedOut.begin("a@example.com").unwrap();
        let err = state.complete(profile("b@example.com")).unwrap_err();
        assert_eq!(err.to_string(), "cannot complete authentication while authenticating");
    }

    #[test]
    fn cannot_begin_twice() {
        let state = SessionState::SignedOut.begin("a@example.com").unwrap();
        assert!(state.begin("a@example.com").is_err());
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(SessionState::SignedOut).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "signed_out" }));
    }
}
