use thiserror::Error;

/// Reasons an `authenticate` event is refused. Always terminal for the
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("init data signature does not match")]
    InvalidSignature,
    #[error("init data is older than the allowed age")]
    Expired,
    #[error("init data carries no usable user object")]
    InvalidUserData,
}

impl AuthError {
    /// Machine-readable reason sent to the client in `auth-failed`.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::InvalidSignature => "invalid-signature",
            AuthError::Expired => "expired",
            AuthError::InvalidUserData => "invalid-user-data",
        }
    }
}

/// Failure reported by a [`GestureStore`](crate::persistence::GestureStore)
/// insert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    /// Set when the failure happened at the network/transport level.
    pub network: bool,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            network: false,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            network: true,
        }
    }

    /// Transient failures are worth another attempt: network errors, or
    /// anything whose description mentions a timeout.
    pub fn is_transient(&self) -> bool {
        if self.network {
            return true;
        }
        let message = self.message.to_lowercase();
        message.contains("timeout") || message.contains("timed out")
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let network = matches!(
            e,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
        );
        Self {
            message: e.to_string(),
            network,
        }
    }
}

/// Terminal outcome of a retried gesture save.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("{0}")]
    Permanent(String),
    #[error("gesture could not be saved after {attempts} attempts")]
    Exhausted { attempts: u32 },
}
