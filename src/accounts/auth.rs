//! Authorization gate for destructive account operations.
//!
//! An [`AuthToken`] can only be obtained from [`authorize`], so any function
//! that takes one is statically known to sit behind a successful key check.

use crate::accounts::keys::ApiKey;
use crate::accounts::store::{DbPool, UserRepo};
use crate::error::{AppError, AppResult};
use tracing::{debug, warn};

/// Who presented the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Holder of the service-wide key from the runtime config
    Service,
    /// Holder of a per-user key
    User(String),
}

/// Proof that a bearer key was checked.
#[derive(Debug, Clone)]
pub struct AuthToken {
    principal: Principal,
}

impl AuthToken {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Validate a presented key against the service key, then against user keys.
pub async fn authorize(pool: &DbPool, service_key: &ApiKey, presented: &str) -> AppResult<AuthToken> {
    if presented.is_empty() {
        return Err(AppError::Unauthorized);
    }

    if service_key.matches(presented) {
        debug!("Authorized with service key");
        return Ok(AuthToken {
            principal: Principal::Service,
        });
    }

    match UserRepo::find_by_api_key(pool, presented).await? {
        Some(user) => {
            debug!(username = %user.username, "Authorized with user key");
            Ok(AuthToken {
                principal: Principal::User(user.username),
            })
        }
        None => {
            warn!("Rejected request with unknown API key");
            Err(AppError::Unauthorized)
        }
    }
}
