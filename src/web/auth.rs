//! Bearer-key extractor guarding destructive routes.

use crate::accounts::{authorize, AuthToken};
use crate::error::AppError;
use crate::web::state::AppState;
use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Runs the key check before the handler body; handlers that take this
/// receive the resulting [`AuthToken`].
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthToken);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let service_key = state.config.service_key().await;
        let token = authorize(state.credentials.pool(), &service_key, bearer.token()).await?;
        Ok(Self(token))
    }
}
