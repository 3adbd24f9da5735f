//! Session token extractor
//!
//! The `authorization` header carries an opaque login token; the session
//! lives in the shared store under `login:token:<token>` and its TTL slides
//! forward on every authenticated request.

use axum::extract::FromRequestParts;
use http::request::Parts;
use shared::error::AppError;
use shared::models::UserDto;

use crate::core::AppState;
use crate::error::ServiceError;
use crate::store::keys;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserDto);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(AppError::unauthorized)?;

        let key = keys::login_key(token);
        let Some(raw) = state.store.get(&key).await? else {
            tracing::debug!(uri = %parts.uri, "Unknown session token");
            return Err(AppError::unauthorized().into());
        };
        let user: UserDto = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(error = %e, "Malformed session payload");
            AppError::unauthorized()
        })?;

        state.store.expire(&key, keys::LOGIN_USER_TTL).await?;

        let user = CurrentUser(user);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
