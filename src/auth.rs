use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{error::ApiError, AppState};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Lowercase wallet address
    pub exp: usize,  // Expiration time
}

/// `0x` followed by 40 hex digits
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Display name used in chat and the player list
pub fn display_name(address: &str) -> String {
    let tag = address.get(2..6).unwrap_or(address);
    format!("Player-{}", tag)
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub address: String,
}

/// Session token from the `Authorization: Bearer` header or the `token` query parameter
fn token_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(String::from)
        .or_else(|| {
            parts
                .uri
                .query()
                .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
                .and_then(|params| {
                    params
                        .into_iter()
                        .find(|(k, _)| k == "token")
                        .map(|(_, v)| v)
                })
        })
}

pub fn verify_token(token: &str, jwt_secret: &str) -> Result<AuthenticatedUser, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    if !is_valid_address(&token_data.claims.sub) {
        return Err(ApiError::Unauthorized);
    }

    Ok(AuthenticatedUser {
        address: token_data.claims.sub,
    })
}

/// Extractor for players holding a session token
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = Arc::<AppState>::from_ref(state);
        let token = token_from_parts(parts);

        async move {
            let token = token.ok_or(ApiError::Unauthorized)?;
            verify_token(&token, &app_state.config.security.jwt_secret)
        }
    }
}

/// Extractor for the configured admin wallet
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub address: String,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        let app_state = Arc::<AppState>::from_ref(state);

        if !user
            .address
            .eq_ignore_ascii_case(&app_state.config.casino.admin_wallet)
        {
            tracing::warn!("Admin access denied for {}", user.address);
            return Err(ApiError::Forbidden);
        }

        Ok(AdminUser {
            address: user.address,
        })
    }
}

/// Sign a session token for `address`, stored lowercase in `sub`
pub fn generate_token(
    address: &str,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(ttl_hours))
        .ok_or(ApiError::Internal)?
        .timestamp();

    let claims = Claims {
        sub: address.to_lowercase(),
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign session token: {}", e);
        ApiError::Internal
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xAD1e0c6495aC38D3b88f2aD32F963E491926EC33";

    #[test]
    fn test_address_format() {
        assert!(is_valid_address(ADDRESS));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address("AD1e0c6495aC38D3b88f2aD32F963E491926EC3300"));
        assert!(!is_valid_address("0xZZ1e0c6495aC38D3b88f2aD32F963E491926EC33"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(ADDRESS), "Player-AD1e");
    }

    #[test]
    fn test_token_round_trip_lowercases_address() {
        let token = generate_token(ADDRESS, "secret", 1).unwrap();
        let user = verify_token(&token, "secret").unwrap();
        assert_eq!(user.address, ADDRESS.to_lowercase());
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = generate_token(ADDRESS, "secret", 1).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = generate_token(ADDRESS, "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
