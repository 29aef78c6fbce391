// src/utils/jwt.rs

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::user::{Role, User},
};

/// Which secret a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure. Identical shape for access and refresh tokens.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID.
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Unique token id, so tokens minted in the same second still differ.
    pub jti: String,
    /// Issued at, Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
}

impl SigningKeys {
    fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }
}

/// Issues and verifies stateless access/refresh tokens.
/// There is no revocation list: logout only discards the token client-side.
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenService {
    pub fn new(access_secret: &str, access_ttl: u64, refresh_secret: &str, refresh_ttl: u64) -> Self {
        Self {
            access: SigningKeys::new(access_secret, access_ttl),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            config.jwt_expiration,
            &config.jwt_refresh_secret,
            config.jwt_refresh_expiration,
        )
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Signs a new token carrying the user's id, email and role.
    pub fn issue(&self, kind: TokenKind, user: &User) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .as_secs() as usize;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + keys.ttl_seconds as usize,
        };

        let token = encode(&Header::default(), &claims, &keys.encoding)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tracing::debug!(user_id = %user.id, kind = ?kind, "token issued");
        Ok(token)
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        self.issue(TokenKind::Access, user)
    }

    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        self.issue(TokenKind::Refresh, user)
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user)?,
        })
    }

    /// Verifies and decodes a token against the secret of `kind`.
    /// Bad signatures and expired tokens both yield the same `AuthError`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.keys(kind).decoding, &Validation::default())
            .map_err(|e| {
                tracing::debug!(kind = ?kind, error = %e, "token rejected");
                AppError::AuthError("Invalid or expired token".to_string())
            })?;

        Ok(token_data.claims)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Fails with `Forbidden` unless the caller's role is in `allowed`.
pub fn ensure_role(claims: &Claims, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        tracing::warn!(user_id = %claims.sub, role = %claims.role, "insufficient permissions");
        Err(AppError::Forbidden("Insufficient permissions".to_string()))
    }
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = {
        let token = bearer_token(req.headers()).ok_or_else(|| {
            AppError::AuthError("Missing or invalid authorization header".to_string())
        })?;
        tokens.verify(token, TokenKind::Access)?
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks if the injected `Claims` has the ADMIN role.
/// If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?;

    ensure_role(claims, &[Role::Admin])?;

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn service() -> TokenService {
        TokenService::new("access-secret", 600, "refresh-secret", 3600)
    }

    fn user(role: Role) -> User {
        User {
            id: "user-1".to_string(),
            email: "a@b.com".to_string(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            role,
            is_active: true,
            email_verified: false,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let tokens = service();
        let token = tokens.issue_access_token(&user(Role::User)).unwrap();
        let claims = tokens.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn access_and_refresh_secrets_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair(&user(Role::Admin)).unwrap();
        assert!(tokens.verify(&pair.access_token, TokenKind::Refresh).is_err());
        assert!(tokens.verify(&pair.refresh_token, TokenKind::Access).is_err());
        let claims = tokens.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn tokens_minted_back_to_back_differ() {
        let tokens = service();
        let u = user(Role::User);
        assert_ne!(
            tokens.issue_access_token(&u).unwrap(),
            tokens.issue_access_token(&u).unwrap()
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "a@b.com".to_string(),
            role: Role::User,
            jti: "jti".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &tokens.access.encoding).unwrap();
        let err = tokens.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let tokens = service();
        let other = TokenService::new("other-secret", 600, "other-refresh", 3600);
        let token = other.issue_access_token(&user(Role::User)).unwrap();
        assert!(tokens.verify(&token, TokenKind::Access).is_err());
        assert!(tokens.verify("not.a.jwt", TokenKind::Access).is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn role_gate() {
        let tokens = service();
        let token = tokens.issue_access_token(&user(Role::User)).unwrap();
        let claims = tokens.verify(&token, TokenKind::Access).unwrap();
        assert!(ensure_role(&claims, &[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            ensure_role(&claims, &[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }
}
