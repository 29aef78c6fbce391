// src/services/auth.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::AppError,
    models::user::{
        AuthResponse, LoginRequest, MeResponse, NewUser, PublicUser, RefreshResponse,
        RegisterRequest, Role, User, is_strong_password,
    },
    store::Store,
    utils::{
        hash::{DUMMY_HASH, hash_password_blocking, verify_password_blocking},
        jwt::{TokenKind, TokenService},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Account lifecycle: registration, login, token refresh and profile lookup.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AppError> {
        let pair = self.tokens.issue_pair(user)?;
        Ok(AuthResponse {
            user: PublicUser::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Creates a USER account and returns a fresh token pair.
    ///
    /// A taken email is reported before the password policy is applied.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        if self.store.find_user_by_email(&req.email).await?.is_some() {
            tracing::info!(email = %req.email, "registration rejected, email taken");
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        if !is_strong_password(&req.password) {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters and contain uppercase, lowercase, number and special character (@$!%*?&)"
                    .to_string(),
            ));
        }

        let password_hash = hash_password_blocking(req.password).await?;

        // The store re-checks uniqueness, so a concurrent duplicate still ends as a conflict.
        let user = self
            .store
            .insert_user(NewUser {
                email: req.email,
                password_hash,
                first_name: req.first_name,
                last_name: req.last_name,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        self.respond(&user)
    }

    /// Verifies credentials and issues a new token pair.
    /// Unknown email, inactive account and wrong password are indistinguishable.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let Some(user) = self.store.find_user_by_email(&req.email).await? else {
            verify_password_blocking(req.password, DUMMY_HASH.to_string()).await?;
            tracing::warn!("login failed");
            return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
        };

        let password_ok = verify_password_blocking(req.password, user.password_hash.clone()).await?;
        if !user.is_active || !password_ok {
            tracing::warn!(user_id = %user.id, "login failed");
            return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
        }

        let now = Utc::now();
        self.store.record_login(&user.id, now).await?;
        let user = User {
            last_login: Some(now),
            ..user
        };

        tracing::info!(user_id = %user.id, "user logged in");
        self.respond(&user)
    }

    /// Mints a new access token. The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AppError> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;

        let user = self
            .store
            .find_user_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.sub, "refresh for missing or inactive user");
                AppError::AuthError("Invalid or expired token".to_string())
            })?;

        Ok(RefreshResponse {
            access_token: self.tokens.issue_access_token(&user)?,
        })
    }

    pub async fn current_user(&self, user_id: &str) -> Result<MeResponse, AppError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .map(MeResponse::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> AuthService {
        let tokens = Arc::new(TokenService::new("access", 600, "refresh", 3600));
        AuthService::new(Arc::new(MemoryStore::new()), tokens)
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_issues_user_tokens() {
        let auth = service();
        let res = auth.register(register_req("a@b.com", "Abcdef1!")).await.unwrap();
        assert_eq!(res.user.role, Role::User);

        let claims = auth.tokens.verify(&res.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, res.user.id);
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_even_with_weak_password() {
        let auth = service();
        auth.register(register_req("a@b.com", "Abcdef1!")).await.unwrap();

        let err = auth.register(register_req("a@b.com", "abcdefgh")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let err = service()
            .register(register_req("a@b.com", "abcdefgh"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let auth = service();
        auth.register(register_req("a@b.com", "Abcdef1!")).await.unwrap();

        let wrong_password = auth.login(login_req("a@b.com", "Abcdef1?")).await.unwrap_err();
        let unknown_email = auth.login(login_req("x@b.com", "Abcdef1!")).await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.status_code(), unknown_email.status_code());
    }

    #[tokio::test]
    async fn login_records_last_login() {
        let auth = service();
        let registered = auth.register(register_req("a@b.com", "Abcdef1!")).await.unwrap();
        assert!(auth.current_user(&registered.user.id).await.unwrap().last_login.is_none());

        auth.login(login_req("a@b.com", "Abcdef1!")).await.unwrap();
        assert!(auth.current_user(&registered.user.id).await.unwrap().last_login.is_some());
    }

    #[tokio::test]
    async fn refresh_yields_access_token_only() {
        let auth = service();
        let res = auth.register(register_req("a@b.com", "Abcdef1!")).await.unwrap();

        let refreshed = auth.refresh(&res.refresh_token).await.unwrap();
        assert!(auth.tokens.verify(&refreshed.access_token, TokenKind::Access).is_ok());
        assert!(auth.tokens.verify(&refreshed.access_token, TokenKind::Refresh).is_err());

        // An access token is not a refresh token.
        assert!(matches!(
            auth.refresh(&res.access_token).await,
            Err(AppError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn unknown_user_profile_is_not_found() {
        assert!(matches!(
            service().current_user("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
