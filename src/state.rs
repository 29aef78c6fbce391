use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{AuthService, CatalogService, ExamService},
    store::Store,
    utils::jwt::TokenService,
};

/// Shared application state. Cheap to clone: everything heavy sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenService>,
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub exams: ExamService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config));
        Self {
            auth: AuthService::new(store.clone(), tokens.clone()),
            catalog: CatalogService::new(store.clone()),
            exams: ExamService::new(store),
            tokens,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for CatalogService {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for ExamService {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}
