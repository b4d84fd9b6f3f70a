// src/state.rs

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{config::Config, services::CommentEngine, store::PgCommentStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub engine: CommentEngine<PgCommentStore>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for CommentEngine<PgCommentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}
