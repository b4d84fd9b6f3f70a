// src/services/mod.rs

pub mod comments;
pub mod likes;
pub mod thread;

use crate::{config::Config, error::AppError, store::CommentStore};

/// Upper bound on parent-by-parent ancestor walks. The stored reply chain
/// is unbounded even though the visual tier is capped, so the walk carries
/// an explicit guard; chains past it indicate corrupt adjacency.
const MAX_ANCESTOR_WALK: usize = 256;

/// Tunable limits the engine enforces on its own, independent of whatever
/// the HTTP layer already validated.
#[derive(Debug, Clone)]
pub struct CommentPolicy {
    pub max_content_length: usize,
}

impl Default for CommentPolicy {
    fn default() -> Self {
        Self {
            max_content_length: 1000,
        }
    }
}

impl From<&Config> for CommentPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_content_length: config.comment_max_length,
        }
    }
}

/// The threaded-comment engine.
///
/// Every operation runs as one store transaction: reply creation with
/// capped depth assignment, content edits, cascading soft-deletion,
/// like-count reconciliation, and the read-only thread assembly. The
/// engine is generic over its store and contains no HTTP or SQL types.
#[derive(Clone)]
pub struct CommentEngine<S: CommentStore> {
    store: S,
    policy: CommentPolicy,
}

impl<S: CommentStore> CommentEngine<S> {
    pub fn new(store: S, policy: CommentPolicy) -> Self {
        Self { store, policy }
    }

    fn validate_content(&self, content: &str) -> Result<(), AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Comment content must not be empty".to_string(),
            ));
        }
        if content.chars().count() > self.policy.max_content_length {
            return Err(AppError::Validation(format!(
                "Comment content exceeds {} characters",
                self.policy.max_content_length
            )));
        }
        Ok(())
    }
}
