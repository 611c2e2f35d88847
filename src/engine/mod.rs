//! Generation engines
//!
//! Orchestrates the domain rules, the token ledger in the database and the
//! hosted providers:
//! - [`ContentEngine`]: budgeted text generation
//! - [`ImageEngine`]: image generation and its history

mod content;
mod image;

use thiserror::Error;

use crate::db::DbError;
use crate::domain::AllowanceDecision;
use crate::providers::ProviderError;

pub use content::{ContentEngine, GenerateRequest, GenerationOutcome, ValidatedGeneration, MAX_COMPLETION_TOKENS};
pub use image::{ImageEngine, ImageOutcome, ImageRequest, SUPPORTED_SIZES};

/// Message returned when a generation would exceed the monthly allowance
pub const TOKEN_LIMIT_MESSAGE: &str =
    "Token limit exceeded. Please upgrade your subscription or try again next month.";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{}", TOKEN_LIMIT_MESSAGE)]
    TokenLimitExceeded(AllowanceDecision),

    #[error("No model provider registered")]
    NoProvider,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Database(#[from] DbError),
}
