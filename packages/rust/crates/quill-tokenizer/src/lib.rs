#![allow(clippy::doc_markdown)]

//! quill-tokenizer - approximate token counting.
//!
//! Uses tiktoken-rs `cl100k_base` as the reference encoding. Counting never
//! fails: if the encoding cannot be loaded the count degrades to
//! `chars / 4`, which is close enough for budget triggers.
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_tokenizer::{count_tokens, TokenCounter, ApproxCounter};
//!
//! let n = count_tokens("Hello, world!");
//! let approx = ApproxCounter.count("abcdefgh"); // 2
//! ```

use std::sync::OnceLock;
use thiserror::Error;

/// Name of the reference encoding.
pub const REFERENCE_ENCODING: &str = "cl100k_base";

/// Characters per token assumed by the fallback estimate.
pub const FALLBACK_CHARS_PER_TOKEN: usize = 4;

/// Errors for explicit-encoding operations.
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// Encoding name not supported.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),
    /// Failed to initialize the encoding
    #[error("Tokenization model initialization failed: {0}")]
    ModelInit(String),
}

/// Cached cl100k_base instance. `None` records a failed load so it is not retried.
static CL100K_BASE: OnceLock<Option<tiktoken_rs::CoreBPE>> = OnceLock::new();

fn cl100k_base() -> Option<&'static tiktoken_rs::CoreBPE> {
    CL100K_BASE
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(error) => {
                log::error!(
                    "failed to load {REFERENCE_ENCODING}; token counts fall back to chars/{FALLBACK_CHARS_PER_TOKEN}: {error}"
                );
                None
            }
        })
        .as_ref()
}

/// Count tokens with the reference encoding, falling back to
/// [`estimate_token_count`] when it is unavailable.
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    cl100k_base().map_or_else(
        || estimate_token_count(text),
        |bpe| bpe.encode_with_special_tokens(text).len(),
    )
}

/// Count tokens using a named encoding.
///
/// Supported encodings:
/// - "cl100k_base" - GPT-4 / GPT-3.5 Turbo (reference)
/// - "o200k_base"  - GPT-4o
/// - "p50k_base"   - Codex
/// - "r50k_base"   - GPT-2
///
/// # Errors
///
/// Returns [`TokenizerError::UnknownEncoding`] for other names and
/// [`TokenizerError::ModelInit`] when the encoding tables fail to load.
pub fn count_tokens_with_encoding(text: &str, encoding: &str) -> Result<usize, TokenizerError> {
    if encoding == REFERENCE_ENCODING {
        return cl100k_base()
            .map(|bpe| bpe.encode_with_special_tokens(text).len())
            .ok_or_else(|| TokenizerError::ModelInit(encoding.to_string()));
    }
    let bpe = match encoding {
        "o200k_base" => tiktoken_rs::o200k_base(),
        "p50k_base" => tiktoken_rs::p50k_base(),
        "r50k_base" => tiktoken_rs::r50k_base(),
        _ => return Err(TokenizerError::UnknownEncoding(encoding.to_string())),
    };
    bpe.map(|bpe| bpe.encode_with_special_tokens(text).len())
        .map_err(|e| TokenizerError::ModelInit(e.to_string()))
}

/// Length-based estimate: `chars / 4`, rounded down.
#[must_use]
pub fn estimate_token_count(text: &str) -> usize {
    text.chars().count() / FALLBACK_CHARS_PER_TOKEN
}

/// Token counting seam. Implementations must never fail.
pub trait TokenCounter: Send + Sync {
    /// Approximate token count of `text`.
    fn count(&self, text: &str) -> usize;
}

/// Reference-encoding counter with length fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cl100kCounter;

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        count_tokens(text)
    }
}

/// Pure `chars / 4` counter. Deterministic, no encoding tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproxCounter;

impl TokenCounter for ApproxCounter {
    fn count(&self, text: &str) -> usize {
        estimate_token_count(text)
    }
}
