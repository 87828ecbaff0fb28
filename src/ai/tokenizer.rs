//! Token Estimation
//!
//! Approximate token counts for procedure and table sources. Counts are
//! recorded on every prepared item and used to flag sources that will not
//! fit a model's context window.
//!
//! ## Strategy
//! - Punctuation and operators count as one token each
//! - Short identifiers count as one token, longer ones roughly 4 chars/token

/// Token estimation method
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TokenEstimator {
    /// Simple character-based estimation (4 chars = 1 token)
    CharBased,
    /// Code-aware estimation (accounts for SQL/C# punctuation)
    #[default]
    CodeAware,
}

/// Token counter for context management
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter {
    estimator: TokenEstimator,
}

impl TokenCounter {
    pub fn new(estimator: TokenEstimator) -> Self {
        Self { estimator }
    }

    /// Estimate token count for a string
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.estimator {
            TokenEstimator::CharBased => text.chars().count().div_ceil(4),
            TokenEstimator::CodeAware => self.count_code_aware(text),
        }
    }

    fn count_code_aware(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut word_len = 0;

        for ch in text.chars() {
            match ch {
                '(' | ')' | '{' | '}' | '[' | ']' | ';' | ':' | ',' | '.' | '+' | '-' | '*'
                | '/' | '=' | '<' | '>' | '!' | '&' | '|' | '@' | '#' | '$' | '%' | '^' | '~'
                | '?' | '\\' | '\'' | '"' => {
                    tokens += word_tokens(word_len) + 1;
                    word_len = 0;
                }
                c if c.is_whitespace() => {
                    tokens += word_tokens(word_len);
                    word_len = 0;
                }
                _ => word_len += 1,
            }
        }

        (tokens + word_tokens(word_len)).max(1)
    }
}

fn word_tokens(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => len.div_ceil(4),
    }
}
