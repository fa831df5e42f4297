//! Pure prompt building and response parsing

pub mod prompt;
pub mod score;

pub use prompt::{judgment_prompt, variant_prompt, PromptContext};
pub use score::parse_judgment_score;
