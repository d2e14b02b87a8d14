//! Column rules, discourse cues and prompt assembly.

mod column;
mod cues;
mod excerpt;
mod guide;
mod prompt;

pub use column::{infer_column, resolve_column, ColumnSource, ResolvedColumn};
pub use cues::{cue_coverage, extract_discourse_cues, split_sentences};
pub use excerpt::{sample_excerpt, take_chars, truncate_by_paragraph};
pub use guide::{ColumnGuide, StyleGuide};
pub use prompt::{PromptBuilder, PromptInput};
