//! Few-shot example selection.
//!
//! - `tokenizer`: Han bigram / ASCII word tokenisation
//! - `bm25`: lexical index over the sample corpus
//! - `semantic`: embedding cosine with a keyword-group fallback
//! - `retriever`: weighted hybrid ranking, column preference and title diversity

mod bm25;
mod retriever;
mod semantic;
mod tokenizer;

pub use bm25::Bm25Index;
pub use retriever::{title_similarity, HybridRetriever, RetrievedRef, ScoredSample};
pub use semantic::{concept_overlap, cosine_similarity};
pub use tokenizer::{is_han, tokenize};
