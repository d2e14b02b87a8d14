pub mod core;
pub mod llm;
pub mod pipeline;
pub mod postprocess;
pub mod protect;
pub mod quality;
pub mod retrieval;
pub mod samples;
pub mod server;
pub mod state;
pub mod style;
