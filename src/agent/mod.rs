//! Chat loop and language model collaborator

mod llm;
mod runner;
mod speech;

pub use llm::{ChatCompletionsClient, LanguageModel};
pub use runner::{ChatLoop, Reply};
pub use speech::clean_for_speech;
