//! phrasegen - batched LLM flashcard generation pipeline
//!
//! Turns learner preferences into a validated, deduplicated set of Thai
//! flashcard phrases by issuing a bounded sequence of batched calls to a
//! generative-model backend. Transient failures are retried with backoff;
//! malformed or invalid responses are recorded and never retried; partial
//! results are merged into one coherent outcome with a diagnostic summary.
//!
//! Library entry point is [`orchestrator::Orchestrator`]:
//!
//! ```no_run
//! use phrasegen::config::Config;
//! use phrasegen::orchestrator::Orchestrator;
//! use phrasegen::types::{GenerationPreferences, GenerationRequest, ProficiencyLevel};
//!
//! # async fn demo() {
//! let config = Config::discover().unwrap();
//! let orchestrator = Orchestrator::from_config(&config);
//! let preferences = GenerationPreferences::new(ProficiencyLevel::Intermediate)
//!     .with_topic("street food");
//! let result = orchestrator.run(GenerationRequest::new(preferences, 10)).await;
//! println!("{} phrases", result.phrases.len());
//! # }
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod llm;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod retry;
pub mod types;
pub mod validate;

pub use orchestrator::Orchestrator;
pub use types::{
    GenerationPreferences, GenerationRequest, GenerationResult, Phrase, ProficiencyLevel,
};
