//! examprep-providers: grading service integrations.
//!
//! Implements the `Grader` trait for Gemini, OpenAI and Anthropic, plus a
//! scripted mock, and loads the examprep configuration file.

pub mod anthropic;
pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;
pub mod prompt;

pub use config::{create_grader, load_config, load_config_from, ExamprepConfig, ProviderConfig};
pub use mock::{MockGrader, MockReply};
