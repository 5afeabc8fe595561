//! LLM-driven autonomous browser agent.
//!
//! The core is an observe/decide/act loop: each step the
//! [`driver::SessionDriver`] snapshots the page ([`dom`]), asks the
//! decision client ([`brain`]) for one free-text directive, parses it
//! into a typed action ([`grammar`]) and executes it against the
//! browser ([`hands`]), then applies the termination policy (step
//! budget, repetition detection, forced-completion ceiling). The
//! browser and the model are both black boxes behind the [`browser::Page`]
//! and [`llm::LlmClient`] traits, which is also what makes the loop
//! testable without either.

pub mod brain;
pub mod browser;
pub mod config;
pub mod dom;
pub mod driver;
pub mod error;
pub mod face;
pub mod grammar;
pub mod hands;
pub mod llm;
pub mod scrape;
pub mod types;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use types::{StepRecord, StepStatus, TaskReport};
