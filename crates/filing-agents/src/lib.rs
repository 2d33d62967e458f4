//! Financial-filing analysis over coordinated multi-participant sessions.
//!
//! This crate supplies the application half of the system: document
//! ingestion, the knowledge-store adapter, the LLM-backed participant
//! cast, and the workbench surface. Turn-taking itself lives in the
//! `roundtable` crate.
//!
//! - [`ingest`]: resilient extraction of a filing into normalized records
//! - [`store`]: graph knowledge store behind an HTTP API
//! - [`agents`]: chat client, prompts, responders, and the cast factory
//! - [`workbench`]: explicit state holder for interactive surfaces
//! - [`config`]: environment-driven configuration with runnable defaults

pub mod agents;
pub mod config;
pub mod ingest;
pub mod store;
pub mod workbench;
