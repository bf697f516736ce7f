//! Documentation generator for Model Context Protocol servers.
//!
//! Connects to a server over a subprocess's stdio, legacy SSE, or streamable
//! HTTP, lists its tools, resources and prompts, optionally invokes tools for
//! example output, merges context files, and renders Markdown, JSON, HTML,
//! PDF, or a Hugo site tree.

pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod extract;
pub mod format;
pub mod runner;
pub mod schema;
pub mod transport;
