//! MCP server exposing GitHub Action release lookups over stdio.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod release;
pub mod repository;
pub mod schema;
pub mod server;
pub mod tools;
pub mod types;

pub use error::{Error, GitHubError, GitHubErrorKind};
