//! # kuatia-cli — Command-Line Interface
//!
//! Wires the issuing agent to its concrete collaborators for terminal
//! use: an interactive confirmation channel over stdin, a JSON-file
//! configuration store under the state directory, and a YAML agent
//! configuration with the secret key taken from the environment.

pub mod config;
pub mod confirm;
pub mod file_store;
pub mod invalidate;
pub mod issue;
pub mod show;
