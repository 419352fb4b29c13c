//! `onboard` command-line front end.
//!
//! Reads source and target schemas as JSON, runs the suggestion engine and
//! renders the results. Also owns logging setup for the workspace.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
