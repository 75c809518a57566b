//! remedyctl - command-line front-end for the remediation engine.

pub mod cli;
pub mod commands;
pub mod output;
