//! Module for generating shell completion scripts for the CLI.

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;

/// Generates the completion script for `shell` on stdout.
pub fn run(shell: Shell) {
    let mut app = crate::Cli::command();
    generate(shell, &mut app, "amoura", &mut io::stdout());
}
