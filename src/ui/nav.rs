//! Leaving the game for the hub.

use std::process::Command;

use anyhow::{bail, Context, Result};

/// Why the main loop stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Exit {
    Quit,
    Hub,
}

/// Split a configured hub command into program and arguments.
fn parse_command(command: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Hand over to the hub. Called after the terminal is restored; with no
/// command configured the process simply exits.
pub fn go_to_hub(command: Option<&str>) -> Result<()> {
    let Some((program, args)) = command.and_then(parse_command) else {
        tracing::info!("no hub command configured; exiting");
        return Ok(());
    };
    tracing::info!(program, "launching hub");
    let status = Command::new(program)
        .args(&args)
        .status()
        .with_context(|| format!("failed to launch hub command `{program}`"))?;
    if !status.success() {
        bail!("hub command `{program}` exited with {status}");
    }
    Ok(())
}
