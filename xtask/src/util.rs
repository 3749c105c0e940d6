// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::{Result, bail};
use std::env::consts;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variables set internally that would only clutter the
/// printed command.
const IGNORED_VARS: [&str; 3] = ["PATH", "RUSTC", "RUSTDOC"];

/// Format a `Command` as a `String`.
///
/// Example: "VAR=val program --arg1 arg2".
pub fn command_to_string(cmd: &Command) -> String {
    let vars = cmd
        .get_envs()
        .filter(|(name, _)| !IGNORED_VARS.contains(&name.to_str().unwrap_or_default()))
        .map(|(name, val)| {
            format!(
                "{}={}",
                name.to_string_lossy(),
                val.unwrap_or_default().to_string_lossy()
            )
        });

    let program = std::iter::once(cmd.get_program().to_string_lossy().to_string());
    let args = cmd.get_args().map(|arg| arg.to_string_lossy().to_string());

    vars.chain(program).chain(args).collect::<Vec<_>>().join(" ")
}

/// Print a `Command` and run it, then check that it completes
/// successfully.
pub fn run_cmd(mut cmd: Command) -> Result<()> {
    println!("{}", command_to_string(&cmd));

    let status = cmd.status()?;
    if status.success() {
        Ok(())
    } else {
        bail!("command failed: {}", status);
    }
}

// Use these instead of `#[cfg(...)]` so that code for every host gets
// checked at compile time.

pub fn is_linux_host() -> bool {
    consts::OS == "linux"
}

pub fn is_windows_host() -> bool {
    consts::FAMILY == "windows"
}

/// Return the first of `candidates` that exists on disk.
pub fn first_existing<'a, I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
}
