// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Remote command execution on a PTY-attached exec channel.
//!
//! One call drives one channel to completion: output chunks from both
//! streams are gathered in arrival order, a sudo password prompt is answered
//! in-band, and the exit status decides between the collected output and an
//! [`Error::Command`](crate::Error::Command).

pub mod channel;
pub mod command;
pub mod output;
pub mod script;
pub mod sudo;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::utils::sanitize_command;

pub use channel::{run_to_exit, ChannelEvent, ExecChannel, RusshExecChannel};
pub use command::{escape_single_quotes, quote, RemoteCommand};
pub use output::OutputCollector;
pub use script::{script_command, scratch_script_path};
pub use sudo::{contains_sudo_failure, SudoPassword, SudoResponder};

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// stdout and stderr interleaved in arrival order
    pub output: String,
    pub exit_status: u32,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Environment assignments prefixed to the command line.
    pub env: BTreeMap<String, String>,
    /// Suppress the `inp:` log line, for commands that embed secrets or
    /// whole script bodies.
    pub silent: bool,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Prefix the rendered environment to `command` and validate the result.
pub fn prepare_command(command: &str, options: &ExecOptions) -> Result<String> {
    let command = sanitize_command(command)?;
    let prefix = command::render_env_prefix(&options.env)?;
    let prepared = if prefix.is_empty() {
        command.to_string()
    } else {
        format!("{prefix} {command}")
    };
    sanitize_command(&prepared)?;
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_prepare_command_rejects_nul_in_env_value() {
        let options = ExecOptions::new().env("TOKEN", "abc\0def");
        let err = prepare_command("true", &options).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_prepare_command_without_env() {
        let cmd = prepare_command("uname -a", &ExecOptions::new()).unwrap();
        assert_eq!(cmd, "uname -a");
    }

    #[test]
    fn test_prepare_command_env_sorted_and_quoted() {
        let options = ExecOptions::new()
            .env("ZED", "last")
            .env("DEBIAN_FRONTEND", "noninteractive")
            .env("GREETING", "it's me");
        let cmd = prepare_command("sudo apt-get -qy update", &options).unwrap();
        assert_eq!(
            cmd,
            "DEBIAN_FRONTEND='noninteractive' GREETING='it'\\''s me' ZED='last' sudo apt-get -qy update"
        );
    }

    #[test]
    fn test_prepare_command_rejects_empty_and_nul() {
        assert!(matches!(
            prepare_command("", &ExecOptions::new()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            prepare_command("ls\0-la", &ExecOptions::new()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_prepare_command_rejects_bad_env_key() {
        let options = ExecOptions::new().env("BAD KEY", "x");
        assert!(matches!(
            prepare_command("true", &options),
            Err(Error::InvalidArgument(_))
        ));
    }
}
