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

//! Error taxonomy shared by the session, executor and transfer layers.

use std::io;
use std::path::PathBuf;

/// Errors surfaced by the provisioning core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The TCP connection or SSH key exchange could not be established.
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// Every offered credential was rejected by the server.
    #[error("authentication failed for {username}@{host}")]
    Authentication { username: String, host: String },

    /// The handshake did not complete within the configured interval.
    #[error("timed out after {seconds}s while connecting to {host}")]
    Timeout { host: String, seconds: u64 },

    /// The remote process exited with a non-zero status or was killed by a signal.
    #[error("remote command failed with exit code {}{}", fmt_exit_code(.exit_code), fmt_signal(.signal))]
    Command {
        exit_code: Option<u32>,
        signal: Option<String>,
        output: String,
    },

    /// The connection dropped or a channel failed mid-operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// A local file or directory could not be read.
    #[error("local I/O error on {path:?}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write, stat or permission change failed on the remote side.
    #[error("remote I/O error on {path}: {reason}")]
    RemoteIo { path: String, reason: String },

    /// A file upload kept failing after all retries were spent.
    #[error("failed to upload {local:?} to {remote} after {attempts} attempt(s): {source}")]
    Transfer {
        local: PathBuf,
        remote: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The call itself was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

fn fmt_exit_code(code: &Option<u32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn fmt_signal(signal: &Option<String>) -> String {
    signal
        .as_ref()
        .map(|s| format!(", signal: {s}"))
        .unwrap_or_default()
}

impl Error {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote_io(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Output captured before the failure, when the remote command produced any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Command { output, .. } => Some(output),
            Self::Transfer { source, .. } => source.output(),
            _ => None,
        }
    }

    /// Exit code of a failed remote command.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            Self::Command { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

impl From<russh::Error> for Error {
    fn from(e: russh::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
