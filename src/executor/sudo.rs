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

//! Sudo password prompt detection and answering.
//!
//! Commands run on a PTY, so `sudo` writes its prompt to the terminal and
//! waits on stdin. The executor hands every chunk to [`SudoResponder`]; a
//! chunk that is exactly the prompt for the session user is answered with
//! the password and dropped from the captured output.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Patterns indicating sudo authentication failure
pub const SUDO_FAILURE_PATTERNS: &[&str] = &[
    "sorry, try again",
    "incorrect password",
    "authentication failure",
    "sudo: 3 incorrect password attempts",
    "sudo: no password was provided",
];

/// A sudo password that is cleared from memory on drop.
#[derive(Clone)]
pub struct SudoPassword {
    inner: SecretString,
}

impl SudoPassword {
    /// Create a new SudoPassword. Empty passwords are rejected.
    pub fn new(password: String) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidArgument(
                "Password cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            inner: SecretString::from(password),
        })
    }

    /// Get the password with a newline appended for sudo input.
    ///
    /// Returns a `Zeroizing<Vec<u8>>` so the copy is also cleared.
    pub fn with_newline(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.inner.expose_secret().as_bytes().to_vec();
        bytes.push(b'\n');
        Zeroizing::new(bytes)
    }
}

impl From<SecretString> for SudoPassword {
    fn from(inner: SecretString) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for SudoPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SudoPassword")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Recognizes the sudo prompt for one user and produces the answer.
///
/// Immutable once built; a session creates it after the handshake.
#[derive(Debug, Clone)]
pub struct SudoResponder {
    prompt: String,
    password: Option<SudoPassword>,
}

impl SudoResponder {
    pub fn new(username: &str, password: Option<SudoPassword>) -> Self {
        Self {
            prompt: format!("[sudo] password for {username}:"),
            password,
        }
    }

    /// True when `chunk`, ignoring surrounding whitespace, is exactly the prompt.
    pub fn is_prompt(&self, chunk: &str) -> bool {
        chunk.trim() == self.prompt
    }

    /// Bytes to write to stdin in reply to the prompt.
    ///
    /// Without a configured password an empty line is sent so sudo fails
    /// fast instead of hanging the command.
    pub fn answer(&self) -> Zeroizing<Vec<u8>> {
        match &self.password {
            Some(password) => {
                tracing::debug!("sudo: prompt detected, sending password");
                password.with_newline()
            }
            None => {
                tracing::warn!("sudo: prompt detected but no password is configured");
                Zeroizing::new(b"\n".to_vec())
            }
        }
    }
}

/// Check if the given output contains a sudo authentication failure message.
pub fn contains_sudo_failure(output: &str) -> bool {
    let lower = output.to_lowercase();
    SUDO_FAILURE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(*pattern))
}
