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

//! Answers for keyboard-interactive challenges.
//!
//! A single responder serves both "OTP then key" and plain password
//! policies: every prompt is classified by a case-insensitive substring
//! match and answered from the configured credentials.

pub mod totp;

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// What a keyboard-interactive prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// One-time verification code (`Verification code:`)
    Verification,
    /// Account password (`Password:`)
    Password,
    Other,
}

impl PromptKind {
    pub fn classify(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        if lower.contains("verification") {
            Self::Verification
        } else if lower.contains("password") {
            Self::Password
        } else {
            Self::Other
        }
    }
}

/// Produces responses for keyboard-interactive prompts.
#[derive(Clone, Default)]
pub struct ChallengeResponder {
    password: Option<SecretString>,
    otp_secret: Option<SecretString>,
}

impl ChallengeResponder {
    pub fn new(password: Option<SecretString>, otp_secret: Option<SecretString>) -> Self {
        Self {
            password,
            otp_secret,
        }
    }

    /// Response for a prompt at the given unix time.
    ///
    /// Unanswerable prompts get an empty response, which lets the server
    /// reject the attempt instead of stalling the handshake.
    pub fn respond_at(&self, prompt: &str, unix_time: u64) -> Zeroizing<String> {
        match PromptKind::classify(prompt) {
            PromptKind::Verification => {
                tracing::info!("otp: prompt received");
                let Some(secret) = &self.otp_secret else {
                    tracing::error!("otp: secret not provided");
                    return Zeroizing::new(String::new());
                };
                match totp::generate_at(secret.expose_secret(), unix_time) {
                    Ok(code) => Zeroizing::new(code),
                    Err(e) => {
                        tracing::error!("otp: failed to generate code: {e}");
                        Zeroizing::new(String::new())
                    }
                }
            }
            PromptKind::Password => {
                tracing::info!("auth: password prompt received");
                self.password
                    .as_ref()
                    .map(|p| Zeroizing::new(p.expose_secret().to_string()))
                    .unwrap_or_default()
            }
            PromptKind::Other => {
                tracing::debug!("auth: unrecognized prompt {prompt:?}, answering empty");
                Zeroizing::new(String::new())
            }
        }
    }

    /// Response for a prompt using the current time.
    pub fn respond(&self, prompt: &str) -> Zeroizing<String> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.respond_at(prompt, now)
    }
}

impl std::fmt::Debug for ChallengeResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeResponder")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("otp_secret", &self.otp_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
