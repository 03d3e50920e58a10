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

use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Options for [`copy`](super::copy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Remove the destination directory before mirroring.
    pub clean: bool,
    /// Stage each file in `/tmp` and move it into place with `sudo`.
    pub sudo: bool,
    /// Further attempts after a failed file upload.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            clean: false,
            sudo: false,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Total attempts per file.
    pub(crate) fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
