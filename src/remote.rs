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

//! The capability surface provisioning code runs against.
//!
//! [`Session`](crate::ssh::Session) is the production implementation;
//! tests substitute recording fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::executor::{script_command, scratch_script_path, ExecOptions};
use crate::transfer::TransferChannel;

#[async_trait]
pub trait Remote: Send + Sync {
    /// Login name of the authenticated user.
    fn username(&self) -> &str;

    /// Run `command` with `options` and return its combined output.
    async fn exec_with(&self, command: &str, options: &ExecOptions) -> Result<String>;

    /// Open a file transfer channel on this connection.
    async fn open_transfer(&self) -> Result<Box<dyn TransferChannel>>;

    async fn exec(&self, command: &str) -> Result<String> {
        self.exec_with(command, &ExecOptions::default()).await
    }

    /// Stage `content` as a temporary script, run it unprivileged, remove it.
    async fn script(&self, content: &str) -> Result<String> {
        let command = script_command(content, &scratch_script_path(), false);
        self.exec_with(&command, &ExecOptions::new().silent()).await
    }

    /// Same as [`Remote::script`] but the script runs under `sudo`.
    async fn sudo_script(&self, content: &str) -> Result<String> {
        let command = script_command(content, &scratch_script_path(), true);
        self.exec_with(&command, &ExecOptions::new().silent()).await
    }
}
