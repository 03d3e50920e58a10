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

//! Recursive file tree mirroring over SFTP.

mod engine;
pub mod options;
pub mod walk;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub use engine::copy;
pub use options::TransferOptions;

/// File operations on one open transfer session.
///
/// Methods take `&self` so sibling uploads can share a session.
#[async_trait]
pub trait TransferChannel: Send + Sync {
    /// Stream a local file into `remote`, creating or truncating it.
    /// Returns the number of bytes written.
    async fn upload(&self, local: &Path, remote: &str) -> Result<u64>;

    /// Create or truncate `remote` with `contents`.
    async fn write_contents(&self, remote: &str, contents: &[u8]) -> Result<()>;

    /// Set the permission bits of `remote`.
    async fn set_permissions(&self, remote: &str, mode: u32) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
