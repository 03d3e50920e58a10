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

use anyhow::Result;
use std::path::Path;

#[cfg(unix)]
use super::{connect, disconnect};

/// Open an interactive shell and return the remote exit status.
#[cfg(unix)]
pub async fn open_shell(playbook_path: &Path, sudo: bool) -> Result<u32> {
    let (_, session) = connect(playbook_path).await?;
    let result = session.interactive_shell(sudo).await;
    disconnect(session).await;
    result
}

#[cfg(not(unix))]
pub async fn open_shell(_playbook_path: &Path, _sudo: bool) -> Result<u32> {
    anyhow::bail!("Interactive shells are only supported on Unix platforms")
}
