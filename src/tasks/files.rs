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

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use super::Task;
use crate::executor::RemoteCommand;
use crate::remote::Remote;
use crate::transfer::{self, walk::remote_parent, TransferOptions};

/// `mkdir -p` a remote directory.
#[derive(Debug, Clone)]
pub struct CreateDirectory {
    pub path: String,
    pub sudo: bool,
}

#[async_trait]
impl Task for CreateDirectory {
    fn name(&self) -> &str {
        "create_directory"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        let mkdir = RemoteCommand::new("mkdir")
            .args(["-p", self.path.as_str()])
            .sudo(self.sudo)
            .render()?;
        remote.exec(&mkdir).await?;
        Ok(())
    }
}

/// Write literal contents to a remote file, optionally setting its mode.
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub destination: String,
    pub contents: String,
    pub mode: Option<u32>,
}

#[async_trait]
impl Task for CreateFile {
    fn name(&self) -> &str {
        "create_file"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        let preview: String = self.contents.chars().take(10).collect();
        tracing::info!("wrt: {preview}... -> {}", self.destination);

        if let Some(parent) = remote_parent(&self.destination) {
            let mkdir = RemoteCommand::new("mkdir").args(["-p", parent]).render()?;
            remote.exec(&mkdir).await?;
        }

        let transfer = remote.open_transfer().await?;
        let written = async {
            transfer
                .write_contents(&self.destination, self.contents.as_bytes())
                .await?;
            if let Some(mode) = self.mode {
                transfer.set_permissions(&self.destination, mode).await?;
            }
            Ok::<_, crate::Error>(())
        }
        .await;
        let closed = transfer.close().await;

        written.with_context(|| format!("Error writing remote file {}", self.destination))?;
        closed.context("Failed to close transfer session")?;
        Ok(())
    }
}

/// Mirror a local file or directory to the remote host.
#[derive(Debug, Clone)]
pub struct CopyTask {
    pub source: PathBuf,
    pub destination: String,
    pub options: TransferOptions,
}

#[async_trait]
impl Task for CopyTask {
    fn name(&self) -> &str {
        "copy"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        tracing::info!("cpy: {:?} -> {}", self.source, self.destination);
        transfer::copy(remote, &self.source, &self.destination, &self.options)
            .await
            .with_context(|| format!("Failed to copy {:?} to {}", self.source, self.destination))
    }
}
