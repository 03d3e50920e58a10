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

use async_trait::async_trait;
use russh::client::Handle;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::connection::ClientHandler;
use crate::error::{Error, Result};
use crate::transfer::TransferChannel;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// [`TransferChannel`] backed by an SFTP subsystem channel.
///
/// Requires `Subsystem sftp` to be enabled in the remote sshd_config.
pub struct SftpTransfer {
    sftp: SftpSession,
}

impl SftpTransfer {
    pub(crate) async fn open(handle: &Handle<ClientHandler>) -> Result<Self> {
        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::Transport(format!("failed to start SFTP session: {e}")))?;
        Ok(Self { sftp })
    }

    async fn create(&self, remote: &str) -> Result<russh_sftp::client::fs::File> {
        self.sftp
            .open_with_flags(
                remote,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| Error::remote_io(remote, e))
    }
}

#[async_trait]
impl TransferChannel for SftpTransfer {
    async fn upload(&self, local: &Path, remote: &str) -> Result<u64> {
        let mut source = tokio::fs::File::open(local)
            .await
            .map_err(|e| Error::local_io(local, e))?;
        let mut target = self.create(remote).await?;

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut written = 0u64;
        loop {
            let n = source
                .read(&mut buffer)
                .await
                .map_err(|e| Error::local_io(local, e))?;
            if n == 0 {
                break;
            }
            target
                .write_all(&buffer[..n])
                .await
                .map_err(|e| Error::remote_io(remote, e))?;
            written += n as u64;
        }

        target.flush().await.map_err(|e| Error::remote_io(remote, e))?;
        target
            .shutdown()
            .await
            .map_err(|e| Error::remote_io(remote, e))?;
        Ok(written)
    }

    async fn write_contents(&self, remote: &str, contents: &[u8]) -> Result<()> {
        let mut target = self.create(remote).await?;
        target
            .write_all(contents)
            .await
            .map_err(|e| Error::remote_io(remote, e))?;
        target.flush().await.map_err(|e| Error::remote_io(remote, e))?;
        target
            .shutdown()
            .await
            .map_err(|e| Error::remote_io(remote, e))
    }

    async fn set_permissions(&self, remote: &str, mode: u32) -> Result<()> {
        let attrs = FileAttributes {
            size: None,
            uid: None,
            user: None,
            gid: None,
            group: None,
            permissions: Some(mode),
            atime: None,
            mtime: None,
        };
        self.sftp
            .set_metadata(remote, attrs)
            .await
            .map_err(|e| Error::remote_io(remote, e))
    }

    async fn close(&self) -> Result<()> {
        self.sftp
            .close()
            .await
            .map_err(|e| Error::Transport(format!("failed to close SFTP session: {e}")))
    }
}
