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

use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::options::TransferOptions;
use super::walk::{
    base_name, collect_directories, deepest_directories, join_remote, remote_parent,
    remote_path_for, sorted_entries,
};
use super::TransferChannel;
use crate::error::{Error, Result};
use crate::executor::RemoteCommand;
use crate::remote::Remote;
use crate::utils::{format_bytes, permission_bits};

/// Mirror a local file or directory tree to `destination` on `remote`.
///
/// One transfer session is opened for the whole call and closed before
/// returning, whether or not the copy succeeded.
pub async fn copy<R>(
    remote: &R,
    source: &Path,
    destination: &str,
    options: &TransferOptions,
) -> Result<()>
where
    R: Remote + ?Sized,
{
    if source.as_os_str().is_empty() {
        return Err(Error::InvalidArgument("Empty source path".to_string()));
    }
    if destination.trim().is_empty() {
        return Err(Error::InvalidArgument("Empty destination path".to_string()));
    }

    let metadata = tokio::fs::symlink_metadata(source)
        .await
        .map_err(|e| Error::local_io(source, e))?;

    let transfer = remote.open_transfer().await?;
    let job = Mirror {
        remote,
        transfer: transfer.as_ref(),
        options,
    };

    let result = if metadata.is_dir() {
        job.copy_directory(source, destination).await
    } else {
        job.copy_file(source, destination).await
    };

    let closed = transfer.close().await;
    if let Err(e) = &closed {
        tracing::warn!("Failed to close transfer session: {e}");
    }
    result.and(closed)
}

struct Mirror<'a, R: ?Sized> {
    remote: &'a R,
    transfer: &'a dyn TransferChannel,
    options: &'a TransferOptions,
}

impl<'a, R> Mirror<'a, R>
where
    R: Remote + ?Sized,
{
    async fn copy_file(&self, source: &Path, destination: &str) -> Result<()> {
        if let Some(parent) = remote_parent(destination) {
            self.make_directories(&[parent.to_string()]).await?;
        }
        self.upload_file(source, destination).await
    }

    async fn copy_directory(&self, source: &Path, destination: &str) -> Result<()> {
        if self.options.clean {
            if destination.trim_end_matches('/').is_empty() {
                return Err(Error::InvalidArgument(
                    "Refusing to clean the remote root directory".to_string(),
                ));
            }
            let rm = RemoteCommand::new("rm")
                .args(["-rf", destination])
                .sudo(self.options.sudo)
                .render()?;
            self.remote.exec(&rm).await?;
        }

        let directories = collect_directories(source)?;
        let mut targets = deepest_directories(&directories)
            .iter()
            .map(|dir| remote_path_for(source, dir, destination))
            .collect::<Result<Vec<_>>>()?;
        if targets.is_empty() {
            targets.push(destination.to_string());
        }
        tracing::debug!(
            "Creating {} remote director{} under {destination}",
            targets.len(),
            if targets.len() == 1 { "y" } else { "ies" }
        );
        // Every upload below depends on these directories existing.
        self.make_directories(&targets).await?;

        self.mirror(source.to_path_buf(), destination.to_string())
            .await
    }

    async fn make_directories(&self, targets: &[String]) -> Result<()> {
        let mkdir = RemoteCommand::new("mkdir")
            .arg("-p")
            .args(targets.iter().cloned())
            .sudo(self.options.sudo)
            .render()?;
        self.remote.exec(&mkdir).await.map(|_| ())
    }

    /// Upload the contents of `local_dir`; siblings run concurrently.
    fn mirror(&'a self, local_dir: PathBuf, remote_dir: String) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut pending: Vec<BoxFuture<'a, Result<()>>> = Vec::new();

            for entry in sorted_entries(&local_dir)? {
                let path = entry.path();
                let target = join_remote(&remote_dir, &entry.file_name().to_string_lossy());
                let file_type = entry.file_type().map_err(|e| Error::local_io(&path, e))?;

                if file_type.is_dir() {
                    pending.push(self.mirror(path, target));
                } else if file_type.is_file() || path.is_file() {
                    pending.push(
                        async move { self.upload_file(&path, &target).await }.boxed(),
                    );
                } else {
                    tracing::warn!("Skipping {path:?}: not a regular file or directory");
                }
            }

            try_join_all(pending).await.map(|_| ())
        }
        .boxed()
    }

    /// Upload one file, staging it under `/tmp` and moving it into place
    /// with `sudo` when elevated. Only the transfer itself is retried.
    async fn upload_file(&self, local: &Path, remote_path: &str) -> Result<()> {
        if !self.options.sudo {
            return self.upload_with_retry(local, remote_path).await;
        }

        let staging = format!("/tmp/{}_{}", base_name(local), Uuid::new_v4().simple());
        self.upload_with_retry(local, &staging).await?;
        let mv = RemoteCommand::new("mv")
            .args([staging.as_str(), remote_path])
            .sudo(true)
            .render()?;
        self.remote.exec(&mv).await?;
        tracing::debug!("Moved {staging} -> {remote_path}");
        Ok(())
    }

    async fn upload_with_retry(&self, local: &Path, remote_path: &str) -> Result<()> {
        let attempts = self.options.attempts();
        let mut attempt = 1;

        loop {
            match self.upload_once(local, remote_path).await {
                Ok(()) => return Ok(()),
                Err(e @ Error::InvalidArgument(_)) => return Err(e),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Retrying upload of {local:?} ({attempt}/{}): {e}",
                        self.options.max_retries
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::Transfer {
                        local: local.to_path_buf(),
                        remote: remote_path.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
            }
        }
    }

    async fn upload_once(&self, local: &Path, remote_path: &str) -> Result<()> {
        let metadata = tokio::fs::metadata(local)
            .await
            .map_err(|e| Error::local_io(local, e))?;
        let mode = permission_bits(&metadata);

        let written = self.transfer.upload(local, remote_path).await?;
        self.transfer.set_permissions(remote_path, mode).await?;
        tracing::debug!("Uploaded {local:?} -> {remote_path} ({})", format_bytes(written));
        Ok(())
    }
}
