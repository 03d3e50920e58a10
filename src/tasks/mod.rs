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

//! Canned provisioning steps built on the [`Remote`] capability surface.

mod debian;
mod files;
mod run;
mod sshd;
mod users;

use anyhow::Result;
use async_trait::async_trait;

use crate::remote::Remote;

pub use debian::UpdateDebian;
pub use files::{CopyTask, CreateDirectory, CreateFile};
pub use run::{RunCommand, RunScript};
pub use sshd::{
    ensure_setting_script, EnforceSshOtpAndPublicKeyOnly, EnforceSshPublicKeyOnly, SshdSetting,
};
pub use users::{SyncUsers, UserAccount};

/// One provisioning step.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, remote: &dyn Remote) -> Result<()>;
}

/// Run `tasks` in order, stopping at the first failure.
pub async fn run_all(remote: &dyn Remote, tasks: &[Box<dyn Task>]) -> Result<()> {
    use anyhow::Context;

    for (index, task) in tasks.iter().enumerate() {
        tracing::info!("tsk: {} ({}/{})", task.name(), index + 1, tasks.len());
        task.run(remote)
            .await
            .with_context(|| format!("Step {} ({}) failed", index + 1, task.name()))?;
    }
    Ok(())
}
