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
use async_trait::async_trait;

use super::Task;
use crate::executor::ExecOptions;
use crate::remote::Remote;

const APT_STEPS: &[&str] = &[
    "sudo apt-get -qy update",
    "sudo apt-get -qy upgrade",
    "sudo apt-get -qy autoremove",
];

/// Refresh package lists, upgrade everything and drop unused packages.
#[derive(Debug, Clone, Default)]
pub struct UpdateDebian;

#[async_trait]
impl Task for UpdateDebian {
    fn name(&self) -> &str {
        "update_debian"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        let options = ExecOptions::new().env("DEBIAN_FRONTEND", "noninteractive");
        for step in APT_STEPS {
            remote.exec_with(step, &options).await?;
        }
        Ok(())
    }
}
