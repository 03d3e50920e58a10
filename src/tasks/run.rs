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
use crate::remote::Remote;

/// A free-form command line, optionally prefixed with `sudo`.
#[derive(Debug, Clone)]
pub struct RunCommand {
    pub command: String,
    pub sudo: bool,
}

#[async_trait]
impl Task for RunCommand {
    fn name(&self) -> &str {
        "exec"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        if self.sudo {
            remote.exec(&format!("sudo {}", self.command)).await?;
        } else {
            remote.exec(&self.command).await?;
        }
        Ok(())
    }
}

/// An inline script staged in `/tmp` and executed.
#[derive(Debug, Clone)]
pub struct RunScript {
    pub content: String,
    pub sudo: bool,
}

#[async_trait]
impl Task for RunScript {
    fn name(&self) -> &str {
        "script"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        if self.sudo {
            remote.sudo_script(&self.content).await?;
        } else {
            remote.script(&self.content).await?;
        }
        Ok(())
    }
}
