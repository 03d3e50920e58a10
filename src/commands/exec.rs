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
use owo_colors::OwoColorize;
use std::path::Path;

use super::{connect, disconnect};
use crate::remote::Remote;

/// Run one command and print its output.
pub async fn execute_command(playbook_path: &Path, command: &[String], sudo: bool) -> Result<()> {
    let command = command.join(" ");
    let command = if sudo {
        format!("sudo {command}")
    } else {
        command
    };

    let (_, session) = connect(playbook_path).await?;
    let result = session.exec(&command).await;
    disconnect(session).await;

    match result {
        Ok(output) => {
            print!("{output}");
            Ok(())
        }
        Err(e) => {
            if let Some(output) = e.output() {
                eprint!("{output}");
            }
            eprintln!("{} {e}", "Command failed:".red().bold());
            Err(e.into())
        }
    }
}
