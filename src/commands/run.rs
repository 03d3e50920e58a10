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
use std::time::Instant;

use super::{connect, disconnect};
use crate::tasks::run_all;

pub async fn run_playbook(playbook_path: &Path) -> Result<()> {
    let (playbook, session) = connect(playbook_path).await?;
    let tasks = match playbook.tasks() {
        Ok(tasks) => tasks,
        Err(e) => {
            disconnect(session).await;
            return Err(e);
        }
    };

    let started = Instant::now();
    let result = run_all(&session, &tasks).await;
    disconnect(session).await;
    result?;

    println!(
        "{} {} step(s) in {:.2}s",
        "Completed".green().bold(),
        tasks.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
