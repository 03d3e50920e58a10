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
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Instant;

use super::{connect, disconnect};
use crate::transfer::{copy, TransferOptions};

pub async fn upload(
    playbook_path: &Path,
    source: &Path,
    destination: &str,
    options: &TransferOptions,
) -> Result<()> {
    let (_, session) = connect(playbook_path).await?;

    println!(
        "{} {:?} {} {}",
        "Uploading".cyan(),
        source,
        "->".dimmed(),
        destination.bold()
    );
    let started = Instant::now();
    let result = copy(&session, source, destination, options).await;
    disconnect(session).await;
    result.with_context(|| format!("Failed to upload {source:?} to {destination}"))?;

    println!(
        "{} in {:.2}s",
        "Upload complete".green().bold(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
