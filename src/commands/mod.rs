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

//! Subcommand implementations for the `deploysteps` binary.

pub mod exec;
pub mod run;
pub mod shell;
pub mod upload;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

use crate::config::Playbook;
use crate::ssh::Session;

/// Load a playbook and open a session to its host.
pub(crate) async fn connect(playbook_path: &Path) -> Result<(Playbook, Session)> {
    let playbook = Playbook::load(playbook_path).await?;
    let config = playbook.session_config()?;
    let target = format!("{}@{}:{}", config.username, config.host, config.port);

    println!("{} {}", "Connecting to".cyan(), target.bold());
    let session = Session::open(config)
        .await
        .with_context(|| format!("Failed to connect to {target}"))?;
    Ok((playbook, session))
}

/// Close `session`, reporting but not failing on teardown problems.
pub(crate) async fn disconnect(session: Session) {
    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close session cleanly: {e}");
    }
}
