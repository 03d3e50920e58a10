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
use clap::Parser;

use deploysteps::{
    cli::{Cli, Commands},
    commands::{exec::execute_command, run::run_playbook, shell::open_shell, upload::upload},
    transfer::TransferOptions,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { playbook } => run_playbook(&playbook).await,
        Commands::Exec {
            playbook,
            sudo,
            command,
        } => execute_command(&playbook, &command, sudo).await,
        Commands::Shell { playbook, sudo } => {
            let status = open_shell(&playbook, sudo).await?;
            if status != 0 {
                std::process::exit(i32::try_from(status).unwrap_or(1));
            }
            Ok(())
        }
        Commands::Upload {
            playbook,
            source,
            destination,
            clean,
            sudo,
            max_retries,
            retry_delay_ms,
        } => {
            let options = TransferOptions::new()
                .clean(clean)
                .sudo(sudo)
                .max_retries(max_retries)
                .retry_delay(std::time::Duration::from_millis(retry_delay_ms));
            upload(&playbook, &source, &destination, &options).await
        }
    }
}
