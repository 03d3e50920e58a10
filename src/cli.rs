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

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::transfer::options::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};

#[derive(Parser, Debug)]
#[command(
    name = "deploysteps",
    version,
    about = "Provision Debian hosts over SSH",
    long_about = "Provision Debian hosts over SSH.\n\n\
                  A playbook names the host and credentials to use and an ordered list of steps.\n\
                  Secrets may be supplied through DEPLOYSTEPS_PASSWORD and DEPLOYSTEPS_OTP_SECRET."
)]
pub struct Cli {
    #[arg(
        short = 'v',
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run every step of a playbook in order")]
    Run {
        #[arg(help = "Playbook file")]
        playbook: PathBuf,
    },

    #[command(about = "Execute one command on the playbook's host")]
    Exec {
        #[arg(help = "Playbook file")]
        playbook: PathBuf,

        #[arg(long, help = "Run the command with sudo")]
        sudo: bool,

        #[arg(
            trailing_var_arg = true,
            required = true,
            num_args = 1..,
            help = "Command to execute"
        )]
        command: Vec<String>,
    },

    #[command(about = "Open an interactive shell on the playbook's host")]
    Shell {
        #[arg(help = "Playbook file")]
        playbook: PathBuf,

        #[arg(long, help = "Authenticate sudo when the shell starts")]
        sudo: bool,
    },

    #[command(about = "Upload a file or directory tree to the playbook's host")]
    Upload {
        #[arg(help = "Playbook file")]
        playbook: PathBuf,

        #[arg(help = "Local file or directory")]
        source: PathBuf,

        #[arg(help = "Remote destination path")]
        destination: String,

        #[arg(long, help = "Remove the destination directory first")]
        clean: bool,

        #[arg(long, help = "Stage files in /tmp and move them into place with sudo")]
        sudo: bool,

        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, help = "Retries per failed file")]
        max_retries: u32,

        #[arg(
            long,
            default_value_t = DEFAULT_RETRY_DELAY.as_millis() as u64,
            help = "Delay between retries in milliseconds"
        )]
        retry_delay_ms: u64,
    },
}
