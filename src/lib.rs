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

//! Provision Debian hosts over SSH.
//!
//! The core is a [`Session`](ssh::Session) that runs commands on a PTY with
//! in-band sudo password answering, and a [`copy`](transfer::copy) engine
//! that mirrors local trees over SFTP with per-file retries. Canned
//! provisioning steps in [`tasks`] are built on the [`Remote`] trait.
//!
//! ```no_run
//! use deploysteps::{Remote, Session, SessionConfig, TransferOptions};
//! use std::path::Path;
//!
//! # async fn example() -> deploysteps::Result<()> {
//! let config = SessionConfig::new("app1.example.com", "deploy").with_password("secret");
//! let session = Session::open(config).await?;
//! session.exec("sudo apt-get -qy update").await?;
//! deploysteps::transfer::copy(
//!     &session,
//!     Path::new("./stacks"),
//!     "/srv/app",
//!     &TransferOptions::new().clean(true),
//! )
//! .await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod pty;
pub mod remote;
pub mod ssh;
pub mod tasks;
pub mod transfer;
pub mod utils;

pub use error::{Error, Result};
pub use executor::{ExecOptions, RemoteCommand};
pub use remote::Remote;
pub use ssh::{Session, SessionConfig, SessionState, StrictHostKeyChecking};
pub use tasks::Task;
pub use transfer::{TransferChannel, TransferOptions};
