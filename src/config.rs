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

//! Playbook files: where to connect, which accounts exist and what to run.
//!
//! ```yaml
//! connection:
//!   host: app1.example.com
//!   username: deploy
//!   private_key_path: ~/.ssh/id_ed25519
//! users:
//!   - username: alice
//!     password: change-me
//!     groups: [sudo]
//! steps:
//!   - update_debian
//!   - create_directory: { path: /srv/app, sudo: true }
//!   - copy: { source: ./stacks, destination: /srv/app, clean: true }
//!   - sync_users
//! ```

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ssh::{SessionConfig, StrictHostKeyChecking, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
use crate::tasks::{
    CopyTask, CreateDirectory, CreateFile, EnforceSshOtpAndPublicKeyOnly,
    EnforceSshPublicKeyOnly, RunCommand, RunScript, SyncUsers, Task, UpdateDebian, UserAccount,
};
use crate::transfer::TransferOptions;
use crate::utils::expand_tilde;

/// Fallback for `connection.password`.
pub const PASSWORD_ENV: &str = "DEPLOYSTEPS_PASSWORD";
/// Fallback for `connection.otp_secret`.
pub const OTP_SECRET_ENV: &str = "DEPLOYSTEPS_OTP_SECRET";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Playbook {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Directory relative local paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
    #[serde(default)]
    pub otp_secret: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub strict_host_key_checking: Option<String>,
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub public_keys: Vec<String>,
    #[serde(default)]
    pub otp_secret: Option<String>,
}

/// File mode given either as an octal string (`"0600"`) or as digits
/// that read as octal (`600`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FileMode {
    Digits(u32),
    Text(String),
}

impl FileMode {
    pub fn to_bits(&self) -> Result<u32> {
        let text = match self {
            Self::Digits(d) => d.to_string(),
            Self::Text(t) => t.trim().to_string(),
        };
        let digits = text.strip_prefix("0o").unwrap_or(&text);
        let bits = u32::from_str_radix(digits, 8)
            .with_context(|| format!("Invalid file mode {text:?}, expected octal digits"))?;
        if bits > 0o7777 {
            anyhow::bail!("File mode {text:?} is out of range");
        }
        Ok(bits)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    UpdateDebian,
    CreateDirectory {
        path: String,
        #[serde(default)]
        sudo: bool,
    },
    CreateFile {
        destination: String,
        contents: String,
        #[serde(default)]
        chmod: Option<FileMode>,
    },
    Copy {
        source: PathBuf,
        destination: String,
        #[serde(default)]
        clean: bool,
        #[serde(default)]
        sudo: bool,
        #[serde(default)]
        max_retries: Option<u32>,
        #[serde(default)]
        retry_delay_ms: Option<u64>,
    },
    SyncUsers,
    EnforceSshPublicKeyOnly,
    EnforceSshOtpAndPublicKeyOnly,
    Exec {
        command: String,
        #[serde(default)]
        sudo: bool,
    },
    Script {
        content: String,
        #[serde(default)]
        sudo: bool,
    },
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

/// Read a non-empty value from the environment.
fn env_secret(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            tracing::debug!("Using {name} from the environment");
            Some(value)
        }
        _ => None,
    }
}

impl Playbook {
    /// Load and parse a playbook file.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);
        let content = tokio::fs::read_to_string(&expanded_path)
            .await
            .with_context(|| format!("Failed to read playbook at {}", expanded_path.display()))?;

        let mut playbook = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse playbook at {}", expanded_path.display()))?;
        playbook.base_dir = expanded_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(playbook)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Invalid playbook YAML")
    }

    /// Resolve a local path from the playbook against its directory.
    pub fn resolve_local(&self, path: &Path) -> PathBuf {
        let expanded = expand_tilde(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    /// Session parameters, with secrets filled from the environment and the
    /// private key read from disk.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let conn = &self.connection;
        let mut config = SessionConfig::new(&conn.host, &conn.username)
            .with_port(conn.port)
            .with_connect_timeout(Duration::from_secs(conn.connect_timeout_secs));

        if let Some(password) = conn.password.clone().or_else(|| env_secret(PASSWORD_ENV)) {
            config = config.with_password(password);
        }
        if let Some(secret) = conn.otp_secret.clone().or_else(|| env_secret(OTP_SECRET_ENV)) {
            config = config.with_otp_secret(secret);
        }
        if let Some(key_path) = &conn.private_key_path {
            let key_path = self.resolve_local(key_path);
            let key = std::fs::read_to_string(&key_path)
                .with_context(|| format!("Failed to read private key {}", key_path.display()))?;
            config = config.with_private_key(key);
        }
        if let Some(passphrase) = &conn.private_key_passphrase {
            config = config.with_private_key_passphrase(passphrase.clone());
        }
        if let Some(mode) = &conn.strict_host_key_checking {
            config = config.with_strict_host_key_checking(
                mode.parse::<StrictHostKeyChecking>()
                    .context("Invalid strict_host_key_checking")?,
            );
        }
        if let Some(path) = &conn.known_hosts_path {
            config = config.with_known_hosts_path(self.resolve_local(path));
        }

        config.validate().context("Invalid connection settings")?;
        Ok(config)
    }

    pub fn user_accounts(&self) -> Vec<UserAccount> {
        self.users
            .iter()
            .map(|u| UserAccount {
                username: u.username.clone(),
                password: SecretString::from(u.password.clone()),
                groups: u.groups.clone(),
                public_keys: u.public_keys.clone(),
                otp_secret: u.otp_secret.clone().map(SecretString::from),
            })
            .collect()
    }

    /// Build the task list in playbook order.
    pub fn tasks(&self) -> Result<Vec<Box<dyn Task>>> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                self.task_for(step)
                    .with_context(|| format!("Invalid step {}", index + 1))
            })
            .collect()
    }

    fn task_for(&self, step: &Step) -> Result<Box<dyn Task>> {
        let task: Box<dyn Task> = match step {
            Step::UpdateDebian => Box::new(UpdateDebian),
            Step::CreateDirectory { path, sudo } => Box::new(CreateDirectory {
                path: path.clone(),
                sudo: *sudo,
            }),
            Step::CreateFile {
                destination,
                contents,
                chmod,
            } => Box::new(CreateFile {
                destination: destination.clone(),
                contents: contents.clone(),
                mode: chmod.as_ref().map(FileMode::to_bits).transpose()?,
            }),
            Step::Copy {
                source,
                destination,
                clean,
                sudo,
                max_retries,
                retry_delay_ms,
            } => {
                let mut options = TransferOptions::new().clean(*clean).sudo(*sudo);
                if let Some(max_retries) = max_retries {
                    options = options.max_retries(*max_retries);
                }
                if let Some(delay) = retry_delay_ms {
                    options = options.retry_delay(Duration::from_millis(*delay));
                }
                Box::new(CopyTask {
                    source: self.resolve_local(source),
                    destination: destination.clone(),
                    options,
                })
            }
            Step::SyncUsers => {
                if self.users.is_empty() {
                    tracing::warn!("sync_users step present but the playbook lists no users");
                }
                Box::new(SyncUsers {
                    users: self.user_accounts(),
                })
            }
            Step::EnforceSshPublicKeyOnly => Box::new(EnforceSshPublicKeyOnly),
            Step::EnforceSshOtpAndPublicKeyOnly => Box::new(EnforceSshOtpAndPublicKeyOnly),
            Step::Exec { command, sudo } => Box::new(RunCommand {
                command: command.clone(),
                sudo: *sudo,
            }),
            Step::Script { content, sudo } => Box::new(RunScript {
                content: content.clone(),
                sudo: *sudo,
            }),
        };
        Ok(task)
    }
}
