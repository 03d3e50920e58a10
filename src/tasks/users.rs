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
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::Task;
use crate::error::Error;
use crate::executor::{escape_single_quotes, quote, ExecOptions, RemoteCommand};
use crate::remote::Remote;
use crate::utils::sanitize_username;

/// A login account to create or update on the remote host.
#[derive(Clone)]
pub struct UserAccount {
    pub username: String,
    pub password: SecretString,
    pub groups: Vec<String>,
    /// OpenSSH public key lines for `authorized_keys`
    pub public_keys: Vec<String>,
    /// Base32 seed written to `~/.google_authenticator`
    pub otp_secret: Option<SecretString>,
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("groups", &self.groups)
            .field("public_keys", &self.public_keys.len())
            .field("otp_secret", &self.otp_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Create or update accounts, their keys and authenticator files.
#[derive(Debug, Clone, Default)]
pub struct SyncUsers {
    pub users: Vec<UserAccount>,
}

#[async_trait]
impl Task for SyncUsers {
    fn name(&self) -> &str {
        "sync_users"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        for user in &self.users {
            sync_user(remote, user)
                .await
                .with_context(|| format!("Failed to sync user {}", user.username))?;
        }
        Ok(())
    }
}

fn home_dir(username: &str) -> String {
    format!("/home/{username}")
}

/// Whether a failed command merely reported "no" through its exit code.
fn is_negative_answer(error: &Error) -> bool {
    matches!(error, Error::Command { exit_code: Some(code), signal: None, .. } if *code != 0)
}

async fn user_exists(remote: &dyn Remote, username: &str) -> Result<bool> {
    let id = RemoteCommand::new("id").args(["-u", username]).render()?;
    match remote.exec(&id).await {
        Ok(_) => Ok(true),
        Err(e) if is_negative_answer(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn sync_user(remote: &dyn Remote, user: &UserAccount) -> Result<()> {
    let username = sanitize_username(&user.username)?;
    let secret_options = ExecOptions::new().silent();
    let password = escape_single_quotes(user.password.expose_secret());

    if user_exists(remote, username).await? {
        tracing::info!("usr: updating password for {username}");
        let chpasswd = format!("echo '{username}:{password}' | sudo chpasswd");
        remote.exec_with(&chpasswd, &secret_options).await?;
    } else {
        tracing::info!("usr: creating {username}");
        let useradd = format!("sudo useradd -m -p \"$(openssl passwd -1 '{password}')\" {username}");
        remote.exec_with(&useradd, &secret_options).await?;
    }

    if !user.groups.is_empty() {
        let usermod = RemoteCommand::new("usermod")
            .args(["-aG", user.groups.join(",").as_str(), username])
            .sudo(true)
            .render()?;
        remote.exec(&usermod).await?;
    }

    let chsh = RemoteCommand::new("chsh")
        .args(["-s", "/bin/bash", username])
        .sudo(true)
        .render()?;
    remote.exec(&chsh).await?;

    if !user.public_keys.is_empty() {
        sync_public_keys(remote, username, &user.public_keys).await?;
    }

    if let Some(secret) = &user.otp_secret {
        remote
            .sudo_script(&authenticator_script(username, secret.expose_secret()))
            .await
            .context("Failed to set up google-authenticator")?;
    }
    Ok(())
}

async fn sync_public_keys(remote: &dyn Remote, username: &str, keys: &[String]) -> Result<()> {
    let ssh_dir = format!("{}/.ssh", home_dir(username));
    let authorized_keys = format!("{ssh_dir}/authorized_keys");
    let owner = format!("{username}:{username}");

    let prepare = format!(
        "sudo mkdir -p {dir} && sudo chown {owner} {dir} && sudo chmod 700 {dir}",
        dir = quote(&ssh_dir),
        owner = quote(&owner),
    );
    remote.exec(&prepare).await?;

    for key in keys {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let grep = RemoteCommand::new("grep")
            .args(["-qF", key, authorized_keys.as_str()])
            .sudo(true)
            .render()?;
        match remote.exec(&grep).await {
            Ok(_) => {
                tracing::debug!("Key already authorized for {username}");
                continue;
            }
            // 1: no match, 2: file missing
            Err(e) if is_negative_answer(&e) => {}
            Err(e) => return Err(e.into()),
        }

        let append = format!(
            "echo {} | sudo tee -a {} > /dev/null",
            quote(key),
            quote(&authorized_keys)
        );
        remote.exec(&append).await?;
    }

    let finalize = format!(
        "sudo chown {owner} {file} && sudo chmod 600 {file}",
        owner = quote(&owner),
        file = quote(&authorized_keys),
    );
    remote.exec(&finalize).await?;
    Ok(())
}

/// Root script installing the PAM module and writing the user's
/// `~/.google_authenticator` with mode 600.
fn authenticator_script(username: &str, secret: &str) -> String {
    let file = format!("{}/.google_authenticator", home_dir(username));
    let config = format!(
        "{secret}\n\" RATE_LIMIT 3 30\n\" WINDOW_SIZE 3\n\" DISALLOW_REUSE\n\" TOTP_AUTH"
    );
    format!(
        "#!/bin/bash\n\
         set -e\n\
         apt-get install -y libpam-google-authenticator\n\
         rm -f {file}\n\
         echo '{config}' | sudo -u {username} tee {file} > /dev/null\n\
         chown {username}:{username} {file}\n\
         chmod 600 {file}\n",
        config = escape_single_quotes(&config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticator_script() {
        let script = authenticator_script("alice", "JBSWY3DPEHPK3PXP");
        assert!(script.contains("apt-get install -y libpam-google-authenticator"));
        assert!(script.contains(
            "echo 'JBSWY3DPEHPK3PXP\n\" RATE_LIMIT 3 30\n\" WINDOW_SIZE 3\n\" DISALLOW_REUSE\n\" TOTP_AUTH' | sudo -u alice tee /home/alice/.google_authenticator > /dev/null"
        ));
        assert!(script.contains("chmod 600 /home/alice/.google_authenticator"));
    }

    #[test]
    fn test_is_negative_answer() {
        let no = Error::Command {
            exit_code: Some(1),
            signal: None,
            output: String::new(),
        };
        assert!(is_negative_answer(&no));
        assert!(!is_negative_answer(&Error::Transport("gone".into())));
        let killed = Error::Command {
            exit_code: None,
            signal: Some("KILL".into()),
            output: String::new(),
        };
        assert!(!is_negative_answer(&killed));
    }

    #[test]
    fn test_user_account_debug_redacts() {
        let user = UserAccount {
            username: "alice".into(),
            password: SecretString::from("hunter2"),
            groups: vec!["sudo".into()],
            public_keys: vec![],
            otp_secret: Some(SecretString::from("JBSWY3DPEHPK3PXP")),
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("JBSWY3DPEHPK3PXP"));
    }
}
