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

//! sshd hardening.
//!
//! Each setting is applied idempotently: when the exact `key value` line is
//! missing, every line starting with the key is removed and the line is
//! appended. sshd is restarted once after all settings are in place.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Task;
use crate::remote::Remote;

const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
const PAM_SSHD: &str = "/etc/pam.d/sshd";
const RESTART_SSHD: &str = "systemctl restart sshd";

/// One `key value` line in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SshdSetting {
    pub file: &'static str,
    pub key: &'static str,
    pub value: &'static str,
}

impl SshdSetting {
    const fn sshd(key: &'static str, value: &'static str) -> Self {
        Self {
            file: SSHD_CONFIG,
            key,
            value,
        }
    }
}

const PUBLIC_KEY_ONLY: &[SshdSetting] = &[
    SshdSetting::sshd("PasswordAuthentication", "no"),
    SshdSetting::sshd("ChallengeResponseAuthentication", "no"),
    SshdSetting::sshd("PubkeyAuthentication", "yes"),
];

const OTP_AND_PUBLIC_KEY: &[SshdSetting] = &[
    SshdSetting::sshd("PasswordAuthentication", "no"),
    SshdSetting::sshd("ChallengeResponseAuthentication", "yes"),
    SshdSetting::sshd("KbdInteractiveAuthentication", "yes"),
    SshdSetting::sshd("AuthenticationMethods", "publickey,keyboard-interactive"),
    SshdSetting::sshd("PubkeyAuthentication", "yes"),
    SshdSetting::sshd("PermitRootLogin", "no"),
    SshdSetting {
        file: PAM_SSHD,
        key: "auth",
        value: "required   pam_google_authenticator.so",
    },
];

/// Script body that makes `setting` the only line for its key.
///
/// Runs as root; no `sudo` inside.
pub fn ensure_setting_script(setting: &SshdSetting) -> String {
    let SshdSetting { file, key, value } = setting;
    format!(
        "#!/bin/bash\n\
         if ! grep -q '^{key}[[:space:]]*{value}[[:space:]]*$' {file}; then\n\
         \x20 echo 'setting {file} > {key} to {value}'\n\
         \x20 sed -i '/^{key}/d' {file}\n\
         \x20 echo '{key} {value}' >> {file}\n\
         fi\n"
    )
}

async fn apply(remote: &dyn Remote, settings: &[SshdSetting]) -> Result<()> {
    for setting in settings {
        remote
            .sudo_script(&ensure_setting_script(setting))
            .await
            .with_context(|| format!("Failed to set {} in {}", setting.key, setting.file))?;
    }
    remote
        .exec(&format!("sudo {RESTART_SSHD}"))
        .await
        .context("Failed to restart sshd")?;
    Ok(())
}

/// Allow public key logins only.
#[derive(Debug, Clone, Default)]
pub struct EnforceSshPublicKeyOnly;

#[async_trait]
impl Task for EnforceSshPublicKeyOnly {
    fn name(&self) -> &str {
        "enforce_ssh_public_key_only"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        apply(remote, PUBLIC_KEY_ONLY).await
    }
}

/// Require a public key followed by a one-time code.
///
/// Users need a `~/.google_authenticator` file before this runs, see
/// [`SyncUsers`](super::SyncUsers).
#[derive(Debug, Clone, Default)]
pub struct EnforceSshOtpAndPublicKeyOnly;

#[async_trait]
impl Task for EnforceSshOtpAndPublicKeyOnly {
    fn name(&self) -> &str {
        "enforce_ssh_otp_and_public_key_only"
    }

    async fn run(&self, remote: &dyn Remote) -> Result<()> {
        apply(remote, OTP_AND_PUBLIC_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_setting_script() {
        let script = ensure_setting_script(&SshdSetting::sshd("PermitRootLogin", "no"));
        assert_eq!(
            script,
            "#!/bin/bash\n\
             if ! grep -q '^PermitRootLogin[[:space:]]*no[[:space:]]*$' /etc/ssh/sshd_config; then\n  \
             echo 'setting /etc/ssh/sshd_config > PermitRootLogin to no'\n  \
             sed -i '/^PermitRootLogin/d' /etc/ssh/sshd_config\n  \
             echo 'PermitRootLogin no' >> /etc/ssh/sshd_config\n\
             fi\n"
        );
    }

    #[test]
    fn test_otp_settings_include_pam() {
        assert!(OTP_AND_PUBLIC_KEY
            .iter()
            .any(|s| s.file == PAM_SSHD && s.value.contains("pam_google_authenticator.so")));
        assert_eq!(OTP_AND_PUBLIC_KEY.len(), 7);
        assert_eq!(PUBLIC_KEY_ONLY.len(), 3);
    }
}
