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

use async_trait::async_trait;
use russh::client::Handle;
use russh::Disconnect;
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

use super::authentication::authenticate;
use super::connection::{connect, ClientHandler};
use super::known_hosts::StrictHostKeyChecking;
use super::sftp::SftpTransfer;
use crate::error::{Error, Result};
use crate::executor::{
    prepare_command, run_to_exit, ExecOptions, RusshExecChannel, SudoPassword, SudoResponder,
};
use crate::remote::Remote;
use crate::transfer::TransferChannel;
use crate::utils::{sanitize_hostname, sanitize_username};

pub const DEFAULT_PORT: u16 = 22;

// SSH connection timeout design:
// - 30 seconds accommodates slow networks and SSH negotiation
// - Covers TCP connect, key exchange and authentication together
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const CLOSE_WAIT: Duration = Duration::from_secs(5);
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Connection parameters and credentials for [`Session::open`].
#[derive(Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<SecretString>,
    /// OpenSSH or PEM encoded private key
    pub private_key: Option<Zeroizing<String>>,
    pub private_key_passphrase: Option<SecretString>,
    /// Base32 TOTP seed for `Verification code:` prompts
    pub otp_secret: Option<SecretString>,
    pub connect_timeout: Duration,
    pub strict_host_key_checking: StrictHostKeyChecking,
    /// Defaults to `~/.ssh/known_hosts`
    pub known_hosts_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: None,
            private_key: None,
            private_key_passphrase: None,
            otp_secret: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            strict_host_key_checking: StrictHostKeyChecking::default(),
            known_hosts_path: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(Zeroizing::new(key.into()));
        self
    }

    pub fn with_private_key_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.private_key_passphrase = Some(SecretString::from(passphrase.into()));
        self
    }

    pub fn with_otp_secret(mut self, secret: impl Into<String>) -> Self {
        self.otp_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_strict_host_key_checking(mut self, mode: StrictHostKeyChecking) -> Self {
        self.strict_host_key_checking = mode;
        self
    }

    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Reject values that cannot be sent to a server as-is.
    pub fn validate(&self) -> Result<()> {
        sanitize_hostname(&self.host)?;
        sanitize_username(&self.username)?;
        if self.port == 0 {
            return Err(Error::InvalidArgument("Port must be non-zero".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "Connect timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |present: bool| if present { Some("[REDACTED]") } else { None };
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(self.password.is_some()))
            .field("private_key", &redact(self.private_key.is_some()))
            .field(
                "private_key_passphrase",
                &redact(self.private_key_passphrase.is_some()),
            )
            .field("otp_secret", &redact(self.otp_secret.is_some()))
            .field("connect_timeout", &self.connect_timeout)
            .field("strict_host_key_checking", &self.strict_host_key_checking)
            .field("known_hosts_path", &self.known_hosts_path)
            .finish()
    }
}

/// Liveness of a [`Session`].
///
/// A `Session` value only exists once [`Session::open`] has completed the
/// handshake, so `Connecting` is never reported by [`Session::state`]. It is
/// kept for callers that track a connection attempt alongside sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Ready = 1,
    Closed = 2,
    Errored = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Ready,
            2 => Self::Closed,
            _ => Self::Errored,
        }
    }
}

/// One authenticated SSH connection.
///
/// Channels for commands and file transfers are opened on demand and may
/// run concurrently. Dropping a session without [`Session::close`] leaves
/// the transport to be torn down by russh in the background.
pub struct Session {
    handle: Arc<Handle<ClientHandler>>,
    host: String,
    port: u16,
    username: String,
    sudo_password: Option<SudoPassword>,
    sudo: SudoResponder,
    state: AtomicU8,
}

impl Session {
    /// Connect and authenticate.
    ///
    /// The whole handshake is bounded by `config.connect_timeout`.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let timeout = config.connect_timeout;
        tracing::debug!(
            "Connecting to {}@{}:{} (timeout {}s)",
            config.username,
            config.host,
            config.port,
            timeout.as_secs()
        );

        match tokio::time::timeout(timeout, Self::handshake(&config)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                host: config.host.clone(),
                seconds: timeout.as_secs(),
            }),
        }
    }

    async fn handshake(config: &SessionConfig) -> Result<Self> {
        let mut handle = connect(config).await.map_err(|e| Error::Connect {
            host: config.host.clone(),
            port: config.port,
            reason: e.to_string(),
        })?;

        authenticate(&mut handle, config).await?;
        tracing::info!(
            "Connected to {}@{}:{}",
            config.username,
            config.host,
            config.port
        );

        let sudo_password = config.password.clone().map(SudoPassword::from);
        Ok(Self {
            handle: Arc::new(handle),
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            sudo: SudoResponder::new(&config.username, sudo_password.clone()),
            sudo_password,
            state: AtomicU8::new(SessionState::Ready as u8),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.handle.is_closed() {
            self.set_state(SessionState::Errored);
        }
        match self.state() {
            SessionState::Ready => Ok(()),
            state => Err(Error::Transport(format!(
                "session to {} is not usable (state: {state:?})",
                self.host
            ))),
        }
    }

    /// Record a transport failure against the session if the connection is gone.
    fn observe(&self, error: Error) -> Error {
        if matches!(error, Error::Transport(_)) && self.handle.is_closed() {
            tracing::warn!("Connection to {} lost: {error}", self.host);
            self.set_state(SessionState::Errored);
        }
        error
    }

    /// Run an interactive login shell attached to the local terminal.
    ///
    /// Returns the remote shell's exit status.
    #[cfg(unix)]
    pub async fn interactive_shell(&self, sudo: bool) -> anyhow::Result<u32> {
        use anyhow::Context;

        self.ensure_ready()?;
        let channel = self
            .handle
            .channel_open_session()
            .await
            .context("Failed to open shell channel")?;
        let sudo_password = if sudo {
            if self.sudo_password.is_none() {
                tracing::warn!("sudo requested but no password is configured");
            }
            self.sudo_password.as_ref()
        } else {
            None
        };
        crate::pty::InteractiveShell::new(channel, sudo, sudo_password)
            .run()
            .await
    }

    /// Disconnect and wait, bounded, for the transport to report closed.
    pub async fn close(self) -> Result<()> {
        if self.state() == SessionState::Closed {
            return Ok(());
        }

        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            tracing::debug!("Disconnect from {} reported: {e}", self.host);
        }

        let deadline = tokio::time::Instant::now() + CLOSE_WAIT;
        while !self.handle.is_closed() {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    "Connection to {} did not close within {}s",
                    self.host,
                    CLOSE_WAIT.as_secs()
                );
                break;
            }
            tokio::time::sleep(CLOSE_POLL_INTERVAL).await;
        }

        self.set_state(SessionState::Closed);
        tracing::debug!("Closed connection to {}", self.host);
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl Remote for Session {
    fn username(&self) -> &str {
        &self.username
    }

    async fn exec_with(&self, command: &str, options: &ExecOptions) -> Result<String> {
        let command = prepare_command(command, options)?;
        self.ensure_ready()?;

        if !options.silent {
            tracing::info!("inp: {command}");
        }

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| self.observe(e.into()))?;
        let mut exec = RusshExecChannel::start(channel, &command)
            .await
            .map_err(|e| self.observe(e))?;

        run_to_exit(&mut exec, &self.sudo)
            .await
            .map(|result| result.output)
            .map_err(|e| self.observe(e))
    }

    async fn open_transfer(&self) -> Result<Box<dyn TransferChannel>> {
        self.ensure_ready()?;
        let transfer = SftpTransfer::open(&self.handle)
            .await
            .map_err(|e| self.observe(e))?;
        Ok(Box::new(transfer))
    }
}
