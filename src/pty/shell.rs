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

use anyhow::{anyhow, Context, Result};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use std::io::{Read, Write};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use super::terminal::{terminal_dimensions, TerminalGuard};
use crate::executor::SudoPassword;

const SHELL_TERM: &str = "xterm-256color";
const SUDO_WARMUP: &[u8] = b"sudo echo \"Entering sudo password\"\n";
const SUDO_PROMPT_MARKER: &str = "[sudo] password for";
const INPUT_CHANNEL_CAPACITY: usize = 64;

/// A login shell on a PTY channel wired to local stdin/stdout.
pub struct InteractiveShell<'a> {
    channel: Channel<Msg>,
    sudo: bool,
    password: Option<&'a SudoPassword>,
}

impl<'a> InteractiveShell<'a> {
    pub fn new(channel: Channel<Msg>, sudo: bool, password: Option<&'a SudoPassword>) -> Self {
        Self {
            channel,
            sudo,
            password,
        }
    }

    /// Run until the remote shell exits and return its exit status.
    pub async fn run(mut self) -> Result<u32> {
        let (cols, rows) = terminal_dimensions();
        self.channel
            .request_pty(false, SHELL_TERM, cols, rows, 0, 0, &[])
            .await
            .context("Failed to request PTY")?;
        self.channel
            .request_shell(true)
            .await
            .context("Failed to start remote shell")?;

        let _terminal = TerminalGuard::new()?;

        let mut awaiting_sudo_prompt = false;
        if self.sudo {
            self.channel
                .data(SUDO_WARMUP)
                .await
                .context("Failed to send sudo warm-up command")?;
            awaiting_sudo_prompt = self.password.is_some();
        }

        let mut input = spawn_stdin_reader();
        let mut stdin_open = true;
        let mut resize = signal(SignalKind::window_change())
            .context("Failed to install SIGWINCH handler")?;
        let mut exit_status: Option<u32> = None;
        let mut stdout = std::io::stdout();

        loop {
            tokio::select! {
                msg = self.channel.wait() => {
                    match msg {
                        Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                            stdout.write_all(&data).context("Failed to write to stdout")?;
                            stdout.flush().ok();

                            if awaiting_sudo_prompt
                                && String::from_utf8_lossy(&data).contains(SUDO_PROMPT_MARKER)
                            {
                                if let Some(password) = self.password {
                                    self.channel
                                        .data(&password.with_newline()[..])
                                        .await
                                        .context("Failed to send sudo password")?;
                                }
                                awaiting_sudo_prompt = false;
                            }
                        }
                        Some(ChannelMsg::ExitStatus { exit_status: code }) => {
                            exit_status = Some(code);
                        }
                        Some(ChannelMsg::Close) | None => break,
                        Some(_) => {}
                    }
                }
                bytes = input.recv(), if stdin_open => {
                    match bytes {
                        Some(bytes) => {
                            if let Err(e) = self.channel.data(&bytes[..]).await {
                                tracing::error!("Failed to send data to SSH channel: {e}");
                                break;
                            }
                        }
                        None => {
                            tracing::debug!("EOF received on stdin");
                            stdin_open = false;
                            self.channel.eof().await.ok();
                        }
                    }
                }
                _ = resize.recv() => {
                    let (cols, rows) = terminal_dimensions();
                    if let Err(e) = self.channel.window_change(cols, rows, 0, 0).await {
                        tracing::warn!("Failed to send window resize to remote: {e}");
                    } else {
                        tracing::debug!("Terminal resized to {cols}x{rows}");
                    }
                }
            }
        }

        exit_status.ok_or_else(|| anyhow!("Remote shell closed without reporting an exit status"))
    }
}

/// Forward stdin bytes over a channel from a plain thread.
///
/// A thread instead of a blocking task: a read parked on stdin would keep
/// the runtime from shutting down.
fn spawn_stdin_reader() -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buffer = [0u8; 1024];
        loop {
            match stdin.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.blocking_send(buffer[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Input error: {e}");
                    break;
                }
            }
        }
    });
    rx
}
