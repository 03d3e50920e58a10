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
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::output::{OutputCollector, Stream};
use super::sudo::{contains_sudo_failure, SudoResponder};
use super::CommandResult;
use crate::error::{Error, Result};

/// Terminal size requested for non-interactive commands.
const EXEC_PTY_TERM: &str = "xterm";
const EXEC_PTY_COLS: u32 = 80;
const EXEC_PTY_ROWS: u32 = 24;

/// Messages the executor cares about on an exec channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    ExitStatus(u32),
    ExitSignal(String),
    Eof,
}

/// An exec channel the executor can drive to completion.
///
/// `next_event` returns `None` once the channel is closed.
#[async_trait]
pub trait ExecChannel: Send {
    async fn next_event(&mut self) -> Option<ChannelEvent>;
    async fn send_input(&mut self, data: &[u8]) -> Result<()>;
}

/// [`ExecChannel`] over a russh session channel.
pub struct RusshExecChannel {
    channel: Channel<Msg>,
}

impl RusshExecChannel {
    /// Attach a PTY to `channel` and start `command` on it.
    pub async fn start(channel: Channel<Msg>, command: &str) -> Result<Self> {
        channel
            .request_pty(false, EXEC_PTY_TERM, EXEC_PTY_COLS, EXEC_PTY_ROWS, 0, 0, &[])
            .await?;
        channel.exec(true, command).await?;
        Ok(Self { channel })
    }
}

#[async_trait]
impl ExecChannel for RusshExecChannel {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = match self.channel.wait().await? {
                ChannelMsg::Data { data } => ChannelEvent::Stdout(data.to_vec()),
                ChannelMsg::ExtendedData { data, ext: 1 } => ChannelEvent::Stderr(data.to_vec()),
                ChannelMsg::ExitStatus { exit_status } => ChannelEvent::ExitStatus(exit_status),
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    ChannelEvent::ExitSignal(format!("{signal_name:?}"))
                }
                ChannelMsg::Eof => ChannelEvent::Eof,
                ChannelMsg::Close => return None,
                _ => continue,
            };
            return Some(event);
        }
    }

    async fn send_input(&mut self, data: &[u8]) -> Result<()> {
        self.channel.data(data).await.map_err(Error::from)
    }
}

/// Drive `channel` until it closes and classify the outcome.
///
/// The exit status may arrive before the last data chunk, so it is only
/// recorded; the loop ends when the channel reports closed.
pub async fn run_to_exit<C>(channel: &mut C, sudo: &SudoResponder) -> Result<CommandResult>
where
    C: ExecChannel + ?Sized,
{
    let mut collector = OutputCollector::new();
    let mut exit_status: Option<u32> = None;
    let mut signal: Option<String> = None;
    let mut prompts_answered = 0usize;

    while let Some(event) = channel.next_event().await {
        match event {
            ChannelEvent::Stdout(data) | ChannelEvent::Stderr(data)
                if sudo.is_prompt(&String::from_utf8_lossy(&data)) =>
            {
                let answer = sudo.answer();
                channel.send_input(&answer).await?;
                prompts_answered += 1;
            }
            ChannelEvent::Stdout(data) => {
                collector.push(Stream::Stdout, &data);
            }
            ChannelEvent::Stderr(data) => {
                collector.push(Stream::Stderr, &data);
            }
            ChannelEvent::ExitStatus(code) => exit_status = Some(code),
            ChannelEvent::ExitSignal(name) => signal = Some(name),
            ChannelEvent::Eof => {}
        }
    }

    let output = collector.into_output();
    match (exit_status, signal) {
        (Some(0), None) => Ok(CommandResult {
            output,
            exit_status: 0,
        }),
        (None, None) => Err(Error::Transport(
            "channel closed before the command reported an exit status".to_string(),
        )),
        (exit_code, signal) => {
            if sudo_rejected(prompts_answered, &output) {
                tracing::warn!("sudo password rejected ({prompts_answered} prompt(s) answered)");
            }
            Err(Error::Command {
                exit_code,
                signal,
                output,
            })
        }
    }
}

/// True when a failed command answered a sudo prompt and sudo refused it.
fn sudo_rejected(prompts_answered: usize, output: &str) -> bool {
    prompts_answered > 0 && contains_sudo_failure(output)
}
