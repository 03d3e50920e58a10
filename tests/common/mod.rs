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

//! Recording fakes for the remote side.

#![allow(dead_code)]

use async_trait::async_trait;
use deploysteps::{Error, ExecOptions, Remote, Result, TransferChannel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything the fake remote observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Exec { command: String, silent: bool },
    OpenTransfer,
    Upload { local: PathBuf, remote: String },
    Write { remote: String, contents: Vec<u8> },
    SetPermissions { remote: String, mode: u32 },
    CloseTransfer,
}

#[derive(Default)]
struct Shared {
    events: Vec<Event>,
    /// command substring -> exit code to fail with
    exec_failures: Vec<(String, u32)>,
    /// remote path substring -> failures left
    upload_failures: HashMap<String, u32>,
}

#[derive(Clone)]
pub struct MockRemote {
    username: String,
    shared: Arc<Mutex<Shared>>,
}

impl MockRemote {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Commands containing `needle` exit with `code`.
    pub fn fail_exec(&self, needle: &str, code: u32) {
        self.shared
            .lock()
            .unwrap()
            .exec_failures
            .push((needle.to_string(), code));
    }

    /// The next `times` uploads to a path containing `needle` fail.
    pub fn fail_upload(&self, needle: &str, times: u32) {
        self.shared
            .lock()
            .unwrap()
            .upload_failures
            .insert(needle.to_string(), times);
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.lock().unwrap().events.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Upload { remote, .. } => Some(remote),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.shared.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl Remote for MockRemote {
    fn username(&self) -> &str {
        &self.username
    }

    async fn exec_with(&self, command: &str, options: &ExecOptions) -> Result<String> {
        let command = deploysteps::executor::prepare_command(command, options)?;
        self.record(Event::Exec {
            command: command.clone(),
            silent: options.silent,
        });

        let failure = self
            .shared
            .lock()
            .unwrap()
            .exec_failures
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, code)| *code);
        match failure {
            Some(code) => Err(Error::Command {
                exit_code: Some(code),
                signal: None,
                output: String::new(),
            }),
            None => Ok(String::new()),
        }
    }

    async fn open_transfer(&self) -> Result<Box<dyn TransferChannel>> {
        self.record(Event::OpenTransfer);
        Ok(Box::new(MockTransfer {
            remote: self.clone(),
        }))
    }
}

pub struct MockTransfer {
    remote: MockRemote,
}

#[async_trait]
impl TransferChannel for MockTransfer {
    async fn upload(&self, local: &Path, remote: &str) -> Result<u64> {
        self.remote.record(Event::Upload {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });

        {
            let mut shared = self.remote.shared.lock().unwrap();
            if let Some((_, left)) = shared
                .upload_failures
                .iter_mut()
                .find(|(needle, left)| remote.contains(needle.as_str()) && **left > 0)
            {
                *left -= 1;
                return Err(Error::RemoteIo {
                    path: remote.to_string(),
                    reason: "injected write failure".to_string(),
                });
            }
        }

        let contents = tokio::fs::read(local).await.map_err(|e| Error::LocalIo {
            path: local.to_path_buf(),
            source: e,
        })?;
        Ok(contents.len() as u64)
    }

    async fn write_contents(&self, remote: &str, contents: &[u8]) -> Result<()> {
        self.remote.record(Event::Write {
            remote: remote.to_string(),
            contents: contents.to_vec(),
        });
        Ok(())
    }

    async fn set_permissions(&self, remote: &str, mode: u32) -> Result<()> {
        self.remote.record(Event::SetPermissions {
            remote: remote.to_string(),
            mode,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.remote.record(Event::CloseTransfer);
        Ok(())
    }
}
