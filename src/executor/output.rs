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

/// Which stream a chunk arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Accumulates command output across both streams in arrival order.
///
/// Raw bytes are kept and decoded once at the end, so a multi-byte
/// character split across two packets survives intact. Every non-empty line
/// of a chunk is echoed through `tracing` as it arrives, prefixed `out:` or
/// `err:`.
#[derive(Debug, Default)]
pub struct OutputCollector {
    buffer: Vec<u8>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stream: Stream, data: &[u8]) {
        for line in String::from_utf8_lossy(data).lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match stream {
                Stream::Stdout => tracing::info!("out: {line}"),
                Stream::Stderr => tracing::info!("err: {line}"),
            }
        }
        self.buffer.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_output(self) -> String {
        match String::from_utf8(self.buffer) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}
