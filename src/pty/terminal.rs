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

//! Terminal state management for interactive sessions.

use anyhow::{Context, Result};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use terminal_size::{terminal_size, Height, Width};

const FALLBACK_COLS: u32 = 80;
const FALLBACK_ROWS: u32 = 24;

/// RAII guard that puts the local terminal in raw mode.
///
/// The raw-mode state seen at creation is restored on drop, so a guard
/// created while raw mode was already on leaves it on.
pub struct TerminalGuard {
    was_raw_mode: bool,
}

impl TerminalGuard {
    pub fn new() -> Result<Self> {
        let was_raw_mode = is_raw_mode_enabled().context("Failed to query terminal mode")?;
        if !was_raw_mode {
            enable_raw_mode().context("Failed to enable raw mode")?;
        }
        Ok(Self { was_raw_mode })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.was_raw_mode {
            if let Err(e) = disable_raw_mode() {
                tracing::warn!("Failed to restore terminal mode: {e}");
            }
        }
    }
}

/// Current terminal size as (columns, rows), or 80x24 when unknown.
pub fn terminal_dimensions() -> (u32, u32) {
    match terminal_size() {
        Some((Width(w), Height(h))) if w > 0 && h > 0 => (u32::from(w), u32::from(h)),
        _ => (FALLBACK_COLS, FALLBACK_ROWS),
    }
}
