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

use uuid::Uuid;

use super::command::escape_single_quotes;

/// Fresh scratch path for a script body: `/tmp/script_<uuid>.sh`.
pub fn scratch_script_path() -> String {
    format!("/tmp/script_{}.sh", Uuid::new_v4().simple())
}

/// One command line that writes `content` to `path`, runs it and removes it.
///
/// The body is staged with `sudo tee` so the file lands owned by root
/// regardless of `elevated`; only the run step differs.
pub fn script_command(content: &str, path: &str, elevated: bool) -> String {
    let run = if elevated {
        format!("sudo {path}")
    } else {
        path.to_string()
    };
    format!(
        "echo '{}' | sudo tee {path} > /dev/null && sudo chmod +x {path} && {run} && sudo rm {path}",
        escape_single_quotes(content)
    )
}
