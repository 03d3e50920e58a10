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

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '=' | ':' | ',' | '@' | '+' | '%')
}

/// Escape single quotes for embedding in a single-quoted shell string.
pub fn escape_single_quotes(text: &str) -> String {
    text.replace('\'', r"'\''")
}

/// Quote one shell word. Shell-safe words are returned unchanged.
pub fn quote(word: &str) -> Cow<'_, str> {
    if !word.is_empty() && word.chars().all(is_shell_safe) {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", escape_single_quotes(word)))
    }
}

fn validate_env_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "Invalid environment variable name: {key:?}"
        )))
    }
}

/// Render `KEY='value'` pairs in key order, separated by spaces.
pub(crate) fn render_env_prefix(env: &BTreeMap<String, String>) -> Result<String> {
    let mut parts = Vec::with_capacity(env.len());
    for (key, value) in env {
        validate_env_key(key)?;
        parts.push(format!("{key}='{}'", escape_single_quotes(value)));
    }
    Ok(parts.join(" "))
}

/// Builder for a single remote command line with every argument quoted.
///
/// ```
/// use deploysteps::executor::RemoteCommand;
///
/// let cmd = RemoteCommand::new("mkdir").arg("-p").arg("/srv/my app").sudo(true);
/// assert_eq!(cmd.render().unwrap(), "sudo mkdir -p '/srv/my app'");
/// ```
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
    sudo: bool,
    env: BTreeMap<String, String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            sudo: false,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Environment for the program. Placed after `sudo` so it survives the
    /// privilege switch.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn render(&self) -> Result<String> {
        if self.program.is_empty() {
            return Err(Error::InvalidArgument("Empty program name".to_string()));
        }

        let mut words: Vec<String> = Vec::new();
        if self.sudo {
            words.push("sudo".to_string());
        }
        let env = render_env_prefix(&self.env)?;
        if !env.is_empty() {
            words.push(env);
        }
        words.push(quote(&self.program).into_owned());
        words.extend(self.args.iter().map(|a| quote(a).into_owned()));
        Ok(words.join(" "))
    }
}
