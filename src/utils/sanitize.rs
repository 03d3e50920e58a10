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

use crate::error::{Error, Result};

// Upper bound for a single exec request. Script bodies are passed inline,
// so this sits well above typical command lengths but below what sshd
// accepts in one channel request.
const MAX_COMMAND_LENGTH: usize = 256 * 1024;

/// Validate a remote command line before it is sent over an exec channel.
pub fn sanitize_command(command: &str) -> Result<&str> {
    if command.trim().is_empty() {
        return Err(Error::InvalidArgument("Empty command not allowed".to_string()));
    }

    if command.len() > MAX_COMMAND_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "Command too long: {} bytes (max: {} bytes)",
            command.len(),
            MAX_COMMAND_LENGTH
        )));
    }

    // Check for null bytes which could cause issues
    if command.contains('\0') {
        return Err(Error::InvalidArgument(
            "Command contains null bytes".to_string(),
        ));
    }

    Ok(command)
}

/// Sanitize hostname to prevent injection in SSH connection strings
pub fn sanitize_hostname(hostname: &str) -> Result<&str> {
    let invalid = |msg: String| Err(Error::InvalidArgument(msg));

    if hostname.trim().is_empty() {
        return invalid("Empty hostname not allowed".to_string());
    }

    const MAX_HOSTNAME_LENGTH: usize = 253; // DNS limit
    if hostname.len() > MAX_HOSTNAME_LENGTH {
        return invalid(format!(
            "Hostname too long: {} bytes (max: {} bytes)",
            hostname.len(),
            MAX_HOSTNAME_LENGTH
        ));
    }

    let is_ipv6 = hostname.starts_with('[') && hostname.ends_with(']');
    let is_bare_ipv6 = hostname.contains(':') && hostname.parse::<std::net::Ipv6Addr>().is_ok();

    if is_ipv6 {
        let ipv6_addr = &hostname[1..hostname.len() - 1];
        if !ipv6_addr.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return invalid(format!("Invalid IPv6 address format: {hostname}"));
        }
    } else if !is_bare_ipv6 {
        // Valid: alphanumeric, dots, hyphens, underscores (for some systems)
        let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';

        if !hostname.chars().all(valid_chars) {
            return invalid(format!("Invalid characters in hostname: {hostname}"));
        }

        if hostname.contains("..") {
            return invalid("Double dots not allowed in hostname".to_string());
        }

        for segment in hostname.split('.') {
            if segment.starts_with('-') || segment.ends_with('-') {
                return invalid("Hostname segments cannot start or end with hyphen".to_string());
            }
        }
    }

    Ok(hostname)
}

/// Sanitize username to prevent injection attacks
///
/// The same rules apply to accounts managed by the user sync task, whose
/// names end up in remote command lines.
pub fn sanitize_username(username: &str) -> Result<&str> {
    let invalid = |msg: String| Err(Error::InvalidArgument(msg));

    if username.trim().is_empty() {
        return invalid("Empty username not allowed".to_string());
    }

    // Typical Unix limit is 32
    const MAX_USERNAME_LENGTH: usize = 32;
    if username.len() > MAX_USERNAME_LENGTH {
        return invalid(format!(
            "Username too long: {} bytes (max: {} bytes)",
            username.len(),
            MAX_USERNAME_LENGTH
        ));
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.';
    if !username.chars().all(valid_chars) {
        return invalid(format!("Invalid characters in username: {username}"));
    }

    // Username should start with letter or underscore (Unix convention)
    if let Some(first_char) = username.chars().next() {
        if !first_char.is_ascii_alphabetic() && first_char != '_' {
            return invalid("Username must start with letter or underscore".to_string());
        }
    }

    Ok(username)
}
