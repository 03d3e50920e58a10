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

use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// How the server's host key is verified during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCheckMethod {
    /// No verification - accept any host key
    NoCheck,
    /// Host must be present in the given known_hosts file
    KnownHostsFile(PathBuf),
    /// Known hosts must match; unknown hosts are appended to the file
    AcceptNew(PathBuf),
}

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, add new ones automatically (TOFU)
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "accept-new" | "accept_new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(Error::InvalidArgument(format!(
                "Unknown host key checking mode: {other}"
            ))),
        }
    }
}

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// Create a ServerCheckMethod based on strict host key checking mode
///
/// `known_hosts` overrides the default `~/.ssh/known_hosts` location.
pub fn get_check_method(
    strict_mode: StrictHostKeyChecking,
    known_hosts: Option<&Path>,
) -> ServerCheckMethod {
    if strict_mode == StrictHostKeyChecking::No {
        tracing::debug!("Host key checking disabled (strict mode = no)");
        return ServerCheckMethod::NoCheck;
    }

    let Some(path) = known_hosts
        .map(Path::to_path_buf)
        .or_else(get_default_known_hosts_path)
    else {
        tracing::warn!("Could not determine known_hosts path, using NoCheck");
        return ServerCheckMethod::NoCheck;
    };

    match strict_mode {
        StrictHostKeyChecking::Yes => {
            tracing::debug!("Using known_hosts file: {:?} (strict mode)", path);
            ServerCheckMethod::KnownHostsFile(path)
        }
        _ => {
            tracing::debug!("Using known_hosts file: {:?} (accept-new mode)", path);
            ServerCheckMethod::AcceptNew(path)
        }
    }
}

/// Verify `key` for `host:port` according to `method`.
///
/// Returns `false` for a rejected key. A changed key is always rejected,
/// even in accept-new mode.
pub(crate) fn verify_host_key(
    method: &ServerCheckMethod,
    host: &str,
    port: u16,
    key: &russh::keys::PublicKey,
) -> bool {
    match method {
        ServerCheckMethod::NoCheck => true,
        ServerCheckMethod::KnownHostsFile(path) => {
            if !path.exists() {
                tracing::warn!("Known hosts file not found at {:?}, rejecting host key", path);
                return false;
            }
            match russh::keys::check_known_hosts_path(host, port, key, path) {
                Ok(true) => true,
                Ok(false) => {
                    tracing::warn!("Host key for {host}:{port} is not in {:?}", path);
                    false
                }
                Err(e) => {
                    tracing::warn!("Host key verification failed for {host}:{port}: {e}");
                    false
                }
            }
        }
        ServerCheckMethod::AcceptNew(path) => {
            if path.exists() {
                match russh::keys::check_known_hosts_path(host, port, key, path) {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!("Host key verification failed for {host}:{port}: {e}");
                        return false;
                    }
                }
            } else if let Some(ssh_dir) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(ssh_dir) {
                    tracing::warn!("Failed to create {:?}: {e}", ssh_dir);
                }
            }

            match russh::keys::known_hosts::learn_known_hosts_path(host, port, key, path) {
                Ok(()) => tracing::info!("Added host key for {host}:{port} to {:?}", path),
                Err(e) => tracing::warn!("Failed to record host key for {host}:{port}: {e}"),
            }
            true
        }
    }
}
