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

use russh::client::{Config, Handle, Handler};
use std::sync::Arc;
use std::time::Duration;

use super::known_hosts::{get_check_method, verify_host_key, ServerCheckMethod};
use super::session::SessionConfig;
use crate::error::Error;

// Keepalives let a dead peer surface as a transport error instead of a hang.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const KEEPALIVE_MAX: usize = 3;

/// russh client callbacks for one connection.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    pub fn new(hostname: String, port: u16, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            port,
            server_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(verify_host_key(
            &self.server_check,
            &self.hostname,
            self.port,
            server_public_key,
        ))
    }
}

/// Open the transport and complete key exchange. No authentication yet.
pub(super) async fn connect(config: &SessionConfig) -> Result<Handle<ClientHandler>, Error> {
    let check_method = get_check_method(
        config.strict_host_key_checking,
        config.known_hosts_path.as_deref(),
    );
    let handler = ClientHandler::new(config.host.clone(), config.port, check_method);

    let russh_config = Arc::new(Config {
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: KEEPALIVE_MAX,
        ..Default::default()
    });

    russh::client::connect(russh_config, (config.host.as_str(), config.port), handler).await
}
