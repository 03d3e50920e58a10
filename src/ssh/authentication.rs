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

//! Authentication chain: public key, then keyboard-interactive, then password.
//!
//! A method that is rejected, or that only reports partial success, hands
//! over to the next one. The first method the server accepts outright ends
//! the chain.

use russh::client::{Handle, KeyboardInteractiveAuthResponse};
use secrecy::ExposeSecret;
use std::sync::Arc;

use super::connection::ClientHandler;
use super::session::SessionConfig;
use crate::auth::ChallengeResponder;
use crate::error::{Error, Result};

// Servers normally finish in one or two rounds (OTP, then maybe password).
const MAX_KEYBOARD_INTERACTIVE_ROUNDS: usize = 8;

pub(super) async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &SessionConfig,
) -> Result<()> {
    let username = config.username.as_str();

    if let Some(key_data) = &config.private_key {
        if try_public_key(handle, config, key_data).await? {
            tracing::debug!("Authenticated {username} with public key");
            return Ok(());
        }
    }

    let responder = ChallengeResponder::new(config.password.clone(), config.otp_secret.clone());
    if try_keyboard_interactive(handle, username, &responder).await? {
        tracing::debug!("Authenticated {username} with keyboard-interactive");
        return Ok(());
    }

    if let Some(password) = &config.password {
        let result = handle
            .authenticate_password(username, password.expose_secret())
            .await?;
        if result.success() {
            tracing::debug!("Authenticated {username} with password");
            return Ok(());
        }
        tracing::debug!("Password rejected for {username}");
    }

    Err(Error::Authentication {
        username: config.username.clone(),
        host: config.host.clone(),
    })
}

async fn try_public_key(
    handle: &mut Handle<ClientHandler>,
    config: &SessionConfig,
    key_data: &str,
) -> Result<bool> {
    let passphrase = config
        .private_key_passphrase
        .as_ref()
        .map(|p| p.expose_secret());
    let key = russh::keys::decode_secret_key(key_data, passphrase)
        .map_err(|e| Error::InvalidArgument(format!("Failed to decode private key: {e}")))?;

    let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
    let result = handle
        .authenticate_publickey(
            config.username.as_str(),
            russh::keys::PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
        )
        .await?;

    if !result.success() {
        tracing::debug!("Public key not sufficient for {}", config.username);
    }
    Ok(result.success())
}

async fn try_keyboard_interactive(
    handle: &mut Handle<ClientHandler>,
    username: &str,
    responder: &ChallengeResponder,
) -> Result<bool> {
    let mut response = handle
        .authenticate_keyboard_interactive_start(username, None::<String>)
        .await?;

    for _ in 0..MAX_KEYBOARD_INTERACTIVE_ROUNDS {
        let prompts = match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::Failure { .. } => return Ok(false),
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => prompts,
        };

        let answers: Vec<String> = prompts
            .iter()
            .map(|prompt| responder.respond(&prompt.prompt).to_string())
            .collect();

        response = handle
            .authenticate_keyboard_interactive_respond(answers)
            .await?;
    }

    tracing::warn!("Keyboard-interactive authentication did not finish, giving up");
    Ok(false)
}
