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

use deploysteps::config::{Playbook, OTP_SECRET_ENV, PASSWORD_ENV};
use deploysteps::StrictHostKeyChecking;
use secrecy::ExposeSecret;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const PLAYBOOK: &str = r#"
connection:
  host: web-01.example.com
  port: 2222
  username: deploy
  private_key_path: keys/id_ed25519
  strict_host_key_checking: "yes"
  connect_timeout_secs: 10
users:
  - username: alice
    password: s3cret
    groups: [sudo]
    public_keys:
      - ssh-ed25519 AAAAC3Nza alice@laptop
steps:
  - update_debian
  - create_directory:
      path: /srv/app
      sudo: true
  - create_file:
      destination: /srv/app/.env
      contents: "PORT=8080\n"
      chmod: "0600"
  - copy:
      source: stacks
      destination: /srv/app/stacks
      clean: true
      max_retries: 5
  - sync_users
  - enforce_ssh_otp_and_public_key_only
  - exec:
      command: systemctl restart app
      sudo: true
  - script:
      content: |
        #!/bin/bash
        echo done
"#;

fn clear_env() {
    unsafe {
        env::remove_var(PASSWORD_ENV);
        env::remove_var(OTP_SECRET_ENV);
    }
}

#[test]
fn test_parse_steps_in_order() {
    let playbook = Playbook::from_yaml(PLAYBOOK).unwrap();
    let tasks = playbook.tasks().unwrap();
    let names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
    assert_eq!(
        names,
        vec![
            "update_debian",
            "create_directory",
            "create_file",
            "copy",
            "sync_users",
            "enforce_ssh_otp_and_public_key_only",
            "exec",
            "script",
        ]
    );
    assert_eq!(playbook.connection.port, 2222);
    assert_eq!(playbook.user_accounts()[0].groups, vec!["sudo"]);
}

#[test]
fn test_unknown_step_is_rejected() {
    let yaml = "connection: {host: h, username: u}\nsteps:\n  - reboot_everything\n";
    assert!(Playbook::from_yaml(yaml).is_err());

    let yaml = "connection: {host: h, username: u}\nsteps:\n  - exec: {command: ls, shell: zsh}\n";
    assert!(Playbook::from_yaml(yaml).is_err());
}

#[test]
fn test_invalid_chmod_names_the_step() {
    let yaml = "connection: {host: h, username: u}\nsteps:\n  - update_debian\n  - create_file: {destination: /f, contents: x, chmod: \"0999\"}\n";
    let playbook = Playbook::from_yaml(yaml).unwrap();
    let err = playbook.tasks().err().unwrap();
    assert!(err.to_string().contains("Invalid step 2"));
}

#[tokio::test]
#[serial]
async fn test_load_resolves_paths_against_playbook_dir() {
    clear_env();
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("keys")).unwrap();
    std::fs::write(temp.path().join("keys/id_ed25519"), "not-a-real-key").unwrap();
    let path = temp.path().join("site.yaml");
    std::fs::write(&path, PLAYBOOK).unwrap();

    let playbook = Playbook::load(&path).await.unwrap();
    assert_eq!(playbook.base_dir, temp.path());
    assert_eq!(
        playbook.resolve_local(&PathBuf::from("stacks")),
        temp.path().join("stacks")
    );

    let config = playbook.session_config().unwrap();
    assert_eq!(config.host, "web-01.example.com");
    assert_eq!(config.port, 2222);
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.strict_host_key_checking, StrictHostKeyChecking::Yes);
    assert_eq!(
        config.private_key.as_deref().map(String::as_str),
        Some("not-a-real-key")
    );
    assert!(config.password.is_none());
}

#[tokio::test]
#[serial]
async fn test_missing_private_key_is_an_error() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("site.yaml");
    std::fs::write(&path, PLAYBOOK).unwrap();

    let playbook = Playbook::load(&path).await.unwrap();
    let err = playbook.session_config().unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read private key"));
}

#[tokio::test]
#[serial]
async fn test_missing_playbook_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = Playbook::load(&temp.path().join("absent.yaml"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read playbook"));
}

#[test]
#[serial]
fn test_secrets_fall_back_to_environment() {
    clear_env();
    unsafe {
        env::set_var(PASSWORD_ENV, "from-env");
        env::set_var(OTP_SECRET_ENV, "JBSWY3DPEHPK3PXP");
    }

    let yaml = "connection: {host: h.example.com, username: deploy}\n";
    let config = Playbook::from_yaml(yaml).unwrap().session_config().unwrap();
    assert_eq!(
        config.password.as_ref().map(|p| p.expose_secret()),
        Some("from-env")
    );
    assert_eq!(
        config.otp_secret.as_ref().map(|s| s.expose_secret()),
        Some("JBSWY3DPEHPK3PXP")
    );
    assert_eq!(config.port, 22);
    assert_eq!(
        config.strict_host_key_checking,
        StrictHostKeyChecking::AcceptNew
    );

    // Values in the file win over the environment.
    let yaml = "connection: {host: h.example.com, username: deploy, password: from-file}\n";
    let config = Playbook::from_yaml(yaml).unwrap().session_config().unwrap();
    assert_eq!(
        config.password.as_ref().map(|p| p.expose_secret()),
        Some("from-file")
    );

    clear_env();
}

#[test]
#[serial]
fn test_invalid_connection_settings() {
    clear_env();
    let yaml = "connection: {host: h.example.com, username: deploy, strict_host_key_checking: maybe}\n";
    assert!(Playbook::from_yaml(yaml).unwrap().session_config().is_err());

    let yaml = "connection: {host: h.example.com, username: deploy, port: 0}\n";
    assert!(Playbook::from_yaml(yaml).unwrap().session_config().is_err());
}
