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

mod common;

use common::{Event, MockRemote};
use deploysteps::tasks::{
    run_all, CreateDirectory, CreateFile, EnforceSshOtpAndPublicKeyOnly, EnforceSshPublicKeyOnly,
    RunCommand, RunScript, SyncUsers, Task, UpdateDebian, UserAccount,
};
use secrecy::SecretString;

fn account(username: &str) -> UserAccount {
    UserAccount {
        username: username.to_string(),
        password: SecretString::from("pa'ss"),
        groups: vec!["sudo".into(), "docker".into()],
        public_keys: vec!["ssh-ed25519 AAAAC3Nza alice@laptop".into()],
        otp_secret: None,
    }
}

#[tokio::test]
async fn test_update_debian() {
    let remote = MockRemote::new("deploy");
    UpdateDebian.run(&remote).await.unwrap();

    assert_eq!(
        remote.commands(),
        vec![
            "DEBIAN_FRONTEND='noninteractive' sudo apt-get -qy update",
            "DEBIAN_FRONTEND='noninteractive' sudo apt-get -qy upgrade",
            "DEBIAN_FRONTEND='noninteractive' sudo apt-get -qy autoremove",
        ]
    );
}

#[tokio::test]
async fn test_create_directory() {
    let remote = MockRemote::new("deploy");
    let task = CreateDirectory {
        path: "/srv/my app".into(),
        sudo: true,
    };
    task.run(&remote).await.unwrap();
    assert_eq!(remote.commands(), vec!["sudo mkdir -p '/srv/my app'"]);
}

#[tokio::test]
async fn test_create_file_with_mode() {
    let remote = MockRemote::new("deploy");
    let task = CreateFile {
        destination: "/srv/app/.env".into(),
        contents: "PORT=8080\n".into(),
        mode: Some(0o600),
    };
    task.run(&remote).await.unwrap();

    assert_eq!(
        remote.events(),
        vec![
            Event::Exec {
                command: "mkdir -p /srv/app".into(),
                silent: false,
            },
            Event::OpenTransfer,
            Event::Write {
                remote: "/srv/app/.env".into(),
                contents: b"PORT=8080\n".to_vec(),
            },
            Event::SetPermissions {
                remote: "/srv/app/.env".into(),
                mode: 0o600,
            },
            Event::CloseTransfer,
        ]
    );
}

#[tokio::test]
async fn test_sync_users_creates_missing_user() {
    let remote = MockRemote::new("deploy");
    remote.fail_exec("id -u alice", 1);
    remote.fail_exec("grep -qF", 1);

    let task = SyncUsers {
        users: vec![account("alice")],
    };
    task.run(&remote).await.unwrap();

    let events = remote.events();
    let commands = remote.commands();
    assert_eq!(commands[0], "id -u alice");
    assert_eq!(
        commands[1],
        r#"sudo useradd -m -p "$(openssl passwd -1 'pa'\''ss')" alice"#
    );
    // Password-bearing commands stay out of the input log.
    assert!(events.contains(&Event::Exec {
        command: commands[1].clone(),
        silent: true,
    }));
    assert_eq!(commands[2], "sudo usermod -aG sudo,docker alice");
    assert_eq!(commands[3], "sudo chsh -s /bin/bash alice");
    assert_eq!(
        commands[4],
        "sudo mkdir -p /home/alice/.ssh && sudo chown alice:alice /home/alice/.ssh && sudo chmod 700 /home/alice/.ssh"
    );
    assert_eq!(
        commands[5],
        "sudo grep -qF 'ssh-ed25519 AAAAC3Nza alice@laptop' /home/alice/.ssh/authorized_keys"
    );
    assert_eq!(
        commands[6],
        "echo 'ssh-ed25519 AAAAC3Nza alice@laptop' | sudo tee -a /home/alice/.ssh/authorized_keys > /dev/null"
    );
    assert_eq!(
        commands[7],
        "sudo chown alice:alice /home/alice/.ssh/authorized_keys && sudo chmod 600 /home/alice/.ssh/authorized_keys"
    );
    assert_eq!(commands.len(), 8);
}

#[tokio::test]
async fn test_sync_users_updates_existing_user_and_skips_known_key() {
    let remote = MockRemote::new("deploy");
    let mut user = account("bob");
    user.groups.clear();
    user.otp_secret = Some(SecretString::from("JBSWY3DPEHPK3PXP"));

    SyncUsers { users: vec![user] }.run(&remote).await.unwrap();

    let commands = remote.commands();
    assert_eq!(commands[1], r"echo 'bob:pa'\''ss' | sudo chpasswd");
    assert!(!commands.iter().any(|c| c.contains("usermod")));
    assert!(!commands.iter().any(|c| c.contains("tee -a")));

    // The authenticator file is written by a silent root script.
    let events = remote.events();
    let script = events
        .iter()
        .find_map(|e| match e {
            Event::Exec { command, silent } if command.contains("google_authenticator") => {
                Some((command.clone(), *silent))
            }
            _ => None,
        })
        .expect("authenticator script");
    assert!(script.1);
    assert!(script.0.starts_with("echo '#!/bin/bash"));
    assert!(script.0.contains("&& sudo /tmp/script_"));
}

#[tokio::test]
async fn test_sync_users_rejects_unsafe_username() {
    let remote = MockRemote::new("deploy");
    let task = SyncUsers {
        users: vec![account("bob;reboot")],
    };
    assert!(task.run(&remote).await.is_err());
    assert!(remote.commands().is_empty());
}

#[tokio::test]
async fn test_enforce_public_key_only() {
    let remote = MockRemote::new("deploy");
    EnforceSshPublicKeyOnly.run(&remote).await.unwrap();

    let commands = remote.commands();
    assert_eq!(commands.len(), 4);
    assert!(commands[0].contains("PasswordAuthentication no"));
    assert!(commands[1].contains("ChallengeResponseAuthentication no"));
    assert!(commands[2].contains("PubkeyAuthentication yes"));
    assert_eq!(commands[3], "sudo systemctl restart sshd");
}

#[tokio::test]
async fn test_enforce_otp_and_public_key() {
    let remote = MockRemote::new("deploy");
    EnforceSshOtpAndPublicKeyOnly.run(&remote).await.unwrap();

    let commands = remote.commands();
    assert_eq!(commands.len(), 8);
    assert!(commands[3].contains("AuthenticationMethods publickey,keyboard-interactive"));
    assert!(commands[6].contains("/etc/pam.d/sshd"));
    assert!(commands[6].contains("pam_google_authenticator.so"));
    assert_eq!(commands[7], "sudo systemctl restart sshd");
    // Settings are applied by elevated scripts.
    assert!(commands[..7].iter().all(|c| c.contains("&& sudo /tmp/script_")));
}

#[tokio::test]
async fn test_run_all_stops_at_first_failure() {
    let remote = MockRemote::new("deploy");
    remote.fail_exec("false", 1);

    let tasks: Vec<Box<dyn Task>> = vec![
        Box::new(RunCommand {
            command: "true".into(),
            sudo: false,
        }),
        Box::new(RunCommand {
            command: "false".into(),
            sudo: true,
        }),
        Box::new(RunScript {
            content: "echo never".into(),
            sudo: false,
        }),
    ];

    let err = run_all(&remote, &tasks).await.unwrap_err();
    assert!(err.to_string().contains("Step 2 (exec) failed"));
    assert_eq!(remote.commands(), vec!["true", "sudo false"]);
}
