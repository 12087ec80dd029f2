//! Candidate servers.

use serde::{Deserialize, Serialize};

/// A candidate deployment target.
///
/// A missing hostname, or the literal hostname `localhost`, means commands
/// run in a local shell instead of over SSH.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Server name, used in logs and injected environment variables.
    pub name: String,
    /// Hostname to connect to.
    pub hostname: Option<String>,
    /// SSH username.
    pub username: Option<String>,
    /// SSH port.
    pub port: Option<u16>,
    /// Path to the SSH private key.
    pub private_key_path: Option<String>,
}

impl Server {
    /// Whether commands for this server run in a local shell.
    pub fn is_local(&self) -> bool {
        match &self.hostname {
            None => true,
            Some(hostname) => hostname == "localhost",
        }
    }

    /// The SSH authority, `user@host` or bare `host`.
    pub fn authority(&self) -> String {
        let hostname = self.hostname.as_deref().unwrap_or("");
        match &self.username {
            Some(username) => format!("{}@{}", username, hostname),
            None => hostname.to_string(),
        }
    }
}
