//! Execution endpoints.

use noodles_core::Server;

/// The target a command batch runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A local shell.
    Local,
    /// A remote server reached over SSH.
    Remote {
        /// `user@host` or bare `host`.
        authority: String,
        /// SSH port, when not the default.
        port: Option<u16>,
        /// Identity file passed to `ssh -i`.
        private_key_path: Option<String>,
    },
}

impl Endpoint {
    /// Resolve the endpoint for a server.
    ///
    /// No server, a missing hostname, or `localhost` all mean the local
    /// shell.
    pub fn for_server(server: Option<&Server>) -> Endpoint {
        match server {
            Some(server) if !server.is_local() => Endpoint::Remote {
                authority: server.authority(),
                port: server.port,
                private_key_path: server.private_key_path.clone(),
            },
            _ => Endpoint::Local,
        }
    }

    /// The command that launches a script-reading shell on this endpoint.
    pub(crate) fn launch_command(&self) -> String {
        match self {
            Endpoint::Local => "bash -c".to_string(),
            Endpoint::Remote {
                authority,
                port,
                private_key_path,
            } => {
                let mut options = Vec::new();
                if let Some(path) = private_key_path {
                    options.push(format!("-i {}", path));
                }
                if let Some(port) = port {
                    options.push(format!("-p {}", port));
                }
                format!("ssh {} {}", options.join(" "), authority)
            }
        }
    }
}
