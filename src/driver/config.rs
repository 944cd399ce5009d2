//! Connection options
//!
//! A database is named by a bare file path or by a URL of the form
//! `mdb://[username[:password]@][host[:port]]/path`. Only the path means
//! anything to a local file; the other parts are accepted so that generic
//! clients can pass them, and are ignored.
//!
//! The path is handed to the connection's [`Engine`](crate::engine::Engine).
//! The default [`MemoryEngine`](crate::engine::MemoryEngine) opens JSON
//! database files; reading real `.mdb`/`.accdb` files needs an engine that
//! understands the Jet page format, supplied as `Connection<E>`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// URL scheme accepted by [`ConnectOptions::parse`]
pub const URL_SCHEME: &str = "mdb";

/// Options for opening a database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectOptions {
    /// Database file
    pub path: PathBuf,
    /// Ignored
    pub username: Option<String>,
    /// Ignored
    pub password: Option<String>,
    /// Ignored
    pub host: Option<String>,
    /// Ignored
    pub port: Option<u16>,
    /// Driver-specific options string; ignored
    pub options: Option<String>,
}

impl ConnectOptions {
    /// Options for a database file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse a bare path or an `mdb://` URL.
    ///
    /// In the URL form the path keeps its leading `/`, as in `file://` URLs.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let Some((scheme, rest)) = name.split_once("://") else {
            if name.is_empty() {
                return Err(Error::Internal("Invalid database name: empty".to_string()));
            }
            return Ok(Self::new(name));
        };
        if !scheme.eq_ignore_ascii_case(URL_SCHEME) {
            return Err(Error::Internal(format!("Invalid URL: unsupported scheme '{}'", scheme)));
        }

        // Authority ends at the first '/'
        let (authority, path) = match rest.find('/') {
            Some(slash) => rest.split_at(slash),
            None => (rest, ""),
        };
        if path.is_empty() {
            return Err(Error::Internal("Invalid URL: missing path".to_string()));
        }

        let (auth, host_port) = match authority.rsplit_once('@') {
            Some((auth, host_port)) => (Some(auth), host_port),
            None => (None, authority),
        };
        let (username, password) = match auth.map(|a| a.split_once(':').unwrap_or((a, ""))) {
            Some((user, pass)) => (
                Some(user.to_string()),
                (!pass.is_empty()).then(|| pass.to_string()),
            ),
            None => (None, None),
        };

        let (host, port) = match host_port.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::Internal(format!("Invalid port: {}", port)))?;
                (host, Some(port))
            }
            None => (host_port, None),
        };

        Ok(Self {
            path: PathBuf::from(path),
            username,
            password,
            host: (!host.is_empty()).then(|| host.to_string()),
            port,
            options: None,
        })
    }

    /// Set the user name
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the driver-specific options string
    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// The database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log every option that will not be used
    pub(crate) fn log_ignored(&self) {
        if let Some(username) = &self.username {
            debug!("Ignoring user name '{}'", username);
        }
        if self.password.is_some() {
            debug!("Ignoring password");
        }
        if let Some(host) = &self.host {
            debug!("Ignoring host '{}'", host);
        }
        if let Some(port) = self.port {
            debug!("Ignoring port {}", port);
        }
        if let Some(options) = &self.options {
            debug!("Ignoring connect options '{}'", options);
        }
    }
}

impl From<&str> for ConnectOptions {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for ConnectOptions {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for ConnectOptions {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}
