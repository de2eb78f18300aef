use std::time::Duration;

use crate::{ApiConnection, Result};

/// Number of ids sent per bulk summary request when precaching.
pub const PRECACHE_CHUNK_SIZE: usize = 35;

/// Advanced settings shared by every resource using a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Whether operations returning groups of users (such as friend lists) should precache their
    /// player summaries with bulk requests. Recommended if names are used right away, since
    /// fetching them one by one takes a while.
    pub precache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { precache: true }
    }
}

/// Configuration for [`ApiConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) settings: Settings,
}

impl ConnectionConfig {
    /// Default base URL for API calls.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.steampowered.com";

    /// Configuration without an API key. Some APIs will not work.
    pub fn anonymous() -> Self {
        ConnectionConfig {
            api_key: None,
            base_url: ConnectionConfig::DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            settings: Settings::default(),
        }
    }

    /// Create a default configuration using the specified API key. An empty key means no key.
    ///
    /// ```
    /// # use steamapi::ConnectionConfig;
    /// ConnectionConfig::from_api_key("api-key");
    /// ```
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        ConnectionConfig {
            api_key: (!api_key.is_empty()).then_some(api_key),
            ..ConnectionConfig::anonymous()
        }
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    pub fn base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = base_url.into();
        self
    }

    /// Request timeout applied by the HTTP client. No timeout by default.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether friend lists precache their summaries. Enabled by default.
    pub fn precache(&mut self, precache: bool) -> &mut Self {
        self.settings.precache = precache;
        self
    }

    /// Create a new [`ApiConnection`] using this configuration.
    ///
    /// ```
    /// # use steamapi::{ApiConnection, ConnectionConfig};
    /// let connection: ApiConnection = ConnectionConfig::from_api_key("api-key")
    ///     .to_connection()
    ///     .unwrap();
    /// ```
    pub fn to_connection(&self) -> Result<ApiConnection> {
        ApiConnection::new(self.clone())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig::anonymous()
    }
}

/// Configuration of an [`ApiInterface`](crate::ApiInterface) call tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// Fetch the list of supported APIs and build the tree up front.
    pub autopopulate: bool,
    /// Only allow access to APIs already in the tree. Requires `autopopulate`.
    pub strict: bool,
}

impl InterfaceConfig {
    /// Autopopulated, but still open to unknown names.
    pub fn autopopulated() -> Self {
        InterfaceConfig {
            autopopulate: true,
            strict: false,
        }
    }

    /// Autopopulated and closed to unknown names.
    pub fn strict() -> Self {
        InterfaceConfig {
            autopopulate: true,
            strict: true,
        }
    }
}
