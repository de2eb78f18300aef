use std::sync::{Arc, Mutex, OnceLock, RwLock};

use reqwest::{blocking::Response, Url};
use serde_json::Value;

use crate::{
    args::{ApiArgs, Method},
    config::{ConnectionConfig, Settings},
    error::check_status,
    ApiResponse, Error, Result,
};

static INSTANCE: OnceLock<Arc<ApiConnection>> = OnceLock::new();
static INSTANCE_INIT: Mutex<()> = Mutex::new(());

/// A connection to the Web API: HTTP client, API key and settings.
///
/// Connections are usually shared as `Arc<ApiConnection>` between resources and call trees. A
/// process-wide instance is available through [`ApiConnection::instance`].
pub struct ApiConnection {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    base_url: Url,
    api_key: RwLock<Option<String>>,
    settings: Settings,
}

/// Result of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed and wrapped JSON body.
    Response(ApiResponse),
    /// Body as received, returned when the caller chose the `format` argument.
    Raw(String),
}

impl Payload {
    /// The wrapped response, or [`Error::UnexpectedPayload`] for a raw body.
    pub fn into_response(self) -> Result<ApiResponse> {
        match self {
            Payload::Response(response) => Ok(response),
            Payload::Raw(_) => Err(Error::UnexpectedPayload),
        }
    }

    /// The wrapped response, if the body was parsed.
    pub fn as_response(&self) -> Option<&ApiResponse> {
        match self {
            Payload::Response(response) => Some(response),
            Payload::Raw(_) => None,
        }
    }

    /// The raw body, if parsing was disabled.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Raw(raw) => Some(raw),
            Payload::Response(_) => None,
        }
    }
}

/// A fully normalized request, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// Effective HTTP method.
    pub method: Method,
    /// Full endpoint URL, without query.
    pub url: Url,
    /// Normalized arguments, sent as query or form body depending on `method`.
    pub params: Vec<(String, String)>,
    /// Whether the body will be parsed and wrapped. Disabled when the caller supplied `format`.
    pub automatic_parsing: bool,
}

impl PreparedRequest {
    /// Whether the request carries a `key` parameter.
    pub fn has_key(&self) -> bool {
        self.params.iter().any(|(name, _)| name == "key")
    }
}

impl ApiConnection {
    /// Create a connection using the specified configuration.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(Error::InvalidBaseUrl)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "base_url '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(ApiConnection {
            client,
            base_url,
            api_key: RwLock::new(config.api_key),
            settings: config.settings,
        })
    }

    /// The process-wide connection.
    ///
    /// The first call creates it from `config`; every later call returns the same instance and
    /// ignores its argument. Use [`ApiConnection::reset`] to change the key afterwards.
    pub fn instance(config: ConnectionConfig) -> Result<Arc<ApiConnection>> {
        if let Some(instance) = INSTANCE.get() {
            return Ok(instance.clone());
        }

        let _guard = INSTANCE_INIT
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(instance) = INSTANCE.get() {
            return Ok(instance.clone());
        }

        let instance = Arc::new(ApiConnection::new(config)?);
        log::debug!(target: "steamapi", "initialized global connection");
        Ok(INSTANCE.get_or_init(|| instance).clone())
    }

    /// The process-wide connection, if [`ApiConnection::instance`] has been called.
    pub fn global() -> Option<Arc<ApiConnection>> {
        INSTANCE.get().cloned()
    }

    /// Replace the API key. An empty key means no key.
    pub fn reset(&self, api_key: Option<&str>) {
        let api_key = api_key.filter(|key| !key.is_empty()).map(str::to_owned);
        *self
            .api_key
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = api_key;
    }

    /// The configured API key.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Settings shared by resources using this connection.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Base URL every API path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Call `{base_url}/{interface}/{command}/{version}/`.
    ///
    /// Lists in `args` are sent comma-joined and booleans as `1`/`0`. `format=json` is added
    /// and the body parsed, unless `args` carries its own `format`, in which case the body is
    /// returned raw. The configured key overrides any `key` in `args`.
    pub fn call(
        &self,
        interface: &str,
        command: &str,
        version: &str,
        method: Method,
        args: ApiArgs,
    ) -> Result<Payload> {
        let request = self.prepare(&[interface, command, version], method, args)?;
        self.execute(request)
    }

    /// [`ApiConnection::call`] expecting a parsed response.
    pub fn call_response(
        &self,
        interface: &str,
        command: &str,
        version: &str,
        method: Method,
        args: ApiArgs,
    ) -> Result<ApiResponse> {
        self.call(interface, command, version, method, args)?
            .into_response()
    }

    /// Build the request for the API at `path` (one segment per path element) without sending it.
    pub fn prepare<S: AsRef<str>>(
        &self,
        path: &[S],
        method: Method,
        mut args: ApiArgs,
    ) -> Result<PreparedRequest> {
        let url = self.endpoint(path)?;

        let automatic_parsing = !args.contains("format");
        if automatic_parsing {
            args.set("format", "json");
        }
        if let Some(key) = self.api_key() {
            args.set("key", key);
        }

        Ok(PreparedRequest {
            method,
            url,
            params: args.normalize(),
            automatic_parsing,
        })
    }

    /// Send a prepared request, classify the response and decode its body.
    pub fn execute(&self, request: PreparedRequest) -> Result<Payload> {
        let response = self.send(&request)?;
        self.decode(&request, response)
    }

    /// Send a prepared request and classify the response status, leaving the body unread.
    pub(crate) fn send(&self, request: &PreparedRequest) -> Result<Response> {
        log::debug!(target: "steamapi",
                    method = request.method.as_str(),
                    url:display = request.url;
                    "calling API");

        let builder = self
            .client
            .request(request.method.into(), request.url.clone());
        let builder = match request.method {
            Method::Get => builder.query(&request.params),
            Method::Post => builder.form(&request.params),
        };
        let response = builder.send()?;

        let status = response.status();
        check_status(status, request.has_key()).inspect_err(|err| {
            log::warn!(target: "steamapi",
                       url:display = request.url,
                       status = status.as_u16();
                       "API call failed: {}", err);
        })?;

        Ok(response)
    }

    /// Read the body of a successful response: wrapped JSON, or raw text when the caller chose
    /// the `format`.
    pub(crate) fn decode(&self, request: &PreparedRequest, response: Response) -> Result<Payload> {
        if !request.automatic_parsing {
            return Ok(Payload::Raw(response.text()?));
        }

        let body = response.bytes()?;
        let body: Value = serde_json::from_slice(&body)?;
        ApiResponse::from_body(body).map(Payload::Response)
    }

    fn endpoint<S: AsRef<str>>(&self, path: &[S]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Configuration("base_url cannot be used as a base".to_owned()))?
            .pop_if_empty()
            .extend(path.iter().map(AsRef::as_ref))
            .push("");
        Ok(url)
    }
}

impl std::fmt::Debug for ApiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConnection")
            .field("base_url", &self.base_url.as_str())
            .field("has_key", &self.api_key().is_some())
            .field("settings", &self.settings)
            .finish()
    }
}
