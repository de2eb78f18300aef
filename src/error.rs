use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type of every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures surfaced by the crate.
///
/// HTTP failures are split in two families: user-caused ([`Error::is_user_error`]) and
/// server-caused ([`Error::is_server_error`]). Everything else is either a configuration mistake
/// reported at the point of misuse, or a transport/decoding failure.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The call doesn't match the API's definition. Check arguments, interface, command and
    /// version. (400)
    #[error("bad API call, check arguments, interface, command and version")]
    BadCall,

    /// The API requires a key, or the key has insufficient permissions. (401)
    #[error("unauthorized, api_key is likely invalid")]
    Unauthorized,

    /// A key was sent, but it is not allowed to access this resource. (403)
    #[error("forbidden, the api_key has insufficient privileges or the resource is private")]
    Forbidden,

    /// No key was sent and the API requires one. (403)
    #[error("this API requires an api_key")]
    KeyRequired,

    /// The API does not exist. (404)
    #[error("API not found")]
    NotFound,

    /// Any other 4xx response.
    #[error("API call failed with status {status}")]
    Failure {
        /// HTTP status code.
        status: u16,
    },

    /// A lookup performed by a resource found no matching user.
    #[error("user not found")]
    UserNotFound,

    /// 5xx response.
    #[error("server error (status {status})")]
    Server {
        /// HTTP status code.
        status: u16,
    },

    /// Invalid combination of settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A different node is already registered under this name.
    #[error("'{name}' is already taken by another API node")]
    DuplicateNode {
        /// Dotted name of the node.
        name: String,
    },

    /// A strict call tree was asked for a name it doesn't know.
    #[error("strict interface has no API named '{name}'")]
    Strict {
        /// Dotted name that was looked up.
        name: String,
    },

    /// Node names must look like identifiers and must not start with `_`.
    #[error("'{name}' is not a valid API identifier")]
    InvalidIdentifier {
        /// The rejected name.
        name: String,
    },

    /// A response has no field with this name.
    #[error("response has no field '{name}'")]
    MissingField {
        /// Field name.
        name: String,
    },

    /// A response field exists but holds a different kind of value.
    #[error("response field '{name}' is not {expected}")]
    UnexpectedType {
        /// Field name.
        name: String,
        /// Description of the expected kind.
        expected: &'static str,
    },

    /// The body of an automatically parsed response was not a JSON object.
    #[error("response body is not a JSON object")]
    UnexpectedPayload,

    /// The configured base URL does not parse.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),

    /// Response body could not be decoded.
    #[error(transparent)]
    Json(Arc<serde_json::Error>),
}

impl Error {
    /// Whether the failure was caused by the request rather than the server.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::BadCall
                | Error::Unauthorized
                | Error::Forbidden
                | Error::KeyRequired
                | Error::NotFound
                | Error::Failure { .. }
                | Error::UserNotFound
        )
    }

    /// Whether the server answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// HTTP status code of a classified failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::BadCall => Some(400),
            Error::Unauthorized => Some(401),
            Error::Forbidden | Error::KeyRequired => Some(403),
            Error::NotFound => Some(404),
            Error::Failure { status } | Error::Server { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Json(Arc::new(value))
    }
}

/// Map a response status to an error. `key_present` tells whether the request carried a `key`
/// parameter, which decides how a 403 is reported.
pub(crate) fn check_status(status: StatusCode, key_present: bool) -> Result<()> {
    let code = status.as_u16();
    match code {
        400 => Err(Error::BadCall),
        401 => Err(Error::Unauthorized),
        403 if key_present => Err(Error::Forbidden),
        403 => Err(Error::KeyRequired),
        404 => Err(Error::NotFound),
        400..=499 => Err(Error::Failure { status: code }),
        500..=599 => Err(Error::Server { status: code }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{check_status, Error};

    fn classify(code: u16, key_present: bool) -> Option<Error> {
        check_status(StatusCode::from_u16(code).unwrap(), key_present).err()
    }

    #[test]
    fn maps_known_client_errors() {
        assert!(matches!(classify(400, true), Some(Error::BadCall)));
        assert!(matches!(classify(401, false), Some(Error::Unauthorized)));
        assert!(matches!(classify(404, true), Some(Error::NotFound)));
    }

    #[test]
    fn forbidden_depends_on_key_presence() {
        assert!(matches!(classify(403, true), Some(Error::Forbidden)));
        assert!(matches!(classify(403, false), Some(Error::KeyRequired)));
    }

    #[test]
    fn other_client_errors_are_generic_failures() {
        assert!(matches!(
            classify(429, true),
            Some(Error::Failure { status: 429 })
        ));
        assert!(matches!(
            classify(410, false),
            Some(Error::Failure { status: 410 })
        ));
    }

    #[test]
    fn server_errors() {
        assert!(matches!(classify(500, true), Some(Error::Server { status: 500 })));
        assert!(matches!(classify(503, false), Some(Error::Server { status: 503 })));
    }

    #[test]
    fn success_and_other_codes_pass() {
        assert!(classify(200, true).is_none());
        assert!(classify(204, false).is_none());
        assert!(classify(302, false).is_none());
    }

    #[test]
    fn taxonomy_families() {
        let err = classify(403, false).unwrap();
        assert!(err.is_user_error());
        assert!(!err.is_server_error());
        assert_eq!(err.status(), Some(403));

        let err = classify(502, true).unwrap();
        assert!(err.is_server_error());
        assert!(!err.is_user_error());
        assert_eq!(err.status(), Some(502));

        assert!(!Error::Configuration("x".into()).is_user_error());
        assert_eq!(Error::UnexpectedPayload.status(), None);
    }
}
