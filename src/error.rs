#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("error assuming hub role '{role_arn}'")]
    HubAssumptionError {
        role_arn: String,
        #[source]
        source: Box<Error>,
    },

    #[error("error assuming '{role_arn}' role in account {account_id}")]
    SpokeAssumptionError {
        role_arn: String,
        account_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Cancelled while assuming {0} role")]
    Cancelled(crate::chain::Stage),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    StdIoError(#[from] std::io::Error),

    #[error(transparent)]
    InvaildHeaderError(#[from] reqwest::header::InvalidHeaderName),

    #[error(transparent)]
    InvalidHeaderValueError(#[from] reqwest::header::InvalidHeaderValue),

    #[error(transparent)]
    HttpError(#[from] http::Error),

    #[error(transparent)]
    XmlError(#[from] roxmltree::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error("API Error ({status}): {code}: {message}")]
    ApiError {
        status: reqwest::StatusCode,
        code: String,
        message: String,
        request_id: Option<String>,
    },
}

/// Error codes STS returns when a request should be retried as-is
const RETRYABLE_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "IDPCommunicationError",
];

impl Error {
    /// Whether the transport may retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReqwestError(e) => e.is_timeout() || e.is_connect(),
            Self::ApiError { status, code, .. } => {
                status.is_server_error() || RETRYABLE_ERROR_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    /// The stage of the credential chain this error was raised at, if any
    pub fn stage(&self) -> Option<crate::chain::Stage> {
        match *self {
            Self::HubAssumptionError { .. } => Some(crate::chain::Stage::Hub),
            Self::SpokeAssumptionError { .. } => Some(crate::chain::Stage::Spoke),
            Self::Cancelled(stage) => Some(stage),
            _ => None,
        }
    }
}
