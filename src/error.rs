use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::structs::respond::ErrorBody;

/// 请求处理过程中所有可能返回给调用方的错误
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid base64 image data: {0}")]
    Decode(String),

    #[error("Unsupported image type: {mime}. Supported types: {supported}")]
    UnsupportedImageType { mime: String, supported: String },

    #[error("Request body too large. Maximum size is {}MB.", .0 / 1024 / 1024)]
    PayloadTooLarge(usize),

    #[error("This endpoint does not exist.")]
    NotFound,

    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        source: ProviderError,
    },

    // 具体原因只写日志，不返回给客户端
    #[error("An internal server error occurred.")]
    Internal(String),
}

impl ApiError {
    pub fn provider(context: &'static str, source: ProviderError) -> Self {
        ApiError::Provider { context, source }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_)
            | ApiError::InvalidBody(_)
            | ApiError::Decode(_)
            | ApiError::UnsupportedImageType { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Provider { source: ProviderError::Timeout, .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Provider { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

impl From<JsonPayloadError> for ApiError {
    fn from(err: JsonPayloadError) -> Self {
        match err {
            JsonPayloadError::Overflow { limit } => ApiError::PayloadTooLarge(limit),
            JsonPayloadError::OverflowKnownLength { limit, .. } => ApiError::PayloadTooLarge(limit),
            JsonPayloadError::ContentType => {
                ApiError::InvalidBody("expected Content-Type: application/json".to_string())
            }
            JsonPayloadError::Deserialize(e) => ApiError::InvalidBody(e.to_string()),
            JsonPayloadError::Payload(e) => ApiError::InvalidBody(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// 调用外部模型服务时的错误
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,

    #[error("could not reach provider: {0}")]
    Connection(String),

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("unreadable provider response: {0}")]
    Decode(String),

    #[error("provider returned an empty response")]
    Empty,
}

impl ProviderError {
    /// 只有确定对方没有处理请求时才允许重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Connection(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status == 503,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Connection(err.to_string())
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Request(err.to_string())
        }
    }
}

/// 启动阶段读取配置时的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("OPENAI_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("invalid provider base_url {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
