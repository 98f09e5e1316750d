use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use thiserror::Error;
use umkm_payment_engine::{AccountApiError, PaymentGatewayError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    InsufficientFunds(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::NoMerchantProfile => StatusCode::FORBIDDEN,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
                AuthError::InvalidSignature => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PreconditionFailed(_) => StatusCode::CONFLICT,
            Self::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The user does not have a merchant profile.")]
    NoMerchantProfile,
    #[error("The request came from an address that is not allowed to call this endpoint.")]
    ForbiddenPeer,
    #[error("The request signature is invalid.")]
    InvalidSignature,
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        use PaymentGatewayError::*;
        match e {
            InvalidSignature => Self::AuthenticationError(AuthError::InvalidSignature),
            MalformedOrderIds(_) | InvalidDecision(_) => Self::InvalidRequestBody(e.to_string()),
            NoMatchingOrders | OrderNotFound(_) | DisputeNotFound(_) | MerchantNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            InvalidTransition(_) | PreconditionFailed(_) | DisputeAlreadyResolved(_) | DisputeAlreadyExists(_) => {
                Self::PreconditionFailed(e.to_string())
            },
            InsufficientBalance { .. } | BelowMinimumWithdrawal { .. } => Self::InsufficientFunds(e.to_string()),
            DatabaseError(_) | AccountError(_) => {
                error!("💻️ Backend failure. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::QueryError(_) => Self::InvalidRequestBody(e.to_string()),
            AccountApiError::DatabaseError(_) => {
                error!("💻️ Backend failure. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
