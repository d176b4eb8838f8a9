pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("operation not allowed: {message}")]
    Authorization {
        message: String,
        #[source]
        source: ServiceError,
    },
    #[error("unable to get the checkout URL, please try again later")]
    CheckoutRequest {
        #[source]
        source: ServiceError,
    },
    #[error("unable to check purchases for pack {pack_id}")]
    PurchaseCheck {
        pack_id: String,
        #[source]
        source: ServiceError,
    },
    #[error("shop request failed")]
    Service {
        #[source]
        source: ServiceError,
    },
    #[error("purchase of pack {pack_id} was not confirmed within {waited_secs}s")]
    PurchaseTimeout { pack_id: String, waited_secs: u64 },
    #[error("log in to purchase this item")]
    NotAuthenticated,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for AppError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(source: ServiceError) -> Self {
        Self::Service { source }
    }
}

impl AppError {
    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classifies a failed checkout-URL request.
    ///
    /// A 403 carrying `auth/wrong-password` is the dev-mode password gate
    /// rejecting the shared secret; everything else is a generic failure.
    pub fn from_checkout_failure(source: ServiceError) -> Self {
        if source.is_wrong_password() {
            Self::Authorization {
                message: "wrong asset store password".to_string(),
                source,
            }
        } else {
            Self::CheckoutRequest { source }
        }
    }

    pub fn purchase_check(pack_id: impl Into<String>, source: ServiceError) -> Self {
        Self::PurchaseCheck {
            pack_id: pack_id.into(),
            source,
        }
    }
}

pub const WRONG_PASSWORD_CODE: &str = "auth/wrong-password";

/// Failure reported by a remote collaborator (billing or purchase listing).
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("{operation} returned HTTP {status}{}", format_code(.code))]
    Status {
        operation: &'static str,
        status: u16,
        code: Option<String>,
        body: String,
    },
    #[error("{operation} request failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{operation} returned an unexpected payload: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn status(
        operation: &'static str,
        status: u16,
        code: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Status {
            operation,
            status,
            code,
            body: body.into(),
        }
    }

    pub fn transport(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            operation,
            source: Box::new(source),
        }
    }

    pub fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation,
            message: message.into(),
        }
    }

    pub fn is_wrong_password(&self) -> bool {
        matches!(
            self,
            Self::Status { status: 403, code: Some(code), .. } if code == WRONG_PASSWORD_CODE
        )
    }
}

fn format_code(code: &Option<String>) -> String {
    code.as_deref()
        .map(|code| format!(" ({code})"))
        .unwrap_or_default()
}
