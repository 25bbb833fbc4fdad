use thiserror::Error;

use crate::token::Token;

/// Errors raised while registering or resolving providers.
#[derive(Debug, Error)]
pub enum InjectorError {
    #[error("No provider registered for {token}")]
    MissingProvider { token: Token },

    #[error("Provider {token} is registered but has not been initialized")]
    Uninitialized { token: Token },

    #[error("Provider {token} is registered more than once")]
    DuplicateProvider { token: Token },

    #[error("Cyclic provider dependency: {}", render_path(.path))]
    CyclicDependency { path: Vec<Token> },

    #[error("Provider {token} does not hold a value of type {expected}")]
    TypeMismatch { token: Token, expected: &'static str },

    #[error("Failed to construct {token}: {message}")]
    Construction { token: Token, message: String },
}

impl InjectorError {
    /// Create a new MissingProvider error
    pub fn missing_provider(token: Token) -> Self {
        Self::MissingProvider { token }
    }

    /// Create a new Construction error
    pub fn construction(token: Token, message: impl Into<String>) -> Self {
        Self::Construction {
            token,
            message: message.into(),
        }
    }

    /// Token the error refers to, if it names exactly one.
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::MissingProvider { token }
            | Self::Uninitialized { token }
            | Self::DuplicateProvider { token }
            | Self::TypeMismatch { token, .. }
            | Self::Construction { token, .. } => Some(token),
            Self::CyclicDependency { .. } => None,
        }
    }
}

fn render_path(path: &[Token]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for injector operations.
pub type Result<T> = std::result::Result<T, InjectorError>;
