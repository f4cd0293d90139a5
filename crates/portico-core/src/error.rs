//! Error types for Portico

use thiserror::Error;

use crate::types::{AttemptLog, HealthSnapshot};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Request Errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Directory Outcomes
    #[error("Credentials rejected by {} directory endpoint(s)", .attempts.len())]
    Unauthorized { attempts: AttemptLog },

    #[error("User not found: {login}")]
    NotFound { login: String },

    #[error("Directory pool unavailable (health {})", .health.status)]
    DirectoryUnavailable { health: HealthSnapshot },

    #[error(
        "Directory lookup failed on {} endpoint(s) (health {})",
        .attempts.len(),
        .health.status
    )]
    DirectoryDegraded {
        health: HealthSnapshot,
        attempts: AttemptLog,
    },

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "InvalidInput",
            Error::Unauthorized { .. } => "Unauthorized",
            Error::NotFound { .. } => "NotFound",
            Error::DirectoryUnavailable { .. } | Error::DirectoryDegraded { .. } => "InternalError",
            Error::Config(_) => "InternalError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::Unauthorized { .. } => 401,
            Error::NotFound { .. } => 404,
            _ => 500,
        }
    }

    /// Health snapshot carried by directory errors
    pub fn health(&self) -> Option<&HealthSnapshot> {
        match self {
            Error::DirectoryUnavailable { health } | Error::DirectoryDegraded { health, .. } => {
                Some(health)
            }
            _ => None,
        }
    }

    /// Attempt log carried by directory errors
    pub fn attempts(&self) -> Option<&AttemptLog> {
        match self {
            Error::Unauthorized { attempts } | Error::DirectoryDegraded { attempts, .. } => {
                Some(attempts)
            }
            _ => None,
        }
    }
}
