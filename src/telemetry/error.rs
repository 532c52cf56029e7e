use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialError {
    pub message: String,
}

impl TrialError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TrialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TrialError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitErrorKind {
    InvalidEndpoint,
    Serialization,
    Connect,
    Timeout,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
}

impl SubmitError {
    pub fn new(kind: SubmitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SubmitError {}

pub fn invalid_endpoint(message: impl Into<String>) -> SubmitError {
    SubmitError::new(SubmitErrorKind::InvalidEndpoint, message)
}

pub fn serialization_error(message: impl Into<String>) -> SubmitError {
    SubmitError::new(SubmitErrorKind::Serialization, message)
}

pub fn connect_error(message: impl Into<String>) -> SubmitError {
    SubmitError::new(SubmitErrorKind::Connect, message)
}

pub fn timeout_error(message: impl Into<String>) -> SubmitError {
    SubmitError::new(SubmitErrorKind::Timeout, message)
}

pub fn transport_error(message: impl Into<String>) -> SubmitError {
    SubmitError::new(SubmitErrorKind::Transport, message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    InvalidRegistration,
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: RegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegistryError {}

pub fn invalid_registration(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::InvalidRegistration, message)
}

pub fn duplicate_id(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::DuplicateId, message)
}
