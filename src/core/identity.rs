use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Student,
    Professor,
    Admin,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "professor" | "prof" | "teacher" => Some(Self::Professor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    fn subject_claims(self) -> &'static [&'static str] {
        match self {
            Self::Student => &["student_id", "sub", "id"],
            Self::Professor => &["professor_id", "prof_id", "sub", "id", "username"],
            Self::Admin => &["admin_id", "sub", "id", "username"],
        }
    }
}

/// Caller identity normalised once at the HTTP boundary. Everything past the
/// guards consumes this value and never looks at raw token claims.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Identity {
    pub(crate) subject_id: String,
    pub(crate) role: Role,
    pub(crate) extra_claims: Map<String, Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum IdentityError {
    #[error("token could not be decoded")]
    InvalidToken,
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("token does not carry a recognised role")]
    UnknownRole,
    #[error("token does not carry a subject identifier")]
    MissingSubject,
}

impl Identity {
    pub(crate) fn from_claims(mut claims: Map<String, Value>) -> Result<Self, IdentityError> {
        let role = match claims.get("role").and_then(Value::as_str) {
            Some(raw) => Role::parse(raw).ok_or(IdentityError::UnknownRole)?,
            None => infer_role(&claims).ok_or(IdentityError::UnknownRole)?,
        };

        let subject_id = role
            .subject_claims()
            .iter()
            .find_map(|key| claims.get(*key).and_then(claim_as_id))
            .ok_or(IdentityError::MissingSubject)?;

        claims.remove("role");
        claims.remove("exp");

        Ok(Self { subject_id, role, extra_claims: claims })
    }

    pub(crate) fn can_author_assignments(&self) -> bool {
        matches!(self.role, Role::Professor | Role::Admin)
    }

    /// Numeric student id, present only for student identities.
    pub(crate) fn student_id(&self) -> Option<i64> {
        if self.role != Role::Student {
            return None;
        }
        self.subject_id.parse::<i64>().ok().filter(|id| *id > 0)
    }
}

pub(crate) fn decode_token(token: &str, settings: &Settings) -> Result<Identity, IdentityError> {
    let algorithm = match settings.security().algorithm.as_str() {
        "HS256" => Algorithm::HS256,
        other => return Err(IdentityError::UnsupportedAlgorithm(other.to_string())),
    };

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());

    let data = decode::<Map<String, Value>>(
        token,
        &DecodingKey::from_secret(settings.security().secret_key.as_bytes()),
        &validation,
    )
    .map_err(|_| IdentityError::InvalidToken)?;

    Identity::from_claims(data.claims)
}

fn infer_role(claims: &Map<String, Value>) -> Option<Role> {
    if claims.contains_key("professor_id") || claims.contains_key("prof_id") {
        Some(Role::Professor)
    } else if claims.contains_key("admin_id") {
        Some(Role::Admin)
    } else if claims.contains_key("student_id") {
        Some(Role::Student)
    } else {
        None
    }
}

fn claim_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
