//! Identity context: who is acting, resolved from a bearer token

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::AppState;

/// Portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Role {
    Superadmin,
    Principal,
    /// Head of department
    Hod,
    CourseCoordinator,
    Teaching,
    NonTeaching,
    FacultyManagement,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Principal => "principal",
            Role::Hod => "hod",
            Role::CourseCoordinator => "course_coordinator",
            Role::Teaching => "teaching",
            Role::NonTeaching => "non_teaching",
            Role::FacultyManagement => "faculty_management",
        }
    }
}

/// Accepts the spellings found in issued tokens ("HOD", "non-teaching", ...)
impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "superadmin" => Ok(Role::Superadmin),
            "principal" => Ok(Role::Principal),
            "hod" => Ok(Role::Hod),
            "course_coordinator" => Ok(Role::CourseCoordinator),
            "teaching" => Ok(Role::Teaching),
            "non_teaching" => Ok(Role::NonTeaching),
            "faculty_management" => Ok(Role::FacultyManagement),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// The authenticated actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub employee_id: String,
    pub role: Role,
    pub department: String,
    pub first_name: String,
    pub last_name: String,
}

impl Identity {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_hod_of(&self, department: &str) -> bool {
        self.role == Role::Hod && self.department == department
    }
}

/// JWT claims carried by the bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub employee_id: String,
    pub role: Role,
    pub department: String,
    pub first_name: String,
    pub last_name: String,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            employee_id: claims.employee_id,
            role: claims.role,
            department: claims.department,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

/// Issues and verifies HS256 session tokens
pub struct Authenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl Authenticator {
    pub fn new(secret: &str, token_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        }
    }

    /// Mint a token for an identity
    pub fn issue(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id,
            employee_id: identity.employee_id.clone(),
            role: identity.role,
            department: identity.department.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            exp: (now + self.token_ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify a token and return the identity it carries
    pub fn authenticate(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        if data.claims.sub.is_nil() {
            return Err(AppError::Authentication("Token has no subject".to_string()));
        }

        Ok(data.claims.into())
    }

    /// Verify the bearer token in an Authorization header
    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Identity> {
        let token = bearer_token(headers)?;
        self.authenticate(token)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::Authentication("Missing Authorization header".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid Authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(AppError::Authentication("Empty bearer token".to_string())),
        None => Err(AppError::Authentication(
            "Authorization header must use Bearer token format".to_string(),
        )),
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        state.auth.authenticate_headers(&parts.headers)
    }
}
