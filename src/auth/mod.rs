// Identity arrives from the upstream gateway as two trusted headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Traveler,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "TRAVELER" => Ok(Role::Traveler),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(AppError::Unauthenticated),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::Forbidden(format!(
                "requires role {role:?}, caller is {:?}",
                self.role
            )));
        }
        Ok(())
    }

    pub fn require_self(&self, owner: Uuid, what: &str) -> Result<(), AppError> {
        if self.id != owner {
            return Err(AppError::Forbidden(format!("access denied to {what}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, PRINCIPAL_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthenticated)?;
        let role = header_value(parts, PRINCIPAL_ROLE_HEADER)?.parse::<Role>()?;

        Ok(Principal { id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthenticated)
}
