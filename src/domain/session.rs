// Session domain model
use serde::Serialize;
use thiserror::Error;

pub const ADMINISTRATOR_ROLE: &str = "ADMINISTRADOR";

/// An authenticated staff session. Set at login, dropped at logout or expiry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: String,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Session {
    pub fn has_any_role(&self, required: &[&str]) -> bool {
        self.roles
            .iter()
            .any(|role| required.iter().any(|r| role.eq_ignore_ascii_case(r)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("You must sign in to access this page.")]
    NotAuthenticated,
    #[error("You do not have the role required to access this page.")]
    MissingRole,
}

/// Route guard: a session is required, and one of `required` roles when any are listed.
pub fn authorize<'a>(
    session: Option<&'a Session>,
    required: &[&str],
) -> Result<&'a Session, AccessError> {
    let session = session.ok_or(AccessError::NotAuthenticated)?;
    if !required.is_empty() && !session.has_any_role(required) {
        return Err(AccessError::MissingRole);
    }
    Ok(session)
}
