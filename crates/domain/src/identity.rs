use schemabridge_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Target group mirroring the administrator role; never deleted.
pub const ADMINISTRATORS_GROUP: &str = "Administrators";

/// Target group every mirrored user belongs to; never deleted.
pub const ALL_USERS_GROUP: &str = "All Users";

/// Placeholder identity of the source store that is never mirrored.
pub const GUEST_EMAIL: &str = "guest@localhost";

/// Returns whether a target group name is reserved by the target system.
#[must_use]
pub fn is_reserved_group(name: &str) -> bool {
    name == ADMINISTRATORS_GROUP || name == ALL_USERS_GROUP
}

/// Named access group of the source-of-truth ACL store with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: NonEmptyString,
    members: Vec<String>,
}

impl Role {
    /// Creates a role from its name and member emails.
    pub fn new(name: impl Into<String>, members: Vec<String>) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            members,
        })
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns member emails that are mirrored to the target system.
    pub fn mirrored_members(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .map(String::as_str)
            .filter(|email| *email != GUEST_EMAIL)
    }

    /// Returns whether members of this role are superusers in the target.
    #[must_use]
    pub fn grants_superuser(&self) -> bool {
        self.name.as_str() == ADMINISTRATORS_GROUP
    }
}

/// First and last name derived from an email-like identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl PersonName {
    /// Derives a name from `first.last@domain`.
    ///
    /// The local part is split on `.` and both parts are capitalised. A local
    /// part without a dot takes the first domain label as last name.
    pub fn from_email(email: &str) -> AppResult<Self> {
        let Some((local_part, domain)) = email.split_once('@') else {
            return Err(AppError::Validation(format!(
                "identity '{email}' is not an email address"
            )));
        };

        let mut parts = local_part.split('.').filter(|part| !part.is_empty());
        let first = parts.next().ok_or_else(|| {
            AppError::Validation(format!("identity '{email}' has an empty local part"))
        })?;
        let last = parts
            .next()
            .or_else(|| domain.split('.').find(|label| !label.is_empty()))
            .unwrap_or_default();

        Ok(Self {
            first_name: capitalize(first),
            last_name: capitalize(last),
        })
    }
}

fn capitalize(value: &str) -> String {
    let mut characters = value.chars();
    match characters.next() {
        Some(first) => first
            .to_uppercase()
            .chain(characters.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
