//! Account factory rules: email normalisation and staff flags.

use crate::validation::FieldErrors;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccountError {
    #[error("Users must have an email address")]
    MissingEmail,

    #[error("Password cannot be empty")]
    EmptyPassword,
}

impl From<AccountError> for FieldErrors {
    fn from(err: AccountError) -> Self {
        let field = match err {
            AccountError::MissingEmail => "email",
            AccountError::EmptyPassword => "password",
        };
        FieldErrors::single(field, err.to_string())
    }
}

/// Lower-case the domain part of an email, leaving the local part alone.
///
/// Splits on the last `@`; a string without one is returned trimmed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// A validated request to create an account. The password is still plain
/// text here; hashing belongs to the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewAccount {
    pub fn regular(email: &str, password: &str) -> Result<Self, AccountError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AccountError::MissingEmail);
        }
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        Ok(Self {
            email,
            name: String::new(),
            password: password.to_string(),
            is_staff: false,
            is_superuser: false,
        })
    }

    pub fn superuser(email: &str, password: &str) -> Result<Self, AccountError> {
        let mut account = Self::regular(email, password)?;
        account.is_staff = true;
        account.is_superuser = true;
        Ok(account)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.trim().to_string();
        self
    }
}
