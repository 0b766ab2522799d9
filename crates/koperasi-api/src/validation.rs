//! Request body rules. Each check records a field error instead of failing
//! fast so the caller gets every problem in one response.

use koperasi_types::api::FieldError;

use crate::error::ApiError;

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize, message: &str) -> &mut Self {
        self.check(value.chars().count() >= min, field, message)
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_valid_email(value), field, "Email tidak valid")
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Shape check only: `local@domain.tld` with no whitespace and non-empty
/// labels on both sides of every dot in the domain.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Rules shared by public registration and admin user creation.
pub fn account_rules(v: &mut Validator, name: &str, email: &str, password: &str) {
    v.min_chars("name", name.trim(), 2, "Nama minimal 2 karakter")
        .email("email", email.trim())
        .min_chars("password", password, 6, "Password minimal 6 karakter");
}
