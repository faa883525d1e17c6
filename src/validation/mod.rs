/// Credential validation module
///
/// Pure checks over registration, login, and password-reset input.
/// Each function reports the first violated rule only, in a fixed
/// evaluation order: presence, then username length, phone shape,
/// password length, email syntax. Field type errors never reach this
/// module; deserialization rejects them earlier.
use crate::error::{LibrisError, LibrisResult};
use validator::ValidateEmail;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 20;
pub const PHONE_DIGITS: usize = 10;

/// Raw registration fields as they arrive off the wire
#[derive(Debug, Clone, Default)]
pub struct RegistrationInput {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Registration fields after every rule has passed
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// A login identifier, disambiguated by syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginId {
    Email(String),
    Username(String),
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Validate registration input, reporting the first violated rule
pub fn validate_registration(input: RegistrationInput) -> LibrisResult<Registration> {
    let (name, username, email, phone, password) = match (
        present(input.name),
        present(input.username),
        present(input.email),
        present(input.phone),
        present(input.password),
    ) {
        (Some(n), Some(u), Some(e), Some(ph), Some(pw)) => (n, u, e, ph, pw),
        _ => {
            return Err(LibrisError::Validation("Missing credentials".to_string()));
        }
    };

    let username_len = char_len(&username);
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        return Err(LibrisError::Validation(format!(
            "Username should be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }

    if char_len(&phone) != PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(LibrisError::Validation(format!(
            "Phone number should have {} digits",
            PHONE_DIGITS
        )));
    }

    validate_password_length(&password)?;

    if !email.validate_email() {
        return Err(LibrisError::Validation("Invalid email format".to_string()));
    }

    Ok(Registration {
        name,
        username,
        email,
        phone,
        password,
    })
}

/// Validate a login submission: both fields present, identifier
/// disambiguated by syntax
pub fn validate_login(
    login_id: Option<String>,
    password: Option<String>,
) -> LibrisResult<(LoginId, String)> {
    let (login_id, password) = match (present(login_id), present(password)) {
        (Some(l), Some(p)) => (l, p),
        _ => {
            return Err(LibrisError::Validation("Missing credentials".to_string()));
        }
    };

    Ok((resolve_login_id(login_id), password))
}

/// Validate the lone identifier used by resend-verification and
/// forgot-password
pub fn validate_login_id(login_id: Option<String>) -> LibrisResult<LoginId> {
    let login_id = present(login_id)
        .ok_or_else(|| LibrisError::Validation("Missing email/username".to_string()))?;

    Ok(resolve_login_id(login_id))
}

/// Validate a reset submission: presence, match, then length
pub fn validate_password_pair(
    new_password: Option<String>,
    confirm_password: Option<String>,
) -> LibrisResult<String> {
    let (new_password, confirm_password) =
        match (present(new_password), present(confirm_password)) {
            (Some(n), Some(c)) => (n, c),
            _ => {
                return Err(LibrisError::Validation("Missing credentials".to_string()));
            }
        };

    if new_password != confirm_password {
        return Err(LibrisError::Validation(
            "New password and confirm password do not match".to_string(),
        ));
    }

    validate_password_length(&new_password)?;

    Ok(new_password)
}

fn validate_password_length(password: &str) -> LibrisResult<()> {
    let len = char_len(password);
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(LibrisError::Validation(format!(
            "Password should be {}-{} characters",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }
    Ok(())
}

fn resolve_login_id(login_id: String) -> LoginId {
    if login_id.validate_email() {
        LoginId::Email(login_id)
    } else {
        LoginId::Username(login_id)
    }
}
