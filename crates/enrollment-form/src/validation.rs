//! Input sanitization and validation for the enrollment form.
//!
//! Every check runs on sanitized text, and validation collects an error for
//! each bad field instead of stopping at the first one.

use regex::Regex;
use std::fmt;

const NAME_MAX_LEN: usize = 50;
const EMAIL_MAX_LEN: usize = 100;
const CODE_LEN: usize = 8;

const NAME_PATTERN: &str = r"^[A-Za-z ]{3,50}$";
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const CODE_PATTERN: &str = r"^\d{8}$";

/// Form input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FullName,
    Email,
    Code,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::FullName => write!(f, "full name"),
            Field::Email => write!(f, "email"),
            Field::Code => write!(f, "verification code"),
        }
    }
}

/// Raw or sanitized contents of the three form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub full_name: String,
    pub email: String,
    pub code: String,
}

/// Per-field error messages. An empty set means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub code: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.code.is_none()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::FullName => self.full_name.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Code => self.code.as_deref(),
        }
    }

    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        let slot = match field {
            Field::FullName => &mut self.full_name,
            Field::Email => &mut self.email,
            Field::Code => &mut self.code,
        };
        *slot = Some(message.into());
    }

    pub fn clear(&mut self, field: Field) {
        match field {
            Field::FullName => self.full_name = None,
            Field::Email => self.email = None,
            Field::Code => self.code = None,
        }
    }

    /// Fields that carry an error, in form order.
    pub fn fields(&self) -> Vec<Field> {
        [Field::FullName, Field::Email, Field::Code]
            .into_iter()
            .filter(|field| self.get(*field).is_some())
            .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.fields().iter().map(Field::to_string).collect();
        write!(f, "invalid {}", fields.join(", "))
    }
}

/// Outcome of validating the form: sanitized values plus any field errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub input: FormInput,
    pub errors: FieldErrors,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Keep ASCII letters and single inner spaces, at most 50 characters.
pub fn sanitize_name(input: &str) -> String {
    let letters: String = input
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();

    let collapsed = letters.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(NAME_MAX_LEN).collect();

    truncated.trim_end().to_string()
}

/// Lowercase and keep only characters valid in an address, at most 100 characters.
pub fn sanitize_email(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| {
            matches!(c, 'a'..='z' | '0'..='9' | '.' | '@' | '_' | '%' | '+' | '-')
        })
        .take(EMAIL_MAX_LEN)
        .collect()
}

/// Keep digits only, at most 8.
pub fn sanitize_otp(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(CODE_LEN)
        .collect()
}

pub fn is_valid_name(name: &str) -> bool {
    Regex::new(NAME_PATTERN).is_ok_and(|re| re.is_match(name))
}

pub fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).is_ok_and(|re| re.is_match(email))
}

pub fn is_valid_otp(code: &str) -> bool {
    Regex::new(CODE_PATTERN).is_ok_and(|re| re.is_match(code))
}

/// Sanitize and check every field. The code is checked only once one has been sent.
pub fn validate(raw: &FormInput, code_sent: bool) -> Validation {
    let input = FormInput {
        full_name: sanitize_name(&raw.full_name),
        email: sanitize_email(&raw.email),
        code: if code_sent {
            sanitize_otp(&raw.code)
        } else {
            raw.code.clone()
        },
    };

    let mut errors = FieldErrors::default();

    if input.full_name.is_empty() {
        errors.set(Field::FullName, "Full name is required");
    } else if !is_valid_name(&input.full_name) {
        errors.set(Field::FullName, "Use English letters only, 3-50 characters");
    }

    if input.email.is_empty() {
        errors.set(Field::Email, "Email is required");
    } else if !is_valid_email(&input.email) {
        errors.set(Field::Email, "Enter a valid email address");
    }

    if code_sent {
        if input.code.is_empty() {
            errors.set(Field::Code, "Enter the verification code");
        } else if !is_valid_otp(&input.code) {
            errors.set(Field::Code, "Code must be 8 digits");
        }
    }

    Validation { input, errors }
}
