//! Input forms: cleaning and validation of submitted data
//!
//! Each form is deserialized from the request body, cleaned (whitespace
//! trimmed, URLs normalized) and then validated. Failures are collected per
//! field into [`FormErrors`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use validator::{Validate, ValidationError, ValidationErrors};

static USERNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap());

/// Field name → messages, reported back to the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        for (field, list) in errors.field_errors() {
            for err in list.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                out.add(&field.to_string(), message);
            }
        }
        out
    }
}

impl IntoResponse for FormErrors {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Invalid form submission",
                "errors": self
            })),
        )
            .into_response()
    }
}

/// Prefix `http://` onto a URL that carries no scheme
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn trimmed_option(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_username");
        err.message = Some("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.".into());
        Err(err)
    }
}

/// New category submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Category name must be 1 to 128 characters."))]
    pub name: String,
}

impl CategoryForm {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        self.name = self.name.trim().to_string();
        self.validate()?;
        Ok(self)
    }
}

/// New page submission; the category comes from the URL, not the body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Page title must be 1 to 128 characters."))]
    pub title: String,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 200, message = "Page URL must be 1 to 200 characters."),
        url(message = "Enter a valid URL.")
    )]
    pub url: String,
}

impl PageForm {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        self.title = self.title.trim().to_string();
        self.url = normalize_url(&self.url);
        self.validate()?;
        Ok(self)
    }
}

/// Account fields of a registration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserForm {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

impl UserForm {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        self.username = self.username.trim().to_string();
        self.email = trimmed_option(self.email);
        self.validate()?;
        Ok(self)
    }
}

/// Profile fields of a registration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserProfileForm {
    #[serde(default)]
    #[validate(url(message = "Enter a valid URL."))]
    pub website: Option<String>,

    #[serde(default)]
    #[validate(length(max = 255, message = "Picture reference must be at most 255 characters."))]
    pub picture: Option<String>,
}

impl UserProfileForm {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        self.website = trimmed_option(self.website).map(|w| normalize_url(&w));
        self.picture = trimmed_option(self.picture);
        self.validate()?;
        Ok(self)
    }
}

/// Registration body: both forms submitted side by side
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationForm {
    #[serde(flatten)]
    pub user: UserForm,
    #[serde(flatten)]
    pub profile: UserProfileForm,
}

impl RegistrationForm {
    /// Clean both halves, reporting the errors of both together
    pub fn clean(self) -> Result<(UserForm, UserProfileForm), FormErrors> {
        match (self.user.clean(), self.profile.clean()) {
            (Ok(user), Ok(profile)) => Ok((user, profile)),
            (user, profile) => {
                let mut errors = FormErrors::default();
                if let Err(e) = user {
                    errors.merge(e);
                }
                if let Err(e) = profile {
                    errors.merge(e);
                }
                Err(errors)
            }
        }
    }
}

/// Login body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
