pub mod auth_utils;
pub mod csrf;
pub mod health;
pub mod root;
pub mod users;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[must_use]
pub fn valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}
