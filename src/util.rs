//! Shared utility functions used across the codebase.

use regex::Regex;
use std::sync::OnceLock;

/// Parse an environment variable as a boolean, returning `default` if unset.
///
/// Recognises `1`, `true`, `yes`, `y`, `on` (case-insensitive) as `true`;
/// everything else maps to `false`.
pub fn env_var_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("email pattern is valid")
    })
}

/// Check that `email` looks like a deliverable `local@domain.tld` address.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }
    let Some((local, _)) = email.split_once('@') else {
        return false;
    };
    if local.len() > 64 || local.starts_with('.') || local.ends_with('.') || local.contains("..")
    {
        return false;
    }
    email_regex().is_match(email)
}

/// Trim surrounding whitespace from user-supplied addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}
