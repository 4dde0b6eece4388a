use std::sync::LazyLock;

use regex::Regex;

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Predicate evaluated against single CSV fields.
pub trait FieldRule: Send + Sync {
    fn matches(&self, field: &str) -> bool;
}

impl<F> FieldRule for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, field: &str) -> bool {
        self(field)
    }
}

/// Matches fields that look like an e-mail address.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailRule {
    strict: bool,
}

impl EmailRule {
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Also rejects consecutive dots, local parts over 64 characters, domains
    /// over 255 characters and domains starting or ending with `.` or `-`.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl FieldRule for EmailRule {
    fn matches(&self, field: &str) -> bool {
        let email = field.trim();
        if !(5..=100).contains(&email.len()) || !RE_EMAIL.is_match(email) {
            return false;
        }
        !self.strict || passes_strict_checks(email)
    }
}

fn passes_strict_checks(email: &str) -> bool {
    if email.contains("..") {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if domain.is_empty() || domain.len() > 255 || !domain.contains('.') {
        return false;
    }
    !(domain.starts_with('.')
        || domain.starts_with('-')
        || domain.ends_with('.')
        || domain.ends_with('-'))
}
