//! Input validation helpers and a small rule-based validator.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

static PASSWORD_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,}$").unwrap_or_else(|e| panic!("password regex: {e}"))
});

/// Characters that count as "special" in a strong password.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Returns `true` for `local@domain.tld`-shaped strings without whitespace.
pub fn is_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Returns `true` if `input` parses as an absolute URL.
pub fn is_url(input: &str) -> bool {
    url::Url::parse(input).is_ok()
}

/// At least 8 characters drawn from letters, digits and `@$!%*?&`, with at
/// least one lowercase letter, uppercase letter, digit and special character.
pub fn is_strong_password(password: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Values that can be checked for presence by [`validate_required`].
pub trait Required {
    /// `false` for blank strings, empty collections and `None`.
    fn is_present(&self) -> bool;
}

impl Required for str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Required for String {
    fn is_present(&self) -> bool {
        self.as_str().is_present()
    }
}

impl<T: Required + ?Sized> Required for &T {
    fn is_present(&self) -> bool {
        (**self).is_present()
    }
}

impl<T: Required> Required for Option<T> {
    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(Required::is_present)
    }
}

impl<T> Required for [T] {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Required for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Required for HashMap<K, V, S> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Required for BTreeMap<K, V> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Required for serde_json::Value {
    fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => s.is_present(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
            Self::Bool(_) | Self::Number(_) => true,
        }
    }
}

macro_rules! always_present {
    ($($t:ty),*) => {
        $(impl Required for $t {
            fn is_present(&self) -> bool {
                true
            }
        })*
    };
}

always_present!(bool, i32, i64, u32, u64, usize, f32, f64);

/// Returns `true` if `value` is present (see [`Required`]).
pub fn validate_required<T: Required + ?Sized>(value: &T) -> bool {
    value.is_present()
}

/// `value` has at least `min` characters.
pub fn validate_min_length(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// `value` has at most `max` characters.
pub fn validate_max_length(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// `min <= value <= max`.
pub fn validate_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    value >= min && value <= max
}

/// Strip `<`, `>`, `'` and `"` from `input`.
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '\'' | '"'))
        .collect()
}

type Check<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// A predicate paired with the message reported when it fails.
pub struct Rule<T: ?Sized> {
    check: Check<T>,
    message: String,
}

impl<T: ?Sized> Rule<T> {
    /// A rule failing with `message` whenever `check` returns `false`.
    pub fn new(
        check: impl Fn(&T) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: Box::new(check),
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<T: ?Sized> std::fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("message", &self.message).finish()
    }
}

/// Outcome of [`Validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Messages of the failed rules, in rule order.
    pub errors: Vec<String>,
}

/// Runs every rule against a value and collects the failures.
///
/// ```
/// use dashboard_stores::validation::{is_email, Rule, Validator};
///
/// let validator = Validator::<str>::new()
///     .rule(Rule::new(|s: &str| !s.is_empty(), "Email is required"))
///     .rule(Rule::new(|s: &str| is_email(s), "Email is invalid"));
///
/// let result = validator.validate("nope");
/// assert!(!result.is_valid);
/// assert_eq!(result.errors, vec!["Email is invalid"]);
/// ```
#[derive(Debug)]
pub struct Validator<T: ?Sized> {
    rules: Vec<Rule<T>>,
}

impl<T: ?Sized> Default for Validator<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T: ?Sized> Validator<T> {
    /// A validator with no rules; it accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method appending a rule.
    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluate every rule; all failures are reported, not just the first.
    pub fn validate(&self, value: &T) -> ValidationResult {
        let errors: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| !(rule.check)(value))
            .map(|rule| rule.message.clone())
            .collect();
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emails() {
        assert!(is_email("alice@example.com"));
        assert!(is_email("a.b+c@sub.example.co.uk"));
        assert!(!is_email("alice@example"));
        assert!(!is_email("alice example@x.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email(""));
    }

    #[test]
    fn urls() {
        assert!(is_url("https://example.com/path?q=1"));
        assert!(is_url("mailto:alice@example.com"));
        assert!(!is_url("example.com"));
        assert!(!is_url("/relative/path"));
    }

    #[test]
    fn strong_passwords() {
        assert!(is_strong_password("Passw0rd!"));
        assert!(!is_strong_password("Pa0!"), "too short");
        assert!(!is_strong_password("password0!"), "no uppercase");
        assert!(!is_strong_password("PASSWORD0!"), "no lowercase");
        assert!(!is_strong_password("Password!!"), "no digit");
        assert!(!is_strong_password("Password00"), "no special");
        assert!(!is_strong_password("Passw0rd! "), "space not allowed");
        assert!(!is_strong_password("Passw0rd#"), "# not in the special set");
    }

    #[test]
    fn required_values() {
        assert!(validate_required("x"));
        assert!(!validate_required("   "));
        assert!(!validate_required(&None::<String>));
        assert!(validate_required(&Some("y".to_owned())));
        assert!(!validate_required(&Vec::<u8>::new()));
        assert!(validate_required(&vec![1]));
        assert!(!validate_required(&HashMap::<String, u8>::new()));
        assert!(validate_required(&0_i64));
        assert!(validate_required(&false));
        assert!(!validate_required(&json!(null)));
        assert!(!validate_required(&json!({})));
        assert!(validate_required(&json!({"a": 1})));
        assert!(validate_required(&json!(0)));
    }

    #[test]
    fn lengths_count_chars() {
        assert!(validate_min_length("héllo", 5));
        assert!(!validate_min_length("héllo", 6));
        assert!(validate_max_length("héllo", 5));
        assert!(!validate_max_length("héllo", 4));
    }

    #[test]
    fn ranges_are_inclusive() {
        assert!(validate_range(5, 1, 5));
        assert!(validate_range(1.0, 1.0, 2.0));
        assert!(!validate_range(0, 1, 5));
        assert!(!validate_range(f64::NAN, 0.0, 1.0));
    }

    #[test]
    fn sanitize_strips_markup_characters() {
        assert_eq!(
            sanitize_string(r#"<script>alert("x's")</script>"#),
            "scriptalert(xs)/script"
        );
        assert_eq!(sanitize_string("plain"), "plain");
    }

    #[test]
    fn validator_reports_all_failures_in_order() {
        let validator = Validator::<str>::new()
            .rule(Rule::new(|s: &str| validate_min_length(s, 8), "Too short"))
            .rule(Rule::new(is_strong_password, "Too weak"))
            .rule(Rule::new(|s: &str| validate_max_length(s, 64), "Too long"));

        let result = validator.validate("abc");
        assert_eq!(
            result,
            ValidationResult {
                is_valid: false,
                errors: vec!["Too short".into(), "Too weak".into()],
            }
        );

        assert!(validator.validate("Passw0rd!").is_valid);
    }

    #[test]
    fn empty_validator_accepts_everything() {
        let validator = Validator::<i64>::new();
        let result = validator.validate(&42);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn validation_result_serializes_camel_case() {
        let result = ValidationResult {
            is_valid: true,
            errors: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"isValid": true, "errors": []})
        );
    }
}
