//! Field validation for accounts and posts, and slug generation.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const BIO_MAX_LEN: usize = 500;
/// Profile updates keep only this many characters of the bio.
pub const PROFILE_BIO_LEN: usize = 160;
pub const COMMENT_MAX_LEN: usize = 2000;
pub const TITLE_MAX_LEN: usize = 200;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Check a username. Returns the message to report on failure.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("Username cannot be empty");
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err("Username cannot be longer than 32 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("Username can only contain letters, numbers, and underscores");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err("Invalid email address")
    }
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), &'static str> {
    if bio.chars().count() > BIO_MAX_LEN {
        return Err("Bio cannot be longer than 500 characters");
    }
    Ok(())
}

/// Keep the first [`PROFILE_BIO_LEN`] characters.
pub fn truncate_bio(bio: &str) -> String {
    bio.chars().take(PROFILE_BIO_LEN).collect()
}

pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err("Slug may only contain lowercase letters, digits and single hyphens")
    }
}

/// Turn free text into a URL slug.
///
/// Accents are decomposed and dropped, everything else outside `[a-z0-9]`
/// collapses into single hyphens, and leading/trailing hyphens are trimmed.
/// The result may be empty.
pub fn generate_slug(text: &str) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();
    let lower = ascii.to_ascii_lowercase();
    NON_ALNUM_RE
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("My First Blog Post! hey"), "my-first-blog-post-hey");
        assert_eq!(generate_slug("Crème Brûlée"), "creme-brulee");
        assert_eq!(generate_slug("  --Hello,   World--  "), "hello-world");
        assert_eq!(generate_slug("Rust 2024 edition"), "rust-2024-edition");
        assert_eq!(generate_slug("日本語"), "");
        assert_eq!(generate_slug("ﬁle"), "file");
    }

    #[test]
    fn test_generated_slugs_validate() {
        for title in ["Hello World", "a-b", "Ünïcödé wins", "x"] {
            let slug = generate_slug(title);
            assert!(validate_slug(&slug).is_ok(), "{:?}", slug);
        }
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("hello-world").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Hello").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("-a").is_err());
        assert!(validate_slug("a_b").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ab").is_ok());
        assert!(validate_username("alice_99").is_ok());
        assert!(validate_username(&"a".repeat(32)).is_ok());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("first.last@example.org").is_ok());
        assert!(validate_email("missing-at.example.com").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_password_and_bio() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
        assert!(validate_bio(&"x".repeat(500)).is_ok());
        assert!(validate_bio(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_truncate_bio_counts_chars() {
        assert_eq!(truncate_bio("short"), "short");
        assert_eq!(truncate_bio(&"x".repeat(300)).len(), 160);
        let accented = "é".repeat(200);
        assert_eq!(truncate_bio(&accented).chars().count(), 160);
    }
}
