use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, NaiveDate, Utc};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Lower-cases a release title and collapses runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parses a full `YYYY-MM-DD` release date. Partial dates yield `None`.
pub fn parse_release_day(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

/// Parses a `YYYY-MM-DD` date, defaulting to today when none is given.
pub fn get_date_from_string(date: Option<&str>) -> Result<NaiveDate, chrono::ParseError> {
    match date {
        Some(date_str) => NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d"),
        None => Ok(Utc::now().date_naive()),
    }
}

/// The `days` calendar days before `date`, most recent first.
pub fn previous_days(date: NaiveDate, days: i64) -> Vec<NaiveDate> {
    (1..=days).map(|i| date - Duration::days(i)).collect()
}

pub fn playlist_link(playlist_id: &str) -> String {
    format!("https://open.spotify.com/playlist/{playlist_id}")
}
