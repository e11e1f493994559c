//! Review notification text
//!
//! Builds the chat message sent for a reviewed lesson.

use url::Url;

use crate::domain::attempt::{ReviewAttempt, Verdict};

/// Default site origin lesson paths are resolved against
pub const DEFAULT_SITE_URL: &str = "https://dvmn.org/";

/// Phrase used when the work was sent back for fixes
pub const NEGATIVE_RESULT: &str = "К сожалению, в работе нашлись ошибки.";

/// Phrase used when the work was accepted
pub const POSITIVE_RESULT: &str = "Работа принята. Можно приступать к следующему уроку.";

impl Verdict {
    pub fn phrase(&self) -> &'static str {
        match self {
            Verdict::Accepted => POSITIVE_RESULT,
            Verdict::Rejected => NEGATIVE_RESULT,
        }
    }
}

/// Resolves the attempt's relative lesson path against the site origin
pub fn lesson_url(site_url: &Url, attempt: &ReviewAttempt) -> Result<Url, url::ParseError> {
    site_url.join(&attempt.lesson_url)
}

/// Renders the notification text for a reviewed attempt
pub fn review_message(site_url: &Url, attempt: &ReviewAttempt) -> Result<String, url::ParseError> {
    let url = lesson_url(site_url, attempt)?;

    Ok(format!(
        "У вас проверили урок \"{}\".\n\n{}\n\n{}",
        attempt.lesson_title,
        attempt.verdict().phrase(),
        url
    ))
}
