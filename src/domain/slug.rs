//! Utilities for generating deterministic, date-stamped post slugs.
//!
//! A slug is `<YYYY-MM-DD>-<body>` where the body is derived from the post
//! title. Letters and numbers from any script survive; other punctuation is
//! dropped, and whitespace or hyphen runs collapse into a single hyphen. The
//! clock is injected so derivation stays pure for a fixed date.

use time::{Date, OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::domain::error::DomainError;

/// Body used when the title carries no letters or numbers.
pub const FALLBACK_SLUG_BODY: &str = "post";

const DATE_STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]-[day padding:zero]");

/// Source of "today" for slug stamps.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

/// Wall clock in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

/// Derive the full slug for `title` stamped with `date`.
pub fn derive_slug(title: &str, date: Date) -> String {
    format!("{}-{}", date_stamp(date), slug_body(title))
}

/// Derive the full slug for `title` using the supplied clock.
pub fn derive_slug_with(title: &str, clock: &dyn Clock) -> String {
    derive_slug(title, clock.today())
}

/// Render the `YYYY-MM-DD` stamp that prefixes every slug.
pub fn date_stamp(date: Date) -> String {
    // The format only contains numeric components, which cannot fail for a valid `Date`.
    date.format(DATE_STAMP_FORMAT).unwrap_or_else(|_| {
        format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        )
    })
}

/// Parse a `YYYY-MM-DD` stamp back into a date.
pub fn parse_date_stamp(value: &str) -> Result<Date, DomainError> {
    Date::parse(value.trim(), DATE_STAMP_FORMAT)
        .map_err(|err| DomainError::validation(format!("invalid date `{value}`: {err}")))
}

/// Derive the title-dependent part of the slug.
pub fn slug_body(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let mut body = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !body.is_empty() {
                body.push('-');
            }
            pending_separator = false;
            body.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
        }
    }

    if body.is_empty() {
        FALLBACK_SLUG_BODY.to_string()
    } else {
        body
    }
}
