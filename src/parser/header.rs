//! Header fields read from a decoded message, plus date parsing for the
//! broken variants mail-parser gives up on.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use mail_parser::{Address, HeaderName, Message, MessageParser};
use tracing::debug;

use super::address_set;

/// The header fields a record is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    /// Lowercased, deduplicated `To` addresses.
    pub to: Vec<String>,
    /// Lowercased, deduplicated `Cc` addresses.
    pub cc: Vec<String>,
    /// First `From` address.
    pub from: Option<String>,
    /// Subject with encoded words resolved.
    pub subject: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    /// Raw `Message-ID`, angle brackets kept.
    pub message_id: Option<String>,
    /// Raw `In-Reply-To`, angle brackets kept.
    pub in_reply_to: Option<String>,
}

impl HeaderFields {
    pub fn from_message(message: &Message<'_>) -> Self {
        Self {
            to: address_list(message.to()),
            cc: address_list(message.cc()),
            from: address_list(message.from()).into_iter().next(),
            subject: message.subject().map(str::to_string),
            date: message_date(message),
            message_id: raw_value(message, HeaderName::MessageId),
            in_reply_to: raw_value(message, HeaderName::InReplyTo),
        }
    }

    /// Read a bare header section, such as Outlook transport headers.
    pub fn from_section(text: &str) -> Self {
        let mut section = text.trim_end().to_string();
        section.push_str("\n\n");
        MessageParser::default()
            .parse(section.as_bytes())
            .map(|message| Self::from_message(&message))
            .unwrap_or_default()
    }
}

/// Addresses from a parsed address header. Display names are scanned too,
/// so a bare address mail-parser left in the name still counts.
fn address_list(list: Option<&Address<'_>>) -> Vec<String> {
    list.map(|list| {
        address_set(
            list.iter()
                .flat_map(|addr| [addr.address(), addr.name()])
                .flatten(),
        )
    })
    .unwrap_or_default()
}

/// A header's raw value with folding collapsed.
fn raw_value(message: &Message<'_>, name: HeaderName<'static>) -> Option<String> {
    let value = message
        .header_raw(name)?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!value.is_empty()).then_some(value)
}

/// mail-parser's date, falling back to [`parse_date`] on the raw value.
fn message_date(message: &Message<'_>) -> Option<DateTime<FixedOffset>> {
    message
        .date()
        .and_then(|dt| DateTime::parse_from_rfc3339(&dt.to_rfc3339()).ok())
        .or_else(|| raw_value(message, HeaderName::Date).and_then(|raw| parse_date(&raw)))
}

/// Find the byte offset where headers end (position of the first blank line).
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Parse an email date, keeping the offset it was written in.
///
/// RFC 2822 first, then RFC 3339, then a handful of broken real-world
/// variants. Dates without a zone are taken as UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }

    let no_dow = strip_day_of_week(trimmed);
    let with_offset = replace_named_tz(&no_dow);

    const FORMATS: [&str; 8] = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    for candidate in [&no_dow, &with_offset] {
        for fmt in &FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt);
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt).fixed_offset());
            }
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Strip a leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim_start_matches(',').trim().to_string();
        }
    }
    s.to_string()
}

/// Replace a trailing timezone abbreviation with its numeric offset.
fn replace_named_tz(s: &str) -> String {
    const ZONES: [(&str, &str); 13] = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    for (name, offset) in ZONES {
        if let Some(head) = s.strip_suffix(name) {
            return format!("{head}{offset}");
        }
    }
    s.to_string()
}
