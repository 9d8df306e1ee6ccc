//! MIME helpers: text/plain collection, attachment listing, HTML-to-text
//! conversion, and content-type rewriting for loose archive messages.

use mail_parser::{Message, MessagePart, MimeHeaders, PartType};
use tracing::warn;

use crate::model::attachment::AttachmentMeta;
use crate::parser::header::find_header_end;

/// Text and attachment data collected from one decoded message.
#[derive(Debug, Clone, Default)]
pub struct MimeContent {
    /// Every `text/plain` part concatenated in document order.
    pub plain_text: String,

    /// `true` if at least one `text/plain` part was found.
    pub has_plain_text: bool,

    /// The first `text/html` part, used when no plain text exists.
    pub first_html: Option<String>,

    /// Every part that carries a filename.
    pub attachments: Vec<AttachmentMeta>,
}

impl MimeContent {
    /// Plain text if present, otherwise the first HTML part rendered as text.
    pub fn body_text(&self) -> String {
        if self.has_plain_text {
            return self.plain_text.clone();
        }
        self.first_html
            .as_deref()
            .map(html_to_text)
            .unwrap_or_default()
    }
}

/// Walk every part of `message`, descending into attached `message/rfc822`
/// parts up to `max_depth` levels.
pub fn collect_content(message: &Message<'_>, max_depth: usize) -> MimeContent {
    let mut content = MimeContent::default();
    walk_parts(message, 0, max_depth, &mut content);
    content
}

fn walk_parts(message: &Message<'_>, depth: usize, max_depth: usize, out: &mut MimeContent) {
    for part in &message.parts {
        if let Some(name) = part.attachment_name() {
            out.attachments
                .push(AttachmentMeta::new(name, part.contents().len() as u64));
        }

        match &part.body {
            PartType::Text(text) if is_plain_text(part) => {
                if !out.plain_text.is_empty() && !out.plain_text.ends_with('\n') {
                    out.plain_text.push('\n');
                }
                out.plain_text.push_str(text.as_ref());
                out.has_plain_text = true;
            }
            PartType::Html(html) if out.first_html.is_none() => {
                out.first_html = Some(html.to_string());
            }
            PartType::Message(nested) => {
                if depth < max_depth {
                    walk_parts(nested, depth + 1, max_depth, out);
                } else {
                    warn!(depth, "Attached message nested too deeply, not descending");
                }
            }
            _ => {}
        }
    }
}

/// `text/plain`, or a text part without any content type (the RFC default).
fn is_plain_text(part: &MessagePart<'_>) -> bool {
    match part.content_type() {
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct
                    .subtype()
                    .is_none_or(|sub| sub.eq_ignore_ascii_case("plain"))
        }
        None => true,
    }
}

/// Rewrite the top-level `Content-Type` of a raw message to `text/plain`.
///
/// Any existing `Content-Type` header (including its continuation lines) is
/// dropped; its `charset` parameter is carried over when present.
pub fn force_plain_text(raw: &[u8]) -> Vec<u8> {
    let raw = skip_from_line(raw);
    let (head, body) = match find_header_end(raw) {
        Some(end) => {
            let rest = &raw[end..];
            let rest = rest
                .strip_prefix(b"\r\n")
                .or_else(|| rest.strip_prefix(b"\n"))
                .unwrap_or(rest);
            (&raw[..end], rest)
        }
        None => (raw, &b"\n"[..]),
    };

    let mut out = Vec::with_capacity(raw.len() + 48);
    let mut charset = None;
    let mut in_content_type = false;

    for line in head.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        let continuation = matches!(line.first(), Some(b' ' | b'\t'));
        if continuation && in_content_type {
            charset = charset.or_else(|| charset_param(line));
            continue;
        }
        in_content_type = line.len() >= 13 && line[..13].eq_ignore_ascii_case(b"content-type:");
        if in_content_type {
            charset = charset_param(line);
            continue;
        }
        out.extend_from_slice(line);
        out.push(b'\n');
    }

    let charset = charset.unwrap_or_else(|| "utf-8".to_string());
    out.extend_from_slice(format!("Content-Type: text/plain; charset=\"{charset}\"\n").as_bytes());
    out.extend_from_slice(body);
    out
}

/// Extract a `charset=` parameter value from a header line.
fn charset_param(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let value: String = text[start..]
        .trim_start_matches('"')
        .chars()
        .take_while(|c| !matches!(c, '"' | ';') && !c.is_whitespace())
        .collect();
    (!value.is_empty()).then_some(value)
}

/// Skip an MBOX-style `From ` separator line (and a UTF-8 BOM) at the start of a message.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Convert HTML to plain text.
///
/// - Line breaks from `<br>`, `<p>`, `<div>` and friends
/// - Scripts and styles removed
/// - Common entities decoded
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["br", "BR", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in ["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    for (entity, replacement) in [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&#160;", " "),
        ("&amp;", "&"),
    ] {
        result = result.replace(entity, replacement);
    }

    // Collapse runs of blank lines
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;

    // ASCII lowercasing keeps byte offsets aligned with the original.
    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match after.to_ascii_lowercase().find(&close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}
