//! Adapter for Outlook `.msg` files.
//!
//! A `.msg` file is a compound file. Each MAPI property lives either in its
//! own `__substg1.0_IIIITTTT` stream (variable-length values: `IIII` is the
//! property id, `TTTT` its type) or in the fixed-width
//! `__properties_version1.0` table. Recipients and attachments are
//! sub-storages with the same layout, and an attachment holding an embedded
//! message carries a full message storage under `__substg1.0_3701000D`.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use cfb::CompoundFile;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use crate::error::{Result, ScrubError};
use crate::model::attachment::AttachmentMeta;
use crate::model::record::{dedup_addresses, EmailRecord};
use crate::parser::header::HeaderFields;
use crate::parser::{address, address_set, mime, scrub_body, FormatAdapter, SourceFormat};

const PROPERTIES_STREAM: &str = "__properties_version1.0";
const RECIPIENT_PREFIX: &str = "__recip_version1.0_";
const ATTACHMENT_PREFIX: &str = "__attach_version1.0_";
const EMBEDDED_MESSAGE: &str = "__substg1.0_3701000D";
const ATTACHMENT_DATA: &str = "__substg1.0_37010102";

// Property ids.
const PR_SUBJECT: u16 = 0x0037;
const PR_CLIENT_SUBMIT_TIME: u16 = 0x0039;
const PR_SENT_REPRESENTING_EMAIL: u16 = 0x0065;
const PR_TRANSPORT_HEADERS: u16 = 0x007D;
const PR_RECIPIENT_TYPE: u16 = 0x0C15;
const PR_SENDER_EMAIL: u16 = 0x0C1F;
const PR_DISPLAY_CC: u16 = 0x0E03;
const PR_DISPLAY_TO: u16 = 0x0E04;
const PR_DELIVERY_TIME: u16 = 0x0E06;
const PR_BODY: u16 = 0x1000;
const PR_HTML: u16 = 0x1013;
const PR_INTERNET_MESSAGE_ID: u16 = 0x1035;
const PR_IN_REPLY_TO: u16 = 0x1042;
const PR_DISPLAY_NAME: u16 = 0x3001;
const PR_EMAIL_ADDRESS: u16 = 0x3003;
const PR_ATTACH_FILENAME: u16 = 0x3704;
const PR_ATTACH_METHOD: u16 = 0x3705;
const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
const PR_ATTACH_CONTENT_ID: u16 = 0x3712;
const PR_SMTP_ADDRESS: u16 = 0x39FE;
const PR_SENDER_SMTP_ADDRESS: u16 = 0x5D01;

// Property types.
const PT_LONG: u16 = 0x0003;
const PT_SYSTIME: u16 = 0x0040;
const PT_STRING8: u16 = 0x001E;
const PT_UNICODE: u16 = 0x001F;
const PT_BINARY: u16 = 0x0102;

const ATTACH_EMBEDDED_MSG: u32 = 5;
const MAPI_TO: u32 = 1;
const MAPI_CC: u32 = 2;

/// Difference between the FILETIME epoch (1601) and the Unix epoch, in seconds.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

/// Header size of the property table, which depends on the storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageKind {
    TopLevel,
    Embedded,
    Child,
}

impl StorageKind {
    fn properties_header_len(self) -> usize {
        match self {
            Self::TopLevel => 32,
            Self::Embedded => 24,
            Self::Child => 8,
        }
    }
}

/// Fixed-width property values keyed by property id.
#[derive(Debug, Default)]
struct FixedProperties {
    values: HashMap<u16, (u16, u64)>,
}

impl FixedProperties {
    fn parse(data: &[u8], kind: StorageKind) -> Self {
        let mut values = HashMap::new();
        let header_len = kind.properties_header_len();
        if data.len() <= header_len {
            return Self { values };
        }
        let mut cursor = Cursor::new(&data[header_len..]);
        while let (Ok(tag), Ok(_flags), Ok(value)) = (
            cursor.read_u32::<LittleEndian>(),
            cursor.read_u32::<LittleEndian>(),
            cursor.read_u64::<LittleEndian>(),
        ) {
            let prop_type = (tag & 0xFFFF) as u16;
            let prop_id = (tag >> 16) as u16;
            values.insert(prop_id, (prop_type, value));
        }
        Self { values }
    }

    fn long(&self, id: u16) -> Option<u32> {
        match self.values.get(&id) {
            Some(&(PT_LONG, value)) => Some(value as u32),
            _ => None,
        }
    }

    fn time(&self, id: u16) -> Option<DateTime<FixedOffset>> {
        match self.values.get(&id) {
            Some(&(PT_SYSTIME, value)) => filetime_to_datetime(value),
            _ => None,
        }
    }
}

/// Convert a Windows FILETIME (100 ns ticks since 1601-01-01 UTC).
fn filetime_to_datetime(ticks: u64) -> Option<DateTime<FixedOffset>> {
    if ticks == 0 {
        return None;
    }
    let secs = (ticks / 10_000_000) as i64 - FILETIME_UNIX_OFFSET;
    let nanos = ((ticks % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.fixed_offset())
}

/// Decode a UTF-16LE property value, dropping trailing NULs.
fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

/// Decode an 8-bit property value (the code page is almost always 1252).
fn decode_string8(bytes: &[u8]) -> String {
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    decoded.trim_end_matches('\0').to_string()
}

/// Read access to one message, recipient or attachment storage.
struct PropertyReader<'a, F> {
    file: &'a mut CompoundFile<F>,
    storage: PathBuf,
}

impl<'a, F: Read + Seek> PropertyReader<'a, F> {
    fn new(file: &'a mut CompoundFile<F>, storage: PathBuf) -> Self {
        Self { file, storage }
    }

    fn stream(&mut self, name: &str) -> Option<Vec<u8>> {
        let path = self.storage.join(name);
        if !self.file.is_stream(&path) {
            return None;
        }
        let mut buf = Vec::new();
        let mut stream = self.file.open_stream(&path).ok()?;
        stream.read_to_end(&mut buf).ok()?;
        Some(buf)
    }

    fn string(&mut self, id: u16) -> Option<String> {
        if let Some(bytes) = self.stream(&substg_name(id, PT_UNICODE)) {
            return Some(decode_utf16le(&bytes));
        }
        self.stream(&substg_name(id, PT_STRING8))
            .map(|bytes| decode_string8(&bytes))
    }

    fn binary(&mut self, id: u16) -> Option<Vec<u8>> {
        self.stream(&substg_name(id, PT_BINARY))
    }

    fn fixed(&mut self, kind: StorageKind) -> FixedProperties {
        self.stream(PROPERTIES_STREAM)
            .map(|data| FixedProperties::parse(&data, kind))
            .unwrap_or_default()
    }

    fn stream_len(&self, name: &str) -> Option<u64> {
        self.file
            .entry(self.storage.join(name))
            .ok()
            .filter(|e| e.is_stream())
            .map(|e| e.len())
    }

    fn has_storage(&self, name: &str) -> bool {
        self.file.is_storage(self.storage.join(name))
    }

    /// Child storages whose names start with `prefix`, sorted by name.
    fn children(&self, prefix: &str) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = match self.file.read_storage(&self.storage) {
            Ok(entries) => entries
                .filter(|e| e.is_storage() && e.name().starts_with(prefix))
                .map(|e| e.path().to_path_buf())
                .collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();
        paths
    }

    fn looks_like_message(&self) -> bool {
        match self.file.read_storage(&self.storage) {
            Ok(mut entries) => entries.any(|e| {
                e.name() == PROPERTIES_STREAM || e.name().starts_with("__substg1.0_")
            }),
            Err(_) => false,
        }
    }
}

fn substg_name(id: u16, prop_type: u16) -> String {
    format!("__substg1.0_{id:04X}{prop_type:04X}")
}

/// Reads Outlook `.msg` files, flattening embedded messages into extra records.
#[derive(Debug, Clone)]
pub struct MsgAdapter {
    max_depth: usize,
}

impl MsgAdapter {
    /// `max_depth` bounds recursion into attached messages.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parse an in-memory `.msg`. `origin` is only used for error context.
    pub fn parse_bytes(&self, data: &[u8], origin: &Path) -> Result<Vec<EmailRecord>> {
        let mut file = CompoundFile::open(Cursor::new(data))
            .map_err(|e| ScrubError::malformed(origin, format!("not a compound file: {e}")))?;

        let root = PathBuf::from("/");
        if !PropertyReader::new(&mut file, root.clone()).looks_like_message() {
            return Err(ScrubError::malformed(origin, "no Outlook message properties"));
        }

        let mut records = Vec::new();
        self.read_message(&mut file, root, StorageKind::TopLevel, 0, origin, &mut records);
        Ok(records)
    }

    /// Read the message at `storage`, pushing it and then any embedded
    /// messages onto `out`.
    fn read_message<F: Read + Seek>(
        &self,
        file: &mut CompoundFile<F>,
        storage: PathBuf,
        kind: StorageKind,
        depth: usize,
        origin: &Path,
        out: &mut Vec<EmailRecord>,
    ) {
        let mut reader = PropertyReader::new(file, storage.clone());
        let fixed = reader.fixed(kind);
        let headers = reader
            .string(PR_TRANSPORT_HEADERS)
            .map(|text| HeaderFields::from_section(&text))
            .unwrap_or_default();

        let body_text = match reader.string(PR_BODY) {
            Some(body) => body,
            None => html_body(&mut reader).unwrap_or_default(),
        };
        let (emails_in_body, body) = scrub_body(&body_text);
        let subject = reader
            .string(PR_SUBJECT)
            .or_else(|| headers.subject.clone())
            .unwrap_or_default();

        let sender_candidates = [
            reader.string(PR_SENDER_SMTP_ADDRESS),
            reader.string(PR_SENDER_EMAIL),
            reader.string(PR_SENT_REPRESENTING_EMAIL),
        ];
        let from = sender_candidates
            .iter()
            .flatten()
            .find_map(|candidate| address::extract_first(candidate))
            .or_else(|| headers.from.clone());

        let display_to = reader.string(PR_DISPLAY_TO);
        let display_cc = reader.string(PR_DISPLAY_CC);
        let message_id = reader
            .string(PR_INTERNET_MESSAGE_ID)
            .or_else(|| headers.message_id.clone());
        let in_reply_to = reader
            .string(PR_IN_REPLY_TO)
            .or_else(|| headers.in_reply_to.clone());
        let date = headers
            .date
            .or_else(|| fixed.time(PR_CLIENT_SUBMIT_TIME))
            .or_else(|| fixed.time(PR_DELIVERY_TIME));

        let recipient_paths = reader.children(RECIPIENT_PREFIX);
        let attachment_paths = reader.children(ATTACHMENT_PREFIX);

        let (to_table, cc_table) = read_recipients(file, &recipient_paths);
        let to = dedup_addresses(
            to_table
                .into_iter()
                .chain(address_set(display_to.as_deref()))
                .chain(headers.to),
        );
        let recipients = dedup_addresses(
            cc_table
                .into_iter()
                .chain(address_set(display_cc.as_deref()))
                .chain(headers.cc),
        );

        let mut embedded = Vec::new();
        let mut attachments = Vec::new();
        for (index, path) in attachment_paths.iter().enumerate() {
            let mut attach = PropertyReader::new(file, path.clone());
            let attach_fixed = attach.fixed(StorageKind::Child);
            if attach_fixed.long(PR_ATTACH_METHOD) == Some(ATTACH_EMBEDDED_MSG)
                || attach.has_storage(EMBEDDED_MESSAGE)
            {
                embedded.push(path.join(EMBEDDED_MESSAGE));
                continue;
            }
            if attach
                .string(PR_ATTACH_CONTENT_ID)
                .is_some_and(|cid| !cid.trim().is_empty())
            {
                debug!(attachment = index, "Skipping inline attachment");
                continue;
            }
            let filename = attach
                .string(PR_ATTACH_LONG_FILENAME)
                .or_else(|| attach.string(PR_ATTACH_FILENAME))
                .or_else(|| attach.string(PR_DISPLAY_NAME))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| AttachmentMeta::fallback_name(index));
            let size = attach.stream_len(ATTACHMENT_DATA).unwrap_or(0);
            attachments.push(AttachmentMeta::new(filename, size));
        }

        out.push(EmailRecord {
            to,
            from,
            recipients,
            emails_in_body,
            subject: address::strip_all(&subject).into_owned(),
            body,
            date,
            message_id,
            in_reply_to,
            attachments,
        });

        for inner in embedded {
            if depth + 1 > self.max_depth {
                warn!(
                    path = %origin.display(),
                    depth = depth + 1,
                    "Embedded message exceeds nesting limit, skipping"
                );
                continue;
            }
            let looks_valid = file.is_storage(&inner)
                && PropertyReader::new(file, inner.clone()).looks_like_message();
            if !looks_valid {
                warn!(
                    path = %origin.display(),
                    kind = %crate::error::ErrorKind::MalformedMessage,
                    "Embedded message attachment is unreadable, skipping"
                );
                continue;
            }
            self.read_message(file, inner, StorageKind::Embedded, depth + 1, origin, out);
        }
    }
}

impl Default for MsgAdapter {
    fn default() -> Self {
        Self::new(super::DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl FormatAdapter for MsgAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Msg
    }

    fn parse_one(&self, source: &Path) -> Result<Vec<EmailRecord>> {
        let data = std::fs::read(source)
            .map_err(|e| ScrubError::malformed(source, format!("read failed: {e}")))?;
        self.parse_bytes(&data, source)
    }
}

/// The HTML body (stored as binary or string) rendered to text.
fn html_body<F: Read + Seek>(reader: &mut PropertyReader<'_, F>) -> Option<String> {
    let html = match reader.binary(PR_HTML) {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => reader.string(PR_HTML)?,
    };
    Some(mime::html_to_text(&html))
}

/// Collect `(to, cc)` addresses from the recipient table.
fn read_recipients<F: Read + Seek>(
    file: &mut CompoundFile<F>,
    paths: &[PathBuf],
) -> (Vec<String>, Vec<String>) {
    let mut to = Vec::new();
    let mut cc = Vec::new();
    for path in paths {
        let mut recipient = PropertyReader::new(file, path.clone());
        let kind = recipient
            .fixed(StorageKind::Child)
            .long(PR_RECIPIENT_TYPE)
            .unwrap_or(MAPI_TO);
        let address = [PR_SMTP_ADDRESS, PR_EMAIL_ADDRESS, PR_DISPLAY_NAME]
            .into_iter()
            .filter_map(|id| recipient.string(id))
            .find_map(|value| address::extract_first(&value));
        match (kind & 0x0F, address) {
            (MAPI_TO, Some(address)) => to.push(address),
            (MAPI_CC, Some(address)) => cc.push(address),
            _ => {}
        }
    }
    (to, cc)
}
