//! Scanning raw email messages for tracking numbers

use crate::error::{Result, TrackingError};
use crate::registry::{CarrierRegistry, ExtractedTrackingNumber};
use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeader, ParsedMail};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shipper names are cut to this many characters
const MAX_SHIPPER_LEN: usize = 100;

/// A shipping notification reduced to what a package tracker needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedMessage {
    pub message_id: Option<String>,

    /// Sender address, when the header is present and parseable
    pub from: Option<String>,

    /// Subject with a leading forward marker removed
    pub subject: String,

    pub date: Option<DateTime<Utc>>,

    /// Numbers found in the subject and body
    pub tracking_numbers: Vec<ExtractedTrackingNumber>,

    /// Suggested package label: the shipper for recognized carrier
    /// notifications, otherwise the subject
    pub label: String,
}

/// Parse a raw RFC 5322 message and extract its tracking numbers
pub fn scan_message(registry: &CarrierRegistry, raw: &[u8]) -> Result<ScannedMessage> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| TrackingError::Message(e.to_string()))?;

    let message_id = header_value(&parsed.headers, "message-id");
    let from = extract_from(&parsed.headers);
    let subject =
        strip_forward_prefix(&header_value(&parsed.headers, "subject").unwrap_or_default());
    let date = header_value(&parsed.headers, "date")
        .and_then(|value| DateTime::parse_from_rfc2822(&value).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let body = extract_body(&parsed);

    let tracking_numbers = registry.extract_tracking_numbers(&format!("{subject}\n{body}"));

    let from_fedex = header_value(&parsed.headers, "in-reply-to")
        .is_some_and(|value| value.to_ascii_lowercase().contains("fedex.com"));
    let label = ups_label(&subject, &body)
        .or_else(|| fedex_label(from_fedex, &subject, &body))
        .unwrap_or_else(|| subject.clone());

    debug!(
        subject = %subject,
        from = from.as_deref().unwrap_or_default(),
        found = tracking_numbers.len(),
        "Scanned message"
    );

    Ok(ScannedMessage {
        message_id,
        from,
        subject,
        date,
        tracking_numbers,
        label,
    })
}

fn header_value(headers: &[MailHeader], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.get_key().eq_ignore_ascii_case(name))
        .map(|h| h.get_value().trim().to_string())
}

/// First mailbox of the From header, or its raw value when unparseable
fn extract_from(headers: &[MailHeader]) -> Option<String> {
    let header = headers
        .iter()
        .find(|h| h.get_key().eq_ignore_ascii_case("from"))?;

    let first = mailparse::addrparse_header(header)
        .ok()
        .and_then(|list| {
            list.iter().find_map(|addr| match addr {
                MailAddr::Single(single) => Some(single.addr.clone()),
                MailAddr::Group(group) => group.addrs.first().map(|single| single.addr.clone()),
            })
        });

    first.or_else(|| {
        let raw = header.get_value();
        let raw = raw.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    })
}

fn strip_forward_prefix(subject: &str) -> String {
    let trimmed = subject.trim();
    for prefix in ["FW:", "FWD:"] {
        if trimmed
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            return trimmed[prefix.len()..].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// First `text/plain` part, else the first `text/html` part with its markup
fn extract_body(parsed: &ParsedMail) -> String {
    let mut text = String::new();
    let mut html: Option<String> = None;

    if parsed.subparts.is_empty() {
        if let Ok(body) = parsed.get_body() {
            if parsed.ctype.mimetype.eq_ignore_ascii_case("text/html") {
                html = Some(body);
            } else {
                text = body;
            }
        }
    } else {
        extract_body_recursive(parsed, &mut text, &mut html);
    }

    if text.trim().is_empty() {
        html.unwrap_or_default()
    } else {
        text
    }
}

fn extract_body_recursive(parsed: &ParsedMail, text: &mut String, html: &mut Option<String>) {
    for part in &parsed.subparts {
        if !part.subparts.is_empty() {
            extract_body_recursive(part, text, html);
            continue;
        }

        let content_type = part.ctype.mimetype.to_lowercase();
        if let Ok(body) = part.get_body() {
            if content_type == "text/plain" && text.trim().is_empty() {
                *text = body;
            } else if content_type == "text/html" && html.is_none() {
                *html = Some(body);
            }
        }
    }
}

/// `UPS: <shipper>` for UPS Update notifications
fn ups_label(subject: &str, body: &str) -> Option<String> {
    if !subject.to_ascii_lowercase().contains("ups update:") {
        return None;
    }

    if let Some(shipper) = text_between(body, "from <strong>", "</strong>") {
        return Some(format!("UPS: {shipper}"));
    }
    body.to_ascii_lowercase()
        .contains("amazon.com")
        .then(|| "UPS: Amazon.com".to_string())
}

/// `FedEx: <shipper>` for FedEx shipment notifications replying to fedex.com
fn fedex_label(from_fedex: bool, subject: &str, body: &str) -> Option<String> {
    if !from_fedex
        || !subject
            .to_ascii_lowercase()
            .contains("your shipment is on the way")
    {
        return None;
    }

    let shipper = text_between(body, ">your shipment from", "is on the way")?;
    let shipper = if shipper == "Lowe's Companies, Inc." {
        "Lowe's".to_string()
    } else {
        shipper
    };
    Some(format!("FedEx: {shipper}"))
}

/// Title-cased text between a case-insensitive `start` marker and the next
/// case-sensitive `end` marker
fn text_between(body: &str, start: &str, end: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets valid for `body`
    let from = body.to_ascii_lowercase().find(start)? + start.len();
    let to = from + body[from..].find(end)?;

    let shipper: String = body[from..to].chars().take(MAX_SHIPPER_LEN).collect();
    let shipper = title_case(shipper.trim());
    (!shipper.is_empty()).then_some(shipper)
}

/// Lowercase everything, then uppercase the first letter of each word
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = c.is_whitespace();
    }
    out
}
