//! Export wrapper for stored reports
//!
//! An export is the stored HTML fragment, byte for byte, framed by a full
//! HTML document. Anything that varies between exports (the timestamp) lives
//! only in the frame, outside the checksummed region, so an exported file can
//! always be re-verified against the checksum recorded at save time.

use crate::checksum::{Checksum, ChecksumError};
use crate::render::escape;
use chrono::{DateTime, SecondsFormat, Utc};

const BODY_START: &str = "<!-- roadmap:body:start -->\n";
const BODY_END: &str = "<!-- roadmap:body:end -->";
const CHECKSUM_META: &str = "<meta name=\"roadmap-checksum\" content=\"";

/// Wrap stored HTML in a standalone document
#[must_use]
pub fn export_document(
    title: &str,
    html: &str,
    checksum: &Checksum,
    exported_at: DateTime<Utc>,
) -> String {
    let mut out = String::with_capacity(html.len() + 512);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(title)));
    out.push_str(&format!("{CHECKSUM_META}{checksum}\">\n"));
    out.push_str(&format!(
        "<meta name=\"roadmap-exported-at\" content=\"{}\">\n",
        exported_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str("</head>\n<body>\n");
    out.push_str(BODY_START);
    out.push_str(html);
    out.push_str(BODY_END);
    out.push_str("\n</body>\n</html>\n");
    out
}

/// Recover the exact checksummed fragment from an export document
#[must_use]
pub fn extract_body(document: &str) -> Option<&str> {
    let start = document.find(BODY_START)? + BODY_START.len();
    let end = document.rfind(BODY_END)?;
    (start <= end).then(|| &document[start..end])
}

/// Check an export document against the checksum recorded in its head
///
/// # Errors
/// Returns [`ExportError`] if the document is malformed or has drifted
pub fn verify_export(document: &str) -> Result<Checksum, ExportError> {
    let meta_start = document
        .find(CHECKSUM_META)
        .ok_or(ExportError::MissingChecksum)?
        + CHECKSUM_META.len();
    let meta_len = document[meta_start..]
        .find('"')
        .ok_or(ExportError::MissingChecksum)?;
    let recorded: Checksum = document[meta_start..meta_start + meta_len].parse()?;

    let body = extract_body(document).ok_or(ExportError::MissingBody)?;
    let actual = Checksum::of(body);
    if actual == recorded {
        Ok(recorded)
    } else {
        Err(ExportError::Drifted { recorded, actual })
    }
}

/// Download file name: slugified report name plus a short checksum
#[must_use]
pub fn export_filename(name: &str, checksum: &Checksum) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "roadmap" } else { slug };
    format!("{slug}-{}.html", &checksum.short()[..8])
}

/// Export verification errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Document head has no checksum meta tag
    #[error("export document has no checksum")]
    MissingChecksum,

    /// Body markers not found
    #[error("export document has no report body")]
    MissingBody,

    /// Recorded checksum is malformed
    #[error("export checksum is malformed: {0}")]
    Checksum(#[from] ChecksumError),

    /// Body no longer matches the recorded checksum
    #[error("export body drifted: recorded {recorded}, actual {actual}")]
    Drifted { recorded: Checksum, actual: Checksum },
}
