//! iCalendar (RFC 5545) rendering.
//!
//! Output is deterministic: UIDs and DTSTAMPs are derived from the block
//! itself, so exporting the same plan twice yields identical bytes.

use chrono::{DateTime, FixedOffset, Utc};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::schedule::Block;

pub const PRODUCT_ID: &str = "-//dayplan//Day Planner//EN";

const MAX_LINE_OCTETS: usize = 75;

fn utc_stamp(at: &DateTime<FixedOffset>) -> String {
    at.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Append `line` folded at 75 octets, never splitting a UTF-8 sequence.
fn push_folded(out: &mut String, line: &str) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if used + len > budget {
            out.push_str("\r\n ");
            // Continuation lines lose one octet to the leading space
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(ch);
        used += len;
    }
    out.push_str("\r\n");
}

fn block_uid(block: &Block) -> String {
    let mut hasher = Sha256::new();
    hasher.update(block.start.to_rfc3339().as_bytes());
    hasher.update(b"|");
    hasher.update(block.end.to_rfc3339().as_bytes());
    hasher.update(b"|");
    hasher.update(block.kind.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(block.title.as_bytes());
    let digest = hasher.finalize();
    format!("{}@dayplan", &hex::encode(digest)[..32])
}

fn in_range(
    block: &Block,
    from: Option<&DateTime<FixedOffset>>,
    to: Option<&DateTime<FixedOffset>>,
) -> bool {
    from.map_or(true, |from| block.start >= *from) && to.map_or(true, |to| block.end <= *to)
}

/// Render `blocks` as a VCALENDAR document with one VEVENT per block.
///
/// Blocks outside `[from, to]` are dropped; a block is kept only if it lies
/// entirely inside the range.
///
/// # Errors
/// Returns [`CoreError::Custom`] when no block survives the filter.
pub fn blocks_to_ics(
    blocks: &[Block],
    from: Option<&DateTime<FixedOffset>>,
    to: Option<&DateTime<FixedOffset>>,
) -> Result<String> {
    let selected: Vec<&Block> = blocks.iter().filter(|b| in_range(b, from, to)).collect();
    if selected.is_empty() {
        return Err(CoreError::Custom("no blocks in range".into()));
    }

    let mut out = String::new();
    push_folded(&mut out, "BEGIN:VCALENDAR");
    push_folded(&mut out, "VERSION:2.0");
    push_folded(&mut out, &format!("PRODID:{PRODUCT_ID}"));
    push_folded(&mut out, "CALSCALE:GREGORIAN");

    for block in &selected {
        let start = utc_stamp(&block.start);
        push_folded(&mut out, "BEGIN:VEVENT");
        push_folded(&mut out, &format!("UID:{}", block_uid(block)));
        push_folded(&mut out, &format!("DTSTAMP:{start}"));
        push_folded(&mut out, &format!("DTSTART:{start}"));
        push_folded(&mut out, &format!("DTEND:{}", utc_stamp(&block.end)));
        push_folded(&mut out, &format!("SUMMARY:{}", escape_text(&block.title)));
        push_folded(&mut out, &format!("CATEGORIES:{}", block.kind.as_str()));
        push_folded(&mut out, "END:VEVENT");
    }

    push_folded(&mut out, "END:VCALENDAR");
    tracing::debug!(events = selected.len(), "calendar rendered");
    Ok(out)
}
