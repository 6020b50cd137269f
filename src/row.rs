use std::fmt;

use crate::schema::{FieldSpan, RowLayout};

/// One record of the fixed-schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: &str, email: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            email: email.to_string(),
        }
    }

    /// Writes the row into `slot`, which must be exactly one row wide.
    ///
    /// String lengths are trusted; callers validate them before a row
    /// reaches the table.
    pub fn encode(&self, layout: &RowLayout, slot: &mut [u8]) {
        slot[layout.id.range()].copy_from_slice(&self.id.to_le_bytes());
        write_text(&mut slot[layout.username.range()], &self.username);
        write_text(&mut slot[layout.email.range()], &self.email);
    }

    pub fn decode(layout: &RowLayout, slot: &[u8]) -> Self {
        let mut id = [0u8; 4];
        id.copy_from_slice(&slot[layout.id.range()]);
        Self {
            id: u32::from_le_bytes(id),
            username: read_text(slot, &layout.username),
            email: read_text(slot, &layout.email),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

// NUL-padded to the column width. Values must not contain NUL themselves;
// reading stops at the first one.
fn write_text(dst: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    dst[..bytes.len()].copy_from_slice(bytes);
    dst[bytes.len()..].fill(0);
}

fn read_text(slot: &[u8], span: &FieldSpan) -> String {
    let field = &slot[span.range()];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
