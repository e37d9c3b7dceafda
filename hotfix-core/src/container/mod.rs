pub mod cache_file;
pub mod table_header;

use crate::error::{HotfixError, Result};
use crate::util::cursor::ByteCursor;

/// Run one field read, turning a short read into `MalformedContainer`
/// that names the field and the offset it started at.
pub(crate) fn field<'a, T>(
    cur: &mut ByteCursor<'a>,
    name: &'static str,
    read: impl FnOnce(&mut ByteCursor<'a>) -> Result<T>,
) -> Result<T> {
    let offset = cur.position();
    read(cur).map_err(|e| match e {
        HotfixError::OutOfData {
            wanted, remaining, ..
        } => HotfixError::MalformedContainer {
            offset,
            field: name,
            reason: format!("truncated: need {wanted} bytes, {remaining} left"),
        },
        other => other,
    })
}

/// Render a 32-bit hash the way lookups and reports expect it:
/// eight upper-case hex digits, zero padded.
pub fn hash_hex(hash: u32) -> String {
    hex::encode_upper(hash.to_be_bytes())
}

/// Render a magic number as the ASCII text of its big-endian bytes,
/// skipping leading zero bytes.
pub fn magic_ascii(magic: u32) -> String {
    magic
        .to_be_bytes()
        .iter()
        .skip_while(|&&b| b == 0)
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
        .collect()
}
