//! Reading plan and query input
//!
//! Plans saved from Management Studio (`.sqlplan`) are UTF-16 with a byte
//! order mark; query files are usually UTF-8.

use anyhow::{Context, Result, bail};
use std::path::Path;

/// Decodes text, honouring a UTF-8 or UTF-16 byte order mark
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => Ok(String::from_utf8(rest.to_vec())?),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => Ok(String::from_utf8(bytes.to_vec())?),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        bail!("UTF-16 input has an odd number of bytes");
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    Ok(String::from_utf16(&units)?)
}

pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_text(&bytes).with_context(|| format!("{} is not valid text", path.display()))
}

/// Treats `arg` as a file path when such a file exists, otherwise as query text
pub fn query_text(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        read_text(path)
    } else {
        Ok(arg.to_string())
    }
}
