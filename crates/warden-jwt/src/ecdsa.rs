//! ECDSA signature format conversion
//!
//! OpenSSL-style signers produce ECDSA signatures as ASN.1 DER
//! `SEQUENCE { INTEGER r, INTEGER s }`; the JWS wire format wants the
//! raw fixed-width `r‖s` concatenation instead (32 bytes per
//! component for ES256, 48 for ES384). Conversion has two sharp
//! edges: DER integers are two's-complement, so a component whose
//! high bit is set carries a leading zero byte that the raw form must
//! not, and raw components are zero-padded to the fixed width that
//! DER strips.

use crate::error::{JwtError, JwtResult};

/// Raw component width for ES256 signatures.
pub const ES256_COMPONENT_LEN: usize = 32;
/// Raw component width for ES384 signatures.
pub const ES384_COMPONENT_LEN: usize = 48;

/// Convert a DER-encoded ECDSA signature to raw fixed-width `r‖s`.
///
/// # Arguments
///
/// * `der` - The ASN.1 DER signature
/// * `component_len` - Fixed width per component (key size / 8)
///
/// # Errors
///
/// `Encoding` when the input is not a well-formed two-integer DER
/// sequence or a component exceeds the requested width.
///
/// # Examples
///
/// ```
/// use warden_jwt::ecdsa::{der_to_raw, raw_to_der, ES256_COMPONENT_LEN};
///
/// let raw = vec![1u8; 64];
/// let der = raw_to_der(&raw).unwrap();
/// assert_eq!(der_to_raw(&der, ES256_COMPONENT_LEN).unwrap(), raw);
/// ```
pub fn der_to_raw(der: &[u8], component_len: usize) -> JwtResult<Vec<u8>> {
    let mut cursor = 0usize;
    expect_byte(der, &mut cursor, 0x30)?;
    let body_len = read_length(der, &mut cursor)?;
    if der.len() != cursor + body_len {
        return Err(JwtError::Encoding("der sequence length mismatch".to_string()));
    }

    let r = read_integer(der, &mut cursor)?;
    let s = read_integer(der, &mut cursor)?;
    if cursor != der.len() {
        return Err(JwtError::Encoding("trailing bytes after der integers".to_string()));
    }

    let mut raw = Vec::with_capacity(component_len * 2);
    raw.extend(pad_component(r, component_len)?);
    raw.extend(pad_component(s, component_len)?);
    Ok(raw)
}

/// Convert a raw fixed-width `r‖s` signature to ASN.1 DER.
///
/// # Errors
///
/// `Encoding` when the input length is odd or empty.
pub fn raw_to_der(raw: &[u8]) -> JwtResult<Vec<u8>> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(JwtError::Encoding(format!("raw signature length {} is not even", raw.len())));
    }
    let (r, s) = raw.split_at(raw.len() / 2);

    let mut body = Vec::new();
    write_integer(&mut body, r);
    write_integer(&mut body, s);

    let mut der = vec![0x30];
    write_length(&mut der, body.len());
    der.extend(body);
    Ok(der)
}

fn expect_byte(data: &[u8], cursor: &mut usize, expected: u8) -> JwtResult<()> {
    match data.get(*cursor) {
        Some(byte) if *byte == expected => {
            *cursor += 1;
            Ok(())
        }
        _ => Err(JwtError::Encoding(format!("expected der tag {:#04x} at offset {}", expected, cursor))),
    }
}

fn read_length(data: &[u8], cursor: &mut usize) -> JwtResult<usize> {
    let first = *data
        .get(*cursor)
        .ok_or_else(|| JwtError::Encoding("truncated der length".to_string()))?;
    *cursor += 1;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    let byte_count = (first & 0x7f) as usize;
    if byte_count == 0 || byte_count > 2 {
        return Err(JwtError::Encoding("unsupported der length form".to_string()));
    }
    let mut length = 0usize;
    for _ in 0..byte_count {
        let byte = *data
            .get(*cursor)
            .ok_or_else(|| JwtError::Encoding("truncated der length".to_string()))?;
        *cursor += 1;
        length = (length << 8) | byte as usize;
    }
    Ok(length)
}

fn read_integer<'a>(data: &'a [u8], cursor: &mut usize) -> JwtResult<&'a [u8]> {
    expect_byte(data, cursor, 0x02)?;
    let length = read_length(data, cursor)?;
    let end = *cursor + length;
    if length == 0 || end > data.len() {
        return Err(JwtError::Encoding("truncated der integer".to_string()));
    }
    let bytes = &data[*cursor..end];
    *cursor = end;
    Ok(bytes)
}

/// Strip the two's-complement sign byte and left-pad to the fixed
/// component width.
fn pad_component(bytes: &[u8], component_len: usize) -> JwtResult<Vec<u8>> {
    let mut significant = bytes;
    while significant.len() > 1 && significant[0] == 0 {
        significant = &significant[1..];
    }
    if significant.len() > component_len {
        return Err(JwtError::Encoding(format!(
            "der integer of {} bytes exceeds component width {}",
            significant.len(),
            component_len
        )));
    }
    let mut padded = vec![0u8; component_len - significant.len()];
    padded.extend_from_slice(significant);
    Ok(padded)
}

fn write_integer(out: &mut Vec<u8>, component: &[u8]) {
    let mut significant = component;
    while significant.len() > 1 && significant[0] == 0 {
        significant = &significant[1..];
    }
    out.push(0x02);
    // A set high bit needs a sign byte to stay a positive integer.
    if significant[0] & 0x80 != 0 {
        write_length(out, significant.len() + 1);
        out.push(0x00);
    } else {
        write_length(out, significant.len());
    }
    out.extend_from_slice(significant);
}

fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
    } else if length <= 0xff {
        out.push(0x81);
        out.push(length as u8);
    } else {
        out.push(0x82);
        out.push((length >> 8) as u8);
        out.push(length as u8);
    }
}
