use crate::{Error, Result, U32_SIZE};
use byteorder::{ByteOrder, LittleEndian};

/// Offset added to Phred values when rendering SAM qualities.
pub const DEFAULT_QUALITY_OFFSET: u8 = 33;

const SEQ_BASES: &[u8; 16] = b"=ACMGRSVTWYHKDBN";
const CIGAR_OPS: &[u8; 9] = b"MIDNSHP=X";

/// Decodes packed sequence bytes, high nibble first.
///
/// Always yields two bases per byte. When the sequence length is odd the last
/// base comes from the padding nibble and has to be dropped by the caller.
pub fn decode_seq(bytes: &[u8]) -> String {
    let mut res = String::with_capacity(2 * bytes.len());
    for byte in bytes {
        res.push(SEQ_BASES[(byte >> 4) as usize] as char);
        res.push(SEQ_BASES[(byte & 0xf) as usize] as char);
    }
    res
}

fn get_cig_op(val: u32) -> Result<char> {
    CIGAR_OPS
        .get(val as usize)
        .map(|&op| op as char)
        .ok_or_else(|| Error::Format(format!("unknown CIGAR operation code {}", val)))
}

/// Decodes CIGAR bytes into a string
pub fn decode_cigar(bytes: &[u8]) -> Result<String> {
    if bytes.len() % U32_SIZE != 0 {
        return Err(Error::truncated(
            "cigar",
            (bytes.len() / U32_SIZE + 1) * U32_SIZE,
            bytes.len(),
        ));
    }
    let mut res = String::with_capacity(3 * bytes.len() / U32_SIZE);
    for cig in bytes.chunks(U32_SIZE).map(LittleEndian::read_u32) {
        let op_len = cig >> 4;
        res.push_str(&op_len.to_string());
        res.push(get_cig_op(cig & 0xf)?);
    }
    Ok(res)
}

/// Renders Phred qualities as text, one character per byte.
///
/// No special handling of the `0xff` "not stored" marker; it comes out as
/// whatever `0xff + offset` maps to and the caller decides what to show.
pub fn decode_qual(bytes: &[u8], offset: u8) -> String {
    bytes
        .iter()
        .filter_map(|&q| char::from_u32(u32::from(q) + u32::from(offset)))
        .collect()
}

/// True when the qualities were not stored (every byte is `0xff`).
pub fn qual_missing(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|&q| q == 0xff)
}
