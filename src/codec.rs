//! Bit layout of arena cells.
//!
//! A cell is a `u64`. The low four bits of a value's root cell hold its
//! [`Kind`]; the rest of the root cell and any following cells hold the
//! payload:
//!
//! ```text
//! Integer   root: value:i32 << 32 | tag
//! Boolean   root: truth << 32 | tag
//! Empty     root: tag
//! Pair      root: tag              next: car:u32 << 32 | cdr:u32
//! String    root: byte_len << 32 | payload_cells << 16 | tag
//! Symbol    (same as String)       next payload_cells cells: raw bytes, 8 per cell
//! ```
//!
//! Everything here is a pure function over cell words. Only [`crate::arena`]
//! knows where cells live.

use crate::Error;

/// Mask selecting the tag field of a root cell
pub const TAG_MASK: u64 = 0xF;

/// Number of text bytes stored in one payload cell
pub const CELL_BYTES: usize = 8;

/// Largest payload cell count a text header can describe (16-bit field)
pub const MAX_TEXT_CELLS: usize = 0xFFFF;

/// Largest byte length a text header can describe
pub const MAX_TEXT_BYTES: usize = MAX_TEXT_CELLS * CELL_BYTES;

const PAYLOAD_CELLS_SHIFT: u32 = 16;
const HIGH_SHIFT: u32 = 32;
const LOW_HALF: u64 = 0xFFFF_FFFF;

/// Discriminant of a value, stored in the low bits of its root cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Integer = 1,
    Pair = 2,
    String = 3,
    Symbol = 4,
    Empty = 5,
    Boolean = 6,
}

impl Kind {
    pub fn tag(self) -> u64 {
        self as u64
    }

    /// Tag 0 (an unused cell) and 7..=15 decode to `None`
    pub fn from_tag(tag: u64) -> Option<Kind> {
        match tag {
            1 => Some(Kind::Integer),
            2 => Some(Kind::Pair),
            3 => Some(Kind::String),
            4 => Some(Kind::Symbol),
            5 => Some(Kind::Empty),
            6 => Some(Kind::Boolean),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Pair => "pair",
            Kind::String => "string",
            Kind::Symbol => "symbol",
            Kind::Empty => "empty list",
            Kind::Boolean => "boolean",
        }
    }
}

/// The two kinds that share the length-delimited text layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    String,
    Symbol,
}

impl From<TextKind> for Kind {
    fn from(kind: TextKind) -> Self {
        match kind {
            TextKind::String => Kind::String,
            TextKind::Symbol => Kind::Symbol,
        }
    }
}

/// A fully decoded value.
///
/// Pair links stay as raw indices here; the arena turns them into
/// [`crate::arena::ValueRef`]s after checking them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<R> {
    Empty,
    Boolean(bool),
    Integer(i32),
    Pair { car: R, cdr: R },
    String(Vec<u8>),
    Symbol(Vec<u8>),
}

impl<R> Value<R> {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Empty => Kind::Empty,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Pair { .. } => Kind::Pair,
            Value::String(_) => Kind::String,
            Value::Symbol(_) => Kind::Symbol,
        }
    }
}

pub fn decode_kind(cell: u64) -> Option<Kind> {
    Kind::from_tag(cell & TAG_MASK)
}

pub fn encode_empty() -> u64 {
    Kind::Empty.tag()
}

pub fn encode_integer(n: i32) -> u64 {
    Kind::Integer.tag() | (u64::from(n as u32) << HIGH_SHIFT)
}

pub fn decode_integer(cell: u64) -> i32 {
    (cell >> HIGH_SHIFT) as u32 as i32
}

pub fn encode_boolean(b: bool) -> u64 {
    Kind::Boolean.tag() | (u64::from(b) << HIGH_SHIFT)
}

pub fn decode_boolean(cell: u64) -> bool {
    (cell >> HIGH_SHIFT) != 0
}

/// Root cell and link cell of a pair
pub fn encode_pair(car: u32, cdr: u32) -> [u64; 2] {
    [
        Kind::Pair.tag(),
        (u64::from(car) << HIGH_SHIFT) | u64::from(cdr),
    ]
}

/// Split a pair's link cell into (car, cdr)
pub fn decode_pair_links(cell: u64) -> (u32, u32) {
    ((cell >> HIGH_SHIFT) as u32, (cell & LOW_HALF) as u32)
}

/// Payload cells needed for `byte_len` bytes of text
pub fn text_cells(byte_len: usize) -> usize {
    byte_len.div_ceil(CELL_BYTES)
}

/// Header cell followed by the packed payload of a string or symbol
pub fn encode_text(bytes: &[u8], kind: TextKind) -> Result<Vec<u64>, Error> {
    if bytes.len() > MAX_TEXT_BYTES {
        return Err(Error::TextTooLong(bytes.len()));
    }
    let payload_cells = text_cells(bytes.len()) as u64;
    let header = Kind::from(kind).tag()
        | (payload_cells << PAYLOAD_CELLS_SHIFT)
        | ((bytes.len() as u64) << HIGH_SHIFT);

    let mut cells = Vec::with_capacity(1 + payload_cells as usize);
    cells.push(header);
    cells.extend(bytes.chunks(CELL_BYTES).map(|chunk| {
        let mut word = [0u8; CELL_BYTES];
        word[..chunk.len()].copy_from_slice(chunk);
        u64::from_le_bytes(word)
    }));
    Ok(cells)
}

/// (byte length, payload cell count) from a text header
pub fn decode_text_header(cell: u64) -> (usize, usize) {
    let byte_len = (cell >> HIGH_SHIFT) as usize;
    let payload_cells = ((cell >> PAYLOAD_CELLS_SHIFT) & 0xFFFF) as usize;
    (byte_len, payload_cells)
}

/// Recover exactly `byte_len` bytes from payload cells; padding is dropped
pub fn decode_text_payload(payload: &[u64], byte_len: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = payload.iter().flat_map(|cell| cell.to_le_bytes()).collect();
    bytes.truncate(byte_len);
    bytes
}
