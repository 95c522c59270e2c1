//! Append-only cell arena.
//!
//! Cells are addressed by 1-based [`ValueRef`]s; index 0 is reserved and can
//! never be named by a `ValueRef`. Allocation bumps a cursor and nothing is
//! ever freed, so a `ValueRef` stays valid for the lifetime of its arena.

use std::num::NonZeroU32;

use tracing::warn;

use crate::Error;
use crate::codec::{self, Kind, TextKind};

/// Pair links are 32-bit, so no arena can address more cells than this
pub const MAX_ARENA_CELLS: u64 = 1 << 32;

/// Reference to the root cell of a value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef(NonZeroU32);

impl ValueRef {
    /// `None` for the reserved index 0
    pub fn from_index(index: u32) -> Option<Self> {
        NonZeroU32::new(index).map(ValueRef)
    }

    pub fn index(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueRef({})", self.0)
    }
}

/// A decoded value whose pair links are checked references
pub type Value = codec::Value<ValueRef>;

/// Fixed-capacity, bump-allocated store of 64-bit cells
pub struct Arena {
    cells: Vec<u64>,
    capacity: usize,
}

impl Arena {
    /// Create an arena holding `capacity` cells in total, the reserved cell
    /// at index 0 included.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity < 2 || capacity as u64 > MAX_ARENA_CELLS {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                limit: usize::try_from(MAX_ARENA_CELLS).unwrap_or(usize::MAX),
            });
        }
        let mut cells = Vec::with_capacity(capacity.min(1 << 16));
        cells.push(0);
        Ok(Arena { cells, capacity })
    }

    /// Index the next allocation will receive
    pub fn cursor(&self) -> usize {
        self.cells.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cells still free
    pub fn available(&self) -> usize {
        self.capacity - self.cells.len()
    }

    /// Cells handed out so far, the reserved cell excluded
    pub fn used(&self) -> usize {
        self.cells.len() - 1
    }

    /// Append already-encoded cells as one value and return its root.
    ///
    /// Either all of `encoded` is written or nothing is.
    pub fn allocate(&mut self, encoded: &[u64]) -> Result<ValueRef, Error> {
        if encoded.len() > self.available() {
            warn!(
                requested = encoded.len(),
                available = self.available(),
                "arena exhausted"
            );
            return Err(Error::ArenaExhausted {
                requested: encoded.len(),
                available: self.available(),
            });
        }
        // capacity <= 2^32 and the reserved cell sits at 0, so the root fits
        let root = u32::try_from(self.cells.len())
            .ok()
            .and_then(ValueRef::from_index)
            .ok_or(Error::InvalidReference(0))?;
        self.cells.extend_from_slice(encoded);
        Ok(root)
    }

    pub fn alloc_empty(&mut self) -> Result<ValueRef, Error> {
        self.allocate(&[codec::encode_empty()])
    }

    pub fn alloc_integer(&mut self, n: i32) -> Result<ValueRef, Error> {
        self.allocate(&[codec::encode_integer(n)])
    }

    pub fn alloc_boolean(&mut self, b: bool) -> Result<ValueRef, Error> {
        self.allocate(&[codec::encode_boolean(b)])
    }

    /// Links must name values that already exist, which keeps every value
    /// graph acyclic.
    pub fn alloc_pair(&mut self, car: ValueRef, cdr: ValueRef) -> Result<ValueRef, Error> {
        for link in [car, cdr] {
            if link.index() as usize >= self.cells.len() {
                return Err(Error::InvalidReference(link.index()));
            }
        }
        self.allocate(&codec::encode_pair(car.index(), cdr.index()))
    }

    pub fn alloc_text(&mut self, bytes: &[u8], kind: TextKind) -> Result<ValueRef, Error> {
        let encoded = codec::encode_text(bytes, kind)?;
        self.allocate(&encoded)
    }

    pub fn alloc_string(&mut self, bytes: &[u8]) -> Result<ValueRef, Error> {
        self.alloc_text(bytes, TextKind::String)
    }

    pub fn alloc_symbol(&mut self, name: &[u8]) -> Result<ValueRef, Error> {
        self.alloc_text(name, TextKind::Symbol)
    }

    fn root_cell(&self, value: ValueRef) -> Result<(u64, Kind), Error> {
        let cell = self
            .cells
            .get(value.index() as usize)
            .copied()
            .ok_or(Error::InvalidReference(value.index()))?;
        let kind = codec::decode_kind(cell).ok_or(Error::InvalidReference(value.index()))?;
        Ok((cell, kind))
    }

    pub fn kind(&self, value: ValueRef) -> Result<Kind, Error> {
        self.root_cell(value).map(|(_, kind)| kind)
    }

    /// Decode the value rooted at `value`
    pub fn get(&self, value: ValueRef) -> Result<Value, Error> {
        let index = value.index() as usize;
        let (cell, kind) = self.root_cell(value)?;
        match kind {
            Kind::Empty => Ok(Value::Empty),
            Kind::Boolean => Ok(Value::Boolean(codec::decode_boolean(cell))),
            Kind::Integer => Ok(Value::Integer(codec::decode_integer(cell))),
            Kind::Pair => {
                let links = self
                    .cells
                    .get(index + 1)
                    .copied()
                    .ok_or(Error::InvalidReference(value.index()))?;
                let (car, cdr) = codec::decode_pair_links(links);
                Ok(Value::Pair {
                    car: self.link(car)?,
                    cdr: self.link(cdr)?,
                })
            }
            Kind::String | Kind::Symbol => {
                let (byte_len, payload_cells) = codec::decode_text_header(cell);
                if codec::text_cells(byte_len) != payload_cells {
                    return Err(Error::InvalidReference(value.index()));
                }
                let payload = self
                    .cells
                    .get(index + 1..index + 1 + payload_cells)
                    .ok_or(Error::InvalidReference(value.index()))?;
                let bytes = codec::decode_text_payload(payload, byte_len);
                Ok(if kind == Kind::String {
                    Value::String(bytes)
                } else {
                    Value::Symbol(bytes)
                })
            }
        }
    }

    fn link(&self, index: u32) -> Result<ValueRef, Error> {
        ValueRef::from_index(index)
            .filter(|link| (link.index() as usize) < self.cells.len())
            .ok_or(Error::InvalidReference(index))
    }

    /// (car, cdr) if `value` is a pair
    pub fn pair(&self, value: ValueRef) -> Result<Option<(ValueRef, ValueRef)>, Error> {
        match self.get(value)? {
            Value::Pair { car, cdr } => Ok(Some((car, cdr))),
            _ => Ok(None),
        }
    }

    /// Name bytes if `value` is a symbol
    pub fn symbol_name(&self, value: ValueRef) -> Result<Option<Vec<u8>>, Error> {
        match self.get(value)? {
            Value::Symbol(name) => Ok(Some(name)),
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Arena(used={}, capacity={})", self.used(), self.capacity)
    }
}
