use std::collections::BTreeSet;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::card::Card;
use crate::MEMORY_MAX;

/// Insertion-ordered map, as used for label and symbol tables.
pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Word-addressed data memory.
///
/// A slot is `None` until it is first written.
#[derive(Debug)]
pub struct DataStore {
    slots: Box<[Option<i64>; MEMORY_MAX]>,
    /// Every address ever written, for display only.
    used: BTreeSet<usize>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self {
            slots: Box::new([None; MEMORY_MAX]),
            used: BTreeSet::new(),
        }
    }
}

impl DataStore {
    pub fn get(&self, address: usize) -> Option<i64> {
        self.slots.get(address).copied().flatten()
    }

    /// Caller must ensure `address` is in range.
    pub fn set(&mut self, address: usize, value: i64) {
        self.slots[address] = Some(value);
        self.used.insert(address);
    }

    pub fn used(&self) -> &BTreeSet<usize> {
        &self.used
    }
}

/// Program cards, with the source line each was read from.
#[derive(Debug, Default)]
pub struct ProgramStore {
    cards: Vec<Card>,
    source_lines: Vec<usize>,
}

impl ProgramStore {
    pub fn push(&mut self, card: Card, source_line: usize) {
        self.cards.push(card);
        self.source_lines.push(source_line);
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    /// 1-based line in the source file.
    pub fn source_line(&self, index: usize) -> Option<usize> {
        self.source_lines.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Input cards, consumed in order.
#[derive(Debug, Default)]
pub struct InputStore {
    values: Vec<i64>,
    cursor: usize,
}

impl InputStore {
    pub fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.values.get(index).copied()
    }

    /// Next unread value and its index, without consuming it.
    pub fn peek(&self) -> Option<(usize, i64)> {
        self.get(self.cursor).map(|value| (self.cursor, value))
    }

    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Block of data memory named by a symbol id.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub base: usize,
    pub size: usize,
}

/// Everything built by loading a card file.
#[derive(Debug, Default)]
pub struct Memory {
    pub data: DataStore,
    pub program: ProgramStore,
    pub input: InputStore,
    /// Label id -> program index
    pub labels: FxMap<u16, usize>,
    /// Symbol id -> data block
    pub symbols: FxMap<u16, Symbol>,
    /// Next free data address for symbol allocation.
    pub allocated: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `size` words for symbol `id`, all set to `fill`.
    ///
    /// Caller is responsible for checking that the symbol is new and fits.
    pub fn allocate(&mut self, id: u16, size: usize, fill: i64) -> Symbol {
        let symbol = Symbol {
            base: self.allocated,
            size,
        };
        for address in symbol.base..symbol.base + size {
            self.data.set(address, fill);
        }
        self.allocated += size;
        self.symbols.insert(id, symbol);
        symbol
    }
}
