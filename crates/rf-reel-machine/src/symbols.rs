//! Symbol types and the catalog that renders them

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Largest catalog a `SymbolType` can index
pub const MAX_CATALOG_SIZE: usize = u8::MAX as usize + 1;

/// Identity of an icon kind. Only equality matters for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolType(pub u8);

impl SymbolType {
    /// Position of this type in its catalog
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SYM{}", self.0)
    }
}

/// Source of renderable handles for symbol types.
///
/// Handles are looked up only when a reel is initialized or reset.
pub trait SymbolCatalog {
    /// Whatever the host renders a cell with (sprite id, texture, name)
    type Handle: Clone + fmt::Debug;

    /// Number of distinct symbol types
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable handle for `symbol`, `None` when out of range
    fn lookup(&self, symbol: SymbolType) -> Option<Self::Handle>;
}

/// Default icon names, in catalog order
const STANDARD_NAMES: [&str; 8] = [
    "CHERRY", "BELL", "SEVEN", "BAR", "LEMON", "PLUM", "STAR", "DIAMOND",
];

/// Catalog whose handles are icon names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCatalog {
    names: Vec<String>,
}

impl NamedCatalog {
    /// Create a catalog from icon names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Catalog of `count` standard icons; names past the built-in set are numbered
    pub fn standard(count: usize) -> Self {
        let names = (0..count).map(|i| match STANDARD_NAMES.get(i) {
            Some(name) => name.to_string(),
            None => format!("SYM{}", i),
        });
        Self::new(names)
    }

    /// Name of a symbol, if it is in range
    pub fn name(&self, symbol: SymbolType) -> Option<&str> {
        self.names.get(symbol.index()).map(String::as_str)
    }
}

impl SymbolCatalog for NamedCatalog {
    type Handle = String;

    fn len(&self) -> usize {
        self.names.len()
    }

    fn lookup(&self, symbol: SymbolType) -> Option<String> {
        self.name(symbol).map(str::to_string)
    }
}

/// Uniformly random permutation of the first `count` symbol types.
///
/// `count` is capped at `MAX_CATALOG_SIZE`; config validation rejects larger catalogs.
pub fn shuffled_symbols<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<SymbolType> {
    let count = count.min(MAX_CATALOG_SIZE);
    let mut symbols: Vec<SymbolType> = (0..count).map(|i| SymbolType(i as u8)).collect();
    symbols.shuffle(rng);
    symbols
}
