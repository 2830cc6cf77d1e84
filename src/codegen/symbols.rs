//! Symbol table
//!
//! Maps variable names to global slot addresses. Every variable takes one
//! slot; an array's slot holds a reference to its heap block.

use std::collections::HashMap;

use crate::parser::ast::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub address: usize,
    pub ty: DataType,
}

/// Grow-only table of allocated variables
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot for `name` and return its address
    ///
    /// Allocating a name that already exists returns the existing address
    /// and keeps the original type.
    pub fn allocate(&mut self, name: &str, ty: DataType) -> usize {
        if let Some(&address) = self.by_name.get(name) {
            return address;
        }
        let address = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.to_string(),
            address,
            ty,
        });
        self.by_name.insert(name.to_string(), address);
        log::trace!("allocated '{}' at {}", name, address);
        address
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&address| &self.symbols[address])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in address order
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}
