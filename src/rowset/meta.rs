use crate::cursor::TypeByte;

/// Shape metadata for one result-set shape: column count, per-column type
/// byte, per-column name, and the optional identity-column list. Every
/// [`crate::rowset::RowSet`] produced for a given query carries one
/// shared `Meta` (via `Rc`), and row comparisons require meta to be
/// pointer-equal — this is the "single-shape contract" from the design.
///
/// Unlike the C runtime, this `Meta` does not also carry byte offsets or
/// function pointers for row teardown/hash/equal/same/slice: those are
/// ordinary functions over `Meta` + `Row` in this crate (see
/// [`crate::rowset`]), since Rust doesn't need hand-rolled vtables to get
/// per-shape dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    names: Vec<String>,
    types: Vec<TypeByte>,
    /// Logical column indices that define row identity for "same row"
    /// comparisons; `None` means identity falls back to full equality.
    identity_columns: Option<Vec<usize>>,
}

impl Meta {
    pub fn new(columns: Vec<(String, TypeByte)>, identity_columns: Option<Vec<usize>>) -> Self {
        if let Some(ids) = &identity_columns {
            for &i in ids {
                assert!(i < columns.len(), "identity column index out of range");
            }
        }
        let (names, types) = columns.into_iter().unzip();
        Meta {
            names,
            types,
            identity_columns,
        }
    }

    pub fn column_count(&self) -> usize {
        self.types.len()
    }

    pub fn name(&self, col: usize) -> &str {
        &self.names[col]
    }

    pub fn type_byte(&self, col: usize) -> TypeByte {
        self.types[col]
    }

    pub fn identity_columns(&self) -> Option<&[usize]> {
        self.identity_columns.as_deref()
    }

    /// Logical index, among only the non-reference columns, of the
    /// `col`-th column — i.e. its position in a row's scalar prefix. Only
    /// valid for non-reference columns.
    pub fn scalar_slot(&self, col: usize) -> usize {
        self.types[..col]
            .iter()
            .filter(|t| !t.core().is_reference())
            .count()
    }

    /// Position in a row's reference suffix. Only valid for reference
    /// columns.
    pub fn ref_slot(&self, col: usize) -> usize {
        self.types[..col]
            .iter()
            .filter(|t| t.core().is_reference())
            .count()
    }
}
