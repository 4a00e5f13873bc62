use bitflags::bitflags;
use smol_str::SmolStr;

use crate::attr::Attribute;

/// A grapheme cluster stored in a cell. Inline-stored for the common case of
/// a single `char`; only clusters with combining marks spill to the heap.
pub type Grapheme = SmolStr;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellFlags: u8 {
        /// Trailing placeholder half of a width-2 cell to its left.
        const WIDE_PLACEHOLDER = 1 << 0;
    }
}

/// One grid position: a grapheme, its display width, and its attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub grapheme: Grapheme,
    /// 0 (combining continuation), 1, or 2 (wide, consumes the next cell).
    pub width: u8,
    pub attr: Attribute,
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::blank(Attribute::DEFAULT)
    }
}

impl Cell {
    /// The canonical "null" cell: a space with default attribute, width 1.
    pub fn blank(attr: Attribute) -> Cell {
        Cell {
            grapheme: SmolStr::new_inline(" "),
            width: 1,
            attr,
            flags: CellFlags::empty(),
        }
    }

    /// The trailing placeholder written at `x+1` after a wide character at `x`.
    pub fn wide_placeholder(attr: Attribute) -> Cell {
        Cell {
            grapheme: SmolStr::new_inline(" "),
            width: 0,
            attr,
            flags: CellFlags::WIDE_PLACEHOLDER,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.width == 1 && self.attr == Attribute::DEFAULT && self.grapheme.as_str() == " "
    }

    /// Whether this is a genuine glyph cell occupying screen space (not a
    /// combining continuation and not a wide-placeholder).
    pub fn has_content(&self) -> bool {
        self.width != 0 && !self.flags.contains(CellFlags::WIDE_PLACEHOLDER)
    }
}

/// Whether appending `ch` to `prior` stays within the same extended grapheme
/// cluster (ZWJ emoji sequences, regional-indicator flag pairs, variation
/// selectors that `unicode-width` alone doesn't report as zero-width).
/// `prior` is the grapheme already committed to a cell; combining marks
/// (width 0) are handled separately and never reach this check.
pub fn is_grapheme_continuation(prior: &str, ch: char) -> bool {
    use unicode_segmentation::GraphemeCursor;

    if prior.is_empty() {
        return false;
    }
    let mut buf = [0u8; 4];
    let mut extended = String::with_capacity(prior.len() + 4);
    extended.push_str(prior);
    extended.push_str(ch.encode_utf8(&mut buf));
    let mut cursor = GraphemeCursor::new(prior.len(), extended.len(), true);
    matches!(cursor.is_boundary(&extended, 0), Ok(false))
}

#[cfg(test)]
mod grapheme_tests {
    use super::*;

    #[test]
    fn regional_indicator_pair_is_one_cluster() {
        // Flag emoji: a pair of regional-indicator symbols (here, a US flag).
        assert!(is_grapheme_continuation("\u{1F1FA}", '\u{1F1F8}'));
    }

    #[test]
    fn unrelated_chars_are_not_joined() {
        assert!(!is_grapheme_continuation("a", 'b'));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cell_is_null_space() {
        let c = Cell::default();
        assert!(c.is_blank());
        assert_eq!(c.width, 1);
    }

    #[test]
    fn wide_placeholder_is_not_content() {
        let c = Cell::wide_placeholder(Attribute::DEFAULT);
        assert!(!c.has_content());
        assert_eq!(c.width, 0);
    }
}
