use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// Text rendition flags carried per cell, independent of color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct StyleFlags: u16 {
        const BOLD        = 1 << 0;
        const DIM         = 1 << 1;
        const ITALIC      = 1 << 2;
        const UNDERLINE   = 1 << 3;
        const BLINK       = 1 << 4;
        const INVERSE     = 1 << 5;
        const INVISIBLE   = 1 << 6;
        const CROSSED_OUT = 1 << 7;
    }
}

/// Addresses a palette entry for OSC 4/10/11/104 (indexed color, default
/// foreground/background) and OSC 12 (cursor color) query/set/reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSlot {
    Indexed(u8),
    Foreground,
    Background,
    Cursor,
}

/// Foreground, background, and style flags: the full "current attribute"
/// carried on the cursor and stamped into cells as they're written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub fg: Color,
    pub bg: Color,
    pub style: StyleFlags,
}

impl Default for Attribute {
    fn default() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            style: StyleFlags::empty(),
        }
    }
}

impl Attribute {
    pub const DEFAULT: Attribute = Attribute {
        fg: Color::Default,
        bg: Color::Default,
        style: StyleFlags::empty(),
    };

    /// Attribute used to erase cells: the current background, default
    /// foreground, no style flags (ECMA-48 "erase attribute").
    pub fn erase(self) -> Attribute {
        Attribute {
            fg: Color::Default,
            bg: self.bg,
            style: StyleFlags::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erase_attribute_keeps_only_background() {
        let attr = Attribute {
            fg: Color::Ansi256(1),
            bg: Color::Ansi256(4),
            style: StyleFlags::BOLD | StyleFlags::UNDERLINE,
        };
        let erased = attr.erase();
        assert_eq!(erased.fg, Color::Default);
        assert_eq!(erased.bg, Color::Ansi256(4));
        assert!(erased.style.is_empty());
    }

    #[test]
    fn default_attribute_is_all_default() {
        assert_eq!(Attribute::default(), Attribute::DEFAULT);
    }
}
