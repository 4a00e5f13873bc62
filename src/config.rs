use serde::{Deserialize, Serialize};

use crate::terminal::CursorShape;

/// Cursor presentation as configured by the embedder (distinct from the
/// live `CursorStyle` the engine tracks, which DECSCUSR can override at runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorStyleConfig {
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorStyleConfig {
    pub fn shape(self) -> CursorShape {
        match self {
            CursorStyleConfig::BlinkingBlock | CursorStyleConfig::SteadyBlock => CursorShape::Block,
            CursorStyleConfig::BlinkingUnderline | CursorStyleConfig::SteadyUnderline => {
                CursorShape::Underline
            }
            CursorStyleConfig::BlinkingBar | CursorStyleConfig::SteadyBar => CursorShape::Bar,
        }
    }

    pub fn blink(self) -> bool {
        matches!(
            self,
            CursorStyleConfig::BlinkingBlock
                | CursorStyleConfig::BlinkingUnderline
                | CursorStyleConfig::BlinkingBar
        )
    }
}

impl Default for CursorStyleConfig {
    fn default() -> Self {
        CursorStyleConfig::BlinkingBlock
    }
}

/// Construction-time parameters for a `Terminal`. Pure data — no file I/O;
/// embedders load and persist this however fits their application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub rows: usize,
    pub cols: usize,
    /// Number of lines the normal-screen ring can hold beyond the visible
    /// rows. Ignored for the alternate screen, which never scrolls back.
    pub scrollback: usize,
    pub tab_stop_width: usize,
    /// Reported as the `TERM` environment convention. Also keys the DA1/DA2
    /// identification replies (`Engine::primary_da_response` /
    /// `secondary_da_response`): a name containing `"linux"` answers like the
    /// Linux console, `"rxvt"`/`"screen"` answer like those families, and
    /// anything else gets the xterm-family reply.
    pub term_name: String,
    pub cursor_style: CursorStyleConfig,
    /// When set, the embedder wants cursor motion and screen contents
    /// narrated in a form a screen reader can consume. The engine itself
    /// does no narration; it only threads the flag through
    /// (`Engine::screen_reader_mode`) so a host-side accessibility bridge
    /// can tell, without separately tracking the config it was constructed
    /// with, whether it should be active.
    pub screen_reader_mode: bool,
    /// Rewrite bare `\n` to `\r\n` for data handed to embedders that expect
    /// canonical line endings (e.g. writing a transcript to disk).
    pub convert_eol: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            rows: 25,
            cols: 80,
            scrollback: 1000,
            tab_stop_width: 8,
            term_name: "xterm-256color".to_string(),
            cursor_style: CursorStyleConfig::default(),
            screen_reader_mode: false,
            convert_eol: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_80x25_with_scrollback() {
        let config = TerminalConfig::default();
        assert_eq!((config.cols, config.rows), (80, 25));
        assert_eq!(config.scrollback, 1000);
    }

    #[test]
    fn cursor_style_blink_matches_name() {
        assert!(CursorStyleConfig::BlinkingBar.blink());
        assert!(!CursorStyleConfig::SteadyBar.blink());
    }
}
