//! VT100/xterm-compatible terminal emulation engine.
//!
//! Consumes a byte stream from a pseudo-terminal (or any other source) and
//! maintains the emulated screen state: a two-dimensional cell grid with
//! colored, styled glyphs, scrollback, scrolling regions, multiple buffers,
//! tab stops, cursor state, selection, and mouse/keyboard reporting modes.
//!
//! Platform rendering, input handling, pty spawning, and transport are all
//! external collaborators reached through the [`host::HostIO`] trait; this
//! crate only maintains emulator state and produces the bytes/events an
//! embedder needs to drive a real terminal UI.

pub mod attr;
pub mod cell;
pub mod charset;
pub mod color;
pub mod config;
pub mod grid_line;
pub mod host;
pub mod mouse;
pub mod ring_buffer;
pub mod screen;
pub mod selection;
pub mod terminal;

pub use attr::{Attribute, ColorSlot, StyleFlags};
pub use cell::{Cell, CellFlags, Grapheme};
pub use charset::{Charset, CharsetSlot, CharsetState};
pub use color::Color;
pub use config::{CursorStyleConfig, TerminalConfig};
pub use grid_line::GridLine;
pub use host::{HostIO, NullHost, WindowCommand};
pub use mouse::{MouseButton, MouseEncoding, MouseEvent, MouseEventKind, MouseTrackingMode};
pub use ring_buffer::RingBuffer;
pub use screen::Screen;
pub use selection::{Position, Selection, SelectionMode};
pub use terminal::{CursorShape, CursorStyle, Engine, Terminal};
