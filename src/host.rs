/// Sub-action of a CSI `t` (window manipulation) sequence the engine can't
/// service itself and hands off to the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCommand {
    DeIconify,
    Iconify,
    Move { x: i64, y: i64 },
    ResizePixels { height: i64, width: i64 },
    RaiseToFront,
    LowerToBottom,
    Refresh,
    ResizeCells { rows: i64, cols: i64 },
    MaximizeRestore,
    FullscreenToggle,
    ReportState,
    ReportPositionPixels,
    ReportSizePixels,
    ReportSizeCells,
    ReportScreenSizeCells,
}

/// Sinks for the side effects a running terminal needs but can't perform
/// itself: writing bytes back to the pty, telling a host window what the
/// application asked for, and surfacing clipboard/notification requests.
///
/// All methods default to doing nothing, so an embedder only overrides what
/// it cares about.
pub trait HostIO {
    /// Bytes the engine wants written back to the controlling process (DSR
    /// replies, DA1/DA2, DECRQSS responses, paste-bracketing acks, …).
    fn write_response(&mut self, _bytes: &[u8]) {}

    fn set_title(&mut self, _title: &str) {}

    fn set_icon_name(&mut self, _name: &str) {}

    /// A canned response (e.g. the answer to `ReportSizeCells`) is written
    /// back to the pty verbatim by the engine; return `None` for commands
    /// with no reply (iconify, move, raise, …).
    fn window_command(&mut self, _cmd: WindowCommand) -> Option<String> {
        None
    }

    /// OSC 52: base64 clipboard payload already decoded, tagged with the
    /// selection target (`c`, `p`, `q`, `s`, `0`-`7`).
    fn clipboard_write(&mut self, _selection: char, _data: &[u8]) {}

    fn clipboard_read(&mut self, _selection: char) -> Option<Vec<u8>> {
        None
    }

    /// OSC 4 / 10 / 11 / 104 palette queries: return the RGB triple for a
    /// named slot so the engine can answer with the same format it was asked in.
    fn query_color(&mut self, _slot: crate::attr::ColorSlot) -> Option<(u8, u8, u8)> {
        None
    }

    fn set_color(&mut self, _slot: crate::attr::ColorSlot, _rgb: (u8, u8, u8)) {}

    fn reset_color(&mut self, _slot: crate::attr::ColorSlot) {}

    /// BEL.
    fn bell(&mut self) {}

    /// OSC 7: reports the current working directory as a `file://` URI.
    fn working_directory_changed(&mut self, _uri: &str) {}

    /// The visible geometry changed (after a `Terminal::resize`).
    fn size_changed(&mut self, _cols: usize, _rows: usize) {}

    /// The scrollback display offset changed (user scrolled, or a trim
    /// moved `y_disp`).
    fn scrolled(&mut self, _y_disp: usize) {}

    /// The engine switched between the normal and alternate screen.
    fn buffer_activated(&mut self, _alternate: bool) {}

    /// DECTCEM turned the cursor visible.
    fn show_cursor(&mut self) {}

    /// The selection range changed.
    fn selection_changed(&mut self) {}

    /// A line feed occurred (hook for hosts that narrate output, e.g. a
    /// screen reader bridge).
    fn linefeed(&mut self) {}

    /// Gate for buffer-checksum queries (DECRQCRA): hosts that can't
    /// verify which process currently owns the pty should return `false`
    /// to refuse leaking buffer contents via checksum oracle.
    fn is_process_trusted(&mut self) -> bool {
        true
    }
}

/// A `HostIO` that drops every side effect; used where no embedder is
/// wired up (tests, headless parsing of recorded sessions).
#[derive(Debug, Default)]
pub struct NullHost;

impl HostIO for NullHost {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_host_accepts_every_call_without_panicking() {
        let mut host = NullHost;
        host.write_response(b"ok");
        host.set_title("t");
        host.bell();
        assert_eq!(host.clipboard_read('c'), None);
    }
}
