/// Which events the host should report, selected by DEC private modes
/// 9 / 1000 / 1002 / 1003.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseTrackingMode {
    #[default]
    Off,
    /// Mode 9: press only.
    X10,
    /// Mode 1000: press and release.
    Normal,
    /// Mode 1002: press, release, and motion while a button is held.
    ButtonEvent,
    /// Mode 1003: press, release, and all motion.
    AnyEvent,
}

/// How coordinates and button codes are encoded on the wire, selected by
/// modes 1005 (UTF-8, legacy), 1006 (SGR), 1015 (URXVT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEncoding {
    #[default]
    Default,
    Utf8,
    Sgr,
    Urxvt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    None,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub kind: MouseEventKind,
    pub col: u16,
    pub row: u16,
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

/// Button portion of the wire code. For the legacy (Default/UTF-8/URXVT)
/// encodings a release is always reported as button 3, regardless of which
/// button went up, since those encodings can't name the released button;
/// SGR (1006) is exempted because it reports the real button on release too.
fn button_code(event: &MouseEvent, encoding: MouseEncoding) -> u8 {
    let base = if event.kind == MouseEventKind::Release && encoding != MouseEncoding::Sgr {
        3
    } else {
        match event.button {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::None => 3,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
        }
    };
    let motion = if event.kind == MouseEventKind::Motion {
        32
    } else {
        0
    };
    let modifiers = (event.shift as u8 * 4) + (event.alt as u8 * 8) + (event.ctrl as u8 * 16);
    base + motion + modifiers
}

/// Whether `event` should be reported at all under the current tracking
/// mode (button-event mode only reports motion while a button is down).
pub fn should_report(mode: MouseTrackingMode, event: &MouseEvent, button_down: bool) -> bool {
    match mode {
        MouseTrackingMode::Off => false,
        MouseTrackingMode::X10 => event.kind == MouseEventKind::Press,
        MouseTrackingMode::Normal => event.kind != MouseEventKind::Motion,
        MouseTrackingMode::ButtonEvent => event.kind != MouseEventKind::Motion || button_down,
        MouseTrackingMode::AnyEvent => true,
    }
}

/// Encode one mouse event as the bytes to write to the pty, per the active
/// tracking mode and encoding. Returns `None` when `should_report` says the
/// event should be suppressed.
pub fn encode_mouse_report(
    mode: MouseTrackingMode,
    encoding: MouseEncoding,
    event: MouseEvent,
    button_down: bool,
) -> Option<Vec<u8>> {
    if !should_report(mode, &event, button_down) {
        return None;
    }

    let code = button_code(&event, encoding);
    let mut out = vec![0x1b, b'['];

    match encoding {
        MouseEncoding::Sgr => {
            out.push(b'<');
            out.extend(code.to_string().bytes());
            out.push(b';');
            out.extend(event.col.to_string().bytes());
            out.push(b';');
            out.extend(event.row.to_string().bytes());
            out.push(if event.kind == MouseEventKind::Release {
                b'm'
            } else {
                b'M'
            });
        }
        MouseEncoding::Urxvt => {
            out.push(b'M');
            out.extend((code as u32 + 32).to_string().bytes());
            out.push(b';');
            out.extend(event.col.to_string().bytes());
            out.push(b';');
            out.extend(event.row.to_string().bytes());
            out.push(b'M');
        }
        MouseEncoding::Utf8 => {
            out.pop();
            out.pop();
            out.push(b'M');
            out.push(code.wrapping_add(32));
            push_utf8_coord(&mut out, event.col);
            push_utf8_coord(&mut out, event.row);
        }
        MouseEncoding::Default => {
            out.pop();
            out.pop();
            out.push(b'M');
            out.push(code.wrapping_add(32));
            out.push(clamp_legacy_coord(event.col));
            out.push(clamp_legacy_coord(event.row));
        }
    }
    Some(out)
}

fn clamp_legacy_coord(v: u16) -> u8 {
    (v.min(223) as u8).wrapping_add(32)
}

/// Legacy 1005 (UTF-8 extended) mode encodes coordinates above 95 as a
/// 2-byte UTF-8 sequence instead of clamping at 223.
fn push_utf8_coord(out: &mut Vec<u8>, v: u16) {
    let code_point = v as u32 + 32;
    if let Some(c) = char::from_u32(code_point) {
        let mut buf = [0u8; 4];
        out.extend(c.encode_utf8(&mut buf).as_bytes());
    } else {
        out.push(b'?');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(col: u16, row: u16) -> MouseEvent {
        MouseEvent {
            button: MouseButton::Left,
            kind: MouseEventKind::Press,
            col,
            row,
            shift: false,
            alt: false,
            ctrl: false,
        }
    }

    #[test]
    fn x10_mode_only_reports_press() {
        let mut ev = press(1, 1);
        ev.kind = MouseEventKind::Release;
        assert!(encode_mouse_report(MouseTrackingMode::X10, MouseEncoding::Default, ev, false).is_none());
    }

    #[test]
    fn sgr_encoding_uses_m_or_lowercase_m_terminator() {
        let mut ev = press(10, 20);
        let bytes = encode_mouse_report(MouseTrackingMode::Normal, MouseEncoding::Sgr, ev, false).unwrap();
        assert_eq!(bytes, b"\x1b[<0;10;20M".to_vec());
        ev.kind = MouseEventKind::Release;
        let bytes = encode_mouse_report(MouseTrackingMode::Normal, MouseEncoding::Sgr, ev, false).unwrap();
        assert_eq!(bytes, b"\x1b[<0;10;20m".to_vec());
    }

    #[test]
    fn default_encoding_reports_release_as_button_3() {
        let mut ev = press(1, 1);
        ev.kind = MouseEventKind::Release;
        let bytes =
            encode_mouse_report(MouseTrackingMode::Normal, MouseEncoding::Default, ev, true).unwrap();
        assert_eq!(bytes, b"M#!!".to_vec());
    }

    #[test]
    fn sgr_encoding_keeps_real_button_on_release() {
        let mut ev = press(10, 20);
        ev.kind = MouseEventKind::Release;
        let bytes = encode_mouse_report(MouseTrackingMode::Normal, MouseEncoding::Sgr, ev, true).unwrap();
        assert_eq!(bytes, b"\x1b[<0;10;20m".to_vec());
    }

    #[test]
    fn default_encoding_clamps_large_coordinates() {
        let ev = press(500, 500);
        let bytes = encode_mouse_report(MouseTrackingMode::Normal, MouseEncoding::Default, ev, false).unwrap();
        assert_eq!(bytes[bytes.len() - 1], clamp_legacy_coord(500));
    }

    #[test]
    fn button_event_mode_suppresses_motion_without_button() {
        let mut ev = press(1, 1);
        ev.kind = MouseEventKind::Motion;
        assert!(!should_report(MouseTrackingMode::ButtonEvent, &ev, false));
        assert!(should_report(MouseTrackingMode::ButtonEvent, &ev, true));
    }
}
