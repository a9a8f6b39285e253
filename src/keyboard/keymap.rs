//! Key code definitions and keyboard layout mapping
//!
//! Every capture backend normalizes to Linux evdev scancodes so that a
//! physical key carries the same identity whichever backend observed it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Represents a physical key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const ESCAPE: KeyCode = KeyCode(1);
    pub const ENTER: KeyCode = KeyCode(28);
    pub const KEYPAD_ENTER: KeyCode = KeyCode(96);

    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Keys that end a round instead of being recorded
    pub fn is_terminator(&self) -> bool {
        *self == Self::ENTER || *self == Self::KEYPAD_ENTER
    }

    /// Stable display name used as the raw key identity
    pub fn name(&self) -> Cow<'static, str> {
        match KEYMAP.get(self) {
            Some(info) => Cow::Borrowed(info.name),
            None => Cow::Owned(format!("Key{}", self.0)),
        }
    }

    /// Map a character typed on a US layout back to the key that produces it.
    ///
    /// Shifted symbols resolve to their base key, so `'T'` and `'t'` share
    /// an identity just as they share a physical key.
    pub fn from_char(c: char) -> Option<Self> {
        let code = match c.to_ascii_lowercase() {
            '`' | '~' => 41,
            '1' | '!' => 2,
            '2' | '@' => 3,
            '3' | '#' => 4,
            '4' | '$' => 5,
            '5' | '%' => 6,
            '6' | '^' => 7,
            '7' | '&' => 8,
            '8' | '*' => 9,
            '9' | '(' => 10,
            '0' | ')' => 11,
            '-' | '_' => 12,
            '=' | '+' => 13,
            'q' => 16,
            'w' => 17,
            'e' => 18,
            'r' => 19,
            't' => 20,
            'y' => 21,
            'u' => 22,
            'i' => 23,
            'o' => 24,
            'p' => 25,
            '[' | '{' => 26,
            ']' | '}' => 27,
            '\\' | '|' => 43,
            'a' => 30,
            's' => 31,
            'd' => 32,
            'f' => 33,
            'g' => 34,
            'h' => 35,
            'j' => 36,
            'k' => 37,
            'l' => 38,
            ';' | ':' => 39,
            '\'' | '"' => 40,
            'z' => 44,
            'x' => 45,
            'c' => 46,
            'v' => 47,
            'b' => 48,
            'n' => 49,
            'm' => 50,
            ',' | '<' => 51,
            '.' | '>' => 52,
            '/' | '?' => 53,
            ' ' => 57,
            _ => return None,
        };
        Some(Self(code))
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<device_query::Keycode> for KeyCode {
    fn from(keycode: device_query::Keycode) -> Self {
        use device_query::Keycode as DK;
        // Map device_query keycodes to Linux evdev scancodes
        let code = match keycode {
            DK::Escape => 1,
            DK::Key1 => 2,
            DK::Key2 => 3,
            DK::Key3 => 4,
            DK::Key4 => 5,
            DK::Key5 => 6,
            DK::Key6 => 7,
            DK::Key7 => 8,
            DK::Key8 => 9,
            DK::Key9 => 10,
            DK::Key0 => 11,
            DK::Minus => 12,
            DK::Equal => 13,
            DK::Backspace => 14,
            DK::Tab => 15,
            DK::Q => 16,
            DK::W => 17,
            DK::E => 18,
            DK::R => 19,
            DK::T => 20,
            DK::Y => 21,
            DK::U => 22,
            DK::I => 23,
            DK::O => 24,
            DK::P => 25,
            DK::LeftBracket => 26,
            DK::RightBracket => 27,
            DK::Enter => 28,
            DK::LControl => 29,
            DK::A => 30,
            DK::S => 31,
            DK::D => 32,
            DK::F => 33,
            DK::G => 34,
            DK::H => 35,
            DK::J => 36,
            DK::K => 37,
            DK::L => 38,
            DK::Semicolon => 39,
            DK::Apostrophe => 40,
            DK::Grave => 41,
            DK::LShift => 42,
            DK::BackSlash => 43,
            DK::Z => 44,
            DK::X => 45,
            DK::C => 46,
            DK::V => 47,
            DK::B => 48,
            DK::N => 49,
            DK::M => 50,
            DK::Comma => 51,
            DK::Dot => 52,
            DK::Slash => 53,
            DK::RShift => 54,
            DK::LAlt => 56,
            DK::Space => 57,
            DK::CapsLock => 58,
            DK::F1 => 59,
            DK::F2 => 60,
            DK::F3 => 61,
            DK::F4 => 62,
            DK::F5 => 63,
            DK::F6 => 64,
            DK::F7 => 65,
            DK::F8 => 66,
            DK::F9 => 67,
            DK::F10 => 68,
            DK::F11 => 87,
            DK::F12 => 88,
            DK::F13 => 183,
            DK::F14 => 184,
            DK::F15 => 185,
            DK::F16 => 186,
            DK::F17 => 187,
            DK::F18 => 188,
            DK::F19 => 189,
            DK::F20 => 190,
            DK::RControl => 97,
            DK::RAlt => 100,
            DK::Home => 102,
            DK::Up => 103,
            DK::PageUp => 104,
            DK::Left => 105,
            DK::Right => 106,
            DK::End => 107,
            DK::Down => 108,
            DK::PageDown => 109,
            DK::Insert => 110,
            DK::Delete => 111,
            DK::LMeta | DK::Command => 125,
            DK::RMeta => 126,
            DK::LOption => 56,
            DK::ROption => 100,
            // Numpad keys
            DK::Numpad0 => 82,
            DK::Numpad1 => 79,
            DK::Numpad2 => 80,
            DK::Numpad3 => 81,
            DK::Numpad4 => 75,
            DK::Numpad5 => 76,
            DK::Numpad6 => 77,
            DK::Numpad7 => 71,
            DK::Numpad8 => 72,
            DK::Numpad9 => 73,
            DK::NumpadSubtract => 74,
            DK::NumpadAdd => 78,
            DK::NumpadDivide => 98,
            DK::NumpadMultiply => 55,
            DK::NumpadDecimal => 83,
            DK::NumpadEnter => 96,
            DK::NumpadEquals => 117,
        };
        Self(code)
    }
}

/// Information about a key
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Display name for the key
    pub name: &'static str,
}

impl KeyInfo {
    const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

const EXTENDED_F_KEYS: [&str; 8] = ["F13", "F14", "F15", "F16", "F17", "F18", "F19", "F20"];

/// Static keymap for standard US keyboard layout
pub static KEYMAP: LazyLock<HashMap<KeyCode, KeyInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    map.insert(KeyCode(1), KeyInfo::new("Escape"));

    // Function row
    map.insert(KeyCode(59), KeyInfo::new("F1"));
    map.insert(KeyCode(60), KeyInfo::new("F2"));
    map.insert(KeyCode(61), KeyInfo::new("F3"));
    map.insert(KeyCode(62), KeyInfo::new("F4"));
    map.insert(KeyCode(63), KeyInfo::new("F5"));
    map.insert(KeyCode(64), KeyInfo::new("F6"));
    map.insert(KeyCode(65), KeyInfo::new("F7"));
    map.insert(KeyCode(66), KeyInfo::new("F8"));
    map.insert(KeyCode(67), KeyInfo::new("F9"));
    map.insert(KeyCode(68), KeyInfo::new("F10"));
    map.insert(KeyCode(87), KeyInfo::new("F11"));
    map.insert(KeyCode(88), KeyInfo::new("F12"));
    for (code, name) in (183..=190).zip(EXTENDED_F_KEYS) {
        map.insert(KeyCode(code), KeyInfo::new(name));
    }

    // Number row
    map.insert(KeyCode(41), KeyInfo::new("Grave"));
    map.insert(KeyCode(2), KeyInfo::new("1"));
    map.insert(KeyCode(3), KeyInfo::new("2"));
    map.insert(KeyCode(4), KeyInfo::new("3"));
    map.insert(KeyCode(5), KeyInfo::new("4"));
    map.insert(KeyCode(6), KeyInfo::new("5"));
    map.insert(KeyCode(7), KeyInfo::new("6"));
    map.insert(KeyCode(8), KeyInfo::new("7"));
    map.insert(KeyCode(9), KeyInfo::new("8"));
    map.insert(KeyCode(10), KeyInfo::new("9"));
    map.insert(KeyCode(11), KeyInfo::new("0"));
    map.insert(KeyCode(12), KeyInfo::new("Minus"));
    map.insert(KeyCode(13), KeyInfo::new("Equals"));
    map.insert(KeyCode(14), KeyInfo::new("Backspace"));

    // Top letter row
    map.insert(KeyCode(15), KeyInfo::new("Tab"));
    map.insert(KeyCode(16), KeyInfo::new("Q"));
    map.insert(KeyCode(17), KeyInfo::new("W"));
    map.insert(KeyCode(18), KeyInfo::new("E"));
    map.insert(KeyCode(19), KeyInfo::new("R"));
    map.insert(KeyCode(20), KeyInfo::new("T"));
    map.insert(KeyCode(21), KeyInfo::new("Y"));
    map.insert(KeyCode(22), KeyInfo::new("U"));
    map.insert(KeyCode(23), KeyInfo::new("I"));
    map.insert(KeyCode(24), KeyInfo::new("O"));
    map.insert(KeyCode(25), KeyInfo::new("P"));
    map.insert(KeyCode(26), KeyInfo::new("LeftBracket"));
    map.insert(KeyCode(27), KeyInfo::new("RightBracket"));
    map.insert(KeyCode(43), KeyInfo::new("Backslash"));

    // Home row
    map.insert(KeyCode(58), KeyInfo::new("CapsLock"));
    map.insert(KeyCode(30), KeyInfo::new("A"));
    map.insert(KeyCode(31), KeyInfo::new("S"));
    map.insert(KeyCode(32), KeyInfo::new("D"));
    map.insert(KeyCode(33), KeyInfo::new("F"));
    map.insert(KeyCode(34), KeyInfo::new("G"));
    map.insert(KeyCode(35), KeyInfo::new("H"));
    map.insert(KeyCode(36), KeyInfo::new("J"));
    map.insert(KeyCode(37), KeyInfo::new("K"));
    map.insert(KeyCode(38), KeyInfo::new("L"));
    map.insert(KeyCode(39), KeyInfo::new("Semicolon"));
    map.insert(KeyCode(40), KeyInfo::new("Apostrophe"));
    map.insert(KeyCode(28), KeyInfo::new("Enter"));

    // Bottom letter row
    map.insert(KeyCode(42), KeyInfo::new("LeftShift"));
    map.insert(KeyCode(44), KeyInfo::new("Z"));
    map.insert(KeyCode(45), KeyInfo::new("X"));
    map.insert(KeyCode(46), KeyInfo::new("C"));
    map.insert(KeyCode(47), KeyInfo::new("V"));
    map.insert(KeyCode(48), KeyInfo::new("B"));
    map.insert(KeyCode(49), KeyInfo::new("N"));
    map.insert(KeyCode(50), KeyInfo::new("M"));
    map.insert(KeyCode(51), KeyInfo::new("Comma"));
    map.insert(KeyCode(52), KeyInfo::new("Period"));
    map.insert(KeyCode(53), KeyInfo::new("Slash"));
    map.insert(KeyCode(54), KeyInfo::new("RightShift"));

    // Bottom row (modifiers + space)
    map.insert(KeyCode(29), KeyInfo::new("LeftCtrl"));
    map.insert(KeyCode(125), KeyInfo::new("LeftMeta"));
    map.insert(KeyCode(56), KeyInfo::new("LeftAlt"));
    map.insert(KeyCode(57), KeyInfo::new("Space"));
    map.insert(KeyCode(100), KeyInfo::new("RightAlt"));
    map.insert(KeyCode(126), KeyInfo::new("RightMeta"));
    map.insert(KeyCode(97), KeyInfo::new("RightCtrl"));
    map.insert(KeyCode(96), KeyInfo::new("KeypadEnter"));

    // Arrows and navigation
    map.insert(KeyCode(103), KeyInfo::new("Up"));
    map.insert(KeyCode(105), KeyInfo::new("Left"));
    map.insert(KeyCode(108), KeyInfo::new("Down"));
    map.insert(KeyCode(106), KeyInfo::new("Right"));
    map.insert(KeyCode(110), KeyInfo::new("Insert"));
    map.insert(KeyCode(102), KeyInfo::new("Home"));
    map.insert(KeyCode(104), KeyInfo::new("PageUp"));
    map.insert(KeyCode(111), KeyInfo::new("Delete"));
    map.insert(KeyCode(107), KeyInfo::new("End"));
    map.insert(KeyCode(109), KeyInfo::new("PageDown"));

    // Numpad
    map.insert(KeyCode(82), KeyInfo::new("Keypad0"));
    map.insert(KeyCode(79), KeyInfo::new("Keypad1"));
    map.insert(KeyCode(80), KeyInfo::new("Keypad2"));
    map.insert(KeyCode(81), KeyInfo::new("Keypad3"));
    map.insert(KeyCode(75), KeyInfo::new("Keypad4"));
    map.insert(KeyCode(76), KeyInfo::new("Keypad5"));
    map.insert(KeyCode(77), KeyInfo::new("Keypad6"));
    map.insert(KeyCode(71), KeyInfo::new("Keypad7"));
    map.insert(KeyCode(72), KeyInfo::new("Keypad8"));
    map.insert(KeyCode(73), KeyInfo::new("Keypad9"));
    map.insert(KeyCode(74), KeyInfo::new("KeypadMinus"));
    map.insert(KeyCode(78), KeyInfo::new("KeypadPlus"));
    map.insert(KeyCode(98), KeyInfo::new("KeypadSlash"));
    map.insert(KeyCode(55), KeyInfo::new("KeypadAsterisk"));
    map.insert(KeyCode(83), KeyInfo::new("KeypadDot"));
    map.insert(KeyCode(117), KeyInfo::new("KeypadEqual"));

    map
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_use_keymap_name() {
        assert_eq!(KeyCode(20).name(), "T");
        assert_eq!(KeyCode(57).name(), "Space");
    }

    #[test]
    fn unknown_codes_stay_distinct() {
        assert_eq!(KeyCode(240).name(), "Key240");
        assert_ne!(KeyCode(240).name(), KeyCode(241).name());
    }

    #[test]
    fn shifted_chars_resolve_to_base_key() {
        assert_eq!(KeyCode::from_char('t'), KeyCode::from_char('T'));
        assert_eq!(KeyCode::from_char('!'), Some(KeyCode(2)));
        assert_eq!(KeyCode::from_char(' '), Some(KeyCode(57)));
        assert_eq!(KeyCode::from_char('é'), None);
    }

    #[test]
    fn device_query_keys_stay_distinct() {
        use device_query::Keycode as DK;

        assert!(KeyCode::from(DK::NumpadEnter).is_terminator());
        assert_ne!(KeyCode::from(DK::F1), KeyCode::from(DK::F2));
        assert_ne!(KeyCode::from(DK::Numpad1), KeyCode::from(DK::Numpad2));
        assert_eq!(KeyCode::from(DK::F13).name(), "F13");
        assert_eq!(KeyCode::from(DK::Numpad1).name(), "Keypad1");

        let keys = [
            DK::F1, DK::F12, DK::F20, DK::Numpad0, DK::Numpad9, DK::NumpadAdd,
            DK::NumpadDecimal, DK::NumpadEquals, DK::NumpadEnter, DK::Escape, DK::Space,
        ];
        let codes: std::collections::HashSet<KeyCode> =
            keys.iter().map(|&k| KeyCode::from(k)).collect();
        assert_eq!(codes.len(), keys.len());
        assert!(codes.iter().all(|code| KEYMAP.contains_key(code)));
    }

    #[test]
    fn terminators() {
        assert!(KeyCode::ENTER.is_terminator());
        assert!(KeyCode::KEYPAD_ENTER.is_terminator());
        assert!(!KeyCode(20).is_terminator());
    }
}
