//! Hotkey chords: a modifier set plus one key symbol. The display driver is
//! expected to report generic modifiers, so there is no left/right split.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CONTROL = 0b0010;
        const ALT = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    pub fn insert_from_token(&mut self, token: &str) -> bool {
        match token.to_lowercase().as_str() {
            "shift" => {
                self.insert(Modifiers::SHIFT);
                true
            }
            "ctrl" | "control" => {
                self.insert(Modifiers::CONTROL);
                true
            }
            "alt" | "mod1" => {
                self.insert(Modifiers::ALT);
                true
            }
            "super" | "mod4" | "meta" | "win" => {
                self.insert(Modifiers::SUPER);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if self.contains(Modifiers::CONTROL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::SUPER) {
            parts.push("Super");
        }
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        write!(f, "{}", parts.join(" + "))
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Minus,
    Equal,
    Comma,
    Period,
    Slash,
    Semicolon,
    Quote,
    Backquote,
    Backslash,
    BracketLeft,
    BracketRight,
    Tab,
    Space,
    Enter,
    Escape,
    Backspace,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Home,
    End,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KeyCode::*;
        let s = match self {
            KeyA => "A",
            KeyB => "B",
            KeyC => "C",
            KeyD => "D",
            KeyE => "E",
            KeyF => "F",
            KeyG => "G",
            KeyH => "H",
            KeyI => "I",
            KeyJ => "J",
            KeyK => "K",
            KeyL => "L",
            KeyM => "M",
            KeyN => "N",
            KeyO => "O",
            KeyP => "P",
            KeyQ => "Q",
            KeyR => "R",
            KeyS => "S",
            KeyT => "T",
            KeyU => "U",
            KeyV => "V",
            KeyW => "W",
            KeyX => "X",
            KeyY => "Y",
            KeyZ => "Z",
            Digit0 => "0",
            Digit1 => "1",
            Digit2 => "2",
            Digit3 => "3",
            Digit4 => "4",
            Digit5 => "5",
            Digit6 => "6",
            Digit7 => "7",
            Digit8 => "8",
            Digit9 => "9",
            ArrowLeft => "Left",
            ArrowRight => "Right",
            ArrowUp => "Up",
            ArrowDown => "Down",
            Tab => "Tab",
            Space => "Space",
            Enter => "Return",
            Escape => "Escape",
            other => return write!(f, "{:?}", other),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for KeyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use KeyCode::*;
        match s.to_uppercase().as_str() {
            "A" => Ok(KeyA),
            "B" => Ok(KeyB),
            "C" => Ok(KeyC),
            "D" => Ok(KeyD),
            "E" => Ok(KeyE),
            "F" => Ok(KeyF),
            "G" => Ok(KeyG),
            "H" => Ok(KeyH),
            "I" => Ok(KeyI),
            "J" => Ok(KeyJ),
            "K" => Ok(KeyK),
            "L" => Ok(KeyL),
            "M" => Ok(KeyM),
            "N" => Ok(KeyN),
            "O" => Ok(KeyO),
            "P" => Ok(KeyP),
            "Q" => Ok(KeyQ),
            "R" => Ok(KeyR),
            "S" => Ok(KeyS),
            "T" => Ok(KeyT),
            "U" => Ok(KeyU),
            "V" => Ok(KeyV),
            "W" => Ok(KeyW),
            "X" => Ok(KeyX),
            "Y" => Ok(KeyY),
            "Z" => Ok(KeyZ),
            "0" => Ok(Digit0),
            "1" => Ok(Digit1),
            "2" => Ok(Digit2),
            "3" => Ok(Digit3),
            "4" => Ok(Digit4),
            "5" => Ok(Digit5),
            "6" => Ok(Digit6),
            "7" => Ok(Digit7),
            "8" => Ok(Digit8),
            "9" => Ok(Digit9),
            "-" | "MINUS" => Ok(Minus),
            "=" | "EQUAL" | "EQUALS" => Ok(Equal),
            "," | "COMMA" => Ok(Comma),
            "." | "DOT" | "PERIOD" => Ok(Period),
            "/" | "SLASH" => Ok(Slash),
            ";" | "SEMICOLON" => Ok(Semicolon),
            "'" | "QUOTE" | "APOSTROPHE" => Ok(Quote),
            "`" | "BACKQUOTE" | "GRAVE" => Ok(Backquote),
            "\\" | "BACKSLASH" => Ok(Backslash),
            "[" | "BRACKETLEFT" => Ok(BracketLeft),
            "]" | "BRACKETRIGHT" => Ok(BracketRight),
            "TAB" => Ok(Tab),
            "SPACE" => Ok(Space),
            "ENTER" | "RETURN" => Ok(Enter),
            "ESC" | "ESCAPE" => Ok(Escape),
            "BACKSPACE" => Ok(Backspace),
            "LEFT" | "ARROWLEFT" => Ok(ArrowLeft),
            "RIGHT" | "ARROWRIGHT" => Ok(ArrowRight),
            "UP" | "ARROWUP" => Ok(ArrowUp),
            "DOWN" | "ARROWDOWN" => Ok(ArrowDown),
            "PAGEUP" => Ok(PageUp),
            "PAGEDOWN" => Ok(PageDown),
            "HOME" => Ok(Home),
            "END" => Ok(End),
            "F1" => Ok(F1),
            "F2" => Ok(F2),
            "F3" => Ok(F3),
            "F4" => Ok(F4),
            "F5" => Ok(F5),
            "F6" => Ok(F6),
            "F7" => Ok(F7),
            "F8" => Ok(F8),
            "F9" => Ok(F9),
            "F10" => Ok(F10),
            "F11" => Ok(F11),
            "F12" => Ok(F12),
            other => Err(anyhow!("Unrecognized key token: {}", other)),
        }
    }
}

/// Mouse buttons used by drag bindings.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl FromStr for Button {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "button1" | "left" => Ok(Button::Left),
            "button2" | "middle" => Ok(Button::Middle),
            "button3" | "right" => Ok(Button::Right),
            other => Err(anyhow!("Unrecognized button token: {}", other)),
        }
    }
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self {
        Self { modifiers, key_code }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
        let mut mods = Modifiers::empty();
        let mut key: Option<KeyCode> = None;
        for part in parts {
            if mods.insert_from_token(part) {
                continue;
            }
            if key.is_some() {
                return Err(anyhow!("Multiple keys in hotkey: {}", s));
            }
            key = Some(KeyCode::from_str(part)?);
        }
        let key_code = key.ok_or_else(|| anyhow!("No key specified in hotkey: {}", s))?;
        Ok(Hotkey::new(mods, key_code))
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Hotkey, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum HotkeyRepr {
            Str(String),
            Map {
                modifiers: Modifiers,
                key_code: KeyCode,
            },
        }

        let repr = HotkeyRepr::deserialize(deserializer)?;
        match repr {
            HotkeyRepr::Str(s) => Hotkey::from_str(&s).map_err(serde::de::Error::custom),
            HotkeyRepr::Map { modifiers, key_code } => Ok(Hotkey::new(modifiers, key_code)),
        }
    }
}

/// A drag chord: modifiers plus a mouse button.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DragChord {
    pub modifiers: Modifiers,
    pub button: Button,
}

impl FromStr for DragChord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
        let mut mods = Modifiers::empty();
        let mut button: Option<Button> = None;
        for part in parts {
            if mods.insert_from_token(part) {
                continue;
            }
            button = Some(Button::from_str(part)?);
        }
        let button = button.ok_or_else(|| anyhow!("No button specified in chord: {}", s))?;
        Ok(DragChord { modifiers: mods, button })
    }
}

impl<'de> Deserialize<'de> for DragChord {
    fn deserialize<D>(deserializer: D) -> Result<DragChord, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DragChord::from_str(&s).map_err(serde::de::Error::custom)
    }
}
