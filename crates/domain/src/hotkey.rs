use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const DEFAULT_HOTKEY: &str = "ctrl+alt+o";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    fn parse(part: &str) -> Option<Self> {
        match part {
            "ctrl" | "control" => Some(Self::Ctrl),
            "alt" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKey {
    /// Lowercase ASCII letter.
    Letter(char),
    Digit(u8),
    /// F1..=F12.
    Function(u8),
}

impl BaseKey {
    fn parse(part: &str) -> Option<Self> {
        let mut chars = part.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_lowercase() => return Some(Self::Letter(ch)),
            (Some(ch), None) if ch.is_ascii_digit() => {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
            _ => {}
        }
        let number: u8 = part.strip_prefix('f')?.parse().ok()?;
        (1..=12).contains(&number).then_some(Self::Function(number))
    }
}

impl Display for BaseKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Letter(ch) => write!(f, "{ch}"),
            Self::Digit(digit) => write!(f, "{digit}"),
            Self::Function(number) => write!(f, "f{number}"),
        }
    }
}

/// A validated global shortcut such as `ctrl+alt+o`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HotkeyCombo {
    modifiers: Vec<Modifier>,
    key: BaseKey,
}

impl HotkeyCombo {
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn key(&self) -> BaseKey {
        self.key
    }
}

impl Default for HotkeyCombo {
    fn default() -> Self {
        Self {
            modifiers: vec![Modifier::Ctrl, Modifier::Alt],
            key: BaseKey::Letter('o'),
        }
    }
}

impl FromStr for HotkeyCombo {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Vec::new();
        let mut key = None;
        for raw in value.split('+') {
            let part = raw.trim().to_ascii_lowercase();
            if part.is_empty() {
                return Err(DomainError::InvalidHotkey(format!("empty part in {value:?}")));
            }
            if let Some(modifier) = Modifier::parse(&part) {
                if modifiers.contains(&modifier) {
                    return Err(DomainError::InvalidHotkey(format!(
                        "modifier {} repeated",
                        modifier.as_str()
                    )));
                }
                modifiers.push(modifier);
                continue;
            }
            let base = BaseKey::parse(&part)
                .ok_or_else(|| DomainError::InvalidHotkey(format!("unknown key {part:?}")))?;
            if key.replace(base).is_some() {
                return Err(DomainError::InvalidHotkey(
                    "exactly one non-modifier key is allowed".to_string(),
                ));
            }
        }
        let key = key.ok_or_else(|| {
            DomainError::InvalidHotkey(format!("{value:?} has no non-modifier key"))
        })?;
        modifiers.sort();
        Ok(Self { modifiers, key })
    }
}

impl Display for HotkeyCombo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        write!(f, "{}", self.key)
    }
}

impl TryFrom<String> for HotkeyCombo {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HotkeyCombo> for String {
    fn from(value: HotkeyCombo) -> Self {
        value.to_string()
    }
}
