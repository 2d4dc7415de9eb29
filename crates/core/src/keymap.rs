use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use markzen_settings::Layout;

use crate::store::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Function(u8),
    Escape,
}

/// 按鍵組合；字元一律以小寫比對。 / A key with modifiers; characters compare lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            key: normalize(key),
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(ch: char) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(Key::Char(ch))
        }
    }

    pub fn ctrl_shift(ch: char) -> Self {
        Self {
            shift: true,
            ..Self::ctrl(ch)
        }
    }

    pub fn ctrl_alt(ch: char) -> Self {
        Self {
            alt: true,
            ..Self::ctrl(ch)
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        match self.key {
            Key::Char(ch) => write!(f, "{}", ch.to_ascii_uppercase()),
            Key::Function(n) => write!(f, "F{n}"),
            Key::Escape => f.write_str("Escape"),
        }
    }
}

fn normalize(key: Key) -> Key {
    match key {
        Key::Char(ch) => Key::Char(ch.to_ascii_lowercase()),
        other => other,
    }
}

/// 需要檔案協作者的動作。 / Actions that go through the file session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    New,
    Open,
    /// 開啟最近使用清單中的檔案。 / Opens an entry from the recent-files list.
    OpenRecent(PathBuf),
    Save,
    SaveAs,
    ExportHtml,
    OpenFolder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Store(Command),
    File(FileAction),
}

/// 快捷鍵對照表。 / Shortcut table.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<KeyChord, Action>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keymap = Self::empty();
        keymap.bind(KeyChord::ctrl('n'), Action::File(FileAction::New));
        keymap.bind(KeyChord::ctrl('o'), Action::File(FileAction::Open));
        keymap.bind(KeyChord::ctrl('s'), Action::File(FileAction::Save));
        keymap.bind(KeyChord::ctrl_shift('s'), Action::File(FileAction::SaveAs));
        keymap.bind(KeyChord::ctrl_shift('e'), Action::File(FileAction::ExportHtml));
        keymap.bind(KeyChord::ctrl('1'), Action::Store(Command::SetLayout(Layout::Editor)));
        keymap.bind(KeyChord::ctrl('2'), Action::Store(Command::SetLayout(Layout::Split)));
        keymap.bind(KeyChord::ctrl('3'), Action::Store(Command::SetLayout(Layout::Preview)));
        keymap.bind(KeyChord::ctrl('/'), Action::Store(Command::CycleLayout));
        keymap.bind(KeyChord::ctrl('\\'), Action::Store(Command::ToggleSidebar));
        keymap.bind(KeyChord::ctrl_alt('t'), Action::Store(Command::NextTheme));
        keymap.bind(
            KeyChord::plain(Key::Function(11)),
            Action::Store(Command::ToggleFocusMode),
        );
        keymap.bind(
            KeyChord::plain(Key::Function(12)),
            Action::Store(Command::ToggleTypewriterMode),
        );
        keymap.bind(
            KeyChord::plain(Key::Escape),
            Action::Store(Command::ExitFocusMode),
        );
        keymap
    }
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// 綁定快捷鍵，回傳被取代的動作。 / Binds a chord, returning the action it replaced.
    pub fn bind(&mut self, chord: KeyChord, action: Action) -> Option<Action> {
        let chord = KeyChord {
            key: normalize(chord.key),
            ..chord
        };
        self.bindings.insert(chord, action)
    }

    pub fn unbind(&mut self, chord: &KeyChord) -> Option<Action> {
        self.bindings.remove(chord)
    }

    pub fn resolve(&self, chord: &KeyChord) -> Option<&Action> {
        let chord = KeyChord {
            key: normalize(chord.key),
            ..*chord
        };
        self.bindings.get(&chord)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
