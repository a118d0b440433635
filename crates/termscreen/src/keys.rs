#![forbid(unsafe_code)]

//! Runtime key tables.
//!
//! Special keys report terminal-specific byte sequences. At session start
//! the sequences the terminal describes are turned into two ordered tables
//! that an input decoder scans: one mapping to line-edit actions and one to
//! pager commands.
//!
//! # Ordering
//!
//! Tables are scanned front to back and the first entry that can still match
//! decides. Two rules fix the order:
//!
//! 1. A sequence is placed ahead of every already registered sequence that
//!    is a strict prefix of it, so `ESC [ A` is seen before a bare `ESC`.
//! 2. Otherwise entries keep registration order; when the same sequence is
//!    registered twice the first registration wins.
//!
//! # Edit-table entries
//!
//! | Key | Capability | Entries |
//! |-----|------------|---------|
//! | right | `kr` | Right, ESC+seq WordRight |
//! | left | `kl` | Left, ESC+seq WordLeft |
//! | up / down | `ku` / `kd` | Up / Down |
//! | home / end | `kh` / `@7` | Home / End |
//! | delete | `kD`, else DEL | Delete, ESC+seq WordDelete |
//! | backspace | erase char | ESC+erase WordBackspace |
//! | word erase | werase char | WordBackspace |
//! | shift-tab / tab | `kB` / `\t` | BackComplete / ForwardComplete |

use crate::capabilities::{CapSource, KeyStrings, TerminalCapabilities};
use crate::tty::EditChars;

const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

/// Line-editing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditAction {
    Right,
    Left,
    WordRight,
    WordLeft,
    Up,
    Down,
    Home,
    End,
    Insert,
    Delete,
    WordDelete,
    WordBackspace,
    ForwardComplete,
    BackComplete,
    Expand,
}

/// Pager commands bound to special keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandAction {
    ForwardLine,
    BackLine,
    ForwardScreen,
    BackScreen,
    RightShift,
    LeftShift,
    GotoLine,
    GotoEnd,
    Help,
    Examine,
}

/// Result of looking a partial or complete input sequence up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch<A> {
    /// The input is a complete sequence.
    Action(A),
    /// The input starts a longer sequence; read more.
    Prefix,
    /// Nothing in the table starts with the input.
    NoMatch,
}

/// Ordered sequence-to-action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable<A> {
    entries: Vec<(Vec<u8>, A)>,
}

impl<A> Default for KeyTable<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: Copy> KeyTable<A> {
    /// Start an empty table.
    #[must_use]
    pub fn builder() -> KeyTableBuilder<A> {
        KeyTableBuilder {
            table: Self::default(),
        }
    }

    /// Scan for `input`. The first entry that starts with `input` decides.
    #[must_use]
    pub fn lookup(&self, input: &[u8]) -> KeyMatch<A> {
        self.entries
            .iter()
            .find(|(seq, _)| seq.starts_with(input))
            .map_or(KeyMatch::NoMatch, |(seq, action)| {
                if seq.len() == input.len() {
                    KeyMatch::Action(*action)
                } else {
                    KeyMatch::Prefix
                }
            })
    }

    /// Entries in scan order.
    pub fn entries(&self) -> impl Iterator<Item = (&[u8], A)> + '_ {
        self.entries.iter().map(|(seq, a)| (seq.as_slice(), *a))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder enforcing the table ordering rules.
#[derive(Debug)]
pub struct KeyTableBuilder<A> {
    table: KeyTable<A>,
}

impl<A: Copy> KeyTableBuilder<A> {
    /// Register `seq`. Empty sequences are ignored.
    pub fn push(&mut self, seq: &[u8], action: A) -> &mut Self {
        if seq.is_empty() {
            return self;
        }
        let entries = &mut self.table.entries;
        let at = entries
            .iter()
            .position(|(existing, _)| existing.len() < seq.len() && seq.starts_with(existing))
            .unwrap_or(entries.len());
        entries.insert(at, (seq.to_vec(), action));
        self
    }

    /// Register ESC followed by `seq`.
    pub fn push_escaped(&mut self, seq: &[u8], action: A) -> &mut Self {
        if seq.is_empty() {
            return self;
        }
        let mut escaped = Vec::with_capacity(seq.len() + 1);
        escaped.push(ESC);
        escaped.extend_from_slice(seq);
        self.push(&escaped, action)
    }

    #[must_use]
    pub fn build(self) -> KeyTable<A> {
        self.table
    }
}

/// The line-edit and command tables for one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyTables {
    pub edit: KeyTable<EditAction>,
    pub command: KeyTable<CommandAction>,
}

/// Build tables from the key strings a terminal reports and the user's
/// edit characters.
#[must_use]
pub fn build_key_tables(keys: &KeyStrings, chars: &EditChars) -> KeyTables {
    let mut edit = KeyTable::builder();
    let mut command = KeyTable::builder();

    if let Some(s) = &keys.right {
        edit.push(s, EditAction::Right)
            .push_escaped(s, EditAction::WordRight);
        command.push(s, CommandAction::RightShift);
    }
    if let Some(s) = &keys.left {
        edit.push(s, EditAction::Left)
            .push_escaped(s, EditAction::WordLeft);
        command.push(s, CommandAction::LeftShift);
    }
    if let Some(s) = &keys.up {
        edit.push(s, EditAction::Up);
        command.push(s, CommandAction::BackLine);
    }
    if let Some(s) = &keys.down {
        edit.push(s, EditAction::Down);
        command.push(s, CommandAction::ForwardLine);
    }
    if let Some(s) = &keys.page_up {
        command.push(s, CommandAction::BackScreen);
    }
    if let Some(s) = &keys.page_down {
        command.push(s, CommandAction::ForwardScreen);
    }
    if let Some(s) = &keys.home {
        edit.push(s, EditAction::Home);
    }
    if let Some(s) = &keys.end {
        edit.push(s, EditAction::End);
    }

    let delete = keys.delete.as_deref().unwrap_or(&[DEL]);
    edit.push(delete, EditAction::Delete)
        .push_escaped(delete, EditAction::WordDelete);

    edit.push(&[ESC, chars.erase], EditAction::WordBackspace);
    if chars.werase != 0 {
        edit.push(&[chars.werase], EditAction::WordBackspace);
    }

    if let Some(s) = &keys.back_tab {
        edit.push(s, EditAction::BackComplete);
    }
    edit.push(b"\t", EditAction::ForwardComplete);

    let tables = KeyTables {
        edit: edit.build(),
        command: command.build(),
    };
    tracing::debug!(
        edit_entries = tables.edit.len(),
        command_entries = tables.command.len(),
        "key tables built"
    );
    tables
}

/// PC console scan codes, reported after a 0xE0 lead byte.
mod scan {
    pub const LEAD: u8 = 0xE0;
    pub const SHIFT_TAB: u8 = 0x0F;
    pub const ALT_E: u8 = 0x12;
    pub const F1: u8 = 0x3B;
    pub const HOME: u8 = 0x47;
    pub const UP: u8 = 0x48;
    pub const PAGE_UP: u8 = 0x49;
    pub const LEFT: u8 = 0x4B;
    pub const RIGHT: u8 = 0x4D;
    pub const END: u8 = 0x4F;
    pub const DOWN: u8 = 0x50;
    pub const PAGE_DOWN: u8 = 0x51;
    pub const INSERT: u8 = 0x52;
    pub const DELETE: u8 = 0x53;
    pub const CTL_LEFT: u8 = 0x73;
    pub const CTL_RIGHT: u8 = 0x74;
    pub const CTL_DELETE: u8 = 0x93;
}

impl KeyTables {
    /// Fixed tables for the PC console, whose special keys always report a
    /// 0xE0 lead byte and a scan code.
    #[must_use]
    pub fn pc_console() -> Self {
        let pc = |code: u8| [scan::LEAD, code];

        let mut edit = KeyTable::builder();
        edit.push(&pc(scan::RIGHT), EditAction::Right)
            .push(&pc(scan::LEFT), EditAction::Left)
            .push(&pc(scan::CTL_RIGHT), EditAction::WordRight)
            .push(&pc(scan::CTL_LEFT), EditAction::WordLeft)
            .push(&pc(scan::INSERT), EditAction::Insert)
            .push(&pc(scan::DELETE), EditAction::Delete)
            .push(&pc(scan::CTL_DELETE), EditAction::WordDelete)
            .push(&[DEL], EditAction::WordBackspace)
            .push(&pc(scan::HOME), EditAction::Home)
            .push(&pc(scan::END), EditAction::End)
            .push(&pc(scan::UP), EditAction::Up)
            .push(&pc(scan::DOWN), EditAction::Down)
            .push(b"\t", EditAction::ForwardComplete)
            .push(b"\x0f", EditAction::BackComplete)
            .push(&pc(scan::SHIFT_TAB), EditAction::BackComplete)
            .push(b"\x0c", EditAction::Expand);

        let mut command = KeyTable::builder();
        command
            .push(&pc(scan::DOWN), CommandAction::ForwardLine)
            .push(&pc(scan::PAGE_DOWN), CommandAction::ForwardScreen)
            .push(&pc(scan::UP), CommandAction::BackLine)
            .push(&pc(scan::PAGE_UP), CommandAction::BackScreen)
            .push(&pc(scan::RIGHT), CommandAction::RightShift)
            .push(&pc(scan::LEFT), CommandAction::LeftShift)
            .push(&pc(scan::HOME), CommandAction::GotoLine)
            .push(&pc(scan::END), CommandAction::GotoEnd)
            .push(&pc(scan::F1), CommandAction::Help)
            .push(&pc(scan::ALT_E), CommandAction::Examine);

        Self {
            edit: edit.build(),
            command: command.build(),
        }
    }

    /// Tables appropriate for a resolved terminal.
    #[must_use]
    pub fn for_terminal(caps: &TerminalCapabilities, chars: &EditChars) -> Self {
        if caps.source == CapSource::Console {
            Self::pc_console()
        } else {
            build_key_tables(&caps.keys, chars)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xterm_keys() -> KeyStrings {
        KeyStrings {
            right: Some(b"\x1bOC".to_vec()),
            left: Some(b"\x1bOD".to_vec()),
            up: Some(b"\x1bOA".to_vec()),
            down: Some(b"\x1bOB".to_vec()),
            page_up: Some(b"\x1b[5~".to_vec()),
            page_down: Some(b"\x1b[6~".to_vec()),
            home: Some(b"\x1bOH".to_vec()),
            end: Some(b"\x1bOF".to_vec()),
            delete: Some(b"\x1b[3~".to_vec()),
            back_tab: Some(b"\x1b[Z".to_vec()),
        }
    }

    fn chars() -> EditChars {
        EditChars {
            erase: 0x7f,
            kill: 0x15,
            werase: 0x17,
        }
    }

    #[test]
    fn up_arrow_resolves_exactly() {
        let keys = KeyStrings {
            up: Some(b"\x1b[A".to_vec()),
            ..Default::default()
        };
        let tables = build_key_tables(&keys, &chars());
        assert_eq!(tables.edit.lookup(b"\x1b[A"), KeyMatch::Action(EditAction::Up));
        assert_eq!(
            tables.command.lookup(b"\x1b[A"),
            KeyMatch::Action(CommandAction::BackLine)
        );
    }

    #[test]
    fn partial_sequences_ask_for_more() {
        let tables = build_key_tables(&xterm_keys(), &chars());
        assert_eq!(tables.edit.lookup(b"\x1bO"), KeyMatch::Prefix);
        assert_eq!(tables.command.lookup(b"\x1b[6"), KeyMatch::Prefix);
        assert_eq!(tables.edit.lookup(b"q"), KeyMatch::NoMatch);
    }

    #[test]
    fn word_motion_entries() {
        let tables = build_key_tables(&xterm_keys(), &chars());
        assert_eq!(
            tables.edit.lookup(b"\x1b\x1bOC"),
            KeyMatch::Action(EditAction::WordRight)
        );
        assert_eq!(
            tables.edit.lookup(b"\x1b\x1b[3~"),
            KeyMatch::Action(EditAction::WordDelete)
        );
        assert_eq!(
            tables.edit.lookup(b"\x1b\x7f"),
            KeyMatch::Action(EditAction::WordBackspace)
        );
        assert_eq!(
            tables.edit.lookup(b"\x17"),
            KeyMatch::Action(EditAction::WordBackspace)
        );
        assert_eq!(
            tables.edit.lookup(b"\x1b[Z"),
            KeyMatch::Action(EditAction::BackComplete)
        );
        assert_eq!(
            tables.edit.lookup(b"\t"),
            KeyMatch::Action(EditAction::ForwardComplete)
        );
    }

    #[test]
    fn undefined_keys_are_skipped() {
        let tables = build_key_tables(&KeyStrings::default(), &chars());
        assert!(tables.command.is_empty());
        // DEL fallback for delete, ESC+DEL for both word delete and word
        // backspace, ^W, tab.
        assert_eq!(tables.edit.lookup(b"\x7f"), KeyMatch::Action(EditAction::Delete));
        assert_eq!(
            tables.edit.lookup(b"\x1b\x7f"),
            KeyMatch::Action(EditAction::WordDelete)
        );
    }

    #[test]
    fn zero_werase_adds_nothing() {
        let no_werase = EditChars {
            werase: 0,
            ..chars()
        };
        let with = build_key_tables(&KeyStrings::default(), &chars());
        let without = build_key_tables(&KeyStrings::default(), &no_werase);
        assert_eq!(with.edit.len(), without.edit.len() + 1);
    }

    #[test]
    fn longer_sequence_moves_ahead_of_its_prefix() {
        let mut b = KeyTable::builder();
        b.push(b"\x1b", 1).push(b"x", 2).push(b"\x1b[A", 3);
        let table = b.build();
        let order: Vec<_> = table.entries().map(|(_, a)| a).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(table.lookup(b"\x1b"), KeyMatch::Prefix);
        assert_eq!(table.lookup(b"\x1b[A"), KeyMatch::Action(3));
    }

    #[test]
    fn first_registration_wins() {
        let mut b = KeyTable::builder();
        b.push(b"\x1b[H", "home").push(b"\x1b[H", "other");
        assert_eq!(b.build().lookup(b"\x1b[H"), KeyMatch::Action("home"));
    }

    #[test]
    fn overlapping_terminal_keys() {
        // A terminal whose delete key is a bare ESC-prefixed sequence that
        // other keys extend.
        let keys = KeyStrings {
            delete: Some(b"\x1b[".to_vec()),
            right: Some(b"\x1b[C".to_vec()),
            ..Default::default()
        };
        let tables = build_key_tables(&keys, &chars());
        assert_eq!(tables.edit.lookup(b"\x1b[C"), KeyMatch::Action(EditAction::Right));
        // The shorter sequence is shadowed while more input may follow.
        assert_eq!(tables.edit.lookup(b"\x1b["), KeyMatch::Prefix);
    }

    #[test]
    fn pc_console_tables() {
        let tables = KeyTables::pc_console();
        assert_eq!(
            tables.command.lookup(&[0xE0, 0x3B]),
            KeyMatch::Action(CommandAction::Help)
        );
        assert_eq!(
            tables.command.lookup(&[0xE0, 0x12]),
            KeyMatch::Action(CommandAction::Examine)
        );
        assert_eq!(
            tables.edit.lookup(&[0xE0, 0x74]),
            KeyMatch::Action(EditAction::WordRight)
        );
        assert_eq!(tables.edit.lookup(&[0xE0]), KeyMatch::Prefix);
        assert_eq!(
            tables.edit.lookup(b"\x0c"),
            KeyMatch::Action(EditAction::Expand)
        );
    }
}
