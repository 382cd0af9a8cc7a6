/// Host-independent key press. The host binary maps terminal events onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    Other,
}

/// Up up down down left right left right b a.
pub const ALTERNATE_SEQUENCE: [Key; 10] = [
    Key::Up,
    Key::Up,
    Key::Down,
    Key::Down,
    Key::Left,
    Key::Right,
    Key::Left,
    Key::Right,
    Key::Char('b'),
    Key::Char('a'),
];

/// Keys with their own meaning during the intro; they leave sequence progress alone.
pub const SEQUENCE_PASSTHROUGH: [Key; 3] = [Key::Char('?'), Key::Char('s'), Key::Char('S')];

/// Exact, case-sensitive ordered-sequence matcher. A wrong key drops progress
/// back to zero unless it is one of the passthrough keys.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    pattern: Vec<Key>,
    passthrough: Vec<Key>,
    progress: usize,
}

impl SequenceMatcher {
    pub fn new(pattern: &[Key]) -> Self {
        Self {
            pattern: pattern.to_vec(),
            passthrough: Vec::new(),
            progress: 0,
        }
    }

    pub fn with_passthrough(mut self, keys: &[Key]) -> Self {
        self.passthrough = keys.to_vec();
        self
    }

    pub fn alternate() -> Self {
        Self::new(&ALTERNATE_SEQUENCE).with_passthrough(&SEQUENCE_PASSTHROUGH)
    }

    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn reset(&mut self) {
        self.progress = 0;
    }

    /// Feeds one key; returns true when it completes the sequence.
    pub fn feed(&mut self, key: Key) -> bool {
        let Some(expected) = self.pattern.get(self.progress).copied() else {
            return false;
        };

        if expected == key {
            self.progress += 1;
        } else if !self.passthrough.contains(&key) {
            self.progress = 0;
        }

        if self.progress == self.pattern.len() {
            self.progress = 0;
            return true;
        }
        false
    }
}
