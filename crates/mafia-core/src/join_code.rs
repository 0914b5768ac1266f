//! Join codes: short, shareable session identifiers.
//!
//! A code is a four-letter prefix (`TEST` or `GAME`) followed by
//! [`SUFFIX_LEN`] uppercase base-36 characters, e.g. `GAME7K`. Codes are not
//! checked against existing sessions, so two sessions may share one.

use rand::RngExt;

/// Number of random characters after the prefix.
pub const SUFFIX_LEN: usize = 2;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Whether a session is a local test game or a standard one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinCodeKind {
    Test,
    Standard,
}

impl JoinCodeKind {
    pub fn prefix(self) -> &'static str {
        match self {
            JoinCodeKind::Test => "TEST",
            JoinCodeKind::Standard => "GAME",
        }
    }

    /// Classify an existing code by its prefix. Anything not starting with
    /// `TEST` is treated as a standard game.
    pub fn of(code: &str) -> Self {
        if code.starts_with(JoinCodeKind::Test.prefix()) {
            JoinCodeKind::Test
        } else {
            JoinCodeKind::Standard
        }
    }
}

/// Generate a join code using the thread-local RNG.
pub fn generate_join_code(kind: JoinCodeKind) -> String {
    generate_join_code_with(kind, &mut rand::rng())
}

/// Generate a join code from the given RNG.
pub fn generate_join_code_with<R: RngExt + ?Sized>(kind: JoinCodeKind, rng: &mut R) -> String {
    let mut code = String::with_capacity(kind.prefix().len() + SUFFIX_LEN);
    code.push_str(kind.prefix());
    for _ in 0..SUFFIX_LEN {
        let idx = rng.random_range(0..ALPHABET.len());
        code.push(ALPHABET[idx] as char);
    }
    code
}
