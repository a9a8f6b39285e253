//! Key identity anonymization
//!
//! Raw key names are replaced by `hex(SHA-256(salt || name))` before any
//! metric is computed. The salt is drawn from the OS CSPRNG once per process
//! and is never serialized or printed, so hashes cannot be correlated across
//! sessions. Storing raw names requires a [`RawCharsConsent`] token, which
//! only an explicit confirmation can produce.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the session salt in bytes
pub const SALT_LEN: usize = 32;

/// Phrase the user must type to allow raw key names in reports
pub const CONSENT_PHRASE: &str = "I CONSENT";

/// Per-session random salt
#[derive(Clone)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draw a fresh salt from the operating system's CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a salt from known bytes, for reproducible hashing in tests
    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// Salted one-way hashing of key identities
#[derive(Debug, Clone)]
pub struct Anonymizer {
    salt: Salt,
}

impl Anonymizer {
    pub fn new(salt: Salt) -> Self {
        Self { salt }
    }

    /// Anonymizer with a freshly generated salt
    pub fn generate() -> Self {
        Self::new(Salt::generate())
    }

    /// Hash a raw key identity; 64 lowercase hex characters
    pub fn hash(&self, identity: &str) -> String {
        debug_assert!(!identity.is_empty(), "key identity must not be empty");
        let mut hasher = Sha256::new();
        hasher.update(self.salt.0);
        hasher.update(identity.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Proof that the user explicitly agreed to store raw key names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCharsConsent {
    _private: (),
}

impl RawCharsConsent {
    /// Accept only the exact consent phrase (surrounding whitespace ignored)
    pub fn confirm(answer: &str) -> Option<Self> {
        (answer.trim() == CONSENT_PHRASE).then_some(Self { _private: () })
    }
}

/// Decides how key identities appear in everything the session emits
#[derive(Debug, Clone)]
pub enum KeyLabeler {
    /// Salted hashes (default)
    Anonymized(Anonymizer),
    /// Raw key names, only with explicit consent
    Raw(RawCharsConsent),
}

impl KeyLabeler {
    pub fn anonymized() -> Self {
        Self::Anonymized(Anonymizer::generate())
    }

    pub fn raw(consent: RawCharsConsent) -> Self {
        Self::Raw(consent)
    }

    pub fn is_anonymized(&self) -> bool {
        matches!(self, Self::Anonymized(_))
    }

    pub fn label(&self, identity: &str) -> String {
        match self {
            Self::Anonymized(anonymizer) => anonymizer.hash(identity),
            Self::Raw(_) => identity.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(byte: u8) -> Anonymizer {
        Anonymizer::new(Salt::from_bytes([byte; SALT_LEN]))
    }

    #[test]
    fn hash_is_deterministic_within_salt() {
        let anonymizer = fixed(7);
        assert_eq!(anonymizer.hash("T"), anonymizer.hash("T"));
        assert_ne!(anonymizer.hash("T"), anonymizer.hash("H"));
    }

    #[test]
    fn hash_differs_across_salts() {
        assert_ne!(fixed(1).hash("T"), fixed(2).hash("T"));
        assert_ne!(Anonymizer::generate().hash("T"), Anonymizer::generate().hash("T"));
    }

    #[test]
    fn hash_is_fixed_width_hex() {
        let hash = fixed(0).hash("Space");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_matches_salt_then_identity() {
        let salt = [9u8; SALT_LEN];
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(b"E");
        let expected = hex::encode(hasher.finalize());
        assert_eq!(Anonymizer::new(Salt::from_bytes(salt)).hash("E"), expected);
    }

    #[test]
    fn salt_debug_is_redacted() {
        let debug = format!("{:?}", fixed(0xAB));
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("171"));
    }

    #[test]
    fn consent_requires_exact_phrase() {
        assert!(RawCharsConsent::confirm("I CONSENT").is_some());
        assert!(RawCharsConsent::confirm("  I CONSENT\n").is_some());
        assert!(RawCharsConsent::confirm("i consent").is_none());
        assert!(RawCharsConsent::confirm("").is_none());
    }

    #[test]
    fn labeler_paths() {
        let anonymized = KeyLabeler::Anonymized(fixed(3));
        assert!(anonymized.is_anonymized());
        assert_ne!(anonymized.label("T"), "T");

        let consent = RawCharsConsent::confirm(CONSENT_PHRASE).unwrap();
        let raw = KeyLabeler::raw(consent);
        assert!(!raw.is_anonymized());
        assert_eq!(raw.label("T"), "T");
    }
}
