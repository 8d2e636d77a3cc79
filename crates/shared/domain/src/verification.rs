//! Email verification key.

use uuid::Uuid;

/// A single-use, opaque key mailed to a user to confirm their address.
///
/// A random 128-bit identifier in its v4 UUID form. Carries no information
/// about the user it belongs to; the cache entry it indexes (`verify:<key>`)
/// is the only place that association is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey(String);

impl VerificationKey {
    /// Generate a new random verification key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VerificationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique() {
        let a = VerificationKey::generate();
        let b = VerificationKey::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_keys_are_well_formed() {
        let key = VerificationKey::generate();
        assert!(Uuid::parse_str(key.as_str()).is_ok());
    }
}
