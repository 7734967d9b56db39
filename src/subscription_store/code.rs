//! Verification code generation.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random bytes per code; hex-encoded this gives 6 characters.
const CODE_BYTES: usize = 3;

/// Source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Short token bound to one pending email.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Keeps codes out of `{:?}` log lines.
impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(******)")
    }
}

/// Produce a fresh 6-character lowercase hex code.
pub fn generate_code(random: &dyn RandomSource) -> VerificationCode {
    let mut bytes = [0u8; CODE_BYTES];
    random.fill_bytes(&mut bytes);
    VerificationCode(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantRandom(u8);

    impl RandomSource for ConstantRandom {
        fn fill_bytes(&self, dest: &mut [u8]) {
            dest.fill(self.0);
        }
    }

    #[test]
    fn codes_are_six_lowercase_hex_chars() {
        for _ in 0..32 {
            let code = generate_code(&OsRandom);
            assert_eq!(code.as_str().len(), 6);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn code_encodes_random_bytes() {
        assert_eq!(generate_code(&ConstantRandom(0xab)).as_str(), "ababab");
        assert_eq!(generate_code(&ConstantRandom(0x01)).as_str(), "010101");
    }

    #[test]
    fn debug_output_hides_the_code() {
        let code = VerificationCode::new("abc123");
        assert!(!format!("{:?}", code).contains("abc123"));
        assert_eq!(code.to_string(), "abc123");
    }
}
