use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Wrapper for credential material that zeroes its memory on drop.
///
/// Used for the identity-provider client secret. The value is redacted in `Debug`
/// output and masked in `Display` output so credentials never land in logs whole.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new secret from the provided value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the inner value.
    ///
    /// Callers should not hold the reference longer than the request that needs it.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masks the value for display: first and last four characters of long values,
    /// `***` for anything eight characters or shorter.
    fn mask(value: &str) -> String {
        if value.len() <= 8 {
            "***".to_string()
        } else {
            format!("{}...{}", &value[..4], &value[value.len() - 4..])
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SecretString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", Self::mask(&self.0))
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
