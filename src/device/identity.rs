use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Client identity presented to the pad when connecting.
///
/// The pad remembers which client it was paired with; presenting a different
/// identity forces a fresh confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppIdentity([u8; 6]);

pub const DEFAULT_APP_IDENTITY: AppIdentity = AppIdentity([0xFA, 0xAB, 0xC1, 0xE0, 0xF1, 0x77]);

impl AppIdentity {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl Default for AppIdentity {
    fn default() -> Self {
        DEFAULT_APP_IDENTITY
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("app identity must be 12 hex digits, got '{0}'")]
pub struct ParseAppIdentityError(String);

impl FromStr for AppIdentity {
    type Err = ParseAppIdentityError;

    /// Accepts `faabc1e0f177` as well as separated forms like `FA:AB:C1:E0:F1:77`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | ' '))
            .collect();
        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseAppIdentityError(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseAppIdentityError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_separated_forms() {
        let plain: AppIdentity = "faabc1e0f177".parse().unwrap();
        let separated: AppIdentity = "FA:AB:C1:E0:F1:77".parse().unwrap();
        assert_eq!(plain, DEFAULT_APP_IDENTITY);
        assert_eq!(separated, DEFAULT_APP_IDENTITY);
        assert_eq!(plain.to_string(), "faabc1e0f177");
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!("faab".parse::<AppIdentity>().is_err());
        assert!("zzabc1e0f177".parse::<AppIdentity>().is_err());
    }
}
