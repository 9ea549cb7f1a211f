use std::fmt;
use std::str::FromStr;

/// Browser whose TLS ClientHello the spoofed transport imitates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintIdentity {
    Chrome,
    Firefox,
    Ios,
    /// Shuffled preset, different on every resolution.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported fingerprint name: {0:?} (expected chrome, firefox, ios or random)")]
pub struct UnknownFingerprint(pub String);

impl FingerprintIdentity {
    pub const ALL: [FingerprintIdentity; 4] = [
        FingerprintIdentity::Chrome,
        FingerprintIdentity::Firefox,
        FingerprintIdentity::Ios,
        FingerprintIdentity::Random,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FingerprintIdentity::Chrome => "chrome",
            FingerprintIdentity::Firefox => "firefox",
            FingerprintIdentity::Ios => "ios",
            FingerprintIdentity::Random => "random",
        }
    }
}

impl FromStr for FingerprintIdentity {
    type Err = UnknownFingerprint;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|identity| identity.name() == name)
            .ok_or_else(|| UnknownFingerprint(name.to_string()))
    }
}

impl fmt::Display for FingerprintIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
