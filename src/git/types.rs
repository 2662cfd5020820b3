//! Value types returned by repository queries

use std::fmt;

/// Identifier of a commit as reported by `git rev-parse`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitHash(String);

impl CommitHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        let end = self.0.len().min(10);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Signature verification status of a commit
///
/// Derived from the single-letter `%G?` placeholder of `git log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Signature present and valid (`G`, `U`)
    Good,
    /// Signature present but bad, expired or revoked (`B`, `X`, `Y`, `R`)
    Bad,
    /// No signature at all (`N`)
    None,
    /// Signature present but could not be checked, e.g. missing public key
    /// (`E`) or an SSH signature with no allowed signers configured
    Unknown,
}

impl SignatureStatus {
    /// Parse the output of `git log -1 --pretty=format:%G?`
    pub fn from_placeholder(code: &str) -> Self {
        match code.trim() {
            "G" | "U" => Self::Good,
            "B" | "X" | "Y" | "R" => Self::Bad,
            "N" => Self::None,
            _ => Self::Unknown,
        }
    }

    /// Whether the commit carries any signature
    ///
    /// Only an explicit "no signature" counts as unsigned; an unknown status
    /// is treated as signed so the commit is left alone.
    pub fn is_signed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "signed-good"),
            Self::Bad => write!(f, "signed-bad"),
            Self::None => write!(f, "no-signature"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
