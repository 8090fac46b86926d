//! Wine prefix architecture.

/// Target architecture of a Wine prefix.
///
/// A prefix is created for exactly one architecture and cannot be converted
/// afterwards. `win64` prefixes can still run 32-bit executables through
/// WoW64; `win32` prefixes are only needed for software that refuses to run
/// otherwise.
///
/// # Example
///
/// ```
/// use yapl_schema::WineArch;
///
/// let arch: WineArch = "win32".parse().unwrap();
/// assert!(arch.is_32_bit());
/// assert_eq!(WineArch::default().as_str(), "win64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum WineArch {
    /// 32-bit prefix.
    Win32,
    /// 64-bit prefix (default).
    #[default]
    Win64,
}

impl WineArch {
    /// Value exported as `WINEARCH`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Win64 => "win64",
        }
    }

    /// Whether this prefix is a 32-bit one.
    pub fn is_32_bit(&self) -> bool {
        matches!(self, Self::Win32)
    }
}

impl std::fmt::Display for WineArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WineArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win32" | "x86" | "i386" => Ok(Self::Win32),
            "win64" | "x64" | "x86_64" | "amd64" => Ok(Self::Win64),
            _ => Err(format!("Unknown wine architecture: {s}")),
        }
    }
}
