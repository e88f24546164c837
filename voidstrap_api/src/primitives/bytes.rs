use std::{fmt::Display, num::ParseIntError, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseByteCountError {
    #[error(transparent)]
    InvalidNumber(#[from] ParseIntError),

    #[error("size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

/// A size in bytes, written in configuration files with an optional binary
/// suffix (`K`, `M`, `G`, `T`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteCount(pub u64);

impl From<u64> for ByteCount {
    fn from(x: u64) -> Self {
        ByteCount(x)
    }
}

impl ByteCount {
    /// Panics on overflow, use `checked_from_mebibytes` for sizes read from
    /// a configuration.
    pub const fn from_mebibytes(mib: u64) -> Self {
        match Self::checked_from_mebibytes(mib) {
            Some(size) => size,
            None => panic!("size in MiB does not fit in 64 bits"),
        }
    }

    pub const fn checked_from_mebibytes(mib: u64) -> Option<Self> {
        match mib.checked_mul(1 << 20) {
            Some(bytes) => Some(ByteCount(bytes)),
            None => None,
        }
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Size in whole MiB, rounded down.
    pub fn mebibytes(self) -> u64 {
        self.0 >> 20
    }

    pub fn to_human_readable(&self) -> String {
        match self.0.trailing_zeros() {
            _ if self.0 == 0 => "0".to_owned(),
            0..=9 => format!("{}", self.0),
            10..=19 => format!("{}K", self.0 >> 10),
            20..=29 => format!("{}M", self.0 >> 20),
            30..=39 => format!("{}G", self.0 >> 30),
            _ => format!("{}T", self.0 >> 40),
        }
    }

    /// Size argument for `lvcreate -L`, which rejects raw byte counts without
    /// a unit.
    pub fn to_lvm_size(&self) -> String {
        match self.0.trailing_zeros() {
            0..=9 if self.0 != 0 => format!("{}b", self.0),
            _ => self.to_human_readable(),
        }
    }

    pub fn from_human_readable(mut s: &str) -> Result<Self, ParseByteCountError> {
        s = s.trim();
        let try_parse = |val: &str, shift: u32| -> Result<Self, ParseByteCountError> {
            val.trim()
                .parse::<u64>()?
                .checked_mul(1 << shift)
                .map(Self)
                .ok_or_else(|| ParseByteCountError::Overflow(s.to_owned()))
        };
        if let Some(p) = s.strip_suffix('K') {
            try_parse(p, 10)
        } else if let Some(p) = s.strip_suffix('M') {
            try_parse(p, 20)
        } else if let Some(p) = s.strip_suffix('G') {
            try_parse(p, 30)
        } else if let Some(p) = s.strip_suffix('T') {
            try_parse(p, 40)
        } else {
            try_parse(s, 0)
        }
    }
}

impl Display for ByteCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

impl FromStr for ByteCount {
    type Err = ParseByteCountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_human_readable(s.trim())
    }
}

impl<'de> serde::Deserialize<'de> for ByteCount {
    fn deserialize<D>(deserializer: D) -> Result<ByteCount, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // YAML turns digit-only sizes into numbers, so accept both shapes.
        let value = serde_yaml::Value::deserialize(deserializer)?;

        match value {
            serde_yaml::Value::String(s) => ByteCount::from_str(s.as_str())
                .map_err(|e| serde::de::Error::custom(format!("invalid size: {e}"))),
            serde_yaml::Value::Number(n) => {
                let n = n.as_u64().ok_or_else(|| {
                    serde::de::Error::custom("invalid size, expected unsigned integer")
                })?;
                Ok(ByteCount(n))
            }
            _ => Err(serde::de::Error::custom("invalid size")),
        }
    }
}

impl serde::Serialize for ByteCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.0 & 0x3FF != 0 {
            serializer.serialize_u64(self.0)
        } else {
            serializer.serialize_str(self.to_human_readable().as_str())
        }
    }
}
