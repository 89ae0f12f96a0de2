use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wrapper for passenger identity data (national id numbers, phone numbers).
///
/// `Debug` and `Display` only ever show the last few characters so the value can
/// travel through `tracing` fields without leaking. Serialization writes the
/// real value: the workflow engine and the notifier are entitled to it.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Masked<T>(pub T);

const VISIBLE_TAIL: usize = 4;

impl<T: AsRef<str>> Masked<T> {
    /// Masked rendering, e.g. `********1234`.
    pub fn redacted(&self) -> String {
        let raw = self.0.as_ref();
        let chars: Vec<char> = raw.chars().collect();
        if chars.len() <= VISIBLE_TAIL {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - VISIBLE_TAIL..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - VISIBLE_TAIL), tail)
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.redacted())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Masked<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Masked)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}
