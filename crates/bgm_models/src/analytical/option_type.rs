//! Call / put flag.

use std::fmt;
use std::str::FromStr;

/// Option direction. For swaptions a call is a payer and a put a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OptionType {
    /// Pays `max(S − K, 0)`.
    #[default]
    Call,
    /// Pays `max(K − S, 0)`.
    Put,
}

impl OptionType {
    /// `+1` for calls, `−1` for puts.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// The other direction.
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            OptionType::Call => OptionType::Put,
            OptionType::Put => OptionType::Call,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call" | "payer" => Ok(OptionType::Call),
            "put" | "receiver" => Ok(OptionType::Put),
            other => Err(format!("unknown option type '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_flip() {
        assert_eq!(OptionType::Call.sign(), 1.0);
        assert_eq!(OptionType::Put.sign(), -1.0);
        assert_eq!(OptionType::Call.flip(), OptionType::Put);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Payer".parse::<OptionType>(), Ok(OptionType::Call));
        assert_eq!("receiver".parse::<OptionType>(), Ok(OptionType::Put));
        assert!("straddle".parse::<OptionType>().is_err());
        assert_eq!(OptionType::Put.to_string(), "put");
    }
}
