//! The closed set of judging outcomes.
//!
//! Verdicts travel over the wire and into the `runs` table as their short tag
//! (`"OK"`, `"WA"`, ...). `Display` renders the human-readable name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The target unit was not found in the submission.
    #[serde(rename = "MS")]
    Missing,
    /// Judge-side fault: sandbox failure, broken reference solution, bad frame.
    #[serde(rename = "CF")]
    CheckFailed,
    #[serde(rename = "VE")]
    ValidationError,
    /// The produced value has the wrong shape or type.
    #[serde(rename = "IA")]
    InvalidAnswer,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "CE")]
    CompileError,
    #[serde(rename = "TL")]
    TimeLimitExceeded,
    #[serde(rename = "OK")]
    Correct,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown verdict tag '{0}'")]
pub struct UnknownVerdict(pub String);

impl Verdict {
    pub const ALL: [Verdict; 9] = [
        Verdict::Missing,
        Verdict::CheckFailed,
        Verdict::ValidationError,
        Verdict::InvalidAnswer,
        Verdict::WrongAnswer,
        Verdict::RuntimeError,
        Verdict::CompileError,
        Verdict::TimeLimitExceeded,
        Verdict::Correct,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Verdict::Missing => "MS",
            Verdict::CheckFailed => "CF",
            Verdict::ValidationError => "VE",
            Verdict::InvalidAnswer => "IA",
            Verdict::WrongAnswer => "WA",
            Verdict::RuntimeError => "RE",
            Verdict::CompileError => "CE",
            Verdict::TimeLimitExceeded => "TL",
            Verdict::Correct => "OK",
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Missing => "Missing",
            Verdict::CheckFailed => "Check Failed",
            Verdict::ValidationError => "Validation Error",
            Verdict::InvalidAnswer => "Invalid Answer",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::CompileError => "Compile Error",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::Correct => "Correct",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verdict::ALL
            .into_iter()
            .find(|v| v.tag() == s)
            .ok_or_else(|| UnknownVerdict(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_back() {
        for verdict in Verdict::ALL {
            assert_eq!(verdict.tag().parse::<Verdict>().unwrap(), verdict);
        }
        assert!("XX".parse::<Verdict>().is_err());
    }

    #[test]
    fn serde_uses_short_tags() {
        let json = serde_json::to_string(&Verdict::TimeLimitExceeded).unwrap();
        assert_eq!(json, "\"TL\"");
        let back: Verdict = serde_json::from_str("\"CE\"").unwrap();
        assert_eq!(back, Verdict::CompileError);
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Verdict::CheckFailed.to_string(), "Check Failed");
        assert!(Verdict::Correct.is_correct());
        assert!(!Verdict::WrongAnswer.is_correct());
    }
}
