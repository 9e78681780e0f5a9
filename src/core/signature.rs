use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// A function name with the ordered names of the fields passed as its arguments.
///
/// Argument names never carry type information. Two signatures with the same
/// function name and arity bind to the same method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    function: String,
    arguments: Vec<String>,
}

impl Signature {
    pub fn new<I, S>(function: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            function: function.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    /// Whether both signatures select the same overload set.
    pub fn matches(&self, other: &Signature) -> bool {
        self.function == other.function && self.arity() == other.arity()
    }
}

impl FromStr for Signature {
    type Err = WireError;

    /// Parses `name(arg1, arg2, ...)`. Arguments are separated by commas and/or whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || WireError::MalformedSignature(s.to_string());

        let start = s.find('(').ok_or_else(malformed)?;
        let end = s.find(')').ok_or_else(malformed)?;
        if end != s.len() - 1 || end < start || s[start + 1..].contains('(') {
            return Err(malformed());
        }

        let function = s[..start].trim();
        if function.is_empty() {
            return Err(malformed());
        }

        let arguments = s[start + 1..end]
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Signature {
            function: function.to_string(),
            arguments,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function, self.arguments.join(", "))
    }
}

/// Macro for literal signatures: `signature!("echo(in)")`
#[macro_export]
macro_rules! signature {
    ($s:expr) => {
        $s.parse::<$crate::core::signature::Signature>()
            .expect("Invalid signature literal")
    };
}
