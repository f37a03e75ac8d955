//! Protocol operations.
//!
//! An [`Operation`] is a named procedure on the processor's command executor
//! together with its arguments.  Arguments come in one of four shapes, which
//! the transport unpacks when it encodes the call:
//!
//! ```text
//! OperationArgs::None                  standby()
//! OperationArgs::Single(p)             input(2)
//! OperationArgs::Positional([p, q])    display_message("Blu-ray", 3)
//! OperationArgs::Keyword({k: p})       get_labels(get_all=false)
//! ```
//!
//! [`ArgShape`] is the *declared* shape of an operation in the command
//! registry; [`ArgShape::accepts`] checks a concrete argument list against it
//! before anything is sent.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Bool(b) => write!(f, "{b}"),
            Param::Int(i) => write!(f, "{i}"),
            Param::Float(x) => write!(f, "{x}"),
            Param::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<i64> for Param {
    fn from(i: i64) -> Self {
        Param::Int(i)
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Bool(b)
    }
}

/// Arguments of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum OperationArgs {
    #[default]
    None,
    Single(Param),
    Positional(Vec<Param>),
    Keyword(BTreeMap<String, Param>),
}

/// Declared argument shape of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// Takes no arguments.
    None,
    /// Takes exactly one argument.
    Single,
    /// Takes exactly this many positional arguments.
    Positional(usize),
    /// Takes keyword arguments drawn from this set.
    Keyword(&'static [&'static str]),
}

impl ArgShape {
    /// Returns `true` when `args` fits this shape.
    pub fn accepts(self, args: &OperationArgs) -> bool {
        match (self, args) {
            (ArgShape::None, OperationArgs::None) => true,
            (ArgShape::Single, OperationArgs::Single(_)) => true,
            (ArgShape::Positional(n), OperationArgs::Positional(v)) => v.len() == n,
            (ArgShape::Keyword(allowed), OperationArgs::Keyword(map)) => {
                map.keys().all(|k| allowed.contains(&k.as_str()))
            }
            _ => false,
        }
    }
}

/// A named procedure plus arguments, ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub args: OperationArgs,
}

impl Operation {
    /// An operation with no arguments.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: OperationArgs::None,
        }
    }

    /// An operation with one argument.
    pub fn single(name: impl Into<String>, param: impl Into<Param>) -> Self {
        Self {
            name: name.into(),
            args: OperationArgs::Single(param.into()),
        }
    }

    /// An operation with positional arguments.
    pub fn positional(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            args: OperationArgs::Positional(params),
        }
    }

    /// An operation with keyword arguments.
    pub fn keyword<I, K>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Param)>,
        K: Into<String>,
    {
        Self {
            name: name.into(),
            args: OperationArgs::Keyword(params.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        match &self.args {
            OperationArgs::None => {}
            OperationArgs::Single(p) => write!(f, "{p}")?,
            OperationArgs::Positional(ps) => {
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
            }
            OperationArgs::Keyword(map) => {
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_shape_accepts_only_no_args() {
        assert!(ArgShape::None.accepts(&OperationArgs::None));
        assert!(!ArgShape::None.accepts(&OperationArgs::Single(Param::Int(1))));
    }

    #[test]
    fn test_single_shape_rejects_positional() {
        assert!(ArgShape::Single.accepts(&OperationArgs::Single(Param::Int(1))));
        assert!(!ArgShape::Single.accepts(&OperationArgs::Positional(vec![Param::Int(1)])));
    }

    #[test]
    fn test_positional_shape_checks_arity() {
        let two = OperationArgs::Positional(vec![Param::Int(1), Param::Int(2)]);
        assert!(ArgShape::Positional(2).accepts(&two));
        assert!(!ArgShape::Positional(3).accepts(&two));
    }

    #[test]
    fn test_keyword_shape_rejects_unknown_keys() {
        let op = Operation::keyword("get_labels", [("get_all", Param::Bool(false))]);
        assert!(ArgShape::Keyword(&["get_all"]).accepts(&op.args));
        assert!(!ArgShape::Keyword(&["other"]).accepts(&op.args));
    }

    #[test]
    fn test_display_renders_call_syntax() {
        assert_eq!(Operation::bare("standby").to_string(), "standby()");
        assert_eq!(Operation::single("input", 2i64).to_string(), "input(2)");
        assert_eq!(
            Operation::keyword("get_labels", [("get_all", Param::Bool(false))]).to_string(),
            "get_labels(get_all=false)"
        );
        assert_eq!(
            Operation::positional("display_message", vec!["Hi".into(), Param::Int(3)]).to_string(),
            "display_message(\"Hi\", 3)"
        );
    }
}
