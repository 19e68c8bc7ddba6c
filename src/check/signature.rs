//! Callable signature resolution.
//!
//! Some callables have curated signatures that override whatever the
//! runtime would report; the manual table holds those. Resolution
//! order for a call: direct manual entry for the mapped name, then a
//! generic `type.method` manual entry when the call target is an
//! attribute access, then runtime introspection of the callable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::interpreter::value::{format_value, ParamSpec};

/// One formal parameter, with its default rendered as source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigParam {
    pub name: String,
    pub default: Option<String>,
}

impl SigParam {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
        }
    }

    pub fn with_default(name: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            default: Some(default.to_string()),
        }
    }
}

/// A callable's formal parameter list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub params: Vec<SigParam>,
}

impl Signature {
    pub fn new(name: &str, params: Vec<SigParam>) -> Self {
        Self {
            name: name.to_string(),
            params,
        }
    }

    /// Build a signature from runtime parameter specs
    pub fn from_params(name: &str, params: &[ParamSpec]) -> Self {
        Self {
            name: name.to_string(),
            params: params
                .iter()
                .map(|p| SigParam {
                    name: p.name.clone(),
                    default: p.default.as_ref().map(format_value),
                })
                .collect(),
        }
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

/// The curated signature table, keyed by mapped callable name. Method
/// entries use the unqualified receiver type: `str.upper`, `dict.keys`.
pub fn manual_signatures() -> HashMap<String, Signature> {
    let mut table = HashMap::new();
    let mut insert = |name: &str, params: Vec<SigParam>| {
        table.insert(name.to_string(), Signature::new(name, params));
    };

    insert(
        "print",
        vec![
            SigParam::required("value"),
            SigParam::with_default("sep", "\" \""),
        ],
    );
    insert(
        "range",
        vec![
            SigParam::required("start"),
            SigParam::with_default("stop", "none"),
        ],
    );
    insert("dict.keys", vec![]);
    insert("str.upper", vec![]);
    insert("str.lower", vec![]);
    insert(
        "frame.head",
        vec![SigParam::with_default("n", "5")],
    );

    table
}

/// Rewrite a dotted call target into a generic `type.method` key,
/// given the receiver's unqualified runtime type name.
pub fn generic_method_key(dotted: &str, receiver_type: &str) -> Option<String> {
    dotted
        .rsplit_once('.')
        .map(|(_, method)| format!("{}.{}", receiver_type, method))
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
