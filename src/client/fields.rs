// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Field selectors (`spec.externalName==foo,metadata.name!=bar`).

use super::{ClientError, ClientResult};
use crate::api::FieldLabels;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOperator {
    Equals,
    NotEquals,
}

/// Requirement is a single `field op value` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub field: String,
    pub operator: SelectorOperator,
    pub value: String,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            SelectorOperator::Equals => write!(f, "{}={}", self.field, escape_value(&self.value)),
            SelectorOperator::NotEquals => {
                write!(f, "{}!={}", self.field, escape_value(&self.value))
            }
        }
    }
}

/// FieldSelector is a conjunction of requirements. An empty selector
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    requirements: Vec<Requirement>,
}

impl FieldSelector {
    /// A selector matching everything.
    pub fn everything() -> Self {
        Self::default()
    }

    /// A selector with the single term `field=value`.
    pub fn one_term_equal(field: &str, value: &str) -> Self {
        Self {
            requirements: vec![Requirement {
                field: field.to_string(),
                operator: SelectorOperator::Equals,
                value: value.to_string(),
            }],
        }
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Returns the value required for `field`, if the selector pins it with `=`.
    pub fn required_value(&self, field: &str) -> Option<&str> {
        self.requirements
            .iter()
            .find(|r| r.field == field && r.operator == SelectorOperator::Equals)
            .map(|r| r.value.as_str())
    }

    /// Checks the object against every requirement. Selecting on a field
    /// the object does not expose is an error.
    pub fn matches<T: FieldLabels + ?Sized>(&self, object: &T) -> ClientResult<bool> {
        for requirement in &self.requirements {
            let actual = object.field_label(&requirement.field).ok_or_else(|| {
                ClientError::InvalidFieldSelector {
                    selector: self.to_string(),
                    reason: format!("field label not supported: {}", requirement.field),
                }
            })?;
            let equal = actual == requirement.value;
            let satisfied = match requirement.operator {
                SelectorOperator::Equals => equal,
                SelectorOperator::NotEquals => !equal,
            };
            if !satisfied {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl FromStr for FieldSelector {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ClientError::InvalidFieldSelector {
            selector: s.to_string(),
            reason,
        };

        let mut requirements = Vec::new();
        for term in split_terms(s).into_iter().map(str::trim).filter(|t| !t.is_empty()) {
            let (field, operator, value) = split_term(term)
                .ok_or_else(|| invalid(format!("invalid selector term {:?}", term)))?;

            let field = field.trim();
            if field.is_empty() {
                return Err(invalid(format!("missing field in term {:?}", term)));
            }
            let value = unescape_value(value.trim())
                .map_err(|reason| invalid(format!("{} in term {:?}", reason, term)))?;
            requirements.push(Requirement {
                field: field.to_string(),
                operator,
                value,
            });
        }
        Ok(Self { requirements })
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", terms.join(","))
    }
}

/// Characters that must be backslash-escaped inside a selector value.
const ESCAPED_CHARS: [char; 3] = ['\\', ',', '='];

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if ESCAPED_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unescape_value(value: &str) -> Result<String, String> {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if ESCAPED_CHARS.contains(&next) => unescaped.push(next),
                Some(next) => return Err(format!("invalid escape sequence \"\\{}\"", next)),
                None => return Err("trailing backslash".to_string()),
            },
            ',' | '=' => return Err(format!("unescaped {:?}", c)),
            c => unescaped.push(c),
        }
    }
    Ok(unescaped)
}

/// Splits on commas that are not escaped.
fn split_terms(s: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' => {
                terms.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&s[start..]);
    terms
}

/// Splits a term at its first unescaped operator. The value stays escaped.
fn split_term(term: &str) -> Option<(&str, SelectorOperator, &str)> {
    let mut escaped = false;
    for (i, c) in term.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        let rest = &term[i..];
        if c == '\\' {
            escaped = true;
        } else if rest.starts_with("!=") {
            return Some((&term[..i], SelectorOperator::NotEquals, &term[i + 2..]));
        } else if rest.starts_with("==") {
            return Some((&term[..i], SelectorOperator::Equals, &term[i + 2..]));
        } else if c == '=' {
            return Some((&term[..i], SelectorOperator::Equals, &term[i + 1..]));
        }
    }
    None
}
