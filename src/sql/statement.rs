// Copyright (c) 2025 ADBC Drivers Contributors
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

//! Client-side statement templating.
//!
//! There is no server-side parameter binding: positional `?` placeholders are
//! rewritten into ordinal markers (`@p1`, `@p2`, ...) and every marker is
//! then replaced with a SQL literal of its bound value. All markers are
//! replaced in one scan, so text inside an inserted literal is never
//! rewritten.

use crate::error::{HiveError, HiveResult};
use crate::result::value::Value;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// A bound parameter, addressed by name (`@name`) or by 1-based ordinal (`@pN`).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal: 0,
            value: value.into(),
        }
    }

    /// Binds `values` to `@p1..@pN` in order.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Vec<Self> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Self::positional(i + 1, value))
            .collect()
    }

    fn marker(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("@{name}"),
            _ => format!("@p{}", self.ordinal),
        }
    }
}

/// Rewrites `?` placeholders left to right into `@p1`, `@p2`, ...
pub fn template(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 8);
    let mut ordinal = 0;
    for (i, part) in query.split('?').enumerate() {
        if i > 0 {
            ordinal += 1;
            out.push_str(&format!("@p{ordinal}"));
        }
        out.push_str(part);
    }
    out
}

/// Substitutes every marker in `tmpl` with the literal of its bound value.
///
/// When a marker is bound twice, the first binding wins.
pub fn render(tmpl: &str, args: &[NamedValue]) -> HiveResult<String> {
    if args.is_empty() {
        return Ok(tmpl.to_string());
    }
    let mut literals: HashMap<String, String> = HashMap::with_capacity(args.len());
    for arg in args {
        literals
            .entry(arg.marker())
            .or_insert_with(|| literal(&arg.value));
    }

    // Longest first, so `@p10` is tried before `@p1`.
    let mut markers: Vec<&str> = literals.keys().map(String::as_str).collect();
    markers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let pattern = markers
        .iter()
        .map(|m| format!(r"{}\b", regex::escape(m)))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&pattern)
        .map_err(|e| HiveError::InvalidArgument(format!("parameter name: {e}")))?;

    let stmt = re.replace_all(tmpl, |caps: &Captures| {
        literals
            .get(&caps[0])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    Ok(stmt.into_owned())
}

/// SQL literal of a bound value. Strings and timestamps are quoted.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => quote(s),
        Value::DateTime(t) => quote(&Value::format_timestamp(t)),
        Value::Bytes(b) => quote(&String::from_utf8_lossy(b)),
        other => other.to_string(),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// A templated statement, ready to be rendered with arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    query: String,
}

impl Stmt {
    pub fn new(query: &str) -> Self {
        Self {
            query: template(query),
        }
    }

    /// The templated text, with positional placeholders already rewritten.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Parameter count is not validated client-side.
    pub fn num_input(&self) -> Option<usize> {
        None
    }

    pub fn render(&self, args: &[NamedValue]) -> HiveResult<String> {
        render(&self.query, args)
    }
}
