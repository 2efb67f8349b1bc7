//! Reads widened facts back out of a textual dump.
//!
//! Expected format (one function after another):
//! - `In function: <name>`
//! - `[B<n>]`
//! - `  <k>: <statement>`
//! - `    upper_bound(<var>) = <offset or expression>`

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

static FUNCTION_PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
static BLOCK_PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
static STMT_PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
static FACT_PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn pattern(
    cell: &'static OnceLock<std::result::Result<Regex, regex::Error>>,
    source: &str,
) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(source))
        .as_ref()
        .map_err(|err| Error::Pattern(err.clone()))
}

/// Widened bound as printed in a dump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DumpBound {
    Offset(i64),
    Expr(String),
}

/// One `upper_bound(..)` line with its location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpFact {
    pub function: String,
    pub block: u32,
    /// 1-based statement number within the block.
    pub stmt: usize,
    pub var: String,
    pub bound: DumpBound,
}

/// Parse every widened fact of a dump.
pub fn parse_dump(text: &str) -> Result<Vec<DumpFact>> {
    let function_re = pattern(&FUNCTION_PATTERN, r"^In function: (\S+)$")?;
    let block_re = pattern(&BLOCK_PATTERN, r"^\[B(\d+)\]$")?;
    let stmt_re = pattern(&STMT_PATTERN, r"^  (\d+): ")?;
    let fact_re = pattern(&FACT_PATTERN, r"^    upper_bound\((\w+)\) = (.+)$")?;

    let mut facts = Vec::new();
    let mut function: Option<&str> = None;
    let mut block: Option<u32> = None;
    let mut stmt: Option<usize> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let malformed = |reason| Error::MalformedDump {
            line: line_no,
            reason,
        };

        if let Some(caps) = function_re.captures(line) {
            function = caps.get(1).map(|m| m.as_str());
            block = None;
            stmt = None;
        } else if let Some(caps) = block_re.captures(line) {
            let number = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| malformed("bad block number"))?;
            block = Some(number);
            stmt = None;
        } else if let Some(caps) = fact_re.captures(line) {
            let (Some(function), Some(block), Some(stmt)) = (function, block, stmt) else {
                return Err(malformed("fact outside of a statement"));
            };
            let var = caps.get(1).map_or("", |m| m.as_str());
            let value = caps.get(2).map_or("", |m| m.as_str());
            let bound = value
                .parse()
                .map_or_else(|_| DumpBound::Expr(value.to_string()), DumpBound::Offset);
            facts.push(DumpFact {
                function: function.to_string(),
                block,
                stmt,
                var: var.to_string(),
                bound,
            });
        } else if let Some(caps) = stmt_re.captures(line) {
            if block.is_none() {
                return Err(malformed("statement outside of a block"));
            }
            stmt = caps.get(1).and_then(|m| m.as_str().parse().ok());
        } else if !line.trim().is_empty() {
            return Err(malformed("unrecognized line"));
        }
    }
    Ok(facts)
}
