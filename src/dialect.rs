use crate::error::{GuardError, Result};
use std::fmt;

const SUPPORTED_DIALECTS: &str = "[db2, mysql, mysql_ansi, oracle]";

/// Escaping strategy for one SQL engine's string-literal syntax.
///
/// Implementations decide how a single unsafe character is rewritten; the
/// default `encode` loop passes ASCII alphanumerics through untouched and
/// routes everything else to the strategy.
pub trait SqlCodec: fmt::Debug {
    /// Escape one non-alphanumeric character.
    fn encode_char(&self, c: char) -> String;

    /// Escape a whole string for embedding in a SQL string literal.
    fn encode(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
            } else {
                out.push_str(&self.encode_char(c));
            }
        }
        out
    }
}

/// MySQL escaping mode: backslash escaping (standard) or ANSI quote doubling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlMode {
    Standard,
    Ansi,
}

#[derive(Debug, Clone, Copy)]
pub struct MySqlCodec {
    mode: MySqlMode,
}

impl MySqlCodec {
    pub fn new(mode: MySqlMode) -> Self {
        Self { mode }
    }
}

impl SqlCodec for MySqlCodec {
    fn encode_char(&self, c: char) -> String {
        match self.mode {
            // ANSI_QUOTES mode only recognizes doubled single quotes.
            MySqlMode::Ansi => {
                if c == '\'' {
                    "''".to_string()
                } else {
                    c.to_string()
                }
            }
            MySqlMode::Standard => match c {
                '\u{0}' => "\\0".to_string(),
                '\u{8}' => "\\b".to_string(),
                '\t' => "\\t".to_string(),
                '\n' => "\\n".to_string(),
                '\r' => "\\r".to_string(),
                '\u{1a}' => "\\Z".to_string(),
                '"' => "\\\"".to_string(),
                '%' => "\\%".to_string(),
                '\'' => "\\'".to_string(),
                '\\' => "\\\\".to_string(),
                '_' => "\\_".to_string(),
                _ => format!("\\{}", c),
            },
        }
    }
}

/// Oracle string literals only need single quotes doubled.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleCodec;

impl SqlCodec for OracleCodec {
    fn encode_char(&self, c: char) -> String {
        if c == '\'' {
            "''".to_string()
        } else {
            c.to_string()
        }
    }
}

/// DB2 doubles single quotes and neutralizes statement separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct Db2Codec;

impl SqlCodec for Db2Codec {
    fn encode_char(&self, c: char) -> String {
        match c {
            '\'' => "''".to_string(),
            ';' => ".".to_string(),
            _ => c.to_string(),
        }
    }
}

/// Resolve a SQL dialect name to a fresh codec.
///
/// There is deliberately no default dialect: guessing an engine's escaping
/// rules risks incorrect escaping, so a blank dialect is an error.
pub fn resolve_sql_codec(dialect: &str) -> Result<Box<dyn SqlCodec>> {
    let normalized = dialect.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(GuardError::Configuration(format!(
            "You need to define a SQL dialect, these dialects are supported {}",
            SUPPORTED_DIALECTS
        )));
    }

    match normalized.as_str() {
        "mysql_ansi" => Ok(Box::new(MySqlCodec::new(MySqlMode::Ansi))),
        "mysql" => Ok(Box::new(MySqlCodec::new(MySqlMode::Standard))),
        "oracle" => Ok(Box::new(OracleCodec)),
        "db2" => Ok(Box::new(Db2Codec)),
        _ => Err(GuardError::Configuration(format!(
            "SQL dialect [{}] is not supported, supported dialects are {}",
            normalized, SUPPORTED_DIALECTS
        ))),
    }
}
