//! # Encode Guard
//!
//! Context-aware output encoding and input canonicalization for untrusted
//! text.
//!
//! ## Features
//!
//! - ✅ **Context Encoding** - HTML, HTML attribute, JavaScript, CSS, URL,
//!   XML, XML attribute, XPath, LDAP, DN, VBScript, SQL
//! - ✅ **Alias Registry** - forgiving target names (`html_attr`,
//!   `html-attr`, `html attr`, ...) resolved through one static table
//! - ✅ **SQL Dialects** - pluggable MySQL (standard/ANSI), Oracle, and DB2
//!   codecs, never guessed
//! - ✅ **Canonicalization Guard** - detects multiple and mixed encoding
//!   layers before any decoded value is trusted
//! - ✅ **Configurable Policy** - restrict/throw flags and the
//!   suppressed-ambiguity sentinel are caller choices
//!
//! ## Quick Start
//!
//! ```rust
//! use encode_guard::{encode_for, EncodeRequest};
//!
//! // Encode for an HTML body context
//! let safe = encode_for("<script>alert('XSS')</script>", "html").unwrap();
//! assert!(safe.contains("&lt;script&gt;"));
//!
//! // Canonicalize first, then encode, with a SQL dialect
//! let safe = EncodeRequest::new("o'brien", "sql")
//!     .with_canonicalize(true)
//!     .with_dialect("mysql")
//!     .run()
//!     .unwrap();
//! assert_eq!(safe, "o\\'brien");
//! ```
//!
//! ## Canonicalization
//!
//! ```rust
//! use encode_guard::{canonicalize, CanonicalizationPolicy};
//!
//! // Plain text passes straight through
//! let policy = CanonicalizationPolicy::new().with_restrict_multiple(true);
//! assert_eq!(canonicalize("hello world", &policy).unwrap(), "hello world");
//!
//! // Double URL-encoding is neutralized to the policy sentinel
//! assert_eq!(canonicalize("%2520", &policy).unwrap(), " ");
//! ```
//!
//! ## Target Resolution
//!
//! ```rust
//! use encode_guard::EncodingTarget;
//!
//! assert_eq!(
//!     EncodingTarget::resolve("HTML_ATTR"),
//!     Some(EncodingTarget::HtmlAttribute)
//! );
//! assert_eq!(EncodingTarget::resolve("none"), Some(EncodingTarget::None));
//! assert_eq!(EncodingTarget::resolve("markdown"), None);
//! ```

pub mod canonicalize;
pub mod dialect;
pub mod encoder;
pub mod error;
pub mod target;

pub use canonicalize::{CanonicalizationPolicy, Canonicalizer};
pub use dialect::{resolve_sql_codec, Db2Codec, MySqlCodec, MySqlMode, OracleCodec, SqlCodec};
pub use encoder::ContextEncoder;
pub use error::{GuardError, Result};
pub use target::EncodingTarget;

/// Encode `value` for the context named by `target` (no canonicalization,
/// no SQL dialect).
pub fn encode_for(value: &str, target: &str) -> Result<String> {
    EncodeRequest::new(value, target).run()
}

/// Canonicalize `input` under `policy` using the default canonicalizer.
pub fn canonicalize(input: &str, policy: &CanonicalizationPolicy) -> Result<String> {
    Canonicalizer::new().canonicalize_guarded(input, policy)
}

/// One encode call: untrusted value, target context name, and the optional
/// canonicalize-first and SQL-dialect settings.
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    value: &'a str,
    target: &'a str,
    canonicalize: bool,
    dialect: Option<&'a str>,
}

impl<'a> EncodeRequest<'a> {
    pub fn new(value: &'a str, target: &'a str) -> Self {
        Self {
            value,
            target,
            canonicalize: false,
            dialect: None,
        }
    }

    /// Canonicalize the value before encoding.
    pub fn with_canonicalize(mut self, canonicalize: bool) -> Self {
        self.canonicalize = canonicalize;
        self
    }

    /// SQL dialect, required when the target resolves to `sql`.
    pub fn with_dialect(mut self, dialect: &'a str) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Resolve the target and dialect, then encode.
    pub fn run(self) -> Result<String> {
        if self.value.is_empty() {
            return Ok(String::new());
        }

        let target = EncodingTarget::parse(self.target)?;

        // The dialect is resolved if and only if the target is SQL; for any
        // other target a configured dialect is ignored.
        let codec = if target == EncodingTarget::Sql {
            Some(resolve_sql_codec(self.dialect.unwrap_or(""))?)
        } else {
            None
        };

        ContextEncoder::encode(self.value, target, self.canonicalize, codec.as_deref())
    }
}
