use crate::canonicalize::Canonicalizer;
use crate::dialect::SqlCodec;
use crate::error::{GuardError, Result};
use crate::target::EncodingTarget;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Unreserved characters pass through; everything else is percent-encoded
/// byte by byte.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Context-specific encoding for untrusted output.
pub struct ContextEncoder;

impl ContextEncoder {
    /// Encode `item` for the given output context.
    ///
    /// `Sql` requires a codec; `None` passes the (possibly canonicalized)
    /// value through unchanged. `Base64` and `Os` are reserved targets with
    /// no encoder behind them.
    pub fn encode(
        item: &str,
        target: EncodingTarget,
        canonicalize_first: bool,
        codec: Option<&dyn SqlCodec>,
    ) -> Result<String> {
        if item.is_empty() {
            return Ok(String::new());
        }

        let item = if canonicalize_first {
            Canonicalizer::new().canonicalize(item, false, false)?
        } else {
            item.to_string()
        };

        match target {
            EncodingTarget::Css => Ok(Self::encode_css(&item)),
            EncodingTarget::Dn => Ok(Self::encode_dn(&item)),
            EncodingTarget::Html => Ok(Self::encode_html(&item)),
            EncodingTarget::HtmlAttribute => Ok(Self::encode_html_attribute(&item)),
            EncodingTarget::JavaScript => Ok(Self::encode_javascript(&item)),
            EncodingTarget::Ldap => Ok(Self::encode_ldap(&item)),
            EncodingTarget::None => Ok(item),
            EncodingTarget::Url => Ok(Self::encode_url(&item)),
            EncodingTarget::VbScript => Ok(Self::encode_vbscript(&item)),
            EncodingTarget::Xml => Ok(Self::encode_xml(&item)),
            EncodingTarget::XmlAttribute => Ok(Self::encode_xml_attribute(&item)),
            EncodingTarget::XPath => Ok(Self::encode_xpath(&item)),
            EncodingTarget::Sql => {
                let codec = codec.ok_or_else(|| {
                    GuardError::Configuration(
                        "a SQL dialect codec is required for the sql target".to_string(),
                    )
                })?;
                Ok(codec.encode(&item))
            }
            EncodingTarget::Base64 | EncodingTarget::Os => Err(GuardError::Configuration(
                "invalid target encoding definition".to_string(),
            )),
        }
    }

    /// Encode for an HTML body context.
    pub fn encode_html(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '<' => "&lt;".to_string(),
                '>' => "&gt;".to_string(),
                '"' => "&quot;".to_string(),
                '\'' => "&#x27;".to_string(),
                '&' => "&amp;".to_string(),
                '/' => "&#x2F;".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }

    /// Encode for a quoted HTML attribute value.
    pub fn encode_html_attribute(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '"' => "&quot;".to_string(),
                '\'' => "&#x27;".to_string(),
                '&' => "&amp;".to_string(),
                '<' => "&lt;".to_string(),
                '>' => "&gt;".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }

    /// Encode for a JavaScript string context.
    pub fn encode_javascript(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\\' => "\\\\".to_string(),
                '"' => "\\\"".to_string(),
                '\'' => "\\'".to_string(),
                '\n' => "\\n".to_string(),
                '\r' => "\\r".to_string(),
                '\t' => "\\t".to_string(),
                '<' => "\\x3C".to_string(),
                '>' => "\\x3E".to_string(),
                '/' => "\\/".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }

    /// Encode for a CSS value context.
    pub fn encode_css(text: &str) -> String {
        text.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_string()
                } else {
                    format!("\\{:X} ", c as u32)
                }
            })
            .collect()
    }

    /// Percent-encode for a URL component.
    pub fn encode_url(text: &str) -> String {
        utf8_percent_encode(text, URL_ENCODE_SET).to_string()
    }

    /// Encode for an XML text node.
    pub fn encode_xml(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '&' => "&amp;".to_string(),
                '<' => "&lt;".to_string(),
                '>' => "&gt;".to_string(),
                '"' => "&quot;".to_string(),
                '\'' => "&apos;".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }

    /// Encode for a quoted XML attribute value. Whitespace is encoded as
    /// character references so it survives attribute-value normalization.
    pub fn encode_xml_attribute(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '&' => "&amp;".to_string(),
                '<' => "&lt;".to_string(),
                '>' => "&gt;".to_string(),
                '"' => "&quot;".to_string(),
                '\'' => "&apos;".to_string(),
                '\t' => "&#x9;".to_string(),
                '\n' => "&#xA;".to_string(),
                '\r' => "&#xD;".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }

    /// Encode for an XPath string literal.
    pub fn encode_xpath(text: &str) -> String {
        Self::encode_xml(text)
    }

    /// Escape for an LDAP search filter (RFC 4515).
    pub fn encode_ldap(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\\' => "\\5c".to_string(),
                '*' => "\\2a".to_string(),
                '(' => "\\28".to_string(),
                ')' => "\\29".to_string(),
                '\u{0}' => "\\00".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }

    /// Escape for an LDAP distinguished name component (RFC 4514).
    pub fn encode_dn(text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(chars.len());
        for (i, &c) in chars.iter().enumerate() {
            let needs_escape = match c {
                '\\' | ',' | '+' | '"' | '<' | '>' | ';' => true,
                '#' => i == 0,
                ' ' => i == 0 || i == chars.len() - 1,
                _ => false,
            };
            if needs_escape {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    /// Encode for a VBScript string context. Doubled quotes keep literals
    /// intact; other specials become `chrw(n)` character builders.
    pub fn encode_vbscript(text: &str) -> String {
        text.chars()
            .map(|c| {
                if c == '"' {
                    "\"\"".to_string()
                } else if c.is_ascii_alphanumeric() || c == ' ' {
                    c.to_string()
                } else {
                    format!("chrw({})", c as u32)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlCodec, MySqlMode};

    #[test]
    fn test_encode_html() {
        let input = r#"<script>alert("XSS")</script>"#;
        let output = ContextEncoder::encode_html(input);

        assert_eq!(
            output,
            "&lt;script&gt;alert(&quot;XSS&quot;)&lt;&#x2F;script&gt;"
        );
        assert!(!output.contains('<'));
        assert!(!output.contains('>'));
    }

    #[test]
    fn test_encode_html_attribute() {
        let input = r#"Hello" onclick="alert('XSS')"#;
        let output = ContextEncoder::encode_html_attribute(input);

        assert!(output.contains("&quot;"));
        assert!(output.contains("&#x27;"));
    }

    #[test]
    fn test_encode_javascript() {
        let input = r#"'; alert('XSS'); //'"#;
        let output = ContextEncoder::encode_javascript(input);

        assert!(output.contains("\\'"));
        assert!(!output.contains("';"));
    }

    #[test]
    fn test_encode_css() {
        let input = "expression(alert('XSS'))";
        let output = ContextEncoder::encode_css(input);

        assert!(!output.contains('('));
        assert!(!output.contains(')'));
    }

    #[test]
    fn test_encode_url() {
        let input = "hello world&test=value";
        let output = ContextEncoder::encode_url(input);

        assert_eq!(output, "hello%20world%26test%3Dvalue");
    }

    #[test]
    fn test_encode_url_is_utf8_safe() {
        let output = ContextEncoder::encode_url("café");
        assert_eq!(output, "caf%C3%A9");
    }

    #[test]
    fn test_encode_xml_and_attribute() {
        assert_eq!(ContextEncoder::encode_xml("<a>'&'</a>"), "&lt;a&gt;&apos;&amp;&apos;&lt;/a&gt;");
        let attr = ContextEncoder::encode_xml_attribute("line\nbreak\t\"q\"");
        assert_eq!(attr, "line&#xA;break&#x9;&quot;q&quot;");
    }

    #[test]
    fn test_encode_ldap_filter() {
        let output = ContextEncoder::encode_ldap("admin)(uid=*");
        assert_eq!(output, "admin\\29\\28uid=\\2a");
    }

    #[test]
    fn test_encode_dn() {
        assert_eq!(ContextEncoder::encode_dn("a,b+c"), "a\\,b\\+c");
        assert_eq!(ContextEncoder::encode_dn("#leading"), "\\#leading");
        assert_eq!(ContextEncoder::encode_dn(" pad "), "\\ pad\\ ");
    }

    #[test]
    fn test_encode_vbscript() {
        let output = ContextEncoder::encode_vbscript(r#"msgbox "hi"<"#);
        assert!(output.contains("\"\""));
        assert!(output.contains("chrw(60)"));
        assert!(!output.contains('<'));
    }

    #[test]
    fn test_dispatch_none_passes_through() {
        let output =
            ContextEncoder::encode("<raw>", EncodingTarget::None, false, None).unwrap();
        assert_eq!(output, "<raw>");
    }

    #[test]
    fn test_dispatch_empty_input_short_circuits() {
        let output = ContextEncoder::encode("", EncodingTarget::Html, true, None).unwrap();
        assert_eq!(output, "");
    }

    #[test]
    fn test_dispatch_canonicalizes_first() {
        let output =
            ContextEncoder::encode("%3Cscript%3E", EncodingTarget::Html, true, None).unwrap();
        assert_eq!(output, "&lt;script&gt;");
    }

    #[test]
    fn test_dispatch_sql_requires_codec() {
        let err = ContextEncoder::encode("x", EncodingTarget::Sql, false, None).unwrap_err();
        assert!(err.to_string().contains("dialect"));

        let codec = MySqlCodec::new(MySqlMode::Standard);
        let output =
            ContextEncoder::encode("o'brien", EncodingTarget::Sql, false, Some(&codec)).unwrap();
        assert_eq!(output, "o\\'brien");
    }

    #[test]
    fn test_dispatch_rejects_reserved_targets() {
        for target in [EncodingTarget::Base64, EncodingTarget::Os] {
            let err = ContextEncoder::encode("x", target, false, None).unwrap_err();
            assert_eq!(err.to_string(), "invalid target encoding definition");
        }
    }
}
