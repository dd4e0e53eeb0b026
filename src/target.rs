use crate::error::{GuardError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Output context a value is encoded for.
///
/// `Base64` and `Os` are reserved variants: no registry alias maps to them
/// and the dispatcher rejects them, but they keep the enumeration aligned
/// with the wire-level target codes callers may persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingTarget {
    Base64,
    Css,
    Dn,
    Html,
    HtmlAttribute,
    JavaScript,
    Ldap,
    Os,
    Sql,
    Url,
    VbScript,
    Xml,
    XmlAttribute,
    XPath,
    None,
}

/// Canonical names callers are told about when they pass an unknown target.
/// `url` resolves but is intentionally absent from this list.
const VALID_TARGET_NAMES: &str =
    "[css,dn,html,html_attr,javascript,ldap,sql,vbscript,xml,xml_attr,xpath]";

static ALIASES: Lazy<HashMap<&'static str, EncodingTarget>> = Lazy::new(|| {
    use EncodingTarget::*;
    let mut map = HashMap::new();

    map.insert("css", Css);
    map.insert("dn", Dn);
    map.insert("html", Html);

    for alias in [
        "html_attr",
        "htmlattr",
        "html-attr",
        "html attr",
        "htmlattribute",
        "html_attributes",
        "htmlattributes",
        "html-attributes",
        "html attributes",
    ] {
        map.insert(alias, HtmlAttribute);
    }

    for alias in ["js", "javascript", "java_script", "java script", "java-script"] {
        map.insert(alias, JavaScript);
    }

    map.insert("ldap", Ldap);
    map.insert("", EncodingTarget::None);
    map.insert("none", EncodingTarget::None);
    map.insert("sql", Sql);
    map.insert("url", Url);

    for alias in ["vbs", "vbscript", "vb-script", "vb_script", "vb script"] {
        map.insert(alias, VbScript);
    }

    map.insert("xml", Xml);

    for alias in [
        "xmlattr",
        "xml attr",
        "xml-attr",
        "xml_attr",
        "xmlattribute",
        "xmlattributes",
        "xml attributes",
        "xml-attributes",
        "xml_attributes",
    ] {
        map.insert(alias, XmlAttribute);
    }

    map.insert("xpath", XPath);

    map
});

impl EncodingTarget {
    /// Resolve a human-supplied context name to a target.
    ///
    /// Lookup is case-insensitive and whitespace-trimmed; unknown names
    /// return `Option::None` so the caller can build a descriptive error.
    pub fn resolve(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        ALIASES.get(normalized.as_str()).copied()
    }

    /// Resolve a context name, failing with the list of supported names.
    pub fn parse(name: &str) -> Result<Self> {
        Self::resolve(name).ok_or_else(|| {
            GuardError::Configuration(format!(
                "value [{}] is invalid, valid values are {}",
                name, VALID_TARGET_NAMES
            ))
        })
    }
}
