//! Relation-keyed links shared by License and Status Documents.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Link relations used by LCP documents.
pub mod rel {
    pub const HINT: &str = "hint";
    pub const PUBLICATION: &str = "publication";
    pub const SELF: &str = "self";
    pub const SUPPORT: &str = "support";
    pub const STATUS: &str = "status";
    pub const REGISTER: &str = "register";
    pub const LICENSE: &str = "license";
    pub const RETURN: &str = "return";
    pub const RENEW: &str = "renew";
}

/// Media types the engine looks for on links.
pub mod media_type {
    pub const LICENSE: &str = "application/vnd.readium.lcp.license.v1.0+json";
    pub const STATUS: &str = "application/vnd.readium.license.status.v1.0+json";
    pub const HTML: &str = "text/html";
}

/// A link object. `rel` may be a single string or an array in the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(deserialize_with = "rels_from_json", serialize_with = "rels_to_json")]
    pub rel: Vec<String>,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RelValue {
    One(String),
    Many(Vec<String>),
}

fn rels_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match RelValue::deserialize(deserializer)? {
        RelValue::One(rel) => vec![rel],
        RelValue::Many(rels) => rels,
    })
}

fn rels_to_json<S: Serializer>(rels: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    match rels {
        [one] => serializer.serialize_str(one),
        many => many.serialize(serializer),
    }
}

impl Link {
    /// Creates a plain link with a single relation.
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: vec![rel.into()],
            href: href.into(),
            media_type: None,
            title: None,
            profile: None,
            templated: false,
            length: None,
            hash: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    #[must_use]
    pub fn templated(mut self) -> Self {
        self.templated = true;
        self
    }

    #[must_use]
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rel.iter().any(|r| r == rel)
    }

    /// Resolves the link to a URL carrying `params`.
    ///
    /// Templated links have their `{...}` expressions expanded (RFC 6570
    /// simple and form-query styles). Other links get the parameters appended
    /// as a query string.
    #[must_use]
    pub fn url(&self, params: &[(&str, String)]) -> String {
        if self.templated {
            return expand_template(&self.href, params);
        }
        if params.is_empty() {
            return self.href.clone();
        }
        let separator = if self.href.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.href, separator, encode_pairs(params.iter().map(|(k, v)| (*k, v.as_str()))))
    }
}

/// Finds the first link with `rel`, preferring one whose type is `preferred_type`.
pub(crate) fn find<'a>(
    links: &'a [Link],
    rel: &str,
    preferred_type: Option<&str>,
) -> Option<&'a Link> {
    let mut candidates = links.iter().filter(|l| l.has_rel(rel));
    match preferred_type {
        None => candidates.next(),
        Some(wanted) => {
            let all: Vec<&Link> = candidates.collect();
            all.iter()
                .find(|l| l.media_type.as_deref() == Some(wanted))
                .or_else(|| all.iter().find(|l| l.media_type.is_none()))
                .or_else(|| all.first())
                .copied()
        }
    }
}

fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn expand_template(template: &str, params: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            // unterminated expression, keep it literally
            out.push_str(&rest[open..]);
            return out;
        };
        let expression = &rest[open + 1..open + close];
        out.push_str(&expand_expression(expression, params));
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

fn expand_expression(expression: &str, params: &[(&str, String)]) -> String {
    let (operator, names) = match expression.chars().next() {
        Some(op @ ('?' | '&')) => (Some(op), &expression[1..]),
        _ => (None, expression),
    };
    let lookup = |name: &str| params.iter().find(|(k, _)| *k == name);

    match operator {
        Some(op) => {
            let present: Vec<&(&str, String)> =
                names.split(',').map(str::trim).filter_map(lookup).collect();
            if present.is_empty() {
                return String::new();
            }
            format!(
                "{op}{}",
                encode_pairs(present.into_iter().map(|(k, v)| (*k, v.as_str())))
            )
        }
        None => names
            .split(',')
            .map(str::trim)
            .filter_map(lookup)
            .map(|(_, v)| urlencoding::encode(v).into_owned())
            .collect::<Vec<_>>()
            .join(","),
    }
}
