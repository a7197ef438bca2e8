//! Tag filter parsing

use anyhow::{Result, bail};

/// A `KEY=VALUE` tag match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub key: String,
    pub value: String,
}

/// Parse a `KEY=VALUE` filter. An empty input means no filter.
///
/// Key and value are trimmed; the value may be empty and may itself
/// contain `=`.
pub fn parse_tag_filter(raw: &str) -> Result<Option<TagFilter>> {
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(Some(TagFilter {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        })),
        _ => bail!("--filter-tag must use KEY=VALUE format"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_means_no_filter() {
        assert_eq!(parse_tag_filter("").unwrap(), None);
    }

    #[test]
    fn parses_and_trims() {
        assert_eq!(
            parse_tag_filter(" env = prod ").unwrap(),
            Some(TagFilter {
                key: "env".into(),
                value: "prod".into()
            })
        );
        assert_eq!(
            parse_tag_filter("expr=a=b").unwrap().unwrap().value,
            "a=b"
        );
        assert_eq!(parse_tag_filter("team=").unwrap().unwrap().value, "");
    }

    #[test]
    fn rejects_malformed_filters() {
        for raw in ["env", "=prod", "  =x"] {
            let err = parse_tag_filter(raw).unwrap_err();
            assert_eq!(err.to_string(), "--filter-tag must use KEY=VALUE format");
        }
    }
}
