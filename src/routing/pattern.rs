//! URL pattern compilation.
//!
//! # Responsibilities
//! - Turn one URL template into a single regex source
//! - Escape literal fragments so they match verbatim
//! - Emit one named capture group per parameter
//!
//! # Design Decisions
//! - Pure function, no anchoring (the combinator anchors sub-patterns)
//! - Group name is `{group_prefix}{parameter}` so nested trees stay unique
//! - Fails fast on a parameter without a pattern

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::routing::types::{BuildError, BuildResult};

/// Compile a URL template into a regex source string.
///
/// `fragments` must hold exactly one more entry than `parameter_names`: the
/// template reads `fragments[0] {names[0]} fragments[1] ... fragments[n]`.
pub fn compile(
    fragments: &[&str],
    parameter_names: &[&str],
    parameter_patterns: &BTreeMap<String, String>,
    group_prefix: &str,
) -> BuildResult<String> {
    if fragments.len() != parameter_names.len() + 1 {
        return Err(BuildError::MalformedTemplate {
            fragments: fragments.len(),
            parameters: parameter_names.len(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut source = regex::escape(fragments[0]);
    for (name, fragment) in parameter_names.iter().zip(&fragments[1..]) {
        validate_parameter_name(name)?;
        if !seen.insert(*name) {
            return Err(BuildError::DuplicateParameter(name.to_string()));
        }
        let pattern = parameter_patterns
            .get(*name)
            .ok_or_else(|| BuildError::MissingParameterPattern(name.to_string()))?;
        check_pattern(pattern)?;

        source.push_str("(?<");
        source.push_str(&group_name(group_prefix, name));
        source.push('>');
        source.push_str(pattern);
        source.push(')');
        source.push_str(&regex::escape(fragment));
    }

    Ok(source)
}

/// Capture group name used for a parameter under a given prefix.
pub fn group_name(group_prefix: &str, parameter: &str) -> String {
    format!("{group_prefix}{parameter}")
}

/// Parameter names end up inside regex group names.
pub fn validate_parameter_name(name: &str) -> BuildResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidParameterName(name.to_string()))
    }
}

fn check_pattern(pattern: &str) -> BuildResult<()> {
    Regex::new(pattern).map(|_| ()).map_err(|e| BuildError::Regex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_literal_only() {
        let source = compile(&["/thing"], &[], &BTreeMap::new(), "e_0_").unwrap();
        assert_eq!(source, "/thing");
    }

    #[test]
    fn test_parameters_get_prefixed_groups() {
        let source = compile(
            &["/thing/", "/sub/", ""],
            &["id", "sub"],
            &patterns(&[("id", "[0-9]+"), ("sub", "[^/]+")]),
            "e_1_",
        )
        .unwrap();
        assert_eq!(source, "/thing/(?<e_1_id>[0-9]+)/sub/(?<e_1_sub>[^/]+)");

        let re = Regex::new(&format!("^{source}$")).unwrap();
        let caps = re.captures("/thing/42/sub/abc").unwrap();
        assert_eq!(&caps["e_1_id"], "42");
        assert_eq!(&caps["e_1_sub"], "abc");
    }

    #[test]
    fn test_literals_are_escaped() {
        let source = compile(&["/a.b+c"], &[], &BTreeMap::new(), "").unwrap();
        let re = Regex::new(&format!("^{source}$")).unwrap();
        assert!(re.is_match("/a.b+c"));
        assert!(!re.is_match("/axbbc"));
    }

    #[test]
    fn test_missing_pattern_fails() {
        let err = compile(&["/", ""], &["id"], &BTreeMap::new(), "").unwrap_err();
        assert_eq!(err, BuildError::MissingParameterPattern("id".into()));
    }

    #[test]
    fn test_invalid_name_and_duplicates() {
        let p = patterns(&[("a", ".+")]);
        assert!(matches!(
            compile(&["/", ""], &["a-b"], &p, ""),
            Err(BuildError::InvalidParameterName(_))
        ));
        assert!(matches!(
            compile(&["/", "/", ""], &["a", "a"], &p, ""),
            Err(BuildError::DuplicateParameter(_))
        ));
        assert!(matches!(
            compile(&["/"], &["a"], &p, ""),
            Err(BuildError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_bad_parameter_regex() {
        let p = patterns(&[("a", "([")]);
        assert!(matches!(
            compile(&["/", ""], &["a"], &p, ""),
            Err(BuildError::Regex { .. })
        ));
    }
}
