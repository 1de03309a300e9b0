//! URL templates: literal fragments interleaved with typed parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::pipeline::validation::{Decoded, StringValidator, ValidationError};
use crate::routing::pattern;
use crate::routing::types::BuildResult;

/// Pattern accepting any non-empty path segment.
pub const DEFAULT_PARAMETER_PATTERN: &str = "[^/]+";

type ErasedStringValidator = Box<dyn Fn(&str) -> Result<Decoded, ValidationError> + Send + Sync>;

/// A declared URL parameter with its match pattern and its validator.
pub struct UrlParameter {
    name: String,
    pattern: String,
    validator: ErasedStringValidator,
}

impl UrlParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Run the parameter's validator on one captured segment.
    pub fn validate(&self, raw: &str) -> Result<Decoded, ValidationError> {
        (self.validator)(raw)
    }
}

impl fmt::Debug for UrlParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlParameter")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// An endpoint URL, e.g. `/thing/{id}`.
///
/// Always has one more fragment than parameters.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    fragments: Vec<String>,
    parameters: Arc<[UrlParameter]>,
}

impl UrlTemplate {
    /// Template made of a single literal path.
    pub fn literal(path: impl Into<String>) -> Self {
        Self::builder().literal(path).build()
    }

    pub fn builder() -> UrlTemplateBuilder {
        UrlTemplateBuilder {
            fragments: vec![String::new()],
            parameters: Vec::new(),
        }
    }

    pub fn parameters(&self) -> &Arc<[UrlParameter]> {
        &self.parameters
    }

    /// Compile into a regex source under `group_prefix`.
    pub fn compile(&self, group_prefix: &str) -> BuildResult<String> {
        let fragments: Vec<&str> = self.fragments.iter().map(String::as_str).collect();
        let names: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        let patterns: BTreeMap<String, String> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.pattern.clone()))
            .collect();
        pattern::compile(&fragments, &names, &patterns, group_prefix)
    }

    /// Human-readable form with `{name}` placeholders.
    pub fn render(&self, url_prefix: &str) -> String {
        let mut out = String::from(url_prefix);
        out.push_str(&self.fragments[0]);
        for (param, fragment) in self.parameters.iter().zip(&self.fragments[1..]) {
            out.push('{');
            out.push_str(&param.name);
            out.push('}');
            out.push_str(fragment);
        }
        out
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(""))
    }
}

/// Builder for [`UrlTemplate`].
pub struct UrlTemplateBuilder {
    fragments: Vec<String>,
    parameters: Vec<UrlParameter>,
}

impl UrlTemplateBuilder {
    /// Append literal text.
    pub fn literal(mut self, text: impl Into<String>) -> Self {
        if let Some(last) = self.fragments.last_mut() {
            last.push_str(&text.into());
        }
        self
    }

    /// Append a parameter matched by `pattern` and decoded by `validator`.
    ///
    /// Names and patterns are checked when the endpoint tree is compiled.
    pub fn param<V>(mut self, name: impl Into<String>, pattern: impl Into<String>, validator: V) -> Self
    where
        V: StringValidator,
    {
        self.parameters.push(UrlParameter {
            name: name.into(),
            pattern: pattern.into(),
            validator: Box::new(move |raw: &str| {
                validator.validate(raw).map(|value| Box::new(value) as Decoded)
            }),
        });
        self.fragments.push(String::new());
        self
    }

    pub fn build(self) -> UrlTemplate {
        UrlTemplate {
            fragments: self.fragments,
            parameters: self.parameters.into(),
        }
    }
}
