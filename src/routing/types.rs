//! Construction-time error definitions for the routing subsystem.

use thiserror::Error;

/// Errors raised while compiling an endpoint tree.
///
/// These only ever surface at startup. Once a [`RouteTable`](super::RouteTable)
/// exists, matching has no failure modes beyond an ordinary non-match.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The template names a parameter without supplying its pattern.
    #[error("URL parameter `{0}` has no matching pattern")]
    MissingParameterPattern(String),

    /// Parameter names become part of capture group names, so they are
    /// restricted to ASCII alphanumerics and underscores.
    #[error("URL parameter name `{0}` is not a valid identifier")]
    InvalidParameterName(String),

    /// The same parameter appears twice in one template.
    #[error("URL parameter `{0}` is declared more than once")]
    DuplicateParameter(String),

    /// Template fragments and parameters do not interleave correctly.
    #[error("URL template has {fragments} fragments for {parameters} parameters")]
    MalformedTemplate { fragments: usize, parameters: usize },

    /// A combinator was given no endpoints to combine.
    #[error("prefix `{0}` combines no endpoints")]
    EmptyCombination(String),

    /// The same method was registered twice on one URL.
    #[error("method {0} is registered more than once for the same URL")]
    DuplicateMethod(String),

    /// The combined pattern was rejected by the regex engine.
    #[error("pattern `{pattern}` failed to compile: {reason}")]
    Regex { pattern: String, reason: String },
}

/// Result type for endpoint compilation.
pub type BuildResult<T> = Result<T, BuildError>;
