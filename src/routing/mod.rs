//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     UrlTemplate + StaticHandler[]
//!     → url.rs / pattern.rs (template → regex source with named groups)
//!     → endpoint.rs (leaf endpoint, one handler per method)
//!     → prefix.rs (combine endpoints, one group per child)
//!     → table.rs (anchor, compile once, freeze)
//!
//! Incoming Request (method, path):
//!     → table.rs (single regex match over the whole tree)
//!     → prefix.rs (follow the set group down to the leaf)
//!     → dispatch.rs (method → static handler, or allowed methods)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)

pub mod dispatch;
pub mod endpoint;
pub mod pattern;
pub mod prefix;
pub mod table;
pub mod types;
pub mod url;

pub use dispatch::{Dispatch, MethodTable};
pub use endpoint::{CompiledEndpoint, Endpoint, HandlerResolver, UrlEndpoint};
pub use prefix::{prefix, PrefixedEndpoints};
pub use table::{MatchedGroups, RouteTable};
pub use types::{BuildError, BuildResult};
pub use url::{UrlParameter, UrlTemplate, UrlTemplateBuilder, DEFAULT_PARAMETER_PATTERN};
