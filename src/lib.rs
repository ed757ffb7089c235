//! Static file mount with precompressed variants and SPA fallback.
//!
//! A request path is cleaned into a document name under the mount root. The
//! name is opened as `name.br`, `name.gz`, ... when the client accepts those
//! encodings, or as-is otherwise. Misses go to the next handler in the chain
//! and, in SPA mode, end at the root index document.

pub mod args;
pub mod compression;
pub mod config;
pub mod error;
pub mod file_serving;
pub mod fs;
pub mod http;
pub mod logging;
pub mod server;

pub use config::{Settings, StaticConfig};
pub use error::ServeError;
pub use file_serving::handlers::StaticFiles;
pub use http::{Handler, NotFoundHandler, Request, Response, Route};
