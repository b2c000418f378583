//! # Parsify Engine
//!
//! The Parsify engine walks paginated HTTP APIs described by a handbook and
//! collects one ordered result sequence per parser scope.
//!
//! ## Key Features
//!
//! - **Odometer traversal**: multi-dimensional pagination (page within category
//!   within region, ...) driven by an explicit `iterables_order`
//! - **Chained extraction**: outputs of earlier chains feed the requests of
//!   later ones through `standard` and indexed `iterables` bindings
//! - **Pluggable transport**: requests go through the [`Transport`] trait, with
//!   [`HttpTransport`] as the production implementation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use parsify_engine::{Engine, EngineSettings, load_handbook_file};
//!
//! let handbook = load_handbook_file("handbook.yaml")?;
//! let mut engine = Engine::http(handbook, EngineSettings::default())?;
//! for (scope, values) in engine.run_all()? {
//!     println!("{scope}: {} values", values.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`iteration`**: per-field counters and the directives that move them
//! - **`cache`**: step name → extracted values for the current scope
//! - **`executor`**: one step invocation (bind, send, extract, merge)
//! - **`traversal`**: odometer traversal of a chain
//! - **`engine`**: parser selection, scope runs and the results map

use std::{fs, path::Path};

use parsify_types::{Handbook, HandbookError};

pub mod cache;
pub mod engine;
pub mod error;
pub mod executor;
pub mod iteration;
pub mod settings;
pub mod traversal;

#[cfg(test)]
mod testing;

pub use cache::ExtractionCache;
pub use engine::{Engine, ParserSelector, Selector, StepSelector};
pub use error::EngineError;
pub use executor::{HttpTransport, StepOutcome, StopReason, Transport, execute_step};
pub use iteration::{Directives, IterationState};
pub use settings::EngineSettings;
pub use traversal::ChainReport;

/// Loads and validates a handbook file.
///
/// Files ending in `.json` are decoded as JSON; anything else is read as YAML,
/// which also accepts JSON documents.
///
/// # Errors
/// Returns [`HandbookError::Io`] when the file cannot be read, and a decode or
/// validation error when its content is not a well-formed handbook. Either way
/// nothing has touched the network yet.
pub fn load_handbook_file(file_path: impl AsRef<Path>) -> Result<Handbook, HandbookError> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).map_err(|source| HandbookError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    let handbook = Handbook::from_str_for_path(&content, file_path)?;
    tracing::debug!(
        path = %file_path.display(),
        parsers = handbook.parsers.len(),
        "handbook loaded"
    );
    Ok(handbook)
}
