//! Code generation from XSD schemas.
//!
//! The schema is read and resolved by [`xsdgen_front`]; [`orchestrator`]
//! then walks the resolved types in dependency order and hands each one to an
//! [`Emitter`] for the selected target language.

pub mod config;
pub mod emitter;
pub mod generators;
pub mod orchestrator;
pub mod output;

pub use config::{AccessorStyle, Config, ConfigError, MethodSpec};
pub use emitter::{Emitter, Field, FieldKind, FieldType};
pub use generators::Generator;
pub use orchestrator::{generate, GenerationReport, NodeState};
pub use output::write_output;

use xsdgen_front::{read_schema, Diagnostics, Options, XsdError};

/// Everything one run produces.
#[derive(Debug)]
pub struct Generated {
    pub code: String,
    pub report: GenerationReport,
    /// Resolver diagnostics followed by generation diagnostics.
    pub diagnostics: Diagnostics,
}

/// Reads `source`, resolves it and renders every type through `emitter`.
pub fn generate_source(
    source: &str,
    namespace_prefix: Option<String>,
    config: &Config,
    emitter: &mut dyn Emitter,
) -> Result<Generated, XsdError> {
    let options = Options {
        namespace_prefix,
        name_table: config.name_table.clone(),
    };
    let (model, mut diagnostics) = read_schema(source, &options)?;
    let report = generate(&model, config, &mut *emitter);
    diagnostics.extend(report.diagnostics.clone());
    Ok(Generated {
        code: emitter.finish(),
        report,
        diagnostics,
    })
}
