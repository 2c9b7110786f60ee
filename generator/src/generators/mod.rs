#[cfg(feature = "generator-rust")]
mod rust;
#[cfg(feature = "generator-typescript")]
mod typescript;

#[cfg(not(any(feature = "generator-rust", feature = "generator-typescript")))]
compile_error!("At least one generator must be enabled");

use clap::ValueEnum;

use crate::emitter::Emitter;

#[cfg(feature = "generator-rust")]
pub use rust::RustEmitter;
#[cfg(feature = "generator-typescript")]
pub use typescript::TypescriptEmitter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Generator {
    #[cfg(feature = "generator-rust")]
    Rust,
    #[cfg(feature = "generator-typescript")]
    Typescript,
}

impl Generator {
    pub fn emitter(&self) -> Box<dyn Emitter> {
        match *self {
            #[cfg(feature = "generator-rust")]
            Self::Rust => Box::new(RustEmitter::new()),
            #[cfg(feature = "generator-typescript")]
            Self::Typescript => Box::new(TypescriptEmitter::new()),
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        #[cfg(feature = "generator-rust")]
        return Self::Rust;
        #[cfg(not(feature = "generator-rust"))]
        return Self::Typescript;
    }
}
