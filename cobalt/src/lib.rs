//! Compiler front-end for Cobalt, a statically-typed, single-inheritance,
//! class-based language targeting managed runtimes. Parses source text and
//! resolves it into a typed, de-sugared AST whose symbols carry runtime
//! metadata handles; instruction emission lives behind [`emit::EmitProvider`].

pub mod ast;
pub mod diagnostics;
pub mod emit;
pub mod import;
pub mod lexis;
pub mod names;
pub mod parse;
pub mod resolve;
pub mod symbols;

pub use diagnostics::{CompileResult, Diagnostic, FileRange, Reporter, Severity};
pub use emit::{EmitProvider, RuntimeHandle, TokenProvider};
pub use import::{CoreLibrary, MetadataSource};
pub use names::{Name, NamePool};
pub use resolve::{Compilation, CompileOptions};
