pub mod decls;
pub mod exprs;
pub mod sigs;
pub mod stmts;

pub use decls::*;
pub use exprs::*;
pub use sigs::*;
pub use stmts::*;

use crate::diagnostics::FileRange;
use crate::names::{Name, NamePool};

/// A user-written name together with where it was written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ident {
	pub name: Name,
	pub range: FileRange,
}

impl Ident {
	pub fn new(name: Name, range: FileRange) -> Self {
		Ident { name, range }
	}
}

/// `A.B.C` as written in source. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedPath {
	pub parts: Vec<Ident>,
}

impl DottedPath {
	pub fn single(ident: Ident) -> Self {
		DottedPath { parts: vec![ident] }
	}

	pub fn range(&self) -> FileRange {
		let first = self.parts.first().map(|i| i.range).unwrap_or(FileRange::NONE);
		let last = self.parts.last().map(|i| i.range).unwrap_or(FileRange::NONE);
		first.through(last)
	}

	pub fn render(&self, pool: &NamePool) -> String {
		let mut out = String::new();
		for (i, part) in self.parts.iter().enumerate() {
			if i > 0 {
				out.push('.');
			}
			out.push_str(pool.get(part.name));
		}
		out
	}
}
