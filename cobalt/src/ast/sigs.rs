use crate::diagnostics::FileRange;
use crate::symbols::TypeId;

use super::DottedPath;

/// Type signatures as written in source. `Resolved` is the pre-bound form
/// the resolver substitutes once a signature has been looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
	Simple(SimpleTypeSig),
	Array(Box<ArrayTypeSig>),
	Ref(Box<RefTypeSig>),
	Resolved(ResolvedTypeSig),
}

impl TypeSig {
	pub fn range(&self) -> FileRange {
		match self {
			TypeSig::Simple(sig) => sig.range,
			TypeSig::Array(sig) => sig.range,
			TypeSig::Ref(sig) => sig.range,
			TypeSig::Resolved(sig) => sig.range,
		}
	}

	pub fn resolved(ty: TypeId, range: FileRange) -> TypeSig {
		TypeSig::Resolved(ResolvedTypeSig { ty, range })
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleTypeSig {
	pub path: DottedPath,
	pub range: FileRange,
}

/// One rank of `T[]`/`T[,]`. For `X[][,,][,]` the left-most brackets are
/// outermost: an array of arrays-of-three-dims of arrays-of-two-dims of X.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayTypeSig {
	pub elem: TypeSig,
	pub rank: u32,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTypeSig {
	pub inner: TypeSig,
	pub range: FileRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTypeSig {
	pub ty: TypeId,
	pub range: FileRange,
}
