use crate::diagnostics::FileRange;
use crate::symbols::{EventId, FieldId, LocalId, MethodId, NamespaceId, ParamId, PropertyId, ScopeId, TypeGenre, TypeId};
use crate::symbols::Modifiers;

use super::exprs::{Expr, Flow};
use super::sigs::TypeSig;
use super::stmts::{BlockStmt, CtorChainStmt};
use super::{DottedPath, Ident};

/// Root of a compilation: the global namespace blocks of every source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
	pub namespaces: Vec<NamespaceDecl>,
}

/// One `namespace N { ... }` block, or a file's implicit global block
/// (`name` is `None`). Blocks naming the same namespace share one symbol
/// but keep their own proxy scope and using directives.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
	pub name: Option<DottedPath>,
	pub usings: Vec<UsingDirective>,
	pub namespaces: Vec<NamespaceDecl>,
	pub types: Vec<TypeDecl>,
	pub sym: Option<NamespaceId>,
	pub scope: Option<ScopeId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsingDirective {
	/// `using N = A.B;`
	Alias { alias: Ident, target: DottedPath, range: FileRange },
	/// `using A.B;`
	Path { target: DottedPath, range: FileRange },
}

impl UsingDirective {
	pub fn range(&self) -> FileRange {
		match self {
			UsingDirective::Alias { range, .. } => *range,
			UsingDirective::Path { range, .. } => *range,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
	Class(ClassDecl),
	Enum(EnumDecl),
}

impl TypeDecl {
	pub fn name(&self) -> Ident {
		match self {
			TypeDecl::Class(decl) => decl.name,
			TypeDecl::Enum(decl) => decl.name,
		}
	}

	pub fn sym(&self) -> Option<TypeId> {
		match self {
			TypeDecl::Class(decl) => decl.sym,
			TypeDecl::Enum(decl) => decl.sym,
		}
	}

	pub fn range(&self) -> FileRange {
		match self {
			TypeDecl::Class(decl) => decl.range,
			TypeDecl::Enum(decl) => decl.range,
		}
	}
}

/// Class, struct or interface. Delegates are parsed into a sealed class
/// flagged `is_delegate`, carrying the synthesized `Invoke` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
	pub name: Ident,
	pub genre: TypeGenre,
	pub modifiers: Modifiers,
	pub bases: Vec<TypeSig>,
	pub fields: Vec<FieldDecl>,
	pub methods: Vec<MethodDecl>,
	pub properties: Vec<PropertyDecl>,
	pub events: Vec<EventDecl>,
	pub nested: Vec<TypeDecl>,
	pub is_delegate: bool,
	pub sym: Option<TypeId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
	pub name: Ident,
	pub modifiers: Modifiers,
	pub members: Vec<EnumMemberDecl>,
	pub sym: Option<TypeId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
	pub name: Ident,
	pub value: Option<i32>,
	pub sym: Option<FieldId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
	pub name: Ident,
	pub sig: TypeSig,
	pub modifiers: Modifiers,
	pub init: Option<Expr>,
	pub sym: Option<FieldId>,
	pub range: FileRange,
}

/// `ret` of `None` marks a constructor. Synthesized declarations (property
/// accessors, event accessors, initializer holders) are flagged so they can
/// skip the checks that only user-written members are subject to.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
	pub name: Ident,
	pub ret: Option<TypeSig>,
	pub params: Vec<ParamVarDecl>,
	pub body: Option<BlockStmt>,
	pub modifiers: Modifiers,
	pub ctor_chain: Option<CtorChainStmt>,
	pub special_name: bool,
	pub synthesized: bool,
	pub sym: Option<MethodId>,
	pub scope: Option<ScopeId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamVarDecl {
	pub name: Ident,
	pub sig: TypeSig,
	pub flow: Flow,
	pub sym: Option<ParamId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl {
	pub name: Ident,
	pub sig: TypeSig,
	pub sym: Option<LocalId>,
	pub range: FileRange,
}

/// A `get`/`set`/`add`/`remove` accessor body; `None` body on abstract
/// accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorDecl {
	pub body: Option<BlockStmt>,
	pub range: FileRange,
}

/// Properties and indexers; indexers carry `params` and the reserved name.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
	pub name: Ident,
	pub sig: TypeSig,
	pub modifiers: Modifiers,
	pub params: Vec<ParamVarDecl>,
	pub getter: Option<AccessorDecl>,
	pub setter: Option<AccessorDecl>,
	pub is_indexer: bool,
	pub sym: Option<PropertyId>,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
	pub name: Ident,
	pub sig: TypeSig,
	pub modifiers: Modifiers,
	pub add: Option<AccessorDecl>,
	pub remove: Option<AccessorDecl>,
	pub sym: Option<EventId>,
	pub range: FileRange,
}
