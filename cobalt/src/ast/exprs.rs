use crate::diagnostics::FileRange;
use crate::names::Name;
use crate::symbols::{EventId, FieldId, LocalId, MethodId, NamespaceId, ParamId, PropertyId, TypeId};

use super::sigs::{ArrayTypeSig, SimpleTypeSig, TypeSig};
use super::{DottedPath, Ident};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	And,
	Or,
	Eq,
	NotEq,
	Less,
	Greater,
	LessEq,
	GreaterEq,
	BitAnd,
	BitOr,
	BitXor,
	Shl,
	Shr,
}

impl BinOp {
	pub fn text(self) -> &'static str {
		match self {
			BinOp::Add => "+",
			BinOp::Sub => "-",
			BinOp::Mul => "*",
			BinOp::Div => "/",
			BinOp::Rem => "%",
			BinOp::And => "&&",
			BinOp::Or => "||",
			BinOp::Eq => "==",
			BinOp::NotEq => "!=",
			BinOp::Less => "<",
			BinOp::Greater => ">",
			BinOp::LessEq => "<=",
			BinOp::GreaterEq => ">=",
			BinOp::BitAnd => "&",
			BinOp::BitOr => "|",
			BinOp::BitXor => "^",
			BinOp::Shl => "<<",
			BinOp::Shr => ">>",
		}
	}

	pub fn is_comparison(self) -> bool {
		matches!(self, BinOp::Eq | BinOp::NotEq | BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq)
	}

	/// Fixed operator-to-method-name table for user-defined operators.
	/// The short-circuiting forms are not overloadable.
	pub fn method_name(self) -> Option<&'static str> {
		match self {
			BinOp::Add => Some("op_Addition"),
			BinOp::Sub => Some("op_Subtraction"),
			BinOp::Mul => Some("op_Multiply"),
			BinOp::Div => Some("op_Division"),
			BinOp::Rem => Some("op_Modulus"),
			BinOp::Eq => Some("op_Equality"),
			BinOp::NotEq => Some("op_Inequality"),
			BinOp::Less => Some("op_LessThan"),
			BinOp::Greater => Some("op_GreaterThan"),
			BinOp::LessEq => Some("op_LessThanOrEqual"),
			BinOp::GreaterEq => Some("op_GreaterThanOrEqual"),
			BinOp::BitAnd => Some("op_BitwiseAnd"),
			BinOp::BitOr => Some("op_BitwiseOr"),
			BinOp::BitXor => Some("op_ExclusiveOr"),
			BinOp::Shl => Some("op_LeftShift"),
			BinOp::Shr => Some("op_RightShift"),
			BinOp::And | BinOp::Or => None,
		}
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnOp {
	Neg,
	Not,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IncDecOp {
	Increment,
	Decrement,
}

/// Parameter passing mode for arguments and parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Flow {
	In,
	Out,
	Ref,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LiteralKind {
	Null,
	Int(i32),
	Bool(bool),
	Char(char),
	Str(Name),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Literal(Literal),
	Binary(Box<BinaryExpr>),
	Unary(Box<UnaryExpr>),
	Is(Box<IsExpr>),
	Cast(Box<CastExpr>),
	Cond(Box<CondExpr>),
	TypeOf(Box<TypeOfExpr>),
	New(Box<NewObjExpr>),
	NewArray(Box<NewArrayExpr>),
	Index(Box<IndexExpr>),
	Call(Box<CallExpr>),
	Arg(Box<ArgExpr>),
	Assign(Box<AssignExpr>),
	IncDec(Box<IncDecExpr>),
	Compound(Box<CompoundExpr>),
	DeclareLocal(Box<DeclareLocalExpr>),

	// Placeholders; none of these survives body resolution.
	SimpleName(Box<SimpleNameExpr>),
	DotName(Box<DotNameExpr>),
	TempType(Box<TempTypeExpr>),
	This(ThisExpr),
	Base(BaseExpr),

	// Resolved-only forms.
	Local(Box<LocalExpr>),
	Param(Box<ParamExpr>),
	Field(Box<FieldExpr>),
	Prop(Box<PropExpr>),
	Event(Box<EventExpr>),
	MethodGroup(Box<MethodGroupExpr>),
	NamespaceRef(Box<NamespaceRefExpr>),
	TypeRef(Box<TypeRefExpr>),
	MethodPtr(Box<MethodPtrExpr>),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Literal {
	pub kind: LiteralKind,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
	pub op: BinOp,
	pub left: Expr,
	pub right: Expr,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
	pub op: UnOp,
	pub operand: Expr,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsExpr {
	pub operand: Expr,
	pub target: TypeSig,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// `(T) e` and `e as T`.
#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
	pub operand: Expr,
	pub target: TypeSig,
	pub as_style: bool,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondExpr {
	pub cond: Expr,
	pub then: Expr,
	pub other: Expr,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeOfExpr {
	pub target: TypeSig,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewObjExpr {
	pub target: TypeSig,
	pub args: Vec<Expr>,
	pub ctor: Option<MethodId>,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArrayExpr {
	pub elem: TypeSig,
	pub rank: u32,
	pub lengths: Vec<Expr>,
	pub init: Option<Vec<Expr>>,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// `a[i]`; becomes an indexer accessor call when `a` is not an array.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
	pub target: Expr,
	pub indices: Vec<Expr>,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// Raw form: `callee` holds the written target and `method` is unset.
/// Resolution consumes `callee`, fills `method` and leaves the receiver
/// expression (instance calls keep one, static calls none).
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
	pub callee: Option<Expr>,
	pub receiver: Option<Expr>,
	pub args: Vec<Expr>,
	pub method: Option<MethodId>,
	pub virtual_call: bool,
	pub vararg: bool,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// Flow-tagged argument wrapper (`ref x`, `out x`).
#[derive(Debug, Clone, PartialEq)]
pub struct ArgExpr {
	pub flow: Flow,
	pub operand: Expr,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpr {
	pub target: Expr,
	pub value: Expr,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncDecExpr {
	pub op: IncDecOp,
	pub prefix: bool,
	pub target: Expr,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// Sequenced side effects followed by a value; the shape array and property
/// lowerings produce.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundExpr {
	pub effects: Vec<Expr>,
	pub value: Expr,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// Declares a synthesized temporary; only resolution creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclareLocalExpr {
	pub local: LocalId,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleNameExpr {
	pub ident: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotNameExpr {
	pub left: Expr,
	pub member: Ident,
	pub range: FileRange,
}

/// Array-type scaffolding: `X[]` in expression position, kept until the
/// statement parser decides whether it was a type.
#[derive(Debug, Clone, PartialEq)]
pub struct TempTypeExpr {
	pub sig: TypeSig,
	pub range: FileRange,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ThisExpr {
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BaseExpr {
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalExpr {
	pub local: LocalId,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamExpr {
	pub param: ParamId,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
	pub field: FieldId,
	pub receiver: Option<Expr>,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropExpr {
	pub prop: PropertyId,
	pub receiver: Option<Expr>,
	/// `base.P`: accessor calls must not dispatch virtually.
	pub base_access: bool,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventExpr {
	pub event: EventId,
	pub receiver: Option<Expr>,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

/// A named method before overload selection. Consumed by call resolution or
/// delegate construction; never survives. Overload search starts at
/// `on_type` and walks its base chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodGroupExpr {
	pub name: Name,
	pub on_type: TypeId,
	pub receiver: Option<Expr>,
	pub base_call: bool,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRefExpr {
	pub namespace: NamespaceId,
	pub range: FileRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRefExpr {
	pub referenced: TypeId,
	pub range: FileRange,
}

/// Method-pointer operand of a delegate construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodPtrExpr {
	pub method: MethodId,
	pub range: FileRange,
	pub ty: Option<TypeId>,
}

impl Expr {
	pub fn range(&self) -> FileRange {
		match self {
			Expr::Literal(e) => e.range,
			Expr::Binary(e) => e.range,
			Expr::Unary(e) => e.range,
			Expr::Is(e) => e.range,
			Expr::Cast(e) => e.range,
			Expr::Cond(e) => e.range,
			Expr::TypeOf(e) => e.range,
			Expr::New(e) => e.range,
			Expr::NewArray(e) => e.range,
			Expr::Index(e) => e.range,
			Expr::Call(e) => e.range,
			Expr::Arg(e) => e.range,
			Expr::Assign(e) => e.range,
			Expr::IncDec(e) => e.range,
			Expr::Compound(e) => e.range,
			Expr::DeclareLocal(e) => e.range,
			Expr::SimpleName(e) => e.ident.range,
			Expr::DotName(e) => e.range,
			Expr::TempType(e) => e.range,
			Expr::This(e) => e.range,
			Expr::Base(e) => e.range,
			Expr::Local(e) => e.range,
			Expr::Param(e) => e.range,
			Expr::Field(e) => e.range,
			Expr::Prop(e) => e.range,
			Expr::Event(e) => e.range,
			Expr::MethodGroup(e) => e.range,
			Expr::NamespaceRef(e) => e.range,
			Expr::TypeRef(e) => e.range,
			Expr::MethodPtr(e) => e.range,
		}
	}

	/// Resolved type. `None` is legal only for null literals, conditionals
	/// with two null arms, arg wrappers over null, and namespace values.
	pub fn ty(&self) -> Option<TypeId> {
		match self {
			Expr::Literal(e) => e.ty,
			Expr::Binary(e) => e.ty,
			Expr::Unary(e) => e.ty,
			Expr::Is(e) => e.ty,
			Expr::Cast(e) => e.ty,
			Expr::Cond(e) => e.ty,
			Expr::TypeOf(e) => e.ty,
			Expr::New(e) => e.ty,
			Expr::NewArray(e) => e.ty,
			Expr::Index(e) => e.ty,
			Expr::Call(e) => e.ty,
			Expr::Arg(e) => e.operand.ty(),
			Expr::Assign(e) => e.ty,
			Expr::IncDec(e) => e.ty,
			Expr::Compound(e) => e.ty,
			Expr::DeclareLocal(e) => e.ty,
			Expr::This(e) => e.ty,
			Expr::Local(e) => e.ty,
			Expr::Param(e) => e.ty,
			Expr::Field(e) => e.ty,
			Expr::Prop(e) => e.ty,
			Expr::Event(e) => e.ty,
			Expr::MethodPtr(e) => e.ty,
			Expr::SimpleName(_)
			| Expr::DotName(_)
			| Expr::TempType(_)
			| Expr::Base(_)
			| Expr::MethodGroup(_)
			| Expr::NamespaceRef(_)
			| Expr::TypeRef(_) => None,
		}
	}

	/// Whether the expression may stand alone as a statement.
	pub fn is_statement_expr(&self) -> bool {
		matches!(
			self,
			Expr::Assign(_) | Expr::Call(_) | Expr::IncDec(_) | Expr::New(_) | Expr::Compound(_) | Expr::DeclareLocal(_)
		)
	}

	/// Reinterpret an expression as the type signature it spells, if any.
	/// This is how statement parsing decides that `A.B[] x;` declared a
	/// local rather than indexed a value.
	pub fn into_type_sig(self) -> Option<TypeSig> {
		match self {
			Expr::SimpleName(e) => {
				let range = e.ident.range;
				Some(TypeSig::Simple(SimpleTypeSig { path: DottedPath::single(e.ident), range }))
			}
			Expr::DotName(e) => {
				let mut sig = match e.left.into_type_sig()? {
					TypeSig::Simple(sig) => sig,
					_ => return None,
				};
				sig.range = sig.range.through(e.member.range);
				sig.path.parts.push(e.member);
				Some(TypeSig::Simple(sig))
			}
			Expr::TempType(e) => Some(e.sig),
			_ => None,
		}
	}
}
