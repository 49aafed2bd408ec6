mod modifiers;
mod overloads;
mod scopes;

pub use modifiers::*;
pub use overloads::*;
pub use scopes::*;

use derivative::Derivative;
use paste::paste;

use crate::ast::Flow;
use crate::emit::RuntimeHandle;
use crate::names::{Name, NamePool};

macro_rules! define_symbol_ids {
	($($id: ident = $entry: ident),* $(,)?) => {
		$(
			#[repr(transparent)]
			#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
			pub struct $id(u32);

			impl $id {
				#[inline]
				pub fn index(self) -> usize {
					self.0 as usize
				}

				#[inline]
				pub(crate) fn new(index: usize) -> Self {
					Self(index as u32)
				}
			}

			impl nohash_hasher::IsEnabled for $id {}

			impl From<$id> for SymbolRef {
				fn from(value: $id) -> Self {
					SymbolRef::$entry(value)
				}
			}

			impl TryFrom<SymbolRef> for $id {
				type Error = ();
				fn try_from(value: SymbolRef) -> Result<Self, Self::Error> {
					match value {
						SymbolRef::$entry(id) => Ok(id),
						_ => Err(()),
					}
				}
			}
		)*

		/// A reference to any symbol entry, tagged by arena.
		#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
		pub enum SymbolRef {
			$($entry($id)),*
		}
	};
}

define_symbol_ids! {
	NamespaceId = Namespace,
	TypeId = Type,
	FieldId = Field,
	MethodId = Method,
	HeaderId = MethodHeader,
	PropertyId = Property,
	EventId = Event,
	LocalId = Local,
	ParamId = Param,
	LabelId = Label,
}

#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
	#[inline]
	pub fn index(self) -> usize {
		self.0 as usize
	}

	#[inline]
	pub(crate) fn new(index: usize) -> Self {
		Self(index as u32)
	}
}

impl nohash_hasher::IsEnabled for ScopeId {}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeGenre {
	Class,
	Struct,
	Interface,
}

/// Named types are interned by full dotted name; array and ref types are
/// structural (one entry per signature instance, compared by element and
/// rank). Enum entries carry their underlying numeric type.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TypeShape {
	Named,
	Array { elem: TypeId, rank: u32 },
	Ref { inner: TypeId },
	Enum { underlying: TypeId },
}

/// Resolution progress; `Resolving` is the cycle-detection flag.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum TypeState {
	Stub,
	Resolving,
	Linked,
	MembersReady,
}

#[derive(Debug)]
pub struct NamespaceSymbol {
	pub name: Name,
	pub full_name: Name,
	pub scope: ScopeId,
	pub parent: Option<NamespaceId>,
	pub imported: bool,
}

#[derive(Debug)]
pub struct TypeSymbol {
	pub name: Name,
	pub full_name: Name,
	pub genre: TypeGenre,
	pub shape: TypeShape,
	pub base: Option<TypeId>,
	pub interfaces: Vec<TypeId>,
	pub scope: Option<ScopeId>,
	pub containing: Option<TypeId>,
	pub namespace: Option<NamespaceId>,
	pub modifiers: Modifiers,
	pub imported: bool,
	pub is_delegate: bool,
	pub state: TypeState,
	pub handle: Option<RuntimeHandle>,
}

impl TypeSymbol {
	pub fn is_interface(&self) -> bool {
		self.genre == TypeGenre::Interface
	}
}

#[derive(Debug)]
pub struct FieldSymbol {
	pub name: Name,
	pub owner: TypeId,
	pub ty: TypeId,
	pub modifiers: Modifiers,
	pub is_static: bool,
	/// Compile-time value of a literal field (enum member, `const`).
	pub literal: Option<i32>,
	pub handle: Option<RuntimeHandle>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ParamSig {
	pub name: Name,
	pub ty: TypeId,
	pub flow: Flow,
}

#[derive(Debug)]
pub struct MethodSymbol {
	pub name: Name,
	pub owner: TypeId,
	pub ret: TypeId,
	pub params: Vec<ParamSig>,
	pub modifiers: Modifiers,
	pub is_static: bool,
	pub special_name: bool,
	pub next_overload: Option<MethodId>,
	pub handle: Option<RuntimeHandle>,
}

/// Groups every overload registered under one name in a scope.
#[derive(Debug)]
pub struct HeaderSymbol {
	pub name: Name,
	pub first: Option<MethodId>,
}

#[derive(Debug)]
pub struct PropertySymbol {
	pub name: Name,
	pub owner: TypeId,
	pub ty: TypeId,
	pub getter: Option<MethodId>,
	pub setter: Option<MethodId>,
	pub modifiers: Modifiers,
	pub is_static: bool,
	pub handle: Option<RuntimeHandle>,
}

#[derive(Debug)]
pub struct EventSymbol {
	pub name: Name,
	pub owner: TypeId,
	pub delegate_ty: TypeId,
	pub add: Option<MethodId>,
	pub remove: Option<MethodId>,
	pub backing_field: Option<FieldId>,
	pub modifiers: Modifiers,
	pub is_static: bool,
	pub handle: Option<RuntimeHandle>,
}

#[derive(Debug)]
pub struct LocalSymbol {
	pub name: Name,
	pub ty: TypeId,
	pub slot: u32,
}

#[derive(Debug)]
pub struct ParamSymbol {
	pub name: Name,
	pub ty: TypeId,
	pub flow: Flow,
	pub slot: u32,
}

#[derive(Debug)]
pub struct LabelSymbol {
	pub name: Name,
}

/// Every symbol and scope of one compilation, in typed arenas.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct Symbols {
	#[derivative(Debug(format_with = "fmt_len"))]
	namespaces: Vec<NamespaceSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	types: Vec<TypeSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	fields: Vec<FieldSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	methods: Vec<MethodSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	headers: Vec<HeaderSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	properties: Vec<PropertySymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	events: Vec<EventSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	locals: Vec<LocalSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	params: Vec<ParamSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	labels: Vec<LabelSymbol>,
	#[derivative(Debug(format_with = "fmt_len"))]
	scopes: Vec<Scope>,
}

fn fmt_len<T>(values: &Vec<T>, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
	write!(fmt, "[{}]", values.len())
}

macro_rules! impl_arenas {
	($($plural: ident / $single: ident: $id: ty => $entry: ty),* $(,)?) => {
		impl Symbols {
			paste! {
				$(
					pub fn [<add_ $single>](&mut self, entry: $entry) -> $id {
						let id = <$id>::new(self.$plural.len());
						self.$plural.push(entry);
						id
					}

					#[inline]
					pub fn $single(&self, id: $id) -> &$entry {
						&self.$plural[id.index()]
					}

					#[inline]
					pub fn [<$single _mut>](&mut self, id: $id) -> &mut $entry {
						&mut self.$plural[id.index()]
					}

					pub fn [<$plural _iter>](&self) -> impl Iterator<Item = $id> + '_ {
						(0..self.$plural.len()).map(<$id>::new)
					}
				)*
			}
		}
	};
}

impl_arenas! {
	namespaces / namespace: NamespaceId => NamespaceSymbol,
	types / ty: TypeId => TypeSymbol,
	fields / field: FieldId => FieldSymbol,
	methods / method: MethodId => MethodSymbol,
	headers / header: HeaderId => HeaderSymbol,
	properties / property: PropertyId => PropertySymbol,
	events / event: EventId => EventSymbol,
	locals / local: LocalId => LocalSymbol,
	params / param: ParamId => ParamSymbol,
	labels / label: LabelId => LabelSymbol,
	scopes / scope: ScopeId => Scope,
}

impl Symbols {
	pub fn new() -> Self {
		Default::default()
	}

	/// Prepend a method to its header's overload list.
	pub fn link_overload(&mut self, header: HeaderId, method: MethodId) {
		let first = self.header(header).first;
		self.method_mut(method).next_overload = first;
		self.header_mut(header).first = Some(method);
	}

	pub fn overloads(&self, header: HeaderId) -> OverloadIter<'_> {
		OverloadIter { symbols: self, next: self.header(header).first }
	}

	/// Human-readable type name for diagnostics; renders array ranks and
	/// byref marks structurally.
	pub fn type_display(&self, pool: &NamePool, ty: TypeId) -> String {
		let entry = self.ty(ty);
		match entry.shape {
			TypeShape::Named | TypeShape::Enum { .. } => pool.get(entry.full_name).to_string(),
			TypeShape::Array { elem, rank } => {
				let mut out = self.type_display(pool, elem);
				out.push('[');
				for _ in 1..rank {
					out.push(',');
				}
				out.push(']');
				out
			}
			TypeShape::Ref { inner } => {
				let mut out = self.type_display(pool, inner);
				out.push('&');
				out
			}
		}
	}

	pub fn is_value_type(&self, ty: TypeId) -> bool {
		let entry = self.ty(ty);
		entry.genre == TypeGenre::Struct || matches!(entry.shape, TypeShape::Enum { .. })
	}
}

pub struct OverloadIter<'a> {
	symbols: &'a Symbols,
	next: Option<MethodId>,
}

impl Iterator for OverloadIter<'_> {
	type Item = MethodId;

	fn next(&mut self) -> Option<MethodId> {
		let id = self.next?;
		self.next = self.symbols.method(id).next_overload;
		Some(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn overload_lists_grow_at_the_head() {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let name = pool.intern("M");
		let owner = test_type(&mut symbols, &pool, "C");
		let ret = test_type(&mut symbols, &pool, "System.Void");
		let header = symbols.add_header(HeaderSymbol { name, first: None });
		let first = add_method(&mut symbols, name, owner, ret);
		let second = add_method(&mut symbols, name, owner, ret);
		symbols.link_overload(header, first);
		symbols.link_overload(header, second);
		let collected: Vec<_> = symbols.overloads(header).collect();
		assert_eq!(collected, vec![second, first]);
	}

	pub(super) fn test_type(symbols: &mut Symbols, pool: &NamePool, full_name: &str) -> TypeId {
		let name = full_name.rsplit('.').next().unwrap();
		symbols.add_ty(TypeSymbol {
			name: pool.intern(name),
			full_name: pool.intern(full_name),
			genre: TypeGenre::Class,
			shape: TypeShape::Named,
			base: None,
			interfaces: Vec::new(),
			scope: None,
			containing: None,
			namespace: None,
			modifiers: Modifiers::PUBLIC,
			imported: false,
			is_delegate: false,
			state: TypeState::Stub,
			handle: None,
		})
	}

	fn add_method(symbols: &mut Symbols, name: Name, owner: TypeId, ret: TypeId) -> MethodId {
		symbols.add_method(MethodSymbol {
			name,
			owner,
			ret,
			params: Vec::new(),
			modifiers: Modifiers::PUBLIC,
			is_static: false,
			special_name: false,
			next_overload: None,
			handle: None,
		})
	}
}
