mod corelib;

pub use corelib::*;

use std::fmt::Debug;

use fxhash::FxHashMap;
use tracing::debug;

use crate::ast::Flow;
use crate::emit::EmitProvider;
use crate::names::NamePool;
use crate::symbols::{
	FieldSymbol, HeaderSymbol, MethodId, MethodSymbol, Modifiers, NamespaceSymbol, ParamSig, PropertySymbol, ScopeId,
	ScopeOwner, SymbolRef, Symbols, TypeGenre, TypeId, TypeShape, TypeState, TypeSymbol,
};

/// Description of an externally-defined type. Member signatures are textual
/// full names with structural suffixes: `[]`/`[,]` ranks (leftmost
/// outermost) and a trailing `&` for byref.
#[derive(Debug, Clone)]
pub struct ExternalType {
	pub full_name: String,
	pub genre: TypeGenre,
	pub is_public: bool,
	pub is_delegate: bool,
	pub base: Option<String>,
	pub interfaces: Vec<String>,
	pub enum_underlying: Option<String>,
	pub fields: Vec<ExternalField>,
	pub methods: Vec<ExternalMethod>,
	pub properties: Vec<ExternalProperty>,
	pub nested: Vec<ExternalType>,
}

#[derive(Debug, Clone)]
pub struct ExternalField {
	pub name: String,
	pub sig: String,
	pub is_static: bool,
	pub literal: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ExternalMethod {
	pub name: String,
	pub ret: String,
	pub params: Vec<(String, String)>,
	pub is_static: bool,
	pub is_virtual: bool,
	pub special_name: bool,
}

#[derive(Debug, Clone)]
pub struct ExternalProperty {
	pub name: String,
	pub sig: String,
	pub params: Vec<(String, String)>,
	pub has_getter: bool,
	pub has_setter: bool,
	pub is_static: bool,
}

/// Where imported assembly metadata comes from. One compilation holds one
/// source; the built-in [`CoreLibrary`] serves the system types.
pub trait MetadataSource: Debug {
	fn find_type(&self, full_name: &str) -> Option<&ExternalType>;
	/// Every namespace the source populates, dotted.
	fn namespaces(&self) -> Vec<String>;
}

/// Borrowed slice of the compilation the importer works against.
pub struct ImportCtx<'a> {
	pub symbols: &'a mut Symbols,
	pub pool: &'a NamePool,
	pub provider: &'a mut dyn EmitProvider,
	pub global_scope: ScopeId,
}

/// On-demand, cycle-proof importer. The full-name-keyed map is the
/// CLR-type-to-symbol map; a stub goes in before base and interface links
/// are chased, so self-referential metadata terminates.
#[derive(Debug)]
pub struct Importer {
	source: Box<dyn MetadataSource>,
	type_map: FxHashMap<String, TypeId>,
}

impl Importer {
	pub fn new<T: MetadataSource + 'static>(source: T) -> Self {
		Importer { source: Box::new(source), type_map: Default::default() }
	}

	/// Register the source's namespaces so using directives and dotted
	/// lookups can resolve before any type of theirs is imported.
	pub fn install_namespaces(&mut self, ctx: &mut ImportCtx) {
		for namespace in self.source.namespaces() {
			ensure_namespace(ctx.symbols, ctx.pool, ctx.global_scope, &namespace, true);
		}
	}

	pub fn known(&self, full_name: &str) -> Option<TypeId> {
		self.type_map.get(full_name).copied()
	}

	/// Import a type by full name. Generic types (backtick in the name) are
	/// rejected; array and byref names materialize structural entries that
	/// are deliberately not interned in the map.
	pub fn import_type(&mut self, ctx: &mut ImportCtx, full_name: &str) -> Option<TypeId> {
		if let Some(existing) = self.type_map.get(full_name) {
			return Some(*existing);
		}
		if full_name.contains('`') {
			debug!(full_name, "rejecting generic type at import");
			return None;
		}
		if let Some(inner) = full_name.strip_suffix('&') {
			let inner = self.import_type(ctx, inner)?;
			return Some(self.ref_type(ctx, inner));
		}
		if let Some(open) = full_name.find('[') {
			let elem_name = &full_name[..open];
			let ranks = parse_rank_suffixes(&full_name[open..])?;
			let mut ty = self.import_type(ctx, elem_name)?;
			for rank in ranks.into_iter().rev() {
				ty = self.array_type(ctx, ty, rank);
			}
			return Some(ty);
		}

		let desc = self.source.find_type(full_name)?;
		if !desc.is_public {
			return None;
		}
		let desc = desc.clone();
		debug!(full_name, "importing type");
		Some(self.import_described(ctx, desc, None))
	}

	fn import_described(&mut self, ctx: &mut ImportCtx, desc: ExternalType, containing: Option<TypeId>) -> TypeId {
		let short = desc.full_name.rsplit('.').next().unwrap_or(&desc.full_name);
		let stub = TypeSymbol {
			name: ctx.pool.intern(short),
			full_name: ctx.pool.intern(&desc.full_name),
			genre: desc.genre,
			shape: TypeShape::Named,
			base: None,
			interfaces: Vec::new(),
			scope: None,
			containing,
			namespace: None,
			modifiers: Modifiers::PUBLIC,
			imported: true,
			is_delegate: desc.is_delegate,
			state: TypeState::Resolving,
			handle: None,
		};
		let ty = ctx.symbols.add_ty(stub);
		self.type_map.insert(desc.full_name.clone(), ty);

		let base = desc.base.as_deref().and_then(|name| self.import_type(ctx, name));
		let interfaces: Vec<TypeId> =
			desc.interfaces.iter().filter_map(|name| self.import_type(ctx, name)).collect();
		let underlying = desc.enum_underlying.as_deref().and_then(|name| self.import_type(ctx, name));

		{
			let entry = ctx.symbols.ty_mut(ty);
			entry.base = base;
			entry.interfaces = interfaces;
			if let Some(underlying) = underlying {
				entry.shape = TypeShape::Enum { underlying };
			}
			entry.state = TypeState::Linked;
		}

		match containing {
			Some(outer) => {
				let scope = ctx.symbols.ty(outer).scope.expect("enclosing type imported without a scope");
				let name = ctx.symbols.ty(ty).name;
				let _ = ctx.symbols.scope_add(scope, name, ty.into());
			}
			None => self.register_in_namespace(ctx, ty, &desc.full_name),
		}

		self.import_members(ctx, ty, &desc);

		let handle = match ctx.symbols.ty(ty).shape {
			TypeShape::Enum { .. } => ctx.provider.create_enum_type_handle(ctx.symbols, ty),
			_ => ctx.provider.create_type_handle(ctx.symbols, ty),
		};
		let entry = ctx.symbols.ty_mut(ty);
		entry.handle = Some(handle);
		entry.state = TypeState::MembersReady;

		for nested in &desc.nested {
			if nested.is_public {
				self.import_described(ctx, nested.clone(), Some(ty));
			}
		}
		ty
	}

	fn register_in_namespace(&mut self, ctx: &mut ImportCtx, ty: TypeId, full_name: &str) {
		match full_name.rsplit_once('.') {
			Some((namespace, short)) => {
				let ns = ensure_namespace(ctx.symbols, ctx.pool, ctx.global_scope, namespace, true);
				let scope = ctx.symbols.namespace(ns).scope;
				let _ = ctx.symbols.scope_add(scope, ctx.pool.intern(short), ty.into());
				ctx.symbols.ty_mut(ty).namespace = Some(ns);
			}
			None => {
				let name = ctx.symbols.ty(ty).name;
				let _ = ctx.symbols.scope_add(ctx.global_scope, name, ty.into());
			}
		}
	}

	fn import_members(&mut self, ctx: &mut ImportCtx, ty: TypeId, desc: &ExternalType) {
		let scope = ctx.symbols.new_scope(ScopeOwner::Type(ty), Some(ctx.global_scope));
		ctx.symbols.ty_mut(ty).scope = Some(scope);

		for field in &desc.fields {
			let Some(field_ty) = self.import_type(ctx, &field.sig) else { continue };
			let name = ctx.pool.intern(&field.name);
			let sym = ctx.symbols.add_field(FieldSymbol {
				name,
				owner: ty,
				ty: field_ty,
				modifiers: Modifiers::PUBLIC,
				is_static: field.is_static,
				literal: field.literal,
				handle: None,
			});
			let handle = match field.literal.is_some() {
				true => ctx.provider.create_literal_field_handle(ctx.symbols, sym),
				false => ctx.provider.create_field_handle(ctx.symbols, sym),
			};
			ctx.symbols.field_mut(sym).handle = Some(handle);
			let _ = ctx.symbols.scope_add(scope, name, sym.into());
		}

		for method in &desc.methods {
			let Some(sym) = self.import_method(ctx, ty, method) else { continue };
			let name = ctx.symbols.method(sym).name;
			self.register_method(ctx, scope, name, sym);
		}

		for property in &desc.properties {
			self.import_property(ctx, ty, scope, property);
		}
	}

	fn import_method(&mut self, ctx: &mut ImportCtx, owner: TypeId, desc: &ExternalMethod) -> Option<MethodId> {
		let ret = self.import_type(ctx, &desc.ret)?;
		let mut params = Vec::with_capacity(desc.params.len());
		for (name, sig) in &desc.params {
			let ty = self.import_type(ctx, sig)?;
			let flow = match matches!(ctx.symbols.ty(ty).shape, TypeShape::Ref { .. }) {
				true => Flow::Ref,
				false => Flow::In,
			};
			params.push(ParamSig { name: ctx.pool.intern(name), ty, flow });
		}
		let mut modifiers = Modifiers::PUBLIC;
		if desc.is_static {
			modifiers |= Modifiers::STATIC;
		}
		if desc.is_virtual {
			modifiers |= Modifiers::VIRTUAL;
		}
		let sym = ctx.symbols.add_method(MethodSymbol {
			name: ctx.pool.intern(&desc.name),
			owner,
			ret,
			params,
			modifiers,
			is_static: desc.is_static,
			special_name: desc.special_name,
			next_overload: None,
			handle: None,
		});
		let handle = ctx.provider.create_method_handle(ctx.symbols, sym);
		ctx.symbols.method_mut(sym).handle = Some(handle);
		Some(sym)
	}

	fn register_method(&mut self, ctx: &mut ImportCtx, scope: ScopeId, name: crate::names::Name, sym: MethodId) {
		match ctx.symbols.scope_lookup_here(scope, name) {
			Some(SymbolRef::MethodHeader(header)) => ctx.symbols.link_overload(header, sym),
			Some(_) => {}
			None => {
				let header = ctx.symbols.add_header(HeaderSymbol { name, first: None });
				ctx.symbols.link_overload(header, sym);
				let _ = ctx.symbols.scope_add(scope, name, header.into());
			}
		}
	}

	fn import_property(&mut self, ctx: &mut ImportCtx, owner: TypeId, scope: ScopeId, desc: &ExternalProperty) {
		let Some(prop_ty) = self.import_type(ctx, &desc.sig) else { return };
		let name = ctx.pool.intern(&desc.name);
		let mut index_params = Vec::with_capacity(desc.params.len());
		for (param_name, sig) in &desc.params {
			let Some(ty) = self.import_type(ctx, sig) else { return };
			index_params.push(ParamSig { name: ctx.pool.intern(param_name), ty, flow: Flow::In });
		}

		let mut accessor = |ctx: &mut ImportCtx, get: bool| -> MethodId {
			let accessor_name = match get {
				true => format!("get_{}", desc.name),
				false => format!("set_{}", desc.name),
			};
			let mut params = index_params.clone();
			let ret = match get {
				true => prop_ty,
				false => {
					params.push(ParamSig { name: ctx.pool.intern("value"), ty: prop_ty, flow: Flow::In });
					self.known("System.Void").expect("core library must define System.Void")
				}
			};
			let sym = ctx.symbols.add_method(MethodSymbol {
				name: ctx.pool.intern(&accessor_name),
				owner,
				ret,
				params,
				modifiers: Modifiers::PUBLIC,
				is_static: desc.is_static,
				special_name: true,
				next_overload: None,
				handle: None,
			});
			let handle = ctx.provider.create_method_handle(ctx.symbols, sym);
			ctx.symbols.method_mut(sym).handle = Some(handle);
			let name = ctx.symbols.method(sym).name;
			self.register_method(ctx, scope, name, sym);
			sym
		};

		let getter = desc.has_getter.then(|| accessor(ctx, true));
		let setter = desc.has_setter.then(|| accessor(ctx, false));

		let sym = ctx.symbols.add_property(PropertySymbol {
			name,
			owner,
			ty: prop_ty,
			getter,
			setter,
			modifiers: Modifiers::PUBLIC,
			is_static: desc.is_static,
			handle: None,
		});
		let handle = ctx.provider.create_property_handle(ctx.symbols, sym);
		ctx.symbols.property_mut(sym).handle = Some(handle);
		let _ = ctx.symbols.scope_add(scope, name, sym.into());
	}

	/// Structural array entry; one per use site, compared by element + rank.
	pub fn array_type(&mut self, ctx: &mut ImportCtx, elem: TypeId, rank: u32) -> TypeId {
		let base = self.known("System.Array");
		let display = {
			let mut out = ctx.symbols.type_display(ctx.pool, elem);
			out.push('[');
			for _ in 1..rank {
				out.push(',');
			}
			out.push(']');
			out
		};
		let name = ctx.pool.intern(&display);
		let ty = ctx.symbols.add_ty(TypeSymbol {
			name,
			full_name: name,
			genre: TypeGenre::Class,
			shape: TypeShape::Array { elem, rank },
			base,
			interfaces: Vec::new(),
			scope: None,
			containing: None,
			namespace: None,
			modifiers: Modifiers::PUBLIC,
			imported: true,
			is_delegate: false,
			state: TypeState::Linked,
			handle: None,
		});
		let handle = ctx.provider.create_array_type_handle(ctx.symbols, ty);
		ctx.symbols.ty_mut(ty).handle = Some(handle);
		ty
	}

	/// Structural byref entry for `ref`/`out` parameters.
	pub fn ref_type(&mut self, ctx: &mut ImportCtx, inner: TypeId) -> TypeId {
		let display = {
			let mut out = ctx.symbols.type_display(ctx.pool, inner);
			out.push('&');
			out
		};
		let name = ctx.pool.intern(&display);
		let ty = ctx.symbols.add_ty(TypeSymbol {
			name,
			full_name: name,
			genre: TypeGenre::Struct,
			shape: TypeShape::Ref { inner },
			base: None,
			interfaces: Vec::new(),
			scope: None,
			containing: None,
			namespace: None,
			modifiers: Modifiers::PUBLIC,
			imported: true,
			is_delegate: false,
			state: TypeState::Linked,
			handle: None,
		});
		let handle = ctx.provider.create_ref_type_handle(ctx.symbols, ty);
		ctx.symbols.ty_mut(ty).handle = Some(handle);
		ty
	}

	/// Register a user-defined type under its runtime full name.
	pub fn register_user_type(&mut self, full_name: String, ty: TypeId) {
		self.type_map.insert(full_name, ty);
	}
}

/// `[]`, `[,]`, `[][,]`: ranks in written order, leftmost outermost.
fn parse_rank_suffixes(text: &str) -> Option<Vec<u32>> {
	let mut ranks = Vec::new();
	let mut rest = text;
	while !rest.is_empty() {
		let close = rest.find(']')?;
		let inside = &rest[1..close];
		if !inside.chars().all(|c| c == ',') {
			return None;
		}
		ranks.push(inside.len() as u32 + 1);
		rest = &rest[close + 1..];
	}
	match ranks.is_empty() {
		true => None,
		false => Some(ranks),
	}
}

/// Look up or create the namespace chain for a dotted name, registering
/// each segment in its parent scope.
pub fn ensure_namespace(
	symbols: &mut Symbols,
	pool: &NamePool,
	global_scope: ScopeId,
	dotted: &str,
	imported: bool,
) -> crate::symbols::NamespaceId {
	let mut parent: Option<crate::symbols::NamespaceId> = None;
	let mut scope = global_scope;
	let mut full = String::new();
	for segment in dotted.split('.') {
		if !full.is_empty() {
			full.push('.');
		}
		full.push_str(segment);
		let name = pool.intern(segment);
		let existing = symbols.scope_lookup_here(scope, name);
		let ns = match existing {
			Some(SymbolRef::Namespace(ns)) => ns,
			_ => {
				let ns_scope = symbols.new_scope(ScopeOwner::Global, Some(global_scope));
				let ns = symbols.add_namespace(NamespaceSymbol {
					name,
					full_name: pool.intern(&full),
					scope: ns_scope,
					parent,
					imported,
				});
				symbols.scope_mut(ns_scope).owner = ScopeOwner::Namespace(ns);
				let _ = symbols.scope_add(scope, name, ns.into());
				ns
			}
		};
		parent = Some(ns);
		scope = symbols.namespace(ns).scope;
	}
	parent.expect("dotted namespace name cannot be empty")
}

#[cfg(test)]
mod tests {
	use crate::emit::TokenProvider;
	use crate::names::NamePool;
	use crate::symbols::{ScopeOwner, Symbols, TypeShape, TypeState};

	use super::*;

	fn setup() -> (NamePool, Symbols, TokenProvider, crate::symbols::ScopeId) {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let global = symbols.new_scope(ScopeOwner::Global, None);
		(pool, symbols, TokenProvider::new(), global)
	}

	#[test]
	fn imports_are_memoized_and_cycle_proof() {
		let (pool, mut symbols, mut provider, global) = setup();
		let mut importer = Importer::new(CoreLibrary::new());
		let mut ctx = ImportCtx { symbols: &mut symbols, pool: &pool, provider: &mut provider, global_scope: global };
		let a = importer.import_type(&mut ctx, "System.String").unwrap();
		let b = importer.import_type(&mut ctx, "System.String").unwrap();
		assert_eq!(a, b);
		// String's members mention String; the stub map must have broken
		// that cycle with the same entry.
		assert_eq!(ctx.symbols.ty(a).state, TypeState::MembersReady);
	}

	#[test]
	fn generic_names_are_rejected() {
		let (pool, mut symbols, mut provider, global) = setup();
		let mut importer = Importer::new(CoreLibrary::new());
		let mut ctx = ImportCtx { symbols: &mut symbols, pool: &pool, provider: &mut provider, global_scope: global };
		assert_eq!(importer.import_type(&mut ctx, "System.Collections.Generic.List`1"), None);
	}

	#[test]
	fn array_and_ref_suffixes_materialize_structurally() {
		let (pool, mut symbols, mut provider, global) = setup();
		let mut importer = Importer::new(CoreLibrary::new());
		let mut ctx = ImportCtx { symbols: &mut symbols, pool: &pool, provider: &mut provider, global_scope: global };
		let arr = importer.import_type(&mut ctx, "System.Int32[][,]").unwrap();
		let int32 = importer.import_type(&mut ctx, "System.Int32").unwrap();
		// Leftmost brackets are outermost.
		let TypeShape::Array { elem, rank: 1 } = ctx.symbols.ty(arr).shape else {
			panic!("expected an outer rank-1 array");
		};
		let TypeShape::Array { elem, rank: 2 } = ctx.symbols.ty(elem).shape else {
			panic!("expected an inner rank-2 array");
		};
		assert_eq!(elem, int32);

		// Structural entries are not interned; equality is element + rank.
		let other = importer.import_type(&mut ctx, "System.Int32[][,]").unwrap();
		assert_ne!(arr, other);
		assert!(ctx.symbols.types_equal(arr, other));

		let byref = importer.import_type(&mut ctx, "System.Int32&").unwrap();
		assert!(matches!(ctx.symbols.ty(byref).shape, TypeShape::Ref { inner } if inner == int32));
	}

	#[test]
	fn namespaces_chain_from_the_global_scope() {
		let (pool, mut symbols, _, global) = setup();
		let ns = ensure_namespace(&mut symbols, &pool, global, "System.Collections", true);
		assert_eq!(pool.get(symbols.namespace(ns).full_name), "System.Collections");
		let system = symbols.scope_lookup_here(global, pool.intern("System")).unwrap();
		let SymbolRef::Namespace(system) = system else { panic!() };
		let inner = symbols.scope_lookup_here(symbols.namespace(system).scope, pool.intern("Collections"));
		assert_eq!(inner, Some(ns.into()));
	}
}
