use nohash_hasher::IntMap;

use crate::names::Name;

use super::{HeaderId, NamespaceId, ScopeId, SymbolRef, Symbols, TypeId};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScopeOwner {
	Global,
	Namespace(NamespaceId),
	Type(TypeId),
	Method,
	Block,
}

/// Resolved using directives attached to a namespace-block proxy scope.
/// Directives are installed only once resolved, so a directive can never
/// feed another directive's resolution.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResolvedUsing {
	Alias { alias: Name, target: SymbolRef },
	Path { namespace: NamespaceId },
}

/// One node of the scope graph. A proxy scope (`share` set) delegates
/// storage to the shared namespace scope but keeps its own lexical parent
/// and using directives.
#[derive(Debug)]
pub struct Scope {
	names: IntMap<Name, SymbolRef>,
	pub owner: ScopeOwner,
	pub parent: Option<ScopeId>,
	pub share: Option<ScopeId>,
	pub usings: Vec<ResolvedUsing>,
	pub locked: bool,
}

impl Scope {
	pub fn new(owner: ScopeOwner, parent: Option<ScopeId>) -> Scope {
		Scope {
			names: Default::default(),
			owner,
			parent,
			share: None,
			usings: Vec::new(),
			locked: false,
		}
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScopeError {
	Duplicate(SymbolRef),
	Locked,
}

impl Symbols {
	pub fn new_scope(&mut self, owner: ScopeOwner, parent: Option<ScopeId>) -> ScopeId {
		self.add_scope(Scope::new(owner, parent))
	}

	pub fn new_proxy_scope(&mut self, owner: ScopeOwner, parent: Option<ScopeId>, share: ScopeId) -> ScopeId {
		let mut scope = Scope::new(owner, parent);
		scope.share = Some(share);
		self.add_scope(scope)
	}

	/// The scope that actually stores names, following the share link.
	pub fn storage_scope(&self, scope: ScopeId) -> ScopeId {
		match self.scope(scope).share {
			Some(shared) => shared,
			None => scope,
		}
	}

	pub fn scope_add(&mut self, scope: ScopeId, name: Name, sym: SymbolRef) -> Result<(), ScopeError> {
		let storage = self.storage_scope(scope);
		let entry = self.scope_mut(storage);
		if entry.locked {
			return Err(ScopeError::Locked);
		}
		match entry.names.get(&name) {
			Some(existing) => Err(ScopeError::Duplicate(*existing)),
			None => {
				entry.names.insert(name, sym);
				Ok(())
			}
		}
	}

	/// Replace an existing entry; used when a method header takes over the
	/// slot its first overload occupied.
	pub fn scope_replace(&mut self, scope: ScopeId, name: Name, sym: SymbolRef) {
		let storage = self.storage_scope(scope);
		self.scope_mut(storage).names.insert(name, sym);
	}

	pub fn scope_lookup_here(&self, scope: ScopeId, name: Name) -> Option<SymbolRef> {
		let storage = self.storage_scope(scope);
		self.scope(storage).names.get(&name).copied()
	}

	/// Write-lock a scope; set once member resolution for its owner is done.
	pub fn scope_lock(&mut self, scope: ScopeId) {
		let storage = self.storage_scope(scope);
		self.scope_mut(storage).locked = true;
	}

	pub fn scope_entries(&self, scope: ScopeId) -> impl Iterator<Item = (Name, SymbolRef)> + '_ {
		let storage = self.storage_scope(scope);
		self.scope(storage).names.iter().map(|(name, sym)| (*name, *sym))
	}

	/// Member lookup through the inheritance graph: the type's own scope,
	/// then the base chain; interfaces search their base interfaces.
	pub fn lookup_member(&self, ty: TypeId, name: Name) -> Option<SymbolRef> {
		let entry = self.ty(ty);
		if let Some(scope) = entry.scope {
			if let Some(found) = self.scope_lookup_here(scope, name) {
				return Some(found);
			}
		}
		if entry.is_interface() {
			return entry.interfaces.iter().find_map(|iface| self.lookup_member(*iface, name));
		}
		entry.base.and_then(|base| self.lookup_member(base, name))
	}

	/// Every method header registered under `name` from `ty` up its base
	/// chain, most-derived first. Overload resolution walks these in order.
	pub fn member_headers(&self, ty: TypeId, name: Name) -> Vec<HeaderId> {
		let mut headers = Vec::new();
		let mut current = Some(ty);
		while let Some(t) = current {
			let entry = self.ty(t);
			if let Some(scope) = entry.scope {
				if let Some(SymbolRef::MethodHeader(header)) = self.scope_lookup_here(scope, name) {
					headers.push(header);
				}
			}
			if entry.is_interface() {
				for iface in &entry.interfaces {
					headers.extend(self.member_headers(*iface, name));
				}
			}
			current = entry.base;
		}
		headers
	}
}

#[cfg(test)]
mod tests {
	use crate::names::NamePool;
	use crate::symbols::tests::test_type;
	use crate::symbols::Symbols;

	use super::*;

	#[test]
	fn add_and_shadowing_lookup() {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let outer = symbols.new_scope(ScopeOwner::Global, None);
		let inner = symbols.new_scope(ScopeOwner::Block, Some(outer));
		let ty = test_type(&mut symbols, &pool, "C");
		let name = pool.intern("C");
		symbols.scope_add(outer, name, ty.into()).unwrap();
		assert_eq!(symbols.scope_lookup_here(outer, name), Some(ty.into()));
		assert_eq!(symbols.scope_lookup_here(inner, name), None);
		assert_eq!(symbols.scope_add(outer, name, ty.into()), Err(ScopeError::Duplicate(ty.into())));
	}

	#[test]
	fn locked_scope_rejects_additions() {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let scope = symbols.new_scope(ScopeOwner::Global, None);
		symbols.scope_lock(scope);
		let ty = test_type(&mut symbols, &pool, "C");
		assert_eq!(symbols.scope_add(scope, pool.intern("C"), ty.into()), Err(ScopeError::Locked));
	}

	#[test]
	fn proxy_scopes_share_storage() {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let shared = symbols.new_scope(ScopeOwner::Global, None);
		let block_a = symbols.new_proxy_scope(ScopeOwner::Global, None, shared);
		let block_b = symbols.new_proxy_scope(ScopeOwner::Global, None, shared);
		let ty = test_type(&mut symbols, &pool, "C");
		let name = pool.intern("C");
		symbols.scope_add(block_a, name, ty.into()).unwrap();
		assert_eq!(symbols.scope_lookup_here(block_b, name), Some(ty.into()));
	}

	#[test]
	fn member_lookup_follows_the_base_chain() {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let base = test_type(&mut symbols, &pool, "A");
		let derived = test_type(&mut symbols, &pool, "B");
		let base_scope = symbols.new_scope(ScopeOwner::Type(base), None);
		let derived_scope = symbols.new_scope(ScopeOwner::Type(derived), None);
		symbols.ty_mut(base).scope = Some(base_scope);
		symbols.ty_mut(derived).scope = Some(derived_scope);
		symbols.ty_mut(derived).base = Some(base);

		let field_ty = test_type(&mut symbols, &pool, "System.Int32");
		let field = symbols.add_field(crate::symbols::FieldSymbol {
			name: pool.intern("f"),
			owner: base,
			ty: field_ty,
			modifiers: Default::default(),
			is_static: false,
			literal: None,
			handle: None,
		});
		symbols.scope_add(base_scope, pool.intern("f"), field.into()).unwrap();
		assert_eq!(symbols.lookup_member(derived, pool.intern("f")), Some(field.into()));
		assert_eq!(symbols.lookup_member(derived, pool.intern("g")), None);
	}
}
