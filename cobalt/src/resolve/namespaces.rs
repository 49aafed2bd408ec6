use tracing::debug;

use crate::ast::{NamespaceDecl, Program, TypeDecl, UsingDirective};
use crate::diagnostics::{codes, CompileResult};
use crate::symbols::{
	NamespaceId, NamespaceSymbol, ResolvedUsing, ScopeId, ScopeOwner, SymbolRef, TypeGenre, TypeShape, TypeState,
	TypeSymbol,
};

use super::Compilation;

impl Compilation {
	/// Pass 1: build the namespace graph, hang per-block proxy scopes off
	/// the shared namespace scopes, stub every type, then resolve using
	/// directives. Directives install only after every block has resolved
	/// its own, so no directive can feed another.
	#[tracing::instrument(skip_all)]
	pub(crate) fn pass1_namespaces(&mut self, program: &mut Program) {
		for block in &mut program.namespaces {
			let _ = self.declare_block(block, self.global_scope, None);
		}
		let mut installs = Vec::new();
		for block in &program.namespaces {
			self.resolve_block_usings(block, &mut installs);
		}
		for (scope, using) in installs {
			self.symbols.scope_mut(scope).usings.push(using);
		}
	}

	fn declare_block(
		&mut self,
		block: &mut NamespaceDecl,
		enclosing_proxy: ScopeId,
		enclosing_ns: Option<NamespaceId>,
	) -> CompileResult<()> {
		let (ns, storage) = match block.name.clone() {
			None => (None, self.global_scope),
			Some(path) => {
				let mut parent_ns = enclosing_ns;
				let mut storage = match enclosing_ns {
					Some(ns) => self.symbols.namespace(ns).scope,
					None => self.global_scope,
				};
				for part in &path.parts {
					let existing = self.symbols.scope_lookup_here(storage, part.name);
					let ns = match existing {
						Some(SymbolRef::Namespace(ns)) => ns,
						Some(_) => {
							let rendered = self.pool.get(part.name).to_string();
							return Err(self.reporter.error(
								codes::DUPLICATE_SYMBOL,
								part.range,
								format!("'{rendered}' is already declared and is not a namespace"),
							));
						}
						None => {
							let full = match parent_ns {
								Some(parent) => {
									format!("{}.{}", self.pool.get(self.symbols.namespace(parent).full_name), self.pool.get(part.name))
								}
								None => self.pool.get(part.name).to_string(),
							};
							let ns_scope = self.symbols.new_scope(ScopeOwner::Global, Some(self.global_scope));
							let ns = self.symbols.add_namespace(NamespaceSymbol {
								name: part.name,
								full_name: self.pool.intern(&full),
								scope: ns_scope,
								parent: parent_ns,
								imported: false,
							});
							self.symbols.scope_mut(ns_scope).owner = ScopeOwner::Namespace(ns);
							let _ = self.symbols.scope_add(storage, part.name, ns.into());
							ns
						}
					};
					parent_ns = Some(ns);
					storage = self.symbols.namespace(ns).scope;
				}
				(parent_ns, storage)
			}
		};

		let owner = match ns {
			Some(ns) => ScopeOwner::Namespace(ns),
			None => ScopeOwner::Global,
		};
		let parent = match block.name.is_some() {
			true => Some(enclosing_proxy),
			false => None,
		};
		let proxy = self.symbols.new_proxy_scope(owner, parent, storage);
		block.sym = ns;
		block.scope = Some(proxy);

		for nested in &mut block.namespaces {
			let _ = self.declare_block(nested, proxy, ns);
		}
		for decl in std::mem::take(&mut block.types) {
			self.declare_type_stub(decl, proxy, ns, None);
		}
		Ok(())
	}

	/// Stub a type: bare entry, member scope, registration in the
	/// enclosing scope. Nested declarations flatten into the same
	/// declaration-ordered list with their containing type recorded.
	fn declare_type_stub(
		&mut self,
		mut decl: TypeDecl,
		enclosing_scope: ScopeId,
		ns: Option<NamespaceId>,
		containing: Option<crate::symbols::TypeId>,
	) {
		let name = decl.name();
		let full_name = {
			let prefix = match (containing, ns) {
				(Some(outer), _) => Some(self.pool.get(self.symbols.ty(outer).full_name).to_string()),
				(None, Some(ns)) => Some(self.pool.get(self.symbols.namespace(ns).full_name).to_string()),
				(None, None) => None,
			};
			match prefix {
				Some(prefix) => format!("{}.{}", prefix, self.pool.get(name.name)),
				None => self.pool.get(name.name).to_string(),
			}
		};
		let (genre, shape, modifiers, is_delegate) = match &decl {
			TypeDecl::Class(class) => (class.genre, TypeShape::Named, class.modifiers, class.is_delegate),
			TypeDecl::Enum(decl) => {
				(TypeGenre::Struct, TypeShape::Enum { underlying: self.well_known.int32 }, decl.modifiers, false)
			}
		};
		let ty = self.symbols.add_ty(TypeSymbol {
			name: name.name,
			full_name: self.pool.intern(&full_name),
			genre,
			shape,
			base: None,
			interfaces: Vec::new(),
			scope: None,
			containing,
			namespace: ns,
			modifiers,
			imported: false,
			is_delegate,
			state: TypeState::Stub,
			handle: None,
		});
		let member_scope = self.symbols.new_scope(ScopeOwner::Type(ty), Some(enclosing_scope));
		self.symbols.ty_mut(ty).scope = Some(member_scope);

		if self.symbols.scope_add(enclosing_scope, name.name, ty.into()).is_err() {
			let rendered = self.pool.get(name.name).to_string();
			self.reporter.error(
				codes::DUPLICATE_SYMBOL,
				name.range,
				format!("the name '{rendered}' is already declared in this scope"),
			);
		}

		match &mut decl {
			TypeDecl::Class(class) => {
				class.sym = Some(ty);
				for nested in std::mem::take(&mut class.nested) {
					self.declare_type_stub(nested, member_scope, ns, Some(ty));
				}
			}
			TypeDecl::Enum(decl) => decl.sym = Some(ty),
		}

		debug!("stubbed type {full_name}");
		let index = self.type_decls.len() as u32;
		self.type_decls.push(Some(decl));
		self.decl_index.insert(ty, index);
	}

	fn resolve_block_usings(&mut self, block: &NamespaceDecl, installs: &mut Vec<(ScopeId, ResolvedUsing)>) {
		let scope = block.scope.expect("pass 1 declared this block");
		for using in &block.usings {
			match using {
				UsingDirective::Path { target, range } => match self.resolve_dotted(scope, target) {
					Ok(SymbolRef::Namespace(namespace)) => {
						installs.push((scope, ResolvedUsing::Path { namespace }));
					}
					Ok(_) => {
						let rendered = target.render(&self.pool);
						self.reporter.error(
							codes::TYPE_MISMATCH,
							*range,
							format!("'{rendered}' is not a namespace"),
						);
					}
					Err(_) => {}
				},
				UsingDirective::Alias { alias, target, range } => match self.resolve_dotted(scope, target) {
					Ok(found @ (SymbolRef::Namespace(_) | SymbolRef::Type(_))) => {
						installs.push((scope, ResolvedUsing::Alias { alias: alias.name, target: found }));
					}
					Ok(_) => {
						let rendered = target.render(&self.pool);
						self.reporter.error(
							codes::TYPE_MISMATCH,
							*range,
							format!("'{rendered}' is not a namespace or type"),
						);
					}
					Err(_) => {}
				},
			}
		}
		for nested in &block.namespaces {
			self.resolve_block_usings(nested, installs);
		}
	}

	pub(crate) fn take_decl(&mut self, ty: crate::symbols::TypeId) -> Option<TypeDecl> {
		let index = *self.decl_index.get(&ty)?;
		self.type_decls[index as usize].take()
	}

	pub(crate) fn put_decl(&mut self, ty: crate::symbols::TypeId, decl: TypeDecl) {
		let index = self.decl_index[&ty];
		self.type_decls[index as usize] = Some(decl);
	}
}
