mod bodies;
mod check;
mod exprs;
mod members;
mod namespaces;
mod operators;
mod types;

use nohash_hasher::{IntMap, IntSet};
use tracing::info;

use crate::ast::{DottedPath, Program, TypeDecl};
use crate::diagnostics::{codes, CompileResult, ErrorReported, FileRange, Reporter};
use crate::emit::EmitProvider;
use crate::import::{ImportCtx, Importer, MetadataSource};
use crate::names::{Name, NamePool};
use crate::parse::parse_source_file;
use crate::symbols::{ResolvedUsing, ScopeId, ScopeOwner, SymbolRef, Symbols, TypeId};

/// Reserved member name indexers are registered under.
pub const INDEXER_NAME: &str = "Item";

#[derive(Debug, Copy, Clone)]
pub struct CompileOptions {
	/// Run the invariant sweep after pass 4. Violations surface as internal
	/// diagnostics, never as panics.
	pub debug_checks: bool,
}

impl Default for CompileOptions {
	fn default() -> Self {
		CompileOptions { debug_checks: true }
	}
}

/// The system types the resolver and the lowering catalog lean on,
/// resolved once at construction.
#[derive(Debug, Copy, Clone)]
pub struct WellKnown {
	pub object: TypeId,
	pub value_type: TypeId,
	pub enum_base: TypeId,
	pub void: TypeId,
	pub int32: TypeId,
	pub boolean: TypeId,
	pub char_: TypeId,
	pub string: TypeId,
	pub array: TypeId,
	pub delegate: TypeId,
	pub multicast: TypeId,
	pub intptr: TypeId,
	pub exception: TypeId,
	pub type_type: TypeId,
	pub enumerator: TypeId,
}

/// One compilation: name pool, diagnostics, symbol arenas, importer,
/// emitter provider, and the pass driver. Single-threaded; concurrent
/// compilations use separate instances.
pub struct Compilation {
	pub options: CompileOptions,
	pub pool: NamePool,
	pub reporter: Reporter,
	pub symbols: Symbols,
	pub program: Program,
	pub(crate) importer: Importer,
	pub(crate) provider: Box<dyn EmitProvider>,
	pub(crate) global_scope: ScopeId,
	pub(crate) well_known: WellKnown,
	/// Flat, declaration-ordered type declarations (nested types
	/// included); the typed AST surface the emitter walks. `None` marks an
	/// entry checked out by an in-progress pass.
	pub(crate) type_decls: Vec<Option<TypeDecl>>,
	pub(crate) decl_index: IntMap<TypeId, u32>,
	/// Types on an inheritance cycle; later passes skip them.
	pub(crate) poisoned: IntSet<TypeId>,

	// Mutable resolution context.
	pub(crate) current_class: Option<TypeId>,
	pub(crate) current_method: Option<crate::symbols::MethodId>,
	pub(crate) current_scope: ScopeId,
	pub(crate) method_scope: ScopeId,
	pub(crate) loop_depth: u32,
	pub(crate) switch_depth: u32,
	pub(crate) next_slot: u32,
	pub(crate) next_temp: u32,
}

impl Compilation {
	/// Builds the compilation and bootstraps the system types: default
	/// aliases into the global scope, plus eager resolution of `Array`,
	/// `Enum` and `MulticastDelegate`, whose scopes user code needs for
	/// member lookup.
	///
	/// Panics if `source` does not describe the core system types; that is
	/// a broken metadata source, not a user error.
	pub fn new<S, P>(options: CompileOptions, source: S, provider: P) -> Self
	where
		S: MetadataSource + 'static,
		P: EmitProvider + 'static,
	{
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let global_scope = symbols.new_scope(ScopeOwner::Global, None);
		let mut importer = Importer::new(source);
		let mut provider: Box<dyn EmitProvider> = Box::new(provider);

		let mut ctx = ImportCtx { symbols: &mut symbols, pool: &pool, provider: provider.as_mut(), global_scope };
		importer.install_namespaces(&mut ctx);

		let mut core = |name: &str| -> TypeId {
			let mut ctx =
				ImportCtx { symbols: &mut symbols, pool: &pool, provider: provider.as_mut(), global_scope };
			importer
				.import_type(&mut ctx, name)
				.unwrap_or_else(|| panic!("the metadata source does not describe {name}"))
		};
		let well_known = WellKnown {
			object: core("System.Object"),
			value_type: core("System.ValueType"),
			enum_base: core("System.Enum"),
			void: core("System.Void"),
			int32: core("System.Int32"),
			boolean: core("System.Boolean"),
			char_: core("System.Char"),
			string: core("System.String"),
			array: core("System.Array"),
			delegate: core("System.Delegate"),
			multicast: core("System.MulticastDelegate"),
			intptr: core("System.IntPtr"),
			exception: core("System.Exception"),
			type_type: core("System.Type"),
			enumerator: core("System.Collections.IEnumerator"),
		};

		// Default aliases point straight at the imported system types.
		let aliases: &[(&str, TypeId)] = &[
			("int", well_known.int32),
			("void", well_known.void),
			("char", well_known.char_),
			("bool", well_known.boolean),
			("string", well_known.string),
			("object", well_known.object),
		];
		for (alias, ty) in aliases {
			let name = pool.intern(alias);
			let _ = symbols.scope_add(global_scope, name, (*ty).into());
		}

		Compilation {
			options,
			pool,
			reporter: Reporter::new(),
			symbols,
			program: Program::default(),
			importer,
			provider,
			global_scope,
			well_known,
			type_decls: Vec::new(),
			decl_index: Default::default(),
			poisoned: Default::default(),
			current_class: None,
			current_method: None,
			current_scope: global_scope,
			method_scope: global_scope,
			loop_depth: 0,
			switch_depth: 0,
			next_slot: 0,
			next_temp: 0,
		}
	}

	/// Parse one source file and queue its global namespace block under the
	/// program root. Parse failures are already recorded.
	pub fn add_source(&mut self, file_name: &str, text: &str) {
		if let Some(unit) = parse_source_file(&self.pool, &mut self.reporter, file_name, text) {
			self.program.namespaces.push(unit);
		}
	}

	/// Run the four resolution passes and the debug check. Any recorded
	/// error makes the build a failure.
	#[tracing::instrument(skip_all)]
	pub fn resolve(&mut self) -> CompileResult<()> {
		let mut program = std::mem::take(&mut self.program);
		self.pass1_namespaces(&mut program);
		self.pass2_types();
		self.pass3_members();
		self.pass4_bodies();
		if self.options.debug_checks {
			self.debug_check();
		}
		self.program = program;
		info!(summary = %self.reporter.summary(), "front-end finished");
		match self.reporter.has_errors() {
			true => Err(ErrorReported),
			false => Ok(()),
		}
	}

	/// Fully-resolved type declarations in declaration order; the typed
	/// AST handed to the emitter alongside the symbol table.
	pub fn type_decls(&self) -> impl Iterator<Item = &TypeDecl> {
		self.type_decls.iter().filter_map(|slot| slot.as_ref())
	}

	pub fn global_scope(&self) -> ScopeId {
		self.global_scope
	}

	pub fn well_known(&self) -> &WellKnown {
		&self.well_known
	}

	// Importer plumbing.

	/// Resolve an external type by full name through the metadata source.
	/// Generic types are rejected; repeated calls are memoized.
	pub fn import_type(&mut self, full_name: &str) -> Option<TypeId> {
		let mut ctx = ImportCtx {
			symbols: &mut self.symbols,
			pool: &self.pool,
			provider: self.provider.as_mut(),
			global_scope: self.global_scope,
		};
		self.importer.import_type(&mut ctx, full_name)
	}

	pub(crate) fn array_type(&mut self, elem: TypeId, rank: u32) -> TypeId {
		let mut ctx = ImportCtx {
			symbols: &mut self.symbols,
			pool: &self.pool,
			provider: self.provider.as_mut(),
			global_scope: self.global_scope,
		};
		self.importer.array_type(&mut ctx, elem, rank)
	}

	pub(crate) fn ref_type(&mut self, inner: TypeId) -> TypeId {
		let mut ctx = ImportCtx {
			symbols: &mut self.symbols,
			pool: &self.pool,
			provider: self.provider.as_mut(),
			global_scope: self.global_scope,
		};
		self.importer.ref_type(&mut ctx, inner)
	}

	/// Probe the metadata source for `<namespace>.<name>`; imported
	/// namespaces fill lazily on first reference.
	fn probe_import(&mut self, namespace: crate::symbols::NamespaceId, name: Name) -> Option<SymbolRef> {
		if !self.symbols.namespace(namespace).imported {
			return None;
		}
		let full = format!("{}.{}", self.pool.get(self.symbols.namespace(namespace).full_name), self.pool.get(name));
		self.import_type(&full).map(SymbolRef::Type)
	}

	// Name lookup.

	/// Context lookup: climb lexical parents; at each level consult the
	/// scope's own names, the member chain for type scopes, and the
	/// block's using directives, in that order.
	pub(crate) fn lookup_context(&mut self, scope: ScopeId, name: Name) -> Option<SymbolRef> {
		let mut current = Some(scope);
		while let Some(here) = current {
			if let Some(found) = self.symbols.scope_lookup_here(here, name) {
				return Some(found);
			}
			match self.symbols.scope(here).owner {
				ScopeOwner::Type(ty) => {
					if let Some(found) = self.symbols.lookup_member(ty, name) {
						return Some(found);
					}
				}
				ScopeOwner::Namespace(ns) => {
					if let Some(found) = self.probe_import(ns, name) {
						return Some(found);
					}
				}
				_ => {}
			}
			if let Some(found) = self.lookup_usings(here, name) {
				return Some(found);
			}
			current = self.symbols.scope(here).parent;
		}
		None
	}

	/// Alias match is an equality check; a search-path match looks only in
	/// the named namespace's immediate scope and never returns a
	/// namespace, so directives cannot leak transitively.
	fn lookup_usings(&mut self, scope: ScopeId, name: Name) -> Option<SymbolRef> {
		let usings = self.symbols.scope(scope).usings.clone();
		for using in &usings {
			match using {
				ResolvedUsing::Alias { alias, target } if *alias == name => return Some(*target),
				ResolvedUsing::Alias { .. } => {}
				ResolvedUsing::Path { namespace } => {
					let ns_scope = self.symbols.namespace(*namespace).scope;
					let found = self
						.symbols
						.scope_lookup_here(ns_scope, name)
						.or_else(|| self.probe_import(*namespace, name));
					match found {
						Some(SymbolRef::Namespace(_)) | None => {}
						Some(found) => return Some(found),
					}
				}
			}
		}
		None
	}

	/// Member-of lookup for a dotted path segment living inside a
	/// namespace or type.
	pub(crate) fn lookup_qualified(&mut self, container: SymbolRef, name: Name) -> Option<SymbolRef> {
		match container {
			SymbolRef::Namespace(ns) => {
				let scope = self.symbols.namespace(ns).scope;
				self.symbols.scope_lookup_here(scope, name).or_else(|| self.probe_import(ns, name))
			}
			SymbolRef::Type(ty) => self.symbols.lookup_member(ty, name),
			_ => None,
		}
	}

	/// Resolve `A.B.C` to a namespace or type, reporting the first segment
	/// that fails.
	pub(crate) fn resolve_dotted(&mut self, scope: ScopeId, path: &DottedPath) -> CompileResult<SymbolRef> {
		let first = path.parts[0];
		let mut current = match self.lookup_context(scope, first.name) {
			Some(found) => found,
			None => {
				let rendered = self.pool.get(first.name).to_string();
				return Err(self.reporter.error(
					codes::UNDEFINED_SYMBOL,
					first.range,
					format!("undefined symbol '{rendered}'"),
				));
			}
		};
		for part in &path.parts[1..] {
			current = match self.lookup_qualified(current, part.name) {
				Some(found) => found,
				None => {
					let rendered = self.pool.get(part.name).to_string();
					return Err(self.reporter.error(
						codes::UNDEFINED_SYMBOL,
						part.range,
						format!("undefined symbol '{rendered}'"),
					));
				}
			};
		}
		Ok(current)
	}

	/// Resolve a written type signature against a scope.
	pub(crate) fn resolve_type_sig(&mut self, scope: ScopeId, sig: &crate::ast::TypeSig) -> CompileResult<TypeId> {
		match sig {
			crate::ast::TypeSig::Resolved(resolved) => Ok(resolved.ty),
			crate::ast::TypeSig::Simple(simple) => {
				match self.resolve_dotted(scope, &simple.path)? {
					SymbolRef::Type(ty) => Ok(ty),
					_ => {
						let rendered = simple.path.render(&self.pool);
						Err(self.reporter.error(
							codes::TYPE_MISMATCH,
							simple.range,
							format!("'{rendered}' is not a type"),
						))
					}
				}
			}
			crate::ast::TypeSig::Array(array) => {
				let elem = self.resolve_type_sig(scope, &array.elem)?;
				Ok(self.array_type(elem, array.rank))
			}
			crate::ast::TypeSig::Ref(byref) => {
				let inner = self.resolve_type_sig(scope, &byref.inner)?;
				Ok(self.ref_type(inner))
			}
		}
	}

	// Shared reporting helpers.

	pub(crate) fn error_undefined(&mut self, name: Name, range: FileRange) -> ErrorReported {
		let rendered = self.pool.get(name).to_string();
		self.reporter.error(codes::UNDEFINED_SYMBOL, range, format!("undefined symbol '{rendered}'"))
	}

	pub(crate) fn type_name(&self, ty: TypeId) -> String {
		self.symbols.type_display(&self.pool, ty)
	}

	pub(crate) fn fresh_temp(&mut self, ty: TypeId) -> crate::symbols::LocalId {
		let name = self.pool.intern(&format!("$tmp{}", self.next_temp));
		self.next_temp += 1;
		let slot = self.next_slot;
		self.next_slot += 1;
		self.symbols.add_local(crate::symbols::LocalSymbol { name, ty, slot })
	}
}

impl std::fmt::Debug for Compilation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Compilation")
			.field("symbols", &self.symbols)
			.field("errors", &self.reporter.error_count())
			.field("warnings", &self.reporter.warning_count())
			.finish()
	}
}
