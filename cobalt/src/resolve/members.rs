use tracing::debug;

use crate::ast::{
	AssignExpr, BlockStmt, CallExpr, CastExpr, ClassDecl, CtorChainStmt, CtorChainTarget, DotNameExpr, EnumDecl,
	Expr, ExprStmt, FieldExpr, Flow, Ident, MethodDecl, ParamVarDecl, SimpleNameExpr, Stmt, ThisExpr, TypeDecl,
	TypeRefExpr, TypeSig,
};
use crate::diagnostics::{codes, CompileResult};
use crate::names::Name;
use crate::symbols::{
	EventSymbol, FieldId, FieldSymbol, HeaderSymbol, MethodId, MethodSymbol, Modifiers, ParamSig, ParamSymbol,
	PropertySymbol, ScopeId, ScopeOwner, SymbolRef, TypeGenre, TypeId, TypeState,
};

use super::Compilation;

impl Compilation {
	/// Pass 3: member declarations. A type's base and interfaces complete
	/// before the type itself; the member scope is locked at the end.
	#[tracing::instrument(skip_all)]
	pub(crate) fn pass3_members(&mut self) {
		let order: Vec<TypeId> =
			self.type_decls.iter().filter_map(|slot| slot.as_ref().and_then(TypeDecl::sym)).collect();
		for ty in order {
			self.ensure_members(ty);
		}
	}

	pub(crate) fn ensure_members(&mut self, ty: TypeId) {
		{
			let entry = self.symbols.ty(ty);
			if entry.imported || entry.state >= TypeState::MembersReady {
				return;
			}
		}
		if self.poisoned.contains(&ty) {
			return;
		}
		let Some(mut decl) = self.take_decl(ty) else { return };

		if let Some(base) = self.symbols.ty(ty).base {
			self.ensure_members(base);
		}
		for iface in self.symbols.ty(ty).interfaces.clone() {
			self.ensure_members(iface);
		}

		match &mut decl {
			TypeDecl::Class(class) => self.resolve_class_members(ty, class),
			TypeDecl::Enum(decl) => self.resolve_enum_members(ty, decl),
		}
		self.put_decl(ty, decl);

		let scope = self.symbols.ty(ty).scope.expect("pass 1 created the member scope");
		self.symbols.scope_lock(scope);
		self.symbols.ty_mut(ty).state = TypeState::MembersReady;
		debug!(name = self.pool.get(self.symbols.ty(ty).full_name), "member declarations ready");
	}

	/// Enum members become public literal fields of the enum type itself,
	/// auto-incrementing from the last folded value.
	fn resolve_enum_members(&mut self, ty: TypeId, decl: &mut EnumDecl) {
		let scope = self.symbols.ty(ty).scope.expect("pass 1 created the member scope");
		let mut next = 0i32;
		for member in &mut decl.members {
			let value = member.value.unwrap_or(next);
			next = value.wrapping_add(1);
			member.value = Some(value);
			let field = self.symbols.add_field(FieldSymbol {
				name: member.name.name,
				owner: ty,
				ty,
				modifiers: Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::CONST,
				is_static: true,
				literal: Some(value),
				handle: None,
			});
			let handle = self.provider.create_literal_field_handle(&self.symbols, field);
			self.symbols.field_mut(field).handle = Some(handle);
			member.sym = Some(field);
			if self.symbols.scope_add(scope, member.name.name, field.into()).is_err() {
				let rendered = self.pool.get(member.name.name).to_string();
				self.reporter.error(
					codes::DUPLICATE_SYMBOL,
					member.name.range,
					format!("duplicate enum member '{rendered}'"),
				);
			}
		}
	}

	fn resolve_class_members(&mut self, ty: TypeId, class: &mut ClassDecl) {
		let scope = self.symbols.ty(ty).scope.expect("pass 1 created the member scope");
		let is_struct = class.genre == TypeGenre::Struct;
		let is_interface = class.genre == TypeGenre::Interface;

		// Events first: they may synthesize fields and accessor methods.
		let mut event_links = Vec::new();
		let mut synthesized_methods = Vec::new();
		for event in &mut class.events {
			let Ok(delegate_ty) = self.resolve_type_sig(scope, &event.sig) else { continue };
			if !self.symbols.ty(delegate_ty).is_delegate {
				let rendered = self.type_name(delegate_ty);
				self.reporter.error(
					codes::TYPE_MISMATCH,
					event.sig.range(),
					format!("'{rendered}' is not a delegate type"),
				);
				continue;
			}
			let is_static = event.modifiers.is_static();
			let sym = self.symbols.add_event(EventSymbol {
				name: event.name.name,
				owner: ty,
				delegate_ty,
				add: None,
				remove: None,
				backing_field: None,
				modifiers: event.modifiers.or_private(),
				is_static,
				handle: None,
			});
			let handle = self.provider.create_event_handle(&self.symbols, sym);
			self.symbols.event_mut(sym).handle = Some(handle);
			event.sym = Some(sym);
			if self.symbols.scope_add(scope, event.name.name, sym.into()).is_err() {
				let rendered = self.pool.get(event.name.name).to_string();
				self.reporter.error(
					codes::DUPLICATE_SYMBOL,
					event.name.range,
					format!("the name '{rendered}' is already declared in this type"),
				);
				continue;
			}

			let add_name = self.pool.intern(&format!("add_{}", self.pool.get(event.name.name)));
			let remove_name = self.pool.intern(&format!("remove_{}", self.pool.get(event.name.name)));
			match (event.add.take(), event.remove.take()) {
				(None, _) | (_, None) => {
					// No explicit accessors: private backing field plus
					// default add/remove built on MulticastDelegate.
					let field = self.symbols.add_field(FieldSymbol {
						name: event.name.name,
						owner: ty,
						ty: delegate_ty,
						modifiers: Modifiers::PRIVATE,
						is_static,
						literal: None,
						handle: None,
					});
					let field_handle = self.provider.create_field_handle(&self.symbols, field);
					self.symbols.field_mut(field).handle = Some(field_handle);
					self.symbols.event_mut(sym).backing_field = Some(field);
					for (accessor_name, combine) in [(add_name, "Combine"), (remove_name, "Remove")] {
						synthesized_methods.push(self.default_event_accessor(
							event, accessor_name, combine, field, delegate_ty, is_static,
						));
					}
				}
				(Some(add), Some(remove)) => {
					for (accessor_name, accessor) in [(add_name, add), (remove_name, remove)] {
						synthesized_methods.push(self.explicit_event_accessor(
							event, accessor_name, accessor.body, delegate_ty,
						));
					}
				}
			}
			event_links.push((sym, add_name, remove_name));
		}

		// Fields, with initializers bucketed static versus instance.
		let mut instance_inits = Vec::new();
		let mut static_inits = Vec::new();
		for field in &mut class.fields {
			let Ok(field_ty) = self.resolve_type_sig(scope, &field.sig) else { continue };
			let is_const = field.modifiers.contains(Modifiers::CONST);
			let is_static = field.modifiers.is_static() || is_const;
			let init = field.init.take();
			let literal = match (is_const, &init) {
				(false, _) => None,
				(true, Some(Expr::Literal(lit))) => match lit.kind {
					crate::ast::LiteralKind::Int(value) => Some(value),
					_ => {
						self.reporter.error(
							codes::TYPE_MISMATCH,
							lit.range,
							"constant fields fold integer literals only".to_string(),
						);
						continue;
					}
				},
				(true, _) => {
					self.reporter.error(
						codes::TYPE_MISMATCH,
						field.range,
						"constant fields require a literal initializer".to_string(),
					);
					continue;
				}
			};
			let sym = self.symbols.add_field(FieldSymbol {
				name: field.name.name,
				owner: ty,
				ty: field_ty,
				modifiers: field.modifiers.or_private(),
				is_static,
				literal,
				handle: None,
			});
			let handle = match is_const {
				true => self.provider.create_literal_field_handle(&self.symbols, sym),
				false => self.provider.create_field_handle(&self.symbols, sym),
			};
			self.symbols.field_mut(sym).handle = Some(handle);
			field.sym = Some(sym);
			if self.symbols.scope_add(scope, field.name.name, sym.into()).is_err() {
				let rendered = self.pool.get(field.name.name).to_string();
				self.reporter.error(
					codes::DUPLICATE_SYMBOL,
					field.name.range,
					format!("the name '{rendered}' is already declared in this type"),
				);
				continue;
			}

			let Some(init) = init else { continue };
			if is_const {
				continue;
			}
			if is_struct && !is_static {
				self.reporter.error(
					codes::STRUCT_INSTANCE_INITIALIZER,
					field.range,
					"structs cannot have instance field initializers".to_string(),
				);
				continue;
			}
			let range = init.range();
			let receiver = match is_static {
				true => None,
				false => Some(Expr::This(ThisExpr { range: field.name.range, ty: None })),
			};
			let target = Expr::Field(Box::new(FieldExpr { field: sym, receiver, range: field.name.range, ty: None }));
			let assign = Expr::Assign(Box::new(AssignExpr { target, value: init, range, ty: None }));
			let stmt = Stmt::Expr(ExprStmt { expr: assign, range });
			match is_static {
				true => static_inits.push(stmt),
				false => instance_inits.push(stmt),
			}
		}

		// Properties before methods; accessors become ordinary special-name
		// method declarations.
		let mut property_links = Vec::new();
		for property in &mut class.properties {
			let Ok(prop_ty) = self.resolve_type_sig(scope, &property.sig) else { continue };
			let sym = self.symbols.add_property(PropertySymbol {
				name: property.name.name,
				owner: ty,
				ty: prop_ty,
				getter: None,
				setter: None,
				modifiers: property.modifiers.or_private(),
				is_static: property.modifiers.is_static(),
				handle: None,
			});
			let handle = self.provider.create_property_handle(&self.symbols, sym);
			self.symbols.property_mut(sym).handle = Some(handle);
			property.sym = Some(sym);
			if self.symbols.scope_add(scope, property.name.name, sym.into()).is_err() {
				let rendered = self.pool.get(property.name.name).to_string();
				self.reporter.error(
					codes::DUPLICATE_SYMBOL,
					property.name.range,
					format!("the name '{rendered}' is already declared in this type"),
				);
				continue;
			}

			let get_name = self.pool.intern(&format!("get_{}", self.pool.get(property.name.name)));
			let set_name = self.pool.intern(&format!("set_{}", self.pool.get(property.name.name)));
			if let Some(getter) = property.getter.take() {
				synthesized_methods.push(MethodDecl {
					name: Ident::new(get_name, property.name.range),
					ret: Some(TypeSig::resolved(prop_ty, property.sig.range())),
					params: property.params.clone(),
					body: getter.body,
					modifiers: property.modifiers,
					ctor_chain: None,
					special_name: true,
					synthesized: true,
					sym: None,
					scope: None,
					range: getter.range,
				});
			}
			if let Some(setter) = property.setter.take() {
				let mut params = property.params.clone();
				params.push(ParamVarDecl {
					name: Ident::new(self.pool.intern("value"), property.name.range),
					sig: TypeSig::resolved(prop_ty, property.sig.range()),
					flow: Flow::In,
					sym: None,
					range: property.name.range,
				});
				synthesized_methods.push(MethodDecl {
					name: Ident::new(set_name, property.name.range),
					ret: Some(TypeSig::resolved(self.well_known.void, property.sig.range())),
					params,
					body: setter.body,
					modifiers: property.modifiers,
					ctor_chain: None,
					special_name: true,
					synthesized: true,
					sym: None,
					scope: None,
					range: setter.range,
				});
			}
			property_links.push((sym, get_name, set_name));
		}
		class.methods.append(&mut synthesized_methods);

		// Methods and constructors.
		for method in &mut class.methods {
			let _ = self.declare_method(ty, scope, is_struct, is_interface, method);
		}

		for (sym, add_name, remove_name) in event_links {
			self.symbols.event_mut(sym).add = self.single_method(scope, add_name);
			self.symbols.event_mut(sym).remove = self.single_method(scope, remove_name);
		}
		for (sym, get_name, set_name) in property_links {
			self.symbols.property_mut(sym).getter = self.single_method(scope, get_name);
			self.symbols.property_mut(sym).setter = self.single_method(scope, set_name);
		}

		// Constructor plumbing: default chains, initializer splicing,
		// synthesized constructors.
		self.wire_constructors(ty, class, is_struct, is_interface, instance_inits, static_inits);

		if class.is_delegate {
			self.synthesize_delegate_ctor(ty, scope);
		}

		if !is_interface {
			self.enforce_inheritance(ty, class);
		}
	}

	fn single_method(&self, scope: ScopeId, name: Name) -> Option<MethodId> {
		match self.symbols.scope_lookup_here(scope, name) {
			Some(SymbolRef::MethodHeader(header)) => self.symbols.header(header).first,
			_ => None,
		}
	}

	/// `field = (D) MulticastDelegate.Combine(field, value)` and the
	/// `Remove` twin.
	fn default_event_accessor(
		&mut self,
		event: &crate::ast::EventDecl,
		accessor_name: Name,
		combine: &str,
		field: FieldId,
		delegate_ty: TypeId,
		is_static: bool,
	) -> MethodDecl {
		let range = event.range;
		let receiver = match is_static {
			true => None,
			false => Some(Expr::This(ThisExpr { range, ty: None })),
		};
		let field_expr = Expr::Field(Box::new(FieldExpr { field, receiver, range, ty: None }));
		let value_expr = Expr::SimpleName(Box::new(SimpleNameExpr { ident: Ident::new(self.pool.intern("value"), range) }));
		let multicast = Expr::TypeRef(Box::new(TypeRefExpr { referenced: self.well_known.multicast, range }));
		let callee = Expr::DotName(Box::new(DotNameExpr {
			left: multicast,
			member: Ident::new(self.pool.intern(combine), range),
			range,
		}));
		let call = Expr::Call(Box::new(CallExpr {
			callee: Some(callee),
			receiver: None,
			args: vec![field_expr.clone(), value_expr],
			method: None,
			virtual_call: true,
			vararg: false,
			range,
			ty: None,
		}));
		let cast = Expr::Cast(Box::new(CastExpr {
			operand: call,
			target: TypeSig::resolved(delegate_ty, range),
			as_style: false,
			range,
			ty: None,
		}));
		let assign = Expr::Assign(Box::new(AssignExpr { target: field_expr, value: cast, range, ty: None }));
		let body = BlockStmt {
			locals: Vec::new(),
			stmts: vec![Stmt::Expr(ExprStmt { expr: assign, range })],
			scope: None,
			range,
		};
		self.event_accessor_shell(event, accessor_name, Some(body), delegate_ty)
	}

	fn explicit_event_accessor(
		&mut self,
		event: &crate::ast::EventDecl,
		accessor_name: Name,
		body: Option<BlockStmt>,
		delegate_ty: TypeId,
	) -> MethodDecl {
		self.event_accessor_shell(event, accessor_name, body, delegate_ty)
	}

	fn event_accessor_shell(
		&mut self,
		event: &crate::ast::EventDecl,
		accessor_name: Name,
		body: Option<BlockStmt>,
		delegate_ty: TypeId,
	) -> MethodDecl {
		let range = event.range;
		MethodDecl {
			name: Ident::new(accessor_name, event.name.range),
			ret: Some(TypeSig::resolved(self.well_known.void, range)),
			params: vec![ParamVarDecl {
				name: Ident::new(self.pool.intern("value"), range),
				sig: TypeSig::resolved(delegate_ty, range),
				flow: Flow::In,
				sym: None,
				range,
			}],
			body,
			modifiers: event.modifiers,
			ctor_chain: None,
			special_name: true,
			synthesized: true,
			sym: None,
			scope: None,
			range,
		}
	}

	/// Declare one method symbol: rename constructors onto the reserved
	/// names, build the method scope with `this` at slot 0, register the
	/// overload and acquire the handle.
	fn declare_method(
		&mut self,
		ty: TypeId,
		scope: ScopeId,
		is_struct: bool,
		is_interface: bool,
		method: &mut MethodDecl,
	) -> CompileResult<MethodId> {
		let is_ctor = method.ret.is_none();
		let is_static = method.modifiers.is_static();
		let name = match (is_ctor, is_static) {
			(true, true) => self.pool.intern(".cctor"),
			(true, false) => self.pool.intern(".ctor"),
			(false, _) => method.name.name,
		};

		if is_ctor && is_struct {
			if method.params.is_empty() && !is_static {
				self.reporter.error(
					codes::STRUCT_DEFAULT_CONSTRUCTOR,
					method.range,
					"structs cannot declare a parameterless constructor".to_string(),
				);
			}
			if matches!(&method.ctor_chain, Some(chain) if chain.target == CtorChainTarget::Base) {
				self.reporter.error(
					codes::BAD_CONSTRUCTOR_CHAIN,
					method.range,
					"struct constructors cannot chain to base".to_string(),
				);
			}
		}

		let ret = match &method.ret {
			None => self.well_known.void,
			Some(sig) => self.resolve_type_sig(scope, sig)?,
		};
		let mut params = Vec::with_capacity(method.params.len());
		for param in &method.params {
			let param_ty = self.resolve_type_sig(scope, &param.sig)?;
			params.push(ParamSig { name: param.name.name, ty: param_ty, flow: param.flow });
		}

		let mut modifiers = method.modifiers.or_private();
		if is_interface {
			modifiers.insert(Modifiers::ABSTRACT);
			modifiers.insert(Modifiers::PUBLIC);
			modifiers.remove(Modifiers::PRIVATE);
		}

		let sym = self.symbols.add_method(MethodSymbol {
			name,
			owner: ty,
			ret,
			params: params.clone(),
			modifiers,
			is_static,
			special_name: method.special_name,
			next_overload: None,
			handle: None,
		});

		match self.symbols.scope_lookup_here(scope, name) {
			None => {
				let header = self.symbols.add_header(HeaderSymbol { name, first: None });
				self.symbols.link_overload(header, sym);
				let _ = self.symbols.scope_add(scope, name, header.into());
			}
			Some(SymbolRef::MethodHeader(header)) => {
				let duplicate = self
					.symbols
					.overloads(header)
					.any(|existing| self.symbols.params_match(&self.symbols.method(existing).params, &params));
				if duplicate {
					let rendered = self.pool.get(method.name.name).to_string();
					return Err(self.reporter.error(
						codes::DUPLICATE_SYMBOL,
						method.name.range,
						format!("'{rendered}' is already declared with the same parameter list"),
					));
				}
				self.symbols.link_overload(header, sym);
			}
			Some(_) => {
				let rendered = self.pool.get(method.name.name).to_string();
				return Err(self.reporter.error(
					codes::DUPLICATE_SYMBOL,
					method.name.range,
					format!("the name '{rendered}' is already declared in this type"),
				));
			}
		}

		// Method scope: `this` occupies slot 0 outside static context; for
		// structs the slot holds a reference to the struct.
		let method_scope = self.symbols.new_scope(ScopeOwner::Method, Some(scope));
		let mut slot = 0;
		if !is_static {
			let this_ty = match is_struct {
				true => self.ref_type(ty),
				false => ty,
			};
			let this = self.symbols.add_param(ParamSymbol {
				name: self.pool.intern("this"),
				ty: this_ty,
				flow: Flow::In,
				slot,
			});
			let this_name = self.symbols.param(this).name;
			let _ = self.symbols.scope_add(method_scope, this_name, this.into());
			slot += 1;
		}
		for (decl, sig) in method.params.iter_mut().zip(&params) {
			let param = self.symbols.add_param(ParamSymbol { name: sig.name, ty: sig.ty, flow: sig.flow, slot });
			slot += 1;
			decl.sym = Some(param);
			if self.symbols.scope_add(method_scope, sig.name, param.into()).is_err() {
				let rendered = self.pool.get(sig.name).to_string();
				self.reporter.error(
					codes::DUPLICATE_SYMBOL,
					decl.name.range,
					format!("duplicate parameter '{rendered}'"),
				);
			}
		}

		let handle = self.provider.create_method_handle(&self.symbols, sym);
		self.symbols.method_mut(sym).handle = Some(handle);
		method.sym = Some(sym);
		method.scope = Some(method_scope);
		Ok(sym)
	}

	fn wire_constructors(
		&mut self,
		ty: TypeId,
		class: &mut ClassDecl,
		is_struct: bool,
		is_interface: bool,
		instance_inits: Vec<Stmt>,
		static_inits: Vec<Stmt>,
	) {
		let mut has_instance_ctor = false;
		let mut has_static_ctor = false;
		for method in &mut class.methods {
			if method.ret.is_some() {
				continue;
			}
			match method.modifiers.is_static() {
				true => {
					has_static_ctor = true;
					if let Some(body) = &mut method.body {
						splice_front(body, &static_inits);
					}
				}
				false => {
					has_instance_ctor = true;
					if method.ctor_chain.is_none() && !is_struct {
						method.ctor_chain = Some(CtorChainStmt {
							target: CtorChainTarget::Base,
							args: Vec::new(),
							method: None,
							range: method.range,
						});
					}
					// The initializer body is spliced, not called, so the
					// verifier sees straight-line assignments.
					let chains_to_base =
						matches!(&method.ctor_chain, Some(chain) if chain.target == CtorChainTarget::Base);
					if chains_to_base {
						if let Some(body) = &mut method.body {
							splice_front(body, &instance_inits);
						}
					}
				}
			}
		}

		// A class with no constructor at all gets a public parameterless
		// one chaining to base; structs never do.
		if !has_instance_ctor && !is_struct && !is_interface && !class.is_delegate {
			let range = class.name.range;
			let mut body = BlockStmt::empty(range);
			splice_front(&mut body, &instance_inits);
			let mut ctor = MethodDecl {
				name: class.name,
				ret: None,
				params: Vec::new(),
				body: Some(body),
				modifiers: Modifiers::PUBLIC,
				ctor_chain: Some(CtorChainStmt {
					target: CtorChainTarget::Base,
					args: Vec::new(),
					method: None,
					range,
				}),
				special_name: true,
				synthesized: true,
				sym: None,
				scope: None,
				range,
			};
			let scope = self.symbols.ty(ty).scope.expect("pass 1 created the member scope");
			let _ = self.declare_method(ty, scope, is_struct, is_interface, &mut ctor);
			class.methods.push(ctor);
		}

		if !static_inits.is_empty() && !has_static_ctor {
			let range = class.name.range;
			let mut body = BlockStmt::empty(range);
			splice_front(&mut body, &static_inits);
			let mut cctor = MethodDecl {
				name: class.name,
				ret: None,
				params: Vec::new(),
				body: Some(body),
				modifiers: Modifiers::PRIVATE | Modifiers::STATIC,
				ctor_chain: None,
				special_name: true,
				synthesized: true,
				sym: None,
				scope: None,
				range,
			};
			let scope = self.symbols.ty(ty).scope.expect("pass 1 created the member scope");
			let _ = self.declare_method(ty, scope, is_struct, is_interface, &mut cctor);
			class.methods.push(cctor);
		}
	}

	/// Delegates get the runtime-implemented `(object, native int)`
	/// constructor delegate construction lowers onto.
	fn synthesize_delegate_ctor(&mut self, ty: TypeId, scope: ScopeId) {
		let name = self.pool.intern(".ctor");
		let params = vec![
			ParamSig { name: self.pool.intern("target"), ty: self.well_known.object, flow: Flow::In },
			ParamSig { name: self.pool.intern("method"), ty: self.well_known.intptr, flow: Flow::In },
		];
		let sym = self.symbols.add_method(MethodSymbol {
			name,
			owner: ty,
			ret: self.well_known.void,
			params,
			modifiers: Modifiers::PUBLIC,
			is_static: false,
			special_name: true,
			next_overload: None,
			handle: None,
		});
		let handle = self.provider.create_method_handle(&self.symbols, sym);
		self.symbols.method_mut(sym).handle = Some(handle);
		let header = self.symbols.add_header(HeaderSymbol { name, first: None });
		self.symbols.link_overload(header, sym);
		let _ = self.symbols.scope_add(scope, name, header.into());
	}

	/// Abstractness, override soundness and interface coverage. Each
	/// failed check reports independently; none aborts the pass.
	fn enforce_inheritance(&mut self, ty: TypeId, class: &ClassDecl) {
		let is_abstract = class.modifiers.contains(Modifiers::ABSTRACT);
		let has_abstract_member = class.methods.iter().any(|m| m.modifiers.contains(Modifiers::ABSTRACT))
			|| class.properties.iter().any(|p| p.modifiers.contains(Modifiers::ABSTRACT));
		if has_abstract_member && !is_abstract {
			let rendered = self.pool.get(class.name.name).to_string();
			self.reporter.error(
				codes::ABSTRACT_MEMBER_IN_CONCRETE_CLASS,
				class.name.range,
				format!("'{rendered}' has abstract members and must be declared abstract"),
			);
		}

		for method in &class.methods {
			if !method.modifiers.contains(Modifiers::OVERRIDE) {
				continue;
			}
			let Some(sym) = method.sym else { continue };
			self.check_override(ty, method, sym);
		}

		if !is_abstract {
			self.check_interface_coverage(ty, class);
		}
	}

	/// An override needs an ancestor method with the identical signature
	/// that is virtual, not final, and of matching visibility. Every
	/// mismatch is its own diagnostic.
	fn check_override(&mut self, ty: TypeId, method: &MethodDecl, sym: MethodId) {
		let name = self.symbols.method(sym).name;
		let Some(base) = self.symbols.ty(ty).base else {
			return;
		};
		let headers = self.symbols.member_headers(base, name);
		let target = headers
			.iter()
			.flat_map(|header| self.symbols.overloads(*header))
			.find(|candidate| self.symbols.signatures_match(*candidate, sym));
		let rendered = self.pool.get(method.name.name).to_string();
		let Some(target) = target else {
			self.reporter.error(
				codes::MISSING_OVERRIDE_TARGET,
				method.name.range,
				format!("'{rendered}' overrides nothing: no ancestor method has the same signature"),
			);
			return;
		};
		let target_mods = self.symbols.method(target).modifiers;
		let virtual_like = target_mods
			.intersects(Modifiers::VIRTUAL | Modifiers::ABSTRACT | Modifiers::OVERRIDE);
		if !virtual_like {
			self.reporter.error(
				codes::MISSING_OVERRIDE_TARGET,
				method.name.range,
				format!("'{rendered}' overrides a method that is not virtual"),
			);
		}
		if target_mods.contains(Modifiers::SEALED) {
			self.reporter.error(
				codes::MISSING_OVERRIDE_TARGET,
				method.name.range,
				format!("'{rendered}' overrides a sealed method"),
			);
		}
		let my_visibility = self.symbols.method(sym).modifiers.visibility();
		if my_visibility != target_mods.visibility() {
			self.reporter.error(
				codes::VISIBILITY_MISMATCH,
				method.name.range,
				format!("'{rendered}' changes the visibility of the method it overrides"),
			);
		}
	}

	/// Every method of every base interface must map to a public method on
	/// this type, directly or inherited. The implementation becomes
	/// implicitly virtual and sealed unless it was declared virtual.
	fn check_interface_coverage(&mut self, ty: TypeId, class: &ClassDecl) {
		let mut interfaces = Vec::new();
		self.collect_interfaces(ty, &mut interfaces);
		for iface in interfaces {
			let Some(iface_scope) = self.symbols.ty(iface).scope else { continue };
			let required: Vec<MethodId> = self
				.symbols
				.scope_entries(iface_scope)
				.filter_map(|(_, sym)| match sym {
					SymbolRef::MethodHeader(header) => Some(header),
					_ => None,
				})
				.flat_map(|header| self.symbols.overloads(header).collect::<Vec<_>>())
				.collect();
			for wanted in required {
				let name = self.symbols.method(wanted).name;
				let headers = self.symbols.member_headers(ty, name);
				let implementation = headers
					.iter()
					.flat_map(|header| self.symbols.overloads(*header))
					.find(|candidate| {
						self.symbols.method(*candidate).owner != iface
							&& !self.symbols.ty(self.symbols.method(*candidate).owner).is_interface()
							&& self.symbols.signatures_match(*candidate, wanted)
					});
				let iface_name = self.type_name(iface);
				let method_name = self.pool.get(name).to_string();
				match implementation {
					None => {
						self.reporter.error(
							codes::INTERFACE_NOT_IMPLEMENTED,
							class.name.range,
							format!("missing implementation of '{iface_name}.{method_name}'"),
						);
					}
					Some(found) => {
						let mods = self.symbols.method(found).modifiers;
						if !mods.is_public() {
							self.reporter.error(
								codes::NONPUBLIC_INTERFACE_IMPL,
								class.name.range,
								format!("'{method_name}' implements '{iface_name}.{method_name}' and must be public"),
							);
						}
						let virtual_like =
							mods.intersects(Modifiers::VIRTUAL | Modifiers::ABSTRACT | Modifiers::OVERRIDE);
						if !virtual_like {
							let entry = self.symbols.method_mut(found);
							entry.modifiers.insert(Modifiers::VIRTUAL);
							entry.modifiers.insert(Modifiers::SEALED);
						}
					}
				}
			}
		}
	}

	fn collect_interfaces(&self, ty: TypeId, out: &mut Vec<TypeId>) {
		for iface in &self.symbols.ty(ty).interfaces {
			if !out.contains(iface) {
				out.push(*iface);
				self.collect_interfaces(*iface, out);
			}
		}
		if let Some(base) = self.symbols.ty(ty).base {
			if !self.symbols.ty(base).imported {
				self.collect_interfaces(base, out);
			}
		}
	}
}

fn splice_front(body: &mut BlockStmt, stmts: &[Stmt]) {
	if stmts.is_empty() {
		return;
	}
	let mut spliced = stmts.to_vec();
	spliced.append(&mut body.stmts);
	body.stmts = spliced;
}
