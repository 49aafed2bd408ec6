use crate::ast::{
	ArgExpr, AssignExpr, BinOp, BinaryExpr, CallExpr, CastExpr, CompoundExpr, CondExpr, DeclareLocalExpr,
	DotNameExpr, Expr, FieldExpr, Flow, Ident, IncDecExpr, IncDecOp, IndexExpr, IsExpr, Literal, LiteralKind,
	LocalExpr, MethodGroupExpr, MethodPtrExpr, NamespaceRefExpr, NewArrayExpr, NewObjExpr, ParamExpr, PropExpr,
	SimpleNameExpr, ThisExpr, TypeOfExpr, TypeRefExpr, TypeSig, UnOp, UnaryExpr,
};
use crate::diagnostics::{codes, CompileResult, ErrorReported, FileRange};
use crate::symbols::{ArgInfo, MethodId, SymbolRef, TypeId, TypeShape};

use super::{Compilation, INDEXER_NAME};

impl Compilation {
	pub(crate) fn arg_info(&self, arg: &Expr) -> ArgInfo {
		match arg {
			Expr::Arg(wrapper) => ArgInfo { ty: wrapper.operand.ty(), flow: wrapper.flow },
			_ => ArgInfo { ty: arg.ty(), flow: Flow::In },
		}
	}

	/// Resolve as right-side: full name binding followed by the rvalue
	/// lowerings (property to getter call, event to backing field, indexer
	/// to `get_Item`).
	pub(crate) fn resolve_rvalue(&mut self, expr: Expr) -> CompileResult<Expr> {
		let expr = self.resolve_reference(expr)?;
		self.rvalue_finish(expr)
	}

	/// Name binding without the final rvalue lowering; assignment and
	/// argument resolution need the place, not the value.
	fn resolve_reference(&mut self, expr: Expr) -> CompileResult<Expr> {
		match expr {
			Expr::Literal(mut literal) => {
				literal.ty = match literal.kind {
					LiteralKind::Null => None,
					LiteralKind::Int(_) => Some(self.well_known.int32),
					LiteralKind::Bool(_) => Some(self.well_known.boolean),
					LiteralKind::Char(_) => Some(self.well_known.char_),
					LiteralKind::Str(_) => Some(self.well_known.string),
				};
				Ok(Expr::Literal(literal))
			}
			Expr::SimpleName(simple) => self.resolve_simple_name(*simple),
			Expr::DotName(dot) => self.resolve_dot_name(*dot),
			Expr::This(this) => self.this_expr(this.range),
			Expr::Base(base) => Ok(Expr::Base(base)),
			Expr::Call(call) => self.resolve_call_expr(*call),
			Expr::New(new) => self.resolve_new(*new),
			Expr::NewArray(new) => self.resolve_new_array(*new),
			Expr::Index(index) => self.resolve_index(*index),
			Expr::Binary(binary) => self.resolve_binary(*binary),
			Expr::Unary(unary) => self.resolve_unary(*unary),
			Expr::IncDec(incdec) => self.resolve_incdec(*incdec),
			Expr::Assign(assign) => self.resolve_assign(*assign),
			Expr::Cond(cond) => self.resolve_cond(*cond),
			Expr::Is(is) => self.resolve_is(*is),
			Expr::Cast(cast) => self.resolve_cast(*cast),
			Expr::TypeOf(typeof_) => self.resolve_typeof(*typeof_),
			Expr::Arg(arg) => self.resolve_arg(*arg),
			Expr::TempType(temp) => {
				let range = temp.range;
				Err(self.reporter.error(codes::NOT_A_VALUE, range, "a type is not a value".to_string()))
			}
			// Nodes synthesized in resolved form only need their type.
			Expr::Field(mut field) => {
				field.ty = Some(self.symbols.field(field.field).ty);
				field.receiver = match field.receiver.take() {
					Some(receiver) => Some(self.resolve_rvalue(receiver)?),
					None => None,
				};
				Ok(Expr::Field(field))
			}
			Expr::TypeRef(_)
			| Expr::NamespaceRef(_)
			| Expr::Local(_)
			| Expr::Param(_)
			| Expr::Prop(_)
			| Expr::Event(_)
			| Expr::MethodGroup(_)
			| Expr::MethodPtr(_)
			| Expr::Compound(_)
			| Expr::DeclareLocal(_) => Ok(expr),
		}
	}

	/// Final rvalue lowerings over a bound reference.
	fn rvalue_finish(&mut self, expr: Expr) -> CompileResult<Expr> {
		match expr {
			Expr::Prop(prop) => self.getter_call(*prop),
			Expr::Event(event) => {
				// Inside the declaring type an event reads as its backing
				// field; everywhere else it is not a value.
				let entry = self.symbols.event(event.event);
				let in_owner = self.current_class == Some(entry.owner);
				match (in_owner, entry.backing_field) {
					(true, Some(field)) => {
						let ty = self.symbols.field(field).ty;
						Ok(Expr::Field(Box::new(FieldExpr {
							field,
							receiver: event.receiver,
							range: event.range,
							ty: Some(ty),
						})))
					}
					_ => Err(self.reporter.error(
						codes::EVENT_NOT_A_VALUE,
						event.range,
						"an event is not a value outside its declaring type".to_string(),
					)),
				}
			}
			Expr::Index(index) if index.ty.is_none() => self.indexer_getter(*index),
			Expr::MethodGroup(group) => Err(self.reporter.error(
				codes::NOT_A_VALUE,
				group.range,
				"a method group is not a value".to_string(),
			)),
			Expr::TypeRef(type_ref) => {
				let rendered = self.type_name(type_ref.referenced);
				Err(self.reporter.error(
					codes::NOT_A_VALUE,
					type_ref.range,
					format!("'{rendered}' is a type, not a value"),
				))
			}
			Expr::NamespaceRef(ns) => {
				let rendered = self.pool.get(self.symbols.namespace(ns.namespace).full_name).to_string();
				Err(self.reporter.error(
					codes::NOT_A_VALUE,
					ns.range,
					format!("'{rendered}' is a namespace, not a value"),
				))
			}
			Expr::Base(base) => Err(self.reporter.error(
				codes::NOT_A_VALUE,
				base.range,
				"'base' is only valid for member access".to_string(),
			)),
			other => Ok(other),
		}
	}

	fn this_expr(&mut self, range: FileRange) -> CompileResult<Expr> {
		let Some(class) = self.current_class else {
			return Err(self.reporter.error(codes::STATIC_MISMATCH, range, "'this' is invalid here".to_string()));
		};
		let method_static = self.current_method.map(|m| self.symbols.method(m).is_static).unwrap_or(true);
		if method_static {
			return Err(self.reporter.error(
				codes::STATIC_MISMATCH,
				range,
				"'this' cannot be used in a static context".to_string(),
			));
		}
		Ok(Expr::This(ThisExpr { range, ty: Some(class) }))
	}

	fn resolve_simple_name(&mut self, simple: SimpleNameExpr) -> CompileResult<Expr> {
		let ident = simple.ident;
		let range = ident.range;
		let Some(found) = self.lookup_context(self.current_scope, ident.name) else {
			return Err(self.error_undefined(ident.name, range));
		};
		match found {
			SymbolRef::Local(local) => {
				let ty = self.symbols.local(local).ty;
				Ok(Expr::Local(Box::new(LocalExpr { local, range, ty: Some(ty) })))
			}
			SymbolRef::Param(param) => {
				// Byref parameters read as their pointee.
				let ty = match self.symbols.ty(self.symbols.param(param).ty).shape {
					TypeShape::Ref { inner } => inner,
					_ => self.symbols.param(param).ty,
				};
				Ok(Expr::Param(Box::new(ParamExpr { param, range, ty: Some(ty) })))
			}
			SymbolRef::Field(field) => {
				let receiver = self.implicit_receiver(self.symbols.field(field).is_static, range)?;
				let ty = self.symbols.field(field).ty;
				Ok(Expr::Field(Box::new(FieldExpr { field, receiver, range, ty: Some(ty) })))
			}
			SymbolRef::Property(prop) => {
				let receiver = self.implicit_receiver(self.symbols.property(prop).is_static, range)?;
				let ty = self.symbols.property(prop).ty;
				Ok(Expr::Prop(Box::new(PropExpr { prop, receiver, base_access: false, range, ty: Some(ty) })))
			}
			SymbolRef::Event(event) => {
				let receiver = self.implicit_receiver(self.symbols.event(event).is_static, range)?;
				let ty = self.symbols.event(event).delegate_ty;
				Ok(Expr::Event(Box::new(crate::ast::EventExpr { event, receiver, range, ty: Some(ty) })))
			}
			SymbolRef::MethodHeader(header) => {
				let on_type = match self.current_class {
					Some(class) => class,
					None => {
						return Err(self.reporter.internal("resolve", "method group outside a class".to_string()));
					}
				};
				let name = self.symbols.header(header).name;
				let method_static =
					self.current_method.map(|m| self.symbols.method(m).is_static).unwrap_or(true);
				let receiver = match method_static {
					true => None,
					false => Some(Expr::This(ThisExpr { range, ty: Some(on_type) })),
				};
				Ok(Expr::MethodGroup(Box::new(MethodGroupExpr { name, on_type, receiver, base_call: false, range })))
			}
			SymbolRef::Type(ty) => Ok(Expr::TypeRef(Box::new(TypeRefExpr { referenced: ty, range }))),
			SymbolRef::Namespace(namespace) => {
				Ok(Expr::NamespaceRef(Box::new(NamespaceRefExpr { namespace, range })))
			}
			SymbolRef::Label(_) => {
				Err(self.reporter.error(codes::NOT_A_VALUE, range, "a label is not a value".to_string()))
			}
			SymbolRef::Method(_) => {
				Err(self.reporter.internal("resolve", "a bare method symbol reached name resolution".to_string()))
			}
		}
	}

	fn implicit_receiver(&mut self, member_static: bool, range: FileRange) -> CompileResult<Option<Expr>> {
		match member_static {
			true => Ok(None),
			false => Ok(Some(self.this_expr(range)?)),
		}
	}

	fn resolve_dot_name(&mut self, dot: DotNameExpr) -> CompileResult<Expr> {
		let member = dot.member;
		let range = dot.range;
		let left = self.resolve_reference(dot.left)?;
		match left {
			Expr::NamespaceRef(ns) => match self.lookup_qualified(SymbolRef::Namespace(ns.namespace), member.name) {
				Some(SymbolRef::Namespace(namespace)) => {
					Ok(Expr::NamespaceRef(Box::new(NamespaceRefExpr { namespace, range })))
				}
				Some(SymbolRef::Type(ty)) => Ok(Expr::TypeRef(Box::new(TypeRefExpr { referenced: ty, range }))),
				_ => Err(self.error_undefined(member.name, member.range)),
			},
			Expr::TypeRef(type_ref) => self.static_member_access(type_ref.referenced, member, range),
			Expr::Base(_) => {
				let this = self.this_expr(range)?;
				let class = self.current_class.expect("this_expr checked the class");
				let Some(base) = self.symbols.ty(class).base else {
					return Err(self.reporter.error(
						codes::NO_SUCH_MEMBER,
						range,
						"this type has no base class".to_string(),
					));
				};
				self.member_access(base, Some(this), true, member, range)
			}
			value => {
				let Some(ty) = value.ty() else {
					return Err(self.reporter.error(
						codes::NOT_A_VALUE,
						range,
						"this expression has no members".to_string(),
					));
				};
				self.member_access(ty, Some(value), false, member, range)
			}
		}
	}

	fn static_member_access(&mut self, on: TypeId, member: Ident, range: FileRange) -> CompileResult<Expr> {
		let found = self.symbols.lookup_member(on, member.name);
		match found {
			Some(SymbolRef::Field(field)) => {
				if !self.symbols.field(field).is_static {
					return Err(self.static_mismatch(member, true));
				}
				let ty = self.symbols.field(field).ty;
				Ok(Expr::Field(Box::new(FieldExpr { field, receiver: None, range, ty: Some(ty) })))
			}
			Some(SymbolRef::Property(prop)) => {
				if !self.symbols.property(prop).is_static {
					return Err(self.static_mismatch(member, true));
				}
				let ty = self.symbols.property(prop).ty;
				Ok(Expr::Prop(Box::new(PropExpr { prop, receiver: None, base_access: false, range, ty: Some(ty) })))
			}
			Some(SymbolRef::Event(event)) => {
				if !self.symbols.event(event).is_static {
					return Err(self.static_mismatch(member, true));
				}
				let ty = self.symbols.event(event).delegate_ty;
				Ok(Expr::Event(Box::new(crate::ast::EventExpr { event, receiver: None, range, ty: Some(ty) })))
			}
			Some(SymbolRef::MethodHeader(header)) => {
				let name = self.symbols.header(header).name;
				Ok(Expr::MethodGroup(Box::new(MethodGroupExpr {
					name,
					on_type: on,
					receiver: None,
					base_call: false,
					range,
				})))
			}
			Some(SymbolRef::Type(nested)) => Ok(Expr::TypeRef(Box::new(TypeRefExpr { referenced: nested, range }))),
			_ => self.no_such_member(on, member),
		}
	}

	fn member_access(
		&mut self,
		on: TypeId,
		receiver: Option<Expr>,
		base_call: bool,
		member: Ident,
		range: FileRange,
	) -> CompileResult<Expr> {
		match self.symbols.lookup_member(on, member.name) {
			Some(SymbolRef::Field(field)) => {
				let entry = self.symbols.field(field);
				let ty = entry.ty;
				let receiver = match entry.is_static {
					true => return Err(self.static_mismatch(member, false)),
					false => receiver,
				};
				Ok(Expr::Field(Box::new(FieldExpr { field, receiver, range, ty: Some(ty) })))
			}
			Some(SymbolRef::Property(prop)) => {
				let entry = self.symbols.property(prop);
				if entry.is_static {
					return Err(self.static_mismatch(member, false));
				}
				let ty = entry.ty;
				Ok(Expr::Prop(Box::new(PropExpr { prop, receiver, base_access: base_call, range, ty: Some(ty) })))
			}
			Some(SymbolRef::Event(event)) => {
				let entry = self.symbols.event(event);
				if entry.is_static {
					return Err(self.static_mismatch(member, false));
				}
				let ty = entry.delegate_ty;
				Ok(Expr::Event(Box::new(crate::ast::EventExpr { event, receiver, range, ty: Some(ty) })))
			}
			Some(SymbolRef::MethodHeader(header)) => {
				let name = self.symbols.header(header).name;
				Ok(Expr::MethodGroup(Box::new(MethodGroupExpr { name, on_type: on, receiver, base_call, range })))
			}
			Some(SymbolRef::Type(_)) => Err(self.reporter.error(
				codes::NOT_A_VALUE,
				member.range,
				"cannot access a nested type through a value".to_string(),
			)),
			_ => self.no_such_member(on, member),
		}
	}

	fn static_mismatch(&mut self, member: Ident, wanted_static: bool) -> ErrorReported {
		let rendered = self.pool.get(member.name).to_string();
		let message = match wanted_static {
			true => format!("'{rendered}' is an instance member; an object reference is required"),
			false => format!("'{rendered}' is static and cannot be accessed through an instance"),
		};
		self.reporter.error(codes::STATIC_MISMATCH, member.range, message)
	}

	fn no_such_member(&mut self, on: TypeId, member: Ident) -> CompileResult<Expr> {
		let type_name = self.type_name(on);
		let rendered = self.pool.get(member.name).to_string();
		Err(self.reporter.error(
			codes::NO_SUCH_MEMBER,
			member.range,
			format!("'{type_name}' has no member '{rendered}'"),
		))
	}

	// Calls.

	fn resolve_call_expr(&mut self, mut call: CallExpr) -> CompileResult<Expr> {
		if call.method.is_some() {
			return Ok(Expr::Call(Box::new(call)));
		}
		let callee = call.callee.take().expect("raw calls carry their callee");
		let callee = self.resolve_reference(callee)?;
		let args = self.resolve_args(std::mem::take(&mut call.args))?;
		match callee {
			Expr::MethodGroup(group) => self.finish_call(*group, args, call.range),
			value => {
				let value = self.rvalue_finish(value)?;
				let delegate = value.ty().filter(|ty| self.symbols.ty(*ty).is_delegate);
				match delegate {
					Some(ty) => {
						let group = MethodGroupExpr {
							name: self.pool.intern("Invoke"),
							on_type: ty,
							receiver: Some(value),
							base_call: false,
							range: call.range,
						};
						self.finish_call(group, args, call.range)
					}
					None => Err(self.reporter.error(
						codes::NOT_CALLABLE,
						call.range,
						"this expression cannot be called".to_string(),
					)),
				}
			}
		}
	}

	fn resolve_args(&mut self, args: Vec<Expr>) -> CompileResult<Vec<Expr>> {
		let mut resolved = Vec::with_capacity(args.len());
		for arg in args {
			resolved.push(self.resolve_rvalue(arg)?);
		}
		Ok(resolved)
	}

	/// Resolve `ref`/`out` wrappers around an assignable place.
	fn resolve_arg(&mut self, mut arg: ArgExpr) -> CompileResult<Expr> {
		let operand = self.resolve_reference(std::mem::replace(
			&mut arg.operand,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		match operand {
			Expr::Local(_) | Expr::Param(_) | Expr::Field(_) => {
				arg.operand = operand;
				Ok(Expr::Arg(Box::new(arg)))
			}
			_ => Err(self.reporter.error(
				codes::NOT_AN_LVALUE,
				arg.range,
				"ref and out arguments require an assignable variable".to_string(),
			)),
		}
	}

	fn finish_call(&mut self, group: MethodGroupExpr, mut args: Vec<Expr>, range: FileRange) -> CompileResult<Expr> {
		let infos: Vec<ArgInfo> = args.iter().map(|arg| self.arg_info(arg)).collect();
		let headers = self.symbols.member_headers(group.on_type, group.name);
		let expect_static = match group.receiver.is_none() {
			true => Some(true),
			false => None,
		};
		let (method, vararg) = match self.symbols.resolve_call(&headers, &infos, expect_static) {
			Ok(found) => found,
			Err(_) => {
				let rendered = self.pool.get(group.name).to_string();
				return Err(self.reporter.error(
					codes::NO_MATCHING_OVERLOAD,
					range,
					format!("no overload of '{rendered}' matches this argument list"),
				));
			}
		};
		if vararg {
			args = self.pack_varargs(method, args, range);
		}
		let entry = self.symbols.method(method);
		let ret = entry.ret;
		let is_static = entry.is_static;
		let receiver = match is_static {
			true => None,
			false => group.receiver,
		};
		Ok(Expr::Call(Box::new(CallExpr {
			callee: None,
			receiver,
			args,
			method: Some(method),
			virtual_call: !group.base_call && !is_static,
			vararg,
			range,
			ty: Some(ret),
		})))
	}

	/// Pack surplus varargs call arguments into a freshly allocated array.
	fn pack_varargs(&mut self, method: MethodId, args: Vec<Expr>, range: FileRange) -> Vec<Expr> {
		let params = &self.symbols.method(method).params;
		let fixed = params.len() - 1;
		let elem = match self.symbols.ty(params[fixed].ty).shape {
			TypeShape::Array { elem, .. } => elem,
			_ => return args,
		};
		let mut args = args;
		let rest = args.split_off(fixed);
		let packed = self.lower_array_literal(elem, rest, range);
		args.push(packed);
		args
	}

	// Object and array construction.

	fn resolve_new(&mut self, mut new: NewObjExpr) -> CompileResult<Expr> {
		let scope = self.current_scope;
		let ty = self.resolve_type_sig(scope, &new.target)?;
		let entry = self.symbols.ty(ty);
		if entry.is_interface() || entry.modifiers.contains(crate::symbols::Modifiers::ABSTRACT) {
			let rendered = self.type_name(ty);
			return Err(self.reporter.error(
				codes::TYPE_MISMATCH,
				new.range,
				format!("cannot instantiate '{rendered}'"),
			));
		}
		if entry.is_delegate {
			return self.resolve_delegate_new(ty, new);
		}
		let args = self.resolve_args(std::mem::take(&mut new.args))?;
		let infos: Vec<ArgInfo> = args.iter().map(|arg| self.arg_info(arg)).collect();
		let ctor_name = self.pool.intern(".ctor");
		let header = self.symbols.ty(ty).scope.and_then(|s| self.symbols.scope_lookup_here(s, ctor_name));
		let ctor = match header {
			Some(SymbolRef::MethodHeader(header)) => {
				match self.symbols.resolve_call(&[header], &infos, Some(false)) {
					Ok((ctor, vararg)) => {
						let args = match vararg {
							true => self.pack_varargs(ctor, args, new.range),
							false => args,
						};
						new.args = args;
						Some(ctor)
					}
					// `new S()` default-initializes a struct even when other
					// constructors exist.
					Err(_) if self.symbols.is_value_type(ty) && args.is_empty() => None,
					Err(_) => {
						let rendered = self.type_name(ty);
						return Err(self.reporter.error(
							codes::NO_MATCHING_OVERLOAD,
							new.range,
							format!("no constructor of '{rendered}' matches this argument list"),
						));
					}
				}
			}
			// Structs without a declared constructor still support `new S()`.
			None if self.symbols.is_value_type(ty) && args.is_empty() => None,
			_ => {
				let rendered = self.type_name(ty);
				return Err(self.reporter.error(
					codes::NO_MATCHING_OVERLOAD,
					new.range,
					format!("'{rendered}' has no accessible constructor"),
				));
			}
		};
		new.target = TypeSig::resolved(ty, new.target.range());
		new.ctor = ctor;
		new.ty = Some(ty);
		Ok(Expr::New(Box::new(new)))
	}

	/// `new D(e.m)` selects `m` by D's `Invoke` signature and lowers to the
	/// runtime delegate constructor over (target, method pointer); a
	/// static target passes null.
	fn resolve_delegate_new(&mut self, ty: TypeId, mut new: NewObjExpr) -> CompileResult<Expr> {
		let args = std::mem::take(&mut new.args);
		if args.len() != 1 {
			return Err(self.reporter.error(
				codes::NO_MATCHING_OVERLOAD,
				new.range,
				"delegate construction takes exactly one method argument".to_string(),
			));
		}
		let group = match self.resolve_reference(args.into_iter().next().unwrap())? {
			Expr::MethodGroup(group) => *group,
			other => {
				return Err(self.reporter.error(
					codes::TYPE_MISMATCH,
					other.range(),
					"delegate construction requires a method".to_string(),
				));
			}
		};
		let invoke_name = self.pool.intern("Invoke");
		let invoke = self
			.symbols
			.ty(ty)
			.scope
			.and_then(|s| self.symbols.scope_lookup_here(s, invoke_name))
			.and_then(|found| match found {
				SymbolRef::MethodHeader(header) => self.symbols.header(header).first,
				_ => None,
			})
			.expect("pass 3 declared Invoke on every delegate");
		let wanted = self.symbols.method(invoke).params.clone();
		let headers = self.symbols.member_headers(group.on_type, group.name);
		let Some(target) = self.symbols.resolve_by_signature(&headers, &wanted) else {
			let rendered = self.pool.get(group.name).to_string();
			let delegate = self.type_name(ty);
			return Err(self.reporter.error(
				codes::NO_MATCHING_OVERLOAD,
				new.range,
				format!("no overload of '{rendered}' matches the signature of '{delegate}'"),
			));
		};
		let first = match self.symbols.method(target).is_static {
			true => Expr::Literal(Literal { kind: LiteralKind::Null, range: new.range, ty: None }),
			false => match group.receiver {
				Some(receiver) => receiver,
				None => {
					let rendered = self.pool.get(group.name).to_string();
					return Err(self.reporter.error(
						codes::STATIC_MISMATCH,
						new.range,
						format!("'{rendered}' is an instance method; an object reference is required"),
					));
				}
			},
		};
		let pointer = Expr::MethodPtr(Box::new(MethodPtrExpr {
			method: target,
			range: new.range,
			ty: Some(self.well_known.intptr),
		}));
		let ctor_name = self.pool.intern(".ctor");
		let ctor = self
			.symbols
			.ty(ty)
			.scope
			.and_then(|s| self.symbols.scope_lookup_here(s, ctor_name))
			.and_then(|found| match found {
				SymbolRef::MethodHeader(header) => self.symbols.header(header).first,
				_ => None,
			});
		new.args = vec![first, pointer];
		new.target = TypeSig::resolved(ty, new.target.range());
		new.ctor = ctor;
		new.ty = Some(ty);
		Ok(Expr::New(Box::new(new)))
	}

	fn resolve_new_array(&mut self, mut new: NewArrayExpr) -> CompileResult<Expr> {
		let scope = self.current_scope;
		let elem = self.resolve_type_sig(scope, &new.elem)?;
		let lengths = self.resolve_args(std::mem::take(&mut new.lengths))?;
		for length in &lengths {
			let is_int = matches!(length.ty(), Some(ty) if self.symbols.types_equal(ty, self.well_known.int32));
			if !is_int {
				return Err(self.reporter.error(
					codes::TYPE_MISMATCH,
					length.range(),
					"array lengths must be integers".to_string(),
				));
			}
		}
		match new.init.take() {
			None => {
				let ty = self.array_type(elem, new.rank);
				new.elem = TypeSig::resolved(elem, new.elem.range());
				new.lengths = lengths;
				new.ty = Some(ty);
				Ok(Expr::NewArray(Box::new(new)))
			}
			Some(values) => {
				if new.rank != 1 {
					return Err(self.reporter.error(
						codes::TYPE_MISMATCH,
						new.range,
						"array initializers require a single-dimensional array".to_string(),
					));
				}
				let mut resolved = Vec::with_capacity(values.len());
				for value in values {
					let value = self.resolve_rvalue(value)?;
					if !self.symbols.is_assignable(value.ty(), elem) {
						let expected = self.type_name(elem);
						self.reporter.error(
							codes::NOT_ASSIGNABLE,
							value.range(),
							format!("array element is not assignable to '{expected}'"),
						);
					}
					resolved.push(value);
				}
				Ok(self.lower_array_literal(elem, resolved, new.range))
			}
		}
	}

	/// `new T[] { e0, e1, ... }` becomes `<declare t; t = new T[n];
	/// t[0] = e0; ...; t>`.
	pub(crate) fn lower_array_literal(&mut self, elem: TypeId, values: Vec<Expr>, range: FileRange) -> Expr {
		let array_ty = self.array_type(elem, 1);
		let temp = self.fresh_temp(array_ty);
		let local = Expr::Local(Box::new(LocalExpr { local: temp, range, ty: Some(array_ty) }));
		let length = Expr::Literal(Literal {
			kind: LiteralKind::Int(values.len() as i32),
			range,
			ty: Some(self.well_known.int32),
		});
		let allocation = Expr::NewArray(Box::new(NewArrayExpr {
			elem: TypeSig::resolved(elem, range),
			rank: 1,
			lengths: vec![length],
			init: None,
			range,
			ty: Some(array_ty),
		}));
		let mut effects = vec![
			Expr::DeclareLocal(Box::new(DeclareLocalExpr { local: temp, range, ty: Some(array_ty) })),
			Expr::Assign(Box::new(AssignExpr { target: local.clone(), value: allocation, range, ty: Some(array_ty) })),
		];
		for (index, value) in values.into_iter().enumerate() {
			let slot = Expr::Index(Box::new(IndexExpr {
				target: local.clone(),
				indices: vec![Expr::Literal(Literal {
					kind: LiteralKind::Int(index as i32),
					range,
					ty: Some(self.well_known.int32),
				})],
				range,
				ty: Some(elem),
			}));
			effects.push(Expr::Assign(Box::new(AssignExpr { target: slot, value, range, ty: Some(elem) })));
		}
		Expr::Compound(Box::new(CompoundExpr { effects, value: local, range, ty: Some(array_ty) }))
	}

	// Element and indexer access.

	fn resolve_index(&mut self, mut index: IndexExpr) -> CompileResult<Expr> {
		if index.ty.is_some() {
			return Ok(Expr::Index(Box::new(index)));
		}
		let target = self.resolve_rvalue(std::mem::replace(
			&mut index.target,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let indices = self.resolve_args(std::mem::take(&mut index.indices))?;
		let Some(target_ty) = target.ty() else {
			return Err(self.reporter.error(
				codes::NOT_A_VALUE,
				index.range,
				"this expression cannot be indexed".to_string(),
			));
		};
		if let TypeShape::Array { elem, rank } = self.symbols.ty(target_ty).shape {
			if rank as usize != indices.len() {
				return Err(self.reporter.error(
					codes::TYPE_MISMATCH,
					index.range,
					format!("this array expects {rank} indices"),
				));
			}
			for idx in &indices {
				let is_int = matches!(idx.ty(), Some(ty) if self.symbols.types_equal(ty, self.well_known.int32));
				if !is_int {
					return Err(self.reporter.error(
						codes::TYPE_MISMATCH,
						idx.range(),
						"array indices must be integers".to_string(),
					));
				}
			}
			index.target = target;
			index.indices = indices;
			index.ty = Some(elem);
			return Ok(Expr::Index(Box::new(index)));
		}
		// Not an array: keep the shape; rvalue finishing or assignment
		// turns it into the matching indexer accessor call.
		index.target = target;
		index.indices = indices;
		Ok(Expr::Index(Box::new(index)))
	}

	/// `a[i]` on a non-array becomes `a.get_Item(i)`.
	fn indexer_getter(&mut self, index: IndexExpr) -> CompileResult<Expr> {
		let target_ty = index.target.ty().expect("indexer targets carry a type");
		let getter_name = self.pool.intern(&format!("get_{INDEXER_NAME}"));
		let headers = self.symbols.member_headers(target_ty, getter_name);
		let infos: Vec<ArgInfo> = index.indices.iter().map(|arg| self.arg_info(arg)).collect();
		match self.symbols.resolve_call(&headers, &infos, Some(false)) {
			Ok((method, _)) => {
				let ret = self.symbols.method(method).ret;
				Ok(Expr::Call(Box::new(CallExpr {
					callee: None,
					receiver: Some(index.target),
					args: index.indices,
					method: Some(method),
					virtual_call: true,
					vararg: false,
					range: index.range,
					ty: Some(ret),
				})))
			}
			Err(_) => {
				let rendered = self.type_name(target_ty);
				Err(self.reporter.error(
					codes::NO_MATCHING_OVERLOAD,
					index.range,
					format!("'{rendered}' has no matching indexer"),
				))
			}
		}
	}

	// Assignment and mutation.

	fn resolve_assign(&mut self, assign: AssignExpr) -> CompileResult<Expr> {
		let range = assign.range;

		// `a.E += d` arrives as `a.E = (a.E + d)` thanks to parse-time
		// compound lowering; recognize the shape before value resolution
		// so the event forms can lower to add/remove accessor calls.
		let event_arm = match &assign.value {
			Expr::Binary(binary)
				if matches!(binary.op, BinOp::Add | BinOp::Sub) && binary.left == assign.target =>
			{
				Some(binary.op)
			}
			_ => None,
		};

		let target = self.resolve_reference(assign.target)?;
		if let (Expr::Event(event), Some(op)) = (&target, event_arm) {
			let Expr::Binary(binary) = assign.value else { unreachable!() };
			let handler = self.resolve_rvalue(binary.right)?;
			return self.event_accessor_call((**event).clone(), op, handler, range);
		}

		let value = self.resolve_rvalue(assign.value)?;
		match target {
			Expr::Local(_) | Expr::Param(_) | Expr::Field(_) => {
				let target_ty = target.ty().expect("bound places carry a type");
				self.check_assignable(value.ty(), target_ty, range)?;
				Ok(Expr::Assign(Box::new(AssignExpr { target, value, range, ty: Some(target_ty) })))
			}
			Expr::Index(index) if index.ty.is_some() => {
				let target_ty = index.ty.expect("checked above");
				self.check_assignable(value.ty(), target_ty, range)?;
				Ok(Expr::Assign(Box::new(AssignExpr {
					target: Expr::Index(index),
					value,
					range,
					ty: Some(target_ty),
				})))
			}
			Expr::Index(index) => self.indexer_setter(*index, value, range),
			Expr::Prop(prop) => {
				self.check_assignable(value.ty(), prop.ty.expect("bound properties carry a type"), range)?;
				self.setter_call(*prop, value, range)
			}
			Expr::Event(event) => {
				// Inside the declaring type a plain assignment writes the
				// backing field.
				let entry = self.symbols.event(event.event);
				match (self.current_class == Some(entry.owner), entry.backing_field) {
					(true, Some(field)) => {
						let field_ty = self.symbols.field(field).ty;
						self.check_assignable(value.ty(), field_ty, range)?;
						let target = Expr::Field(Box::new(FieldExpr {
							field,
							receiver: event.receiver,
							range: event.range,
							ty: Some(field_ty),
						}));
						Ok(Expr::Assign(Box::new(AssignExpr { target, value, range, ty: Some(field_ty) })))
					}
					_ => Err(self.reporter.error(
						codes::EVENT_NOT_A_VALUE,
						event.range,
						"events can only be assigned inside their declaring type".to_string(),
					)),
				}
			}
			other => Err(self.reporter.error(
				codes::NOT_AN_LVALUE,
				other.range(),
				"this expression cannot be assigned to".to_string(),
			)),
		}
	}

	fn check_assignable(&mut self, from: Option<TypeId>, to: TypeId, range: FileRange) -> CompileResult<()> {
		match self.symbols.is_assignable(from, to) {
			true => Ok(()),
			false => {
				let expected = self.type_name(to);
				let found = match from {
					Some(from) => self.type_name(from),
					None => "null".to_string(),
				};
				Err(self.reporter.error(
					codes::NOT_ASSIGNABLE,
					range,
					format!("a value of type '{found}' is not assignable to '{expected}'"),
				))
			}
		}
	}

	/// `a.E += d` / `a.E -= d` become `a.add_E(d)` / `a.remove_E(d)`.
	fn event_accessor_call(
		&mut self,
		event: crate::ast::EventExpr,
		op: BinOp,
		handler: Expr,
		range: FileRange,
	) -> CompileResult<Expr> {
		let entry = self.symbols.event(event.event);
		let delegate_ty = entry.delegate_ty;
		let accessor = match op {
			BinOp::Add => entry.add,
			_ => entry.remove,
		};
		let Some(accessor) = accessor else {
			return Err(self.reporter.internal("resolve", "event accessors missing after pass 3".to_string()));
		};
		self.check_assignable(handler.ty(), delegate_ty, range)?;
		let ret = self.symbols.method(accessor).ret;
		Ok(Expr::Call(Box::new(CallExpr {
			callee: None,
			receiver: event.receiver,
			args: vec![handler],
			method: Some(accessor),
			virtual_call: true,
			vararg: false,
			range,
			ty: Some(ret),
		})))
	}

	/// `p` as rvalue becomes `receiver.get_X()`.
	fn getter_call(&mut self, prop: PropExpr) -> CompileResult<Expr> {
		let entry = self.symbols.property(prop.prop);
		let Some(getter) = entry.getter else {
			let rendered = self.pool.get(entry.name).to_string();
			return Err(self.reporter.error(
				codes::NO_SUCH_MEMBER,
				prop.range,
				format!("property '{rendered}' has no getter"),
			));
		};
		let ret = self.symbols.method(getter).ret;
		Ok(Expr::Call(Box::new(CallExpr {
			callee: None,
			receiver: prop.receiver,
			args: Vec::new(),
			method: Some(getter),
			virtual_call: !prop.base_access,
			vararg: false,
			range: prop.range,
			ty: Some(ret),
		})))
	}

	/// `p = v` becomes `receiver.set_X(v)`.
	fn setter_call(&mut self, prop: PropExpr, value: Expr, range: FileRange) -> CompileResult<Expr> {
		let entry = self.symbols.property(prop.prop);
		let Some(setter) = entry.setter else {
			let rendered = self.pool.get(entry.name).to_string();
			return Err(self.reporter.error(
				codes::NOT_AN_LVALUE,
				range,
				format!("property '{rendered}' has no setter"),
			));
		};
		let ret = self.symbols.method(setter).ret;
		Ok(Expr::Call(Box::new(CallExpr {
			callee: None,
			receiver: prop.receiver,
			args: vec![value],
			method: Some(setter),
			virtual_call: !prop.base_access,
			vararg: false,
			range,
			ty: Some(ret),
		})))
	}

	fn indexer_setter(&mut self, index: IndexExpr, value: Expr, range: FileRange) -> CompileResult<Expr> {
		let target_ty = index.target.ty().expect("indexer targets carry a type");
		let setter_name = self.pool.intern(&format!("set_{INDEXER_NAME}"));
		let headers = self.symbols.member_headers(target_ty, setter_name);
		let mut args = index.indices;
		args.push(value);
		let infos: Vec<ArgInfo> = args.iter().map(|arg| self.arg_info(arg)).collect();
		match self.symbols.resolve_call(&headers, &infos, Some(false)) {
			Ok((method, _)) => {
				let ret = self.symbols.method(method).ret;
				Ok(Expr::Call(Box::new(CallExpr {
					callee: None,
					receiver: Some(index.target),
					args,
					method: Some(method),
					virtual_call: true,
					vararg: false,
					range,
					ty: Some(ret),
				})))
			}
			Err(_) => {
				let rendered = self.type_name(target_ty);
				Err(self.reporter.error(
					codes::NO_MATCHING_OVERLOAD,
					range,
					format!("'{rendered}' has no matching indexer setter"),
				))
			}
		}
	}

	/// `++`/`--`. Plain places stay as a resolved node; property and
	/// indexer targets rewrite through their accessors and a literal 1,
	/// sequenced through a temporary.
	fn resolve_incdec(&mut self, mut incdec: IncDecExpr) -> CompileResult<Expr> {
		let range = incdec.range;
		let target = self.resolve_reference(std::mem::replace(
			&mut incdec.target,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let int32 = self.well_known.int32;
		let check_int = |this: &mut Self, ty: Option<TypeId>| -> CompileResult<()> {
			match matches!(ty, Some(ty) if this.symbols.types_equal(ty, int32)) {
				true => Ok(()),
				false => Err(this.reporter.error(
					codes::TYPE_MISMATCH,
					range,
					"increment and decrement require an integer operand".to_string(),
				)),
			}
		};
		match target {
			Expr::Local(_) | Expr::Param(_) | Expr::Field(_) => {
				check_int(self, target.ty())?;
				incdec.target = target;
				incdec.ty = Some(int32);
				Ok(Expr::IncDec(Box::new(incdec)))
			}
			Expr::Index(index) if index.ty.is_some() => {
				check_int(self, index.ty)?;
				incdec.target = Expr::Index(index);
				incdec.ty = Some(int32);
				Ok(Expr::IncDec(Box::new(incdec)))
			}
			Expr::Prop(prop) => {
				check_int(self, prop.ty)?;
				self.lower_accessor_incdec(*prop, incdec.op, incdec.prefix, range)
			}
			other => Err(self.reporter.error(
				codes::NOT_AN_LVALUE,
				other.range(),
				"this expression cannot be incremented".to_string(),
			)),
		}
	}

	fn lower_accessor_incdec(
		&mut self,
		prop: PropExpr,
		op: IncDecOp,
		prefix: bool,
		range: FileRange,
	) -> CompileResult<Expr> {
		let int32 = self.well_known.int32;
		let binop = match op {
			IncDecOp::Increment => BinOp::Add,
			IncDecOp::Decrement => BinOp::Sub,
		};
		let one = Expr::Literal(Literal { kind: LiteralKind::Int(1), range, ty: Some(int32) });
		let temp = self.fresh_temp(int32);
		let temp_expr = Expr::Local(Box::new(LocalExpr { local: temp, range, ty: Some(int32) }));
		let get = self.getter_call(prop.clone())?;
		let stepped = |value: Expr| {
			Expr::Binary(Box::new(BinaryExpr { op: binop, left: value, right: one.clone(), range, ty: Some(int32) }))
		};
		let (loaded, written) = match prefix {
			// ++p: t = get() + 1; set(t); value t
			true => (stepped(get), temp_expr.clone()),
			// p++: t = get(); set(t + 1); value t
			false => (get, stepped(temp_expr.clone())),
		};
		let set = self.setter_call(prop, written, range)?;
		let effects = vec![
			Expr::DeclareLocal(Box::new(DeclareLocalExpr { local: temp, range, ty: Some(int32) })),
			Expr::Assign(Box::new(AssignExpr { target: temp_expr.clone(), value: loaded, range, ty: Some(int32) })),
			set,
		];
		Ok(Expr::Compound(Box::new(CompoundExpr { effects, value: temp_expr, range, ty: Some(int32) })))
	}

	// Remaining operator-less forms.

	fn resolve_unary(&mut self, mut unary: UnaryExpr) -> CompileResult<Expr> {
		let operand = self.resolve_rvalue(std::mem::replace(
			&mut unary.operand,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let expected = match unary.op {
			UnOp::Neg => self.well_known.int32,
			UnOp::Not => self.well_known.boolean,
		};
		let fits = matches!(operand.ty(), Some(ty) if self.symbols.types_equal(ty, expected));
		if !fits {
			let rendered = self.type_name(expected);
			return Err(self.reporter.error(
				codes::TYPE_MISMATCH,
				unary.range,
				format!("this operator requires an operand of type '{rendered}'"),
			));
		}
		unary.operand = operand;
		unary.ty = Some(expected);
		Ok(Expr::Unary(Box::new(unary)))
	}

	fn resolve_cond(&mut self, mut cond: CondExpr) -> CompileResult<Expr> {
		let test = self.resolve_rvalue(std::mem::replace(
			&mut cond.cond,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let is_bool = matches!(test.ty(), Some(ty) if self.symbols.types_equal(ty, self.well_known.boolean));
		if !is_bool {
			return Err(self.reporter.error(
				codes::CONDITION_NOT_BOOLEAN,
				test.range(),
				"the first operand of '?:' must be boolean".to_string(),
			));
		}
		let then = self.resolve_rvalue(std::mem::replace(
			&mut cond.then,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let other = self.resolve_rvalue(std::mem::replace(
			&mut cond.other,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		// Both arms null is the one legal way a conditional has no type.
		cond.ty = match (then.ty(), other.ty()) {
			(None, None) => None,
			(Some(a), None) => Some(a),
			(None, Some(b)) => Some(b),
			(Some(a), Some(b)) if self.symbols.is_assignable(Some(a), b) => Some(b),
			(Some(a), Some(b)) if self.symbols.is_assignable(Some(b), a) => Some(a),
			(Some(a), Some(b)) => {
				let (a, b) = (self.type_name(a), self.type_name(b));
				return Err(self.reporter.error(
					codes::TYPE_MISMATCH,
					cond.range,
					format!("'?:' arms have unrelated types '{a}' and '{b}'"),
				));
			}
		};
		cond.cond = test;
		cond.then = then;
		cond.other = other;
		Ok(Expr::Cond(Box::new(cond)))
	}

	fn resolve_is(&mut self, mut is: IsExpr) -> CompileResult<Expr> {
		let operand = self.resolve_rvalue(std::mem::replace(
			&mut is.operand,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let scope = self.current_scope;
		let target = self.resolve_type_sig(scope, &is.target)?;
		is.operand = operand;
		is.target = TypeSig::resolved(target, is.target.range());
		is.ty = Some(self.well_known.boolean);
		Ok(Expr::Is(Box::new(is)))
	}

	fn resolve_cast(&mut self, mut cast: CastExpr) -> CompileResult<Expr> {
		let operand = self.resolve_rvalue(std::mem::replace(
			&mut cast.operand,
			Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
		))?;
		let scope = self.current_scope;
		let target = self.resolve_type_sig(scope, &cast.target)?;
		if cast.as_style && self.symbols.is_value_type(target) {
			let rendered = self.type_name(target);
			return Err(self.reporter.error(
				codes::TYPE_MISMATCH,
				cast.range,
				format!("'as' requires a reference type, not '{rendered}'"),
			));
		}
		let convertible = match operand.ty() {
			None => self.symbols.is_reference_type(target),
			Some(from) => {
				self.symbols.is_assignable(Some(from), target)
					|| self.symbols.is_assignable(Some(target), from)
					|| self.conversion_exists(from, target)
			}
		};
		if !convertible {
			let from = operand.ty().map(|ty| self.type_name(ty)).unwrap_or_else(|| "null".to_string());
			let to = self.type_name(target);
			return Err(self.reporter.error(
				codes::TYPE_MISMATCH,
				cast.range,
				format!("cannot convert '{from}' to '{to}'"),
			));
		}
		cast.operand = operand;
		cast.target = TypeSig::resolved(target, cast.target.range());
		cast.ty = Some(target);
		Ok(Expr::Cast(Box::new(cast)))
	}

	/// Explicit conversions beyond the assignability lattice: the numeric
	/// kinds among themselves and enums with their underlying type.
	fn conversion_exists(&self, from: TypeId, to: TypeId) -> bool {
		let numeric = |ty: TypeId| {
			self.symbols.types_equal(ty, self.well_known.int32) || self.symbols.types_equal(ty, self.well_known.char_)
		};
		let enum_and_int = |a: TypeId, b: TypeId| {
			matches!(self.symbols.ty(a).shape, TypeShape::Enum { .. })
				&& self.symbols.types_equal(b, self.well_known.int32)
		};
		(numeric(from) && numeric(to)) || enum_and_int(from, to) || enum_and_int(to, from)
	}

	fn resolve_typeof(&mut self, mut typeof_: TypeOfExpr) -> CompileResult<Expr> {
		let scope = self.current_scope;
		let target = self.resolve_type_sig(scope, &typeof_.target)?;
		typeof_.target = TypeSig::resolved(target, typeof_.target.range());
		typeof_.ty = Some(self.well_known.type_type);
		Ok(Expr::TypeOf(Box::new(typeof_)))
	}
}
