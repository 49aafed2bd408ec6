use tracing::debug;

use crate::ast::{
	AssignExpr, BinOp, BinaryExpr, BlockStmt, CallExpr, CastExpr, CtorChainStmt, CtorChainTarget, DotNameExpr,
	Expr, ExprStmt, Ident, IndexExpr, Literal, LiteralKind, LocalVarDecl, MethodDecl, SimpleNameExpr, Stmt,
	SwitchLabel, TypeDecl, TypeSig,
};
use crate::diagnostics::{codes, CompileResult, ErrorReported, FileRange};
use crate::symbols::{ArgInfo, LabelSymbol, LocalSymbol, SymbolRef, TypeId, TypeShape};

use super::Compilation;

impl Compilation {
	/// Pass 4: method bodies. Statements resolve top-down, then a second
	/// walk binds gotos to the labels the first walk gathered.
	#[tracing::instrument(skip_all)]
	pub(crate) fn pass4_bodies(&mut self) {
		let order: Vec<TypeId> =
			self.type_decls.iter().filter_map(|slot| slot.as_ref().and_then(TypeDecl::sym)).collect();
		for ty in order {
			if self.poisoned.contains(&ty) {
				continue;
			}
			let Some(mut decl) = self.take_decl(ty) else { continue };
			if let TypeDecl::Class(class) = &mut decl {
				for method in &mut class.methods {
					self.resolve_method_body(ty, method);
				}
			}
			self.put_decl(ty, decl);
		}
	}

	fn resolve_method_body(&mut self, ty: TypeId, method: &mut MethodDecl) {
		let (Some(sym), Some(scope)) = (method.sym, method.scope) else { return };
		self.current_class = Some(ty);
		self.current_method = Some(sym);
		self.method_scope = scope;
		self.current_scope = scope;
		self.loop_depth = 0;
		self.switch_depth = 0;
		self.next_slot = 0;
		self.next_temp = 0;

		if let Some(chain) = &mut method.ctor_chain {
			let mut chain_taken = std::mem::replace(
				chain,
				CtorChainStmt { target: CtorChainTarget::Base, args: Vec::new(), method: None, range: FileRange::NONE },
			);
			let _ = self.resolve_ctor_chain(ty, &mut chain_taken);
			*chain = chain_taken;
		}

		if let Some(body) = method.body.take() {
			let mut resolved = self.resolve_block(body);
			self.fixup_block_gotos(&mut resolved);
			method.body = Some(resolved);
		}
		debug!(method = self.pool.get(self.symbols.method(sym).name), "resolved body");
		self.current_class = None;
		self.current_method = None;
	}

	/// Constructor chains look up `.ctor` in the target type's own scope
	/// only; constructors are never inherited.
	fn resolve_ctor_chain(&mut self, ty: TypeId, chain: &mut CtorChainStmt) -> CompileResult<()> {
		let target_ty = match chain.target {
			CtorChainTarget::This => ty,
			CtorChainTarget::Base => match self.symbols.ty(ty).base {
				Some(base) => base,
				None => {
					return Err(self.reporter.error(
						codes::BAD_CONSTRUCTOR_CHAIN,
						chain.range,
						"this type has no base class to chain to".to_string(),
					));
				}
			},
		};
		let args = std::mem::take(&mut chain.args);
		let mut resolved_args = Vec::with_capacity(args.len());
		for arg in args {
			resolved_args.push(self.resolve_rvalue(arg)?);
		}
		let infos: Vec<ArgInfo> = resolved_args.iter().map(|arg| self.arg_info(arg)).collect();
		let ctor_name = self.pool.intern(".ctor");
		let header = match self.symbols.ty(target_ty).scope.and_then(|s| self.symbols.scope_lookup_here(s, ctor_name))
		{
			Some(SymbolRef::MethodHeader(header)) => header,
			_ => {
				let rendered = self.type_name(target_ty);
				return Err(self.reporter.error(
					codes::NO_MATCHING_OVERLOAD,
					chain.range,
					format!("'{rendered}' has no accessible constructor"),
				));
			}
		};
		match self.symbols.resolve_call(&[header], &infos, Some(false)) {
			Ok((method, _)) => {
				chain.method = Some(method);
				chain.args = resolved_args;
				Ok(())
			}
			Err(_) => {
				let rendered = self.type_name(target_ty);
				Err(self.reporter.error(
					codes::NO_MATCHING_OVERLOAD,
					chain.range,
					format!("no constructor of '{rendered}' matches this argument list"),
				))
			}
		}
	}

	pub(crate) fn resolve_block(&mut self, mut block: BlockStmt) -> BlockStmt {
		let scope = self.symbols.new_scope(crate::symbols::ScopeOwner::Block, Some(self.current_scope));
		block.scope = Some(scope);
		let saved = std::mem::replace(&mut self.current_scope, scope);

		for local in &mut block.locals {
			self.declare_local(scope, local);
		}
		let stmts = std::mem::take(&mut block.stmts);
		block.stmts = stmts
			.into_iter()
			.map(|stmt| {
				let range = stmt.range();
				match self.resolve_stmt(stmt) {
					Ok(stmt) => stmt,
					Err(ErrorReported) => Stmt::Empty(crate::ast::EmptyStmt { range }),
				}
			})
			.collect();

		self.current_scope = saved;
		block
	}

	fn declare_local(&mut self, scope: crate::symbols::ScopeId, local: &mut LocalVarDecl) {
		let Ok(ty) = self.resolve_type_sig(scope, &local.sig) else { return };
		let slot = self.next_slot;
		self.next_slot += 1;
		let sym = self.symbols.add_local(LocalSymbol { name: local.name.name, ty, slot });
		local.sym = Some(sym);
		if self.symbols.scope_add(scope, local.name.name, sym.into()).is_err() {
			let rendered = self.pool.get(local.name.name).to_string();
			self.reporter.error(
				codes::DUPLICATE_SYMBOL,
				local.name.range,
				format!("a variable named '{rendered}' is already declared in this scope"),
			);
		}
	}

	fn resolve_stmt(&mut self, stmt: Stmt) -> CompileResult<Stmt> {
		match stmt {
			Stmt::Block(block) => Ok(Stmt::Block(self.resolve_block(block))),
			Stmt::Empty(stmt) => Ok(Stmt::Empty(stmt)),
			Stmt::Expr(mut stmt) => {
				stmt.expr = self.resolve_rvalue(stmt.expr)?;
				Ok(Stmt::Expr(stmt))
			}
			Stmt::If(mut stmt) => {
				stmt.cond = self.resolve_condition(stmt.cond)?;
				stmt.then = self.resolve_stmt(stmt.then)?;
				stmt.other = match stmt.other {
					Some(other) => Some(self.resolve_stmt(other)?),
					None => None,
				};
				Ok(Stmt::If(stmt))
			}
			Stmt::While(mut stmt) => {
				stmt.cond = self.resolve_condition(stmt.cond)?;
				self.loop_depth += 1;
				let body = self.resolve_stmt(stmt.body);
				self.loop_depth -= 1;
				stmt.body = body?;
				Ok(Stmt::While(stmt))
			}
			Stmt::Do(mut stmt) => {
				self.loop_depth += 1;
				let body = self.resolve_stmt(stmt.body);
				self.loop_depth -= 1;
				stmt.body = body?;
				stmt.cond = self.resolve_condition(stmt.cond)?;
				Ok(Stmt::Do(stmt))
			}
			Stmt::For(mut stmt) => {
				stmt.init = match stmt.init {
					Some(init) => Some(self.resolve_rvalue(init)?),
					None => None,
				};
				stmt.cond = match stmt.cond {
					Some(cond) => Some(self.resolve_condition(cond)?),
					None => None,
				};
				stmt.update = match stmt.update {
					Some(update) => Some(self.resolve_rvalue(update)?),
					None => None,
				};
				self.loop_depth += 1;
				let body = self.resolve_stmt(stmt.body);
				self.loop_depth -= 1;
				stmt.body = body?;
				Ok(Stmt::For(stmt))
			}
			Stmt::Foreach(stmt) => self.lower_foreach(*stmt),
			Stmt::Switch(mut stmt) => {
				stmt.value = self.resolve_rvalue(stmt.value)?;
				let governing = stmt.value.ty();
				for section in &mut stmt.sections {
					for label in &mut section.labels {
						if let SwitchLabel::Case(value) = label {
							let resolved = self.resolve_rvalue(std::mem::replace(
								value,
								Expr::Literal(Literal { kind: LiteralKind::Null, range: FileRange::NONE, ty: None }),
							))?;
							if let Some(governing) = governing {
								if !self.symbols.is_assignable(resolved.ty(), governing) {
									let expected = self.type_name(governing);
									self.reporter.error(
										codes::NOT_ASSIGNABLE,
										resolved.range(),
										format!("case value is not assignable to the governing type '{expected}'"),
									);
								}
							}
							*value = resolved;
						}
					}
					self.switch_depth += 1;
					let stmts = std::mem::take(&mut section.stmts);
					section.stmts = stmts
						.into_iter()
						.map(|stmt| {
							let range = stmt.range();
							self.resolve_stmt(stmt)
								.unwrap_or(Stmt::Empty(crate::ast::EmptyStmt { range }))
						})
						.collect();
					self.switch_depth -= 1;
				}
				Ok(Stmt::Switch(stmt))
			}
			Stmt::Return(mut stmt) => {
				let method = self.current_method.expect("bodies resolve inside a method");
				let ret = self.symbols.method(method).ret;
				let is_void = self.symbols.types_equal(ret, self.well_known.void);
				stmt.value = match (stmt.value, is_void) {
					(None, true) => None,
					(None, false) => {
						let expected = self.type_name(ret);
						return Err(self.reporter.error(
							codes::RETURN_MISMATCH,
							stmt.range,
							format!("this method must return a value of type '{expected}'"),
						));
					}
					(Some(value), true) => {
						return Err(self.reporter.error(
							codes::RETURN_MISMATCH,
							value.range(),
							"this method returns no value".to_string(),
						));
					}
					(Some(value), false) => {
						let value = self.resolve_rvalue(value)?;
						if !self.symbols.is_assignable(value.ty(), ret) {
							let expected = self.type_name(ret);
							return Err(self.reporter.error(
								codes::RETURN_MISMATCH,
								value.range(),
								format!("return value is not assignable to '{expected}'"),
							));
						}
						Some(value)
					}
				};
				Ok(Stmt::Return(stmt))
			}
			Stmt::Throw(mut stmt) => {
				stmt.value = match stmt.value {
					None => None,
					Some(value) => {
						let value = self.resolve_rvalue(value)?;
						if !self.symbols.is_assignable(value.ty(), self.well_known.exception) {
							return Err(self.reporter.error(
								codes::TYPE_MISMATCH,
								value.range(),
								"thrown values must derive from System.Exception".to_string(),
							));
						}
						Some(value)
					}
				};
				Ok(Stmt::Throw(stmt))
			}
			Stmt::Try(mut stmt) => {
				stmt.body = self.resolve_block(std::mem::replace(&mut stmt.body, BlockStmt::empty(FileRange::NONE)));
				let mut seen: Vec<Option<TypeId>> = Vec::new();
				for clause in &mut stmt.catches {
					let caught = match clause.sig.take() {
						Some(sig) => {
							let scope = self.current_scope;
							match self.resolve_type_sig(scope, &sig) {
								Ok(ty) => {
									if !self.symbols.types_equal(ty, self.well_known.exception)
										&& !self.symbols.is_derived_from(ty, self.well_known.exception)
									{
										let rendered = self.type_name(ty);
										self.reporter.error(
											codes::BAD_CATCH_TYPE,
											sig.range(),
											format!("'{rendered}' does not derive from System.Exception"),
										);
									}
									clause.sig = Some(TypeSig::resolved(ty, sig.range()));
									Some(ty)
								}
								Err(_) => None,
							}
						}
						None => None,
					};

					// A handler is unreachable when an earlier one catches
					// the same type or a base of it.
					for earlier in &seen {
						let covered = match (earlier, caught) {
							(None, _) => true,
							(Some(_), None) => false,
							(Some(earlier), Some(caught)) => {
								self.symbols.types_equal(*earlier, caught)
									|| self.symbols.is_derived_from(caught, *earlier)
							}
						};
						if covered {
							self.reporter.error(
								codes::UNREACHABLE_CATCH,
								clause.range,
								"this catch clause is unreachable".to_string(),
							);
							break;
						}
					}
					seen.push(caught);

					let mut body = std::mem::replace(&mut clause.body, BlockStmt::empty(FileRange::NONE));
					if let (Some(name), Some(ty)) = (clause.name, caught) {
						body.locals.insert(
							0,
							LocalVarDecl { name, sig: TypeSig::resolved(ty, name.range), sym: None, range: name.range },
						);
					}
					let body = self.resolve_block(body);
					if let Some(name) = clause.name {
						clause.local = body.locals.first().filter(|l| l.name.name == name.name).and_then(|l| l.sym);
					}
					clause.body = body;
				}
				stmt.finally = match stmt.finally.take() {
					Some(block) => Some(self.resolve_block(block)),
					None => None,
				};
				Ok(Stmt::Try(stmt))
			}
			Stmt::Goto(stmt) => Ok(Stmt::Goto(stmt)),
			Stmt::Label(mut stmt) => {
				let sym = self.symbols.add_label(LabelSymbol { name: stmt.name.name });
				match self.symbols.scope_add(self.method_scope, stmt.name.name, sym.into()) {
					Ok(()) => {
						stmt.sym = Some(sym);
						Ok(Stmt::Label(stmt))
					}
					Err(_) => {
						let rendered = self.pool.get(stmt.name.name).to_string();
						Err(self.reporter.error(
							codes::DUPLICATE_SYMBOL,
							stmt.name.range,
							format!("duplicate label '{rendered}'"),
						))
					}
				}
			}
			Stmt::Break(stmt) => {
				if self.loop_depth == 0 && self.switch_depth == 0 {
					return Err(self.reporter.error(
						codes::BREAK_OUTSIDE_LOOP,
						stmt.range,
						"break used outside a loop or switch".to_string(),
					));
				}
				Ok(Stmt::Break(stmt))
			}
			Stmt::Continue(stmt) => {
				if self.loop_depth == 0 {
					return Err(self.reporter.error(
						codes::BREAK_OUTSIDE_LOOP,
						stmt.range,
						"continue used outside a loop".to_string(),
					));
				}
				Ok(Stmt::Continue(stmt))
			}
			Stmt::CtorChain(stmt) => Ok(Stmt::CtorChain(stmt)),
		}
	}

	fn resolve_condition(&mut self, cond: Expr) -> CompileResult<Expr> {
		let cond = self.resolve_rvalue(cond)?;
		let is_bool = matches!(cond.ty(), Some(ty) if self.symbols.types_equal(ty, self.well_known.boolean));
		if !is_bool {
			return Err(self.reporter.error(
				codes::CONDITION_NOT_BOOLEAN,
				cond.range(),
				"this condition must be a boolean expression".to_string(),
			));
		}
		Ok(cond)
	}

	/// Foreach lowers to raw statements that run back through normal
	/// resolution: an index loop over arrays, the enumerator pattern for
	/// everything else.
	fn lower_foreach(&mut self, stmt: crate::ast::ForeachStmt) -> CompileResult<Stmt> {
		let source = self.resolve_rvalue(stmt.source)?;
		let Some(source_ty) = source.ty() else {
			return Err(self.reporter.error(
				codes::NOT_A_VALUE,
				source.range(),
				"cannot iterate over this expression".to_string(),
			));
		};
		let range = stmt.range;
		let temp_index = self.next_temp;
		self.next_temp += 1;

		let name =
			|this: &Self, text: &str| Ident::new(this.pool.intern(&format!("${text}{temp_index}")), range);
		let simple = |ident: Ident| Expr::SimpleName(Box::new(SimpleNameExpr { ident }));
		let int_literal = |value: i32| Expr::Literal(Literal { kind: LiteralKind::Int(value), range, ty: None });
		let assign = |target: Expr, value: Expr| {
			Stmt::Expr(ExprStmt { expr: Expr::Assign(Box::new(AssignExpr { target, value, range, ty: None })), range })
		};
		let member = |left: Expr, this: &Self, text: &str| {
			Expr::DotName(Box::new(DotNameExpr { left, member: Ident::new(this.pool.intern(text), range), range }))
		};
		let call = |callee: Expr| {
			Expr::Call(Box::new(CallExpr {
				callee: Some(callee),
				receiver: None,
				args: Vec::new(),
				method: None,
				virtual_call: true,
				vararg: false,
				range,
				ty: None,
			}))
		};
		let cast_to = |operand: Expr, sig: TypeSig| {
			Expr::Cast(Box::new(CastExpr { operand, target: sig, as_style: false, range, ty: None }))
		};

		let is_array = matches!(self.symbols.ty(source_ty).shape, TypeShape::Array { rank: 1, .. });
		let block = match is_array {
			true => {
				let src = name(self, "src");
				let idx = name(self, "idx");
				let body_assign = assign(
					simple(stmt.name),
					cast_to(
						Expr::Index(Box::new(IndexExpr {
							target: simple(src),
							indices: vec![simple(idx)],
							range,
							ty: None,
						})),
						stmt.sig.clone(),
					),
				);
				let cond = Expr::Binary(Box::new(BinaryExpr {
					op: BinOp::Less,
					left: simple(idx),
					right: member(simple(src), self, "Length"),
					range,
					ty: None,
				}));
				let advance = assign(
					simple(idx),
					Expr::Binary(Box::new(BinaryExpr {
						op: BinOp::Add,
						left: simple(idx),
						right: int_literal(1),
						range,
						ty: None,
					})),
				);
				BlockStmt {
					locals: vec![
						LocalVarDecl { name: src, sig: TypeSig::resolved(source_ty, range), sym: None, range },
						LocalVarDecl {
							name: idx,
							sig: TypeSig::resolved(self.well_known.int32, range),
							sym: None,
							range,
						},
						LocalVarDecl { name: stmt.name, sig: stmt.sig, sym: None, range },
					],
					stmts: vec![
						assign(simple(src), source),
						assign(simple(idx), int_literal(0)),
						Stmt::While(Box::new(crate::ast::WhileStmt {
							cond,
							body: Stmt::Block(BlockStmt {
								locals: Vec::new(),
								stmts: vec![body_assign, stmt.body, advance],
								scope: None,
								range,
							}),
							range,
						})),
					],
					scope: None,
					range,
				}
			}
			false => {
				let enumerator = name(self, "en");
				let get = assign(simple(enumerator), call(member(source, self, "GetEnumerator")));
				let cond = call(member(simple(enumerator), self, "MoveNext"));
				let body_assign = assign(
					simple(stmt.name),
					cast_to(member(simple(enumerator), self, "Current"), stmt.sig.clone()),
				);
				BlockStmt {
					locals: vec![
						LocalVarDecl {
							name: enumerator,
							sig: TypeSig::resolved(self.well_known.enumerator, range),
							sym: None,
							range,
						},
						LocalVarDecl { name: stmt.name, sig: stmt.sig, sym: None, range },
					],
					stmts: vec![
						get,
						Stmt::While(Box::new(crate::ast::WhileStmt {
							cond,
							body: Stmt::Block(BlockStmt {
								locals: Vec::new(),
								stmts: vec![body_assign, stmt.body],
								scope: None,
								range,
							}),
							range,
						})),
					],
					scope: None,
					range,
				}
			}
		};
		self.resolve_stmt(Stmt::Block(block))
	}

	// Goto fixup: the second body walk of pass 4.

	fn fixup_block_gotos(&mut self, block: &mut BlockStmt) {
		let stmts = std::mem::take(&mut block.stmts);
		block.stmts = stmts.into_iter().map(|stmt| self.fixup_stmt_gotos(stmt)).collect();
	}

	fn fixup_stmt_gotos(&mut self, stmt: Stmt) -> Stmt {
		match stmt {
			Stmt::Goto(mut stmt) => {
				match self.symbols.scope_lookup_here(self.method_scope, stmt.label.name) {
					Some(SymbolRef::Label(label)) => stmt.target = Some(label),
					_ => {
						let rendered = self.pool.get(stmt.label.name).to_string();
						self.reporter.error(
							codes::UNDEFINED_LABEL,
							stmt.label.range,
							format!("undefined label '{rendered}'"),
						);
					}
				}
				Stmt::Goto(stmt)
			}
			Stmt::Block(mut block) => {
				self.fixup_block_gotos(&mut block);
				Stmt::Block(block)
			}
			Stmt::If(mut stmt) => {
				stmt.then = self.fixup_stmt_gotos(stmt.then);
				stmt.other = stmt.other.map(|other| self.fixup_stmt_gotos(other));
				Stmt::If(stmt)
			}
			Stmt::While(mut stmt) => {
				stmt.body = self.fixup_stmt_gotos(stmt.body);
				Stmt::While(stmt)
			}
			Stmt::Do(mut stmt) => {
				stmt.body = self.fixup_stmt_gotos(stmt.body);
				Stmt::Do(stmt)
			}
			Stmt::For(mut stmt) => {
				stmt.body = self.fixup_stmt_gotos(stmt.body);
				Stmt::For(stmt)
			}
			Stmt::Switch(mut stmt) => {
				for section in &mut stmt.sections {
					let stmts = std::mem::take(&mut section.stmts);
					section.stmts = stmts.into_iter().map(|stmt| self.fixup_stmt_gotos(stmt)).collect();
				}
				Stmt::Switch(stmt)
			}
			Stmt::Try(mut stmt) => {
				self.fixup_block_gotos(&mut stmt.body);
				for clause in &mut stmt.catches {
					self.fixup_block_gotos(&mut clause.body);
				}
				if let Some(finally) = &mut stmt.finally {
					self.fixup_block_gotos(finally);
				}
				Stmt::Try(stmt)
			}
			other => other,
		}
	}
}
