use crate::ast::{
	AssignExpr, BlockStmt, BreakStmt, CatchClause, ContinueStmt, CtorChainStmt, CtorChainTarget, DoStmt, EmptyStmt,
	Expr, ExprStmt, ForStmt, ForeachStmt, GotoStmt, IfStmt, LabelStmt, LocalVarDecl, ReturnStmt, SimpleNameExpr,
	Stmt, SwitchLabel, SwitchSection, SwitchStmt, ThrowStmt, TryStmt, WhileStmt,
};
use crate::diagnostics::codes;
use crate::lexis::{Keyword, Punct, TokenKind, TokenSource};

use super::{PResult, Parser};

impl<T: TokenSource> Parser<'_, T> {
	pub(crate) fn parse_block(&mut self) -> PResult<BlockStmt> {
		let start = self.expect_punct(Punct::OpenBrace)?.range;
		let mut block = BlockStmt::empty(start);
		while !self.at_punct(Punct::CloseBrace) {
			self.parse_statement_into(&mut block)?;
		}
		let end = self.expect_punct(Punct::CloseBrace)?.range;
		block.range = start.through(end);
		Ok(block)
	}

	/// One statement in block position, where local declarations are legal.
	fn parse_statement_into(&mut self, block: &mut BlockStmt) -> PResult<()> {
		match self.peek_kind() {
			TokenKind::Identifier(_) | TokenKind::Keyword(Keyword::This | Keyword::Base) => {
				self.parse_expr_or_decl_into(block)
			}
			_ => {
				let stmt = self.parse_embedded_statement()?;
				block.stmts.push(stmt);
				Ok(())
			}
		}
	}

	/// Statement position where a declaration is not permitted (branch
	/// bodies, loop bodies).
	pub(crate) fn parse_embedded_statement(&mut self) -> PResult<Stmt> {
		match self.peek_kind() {
			TokenKind::Punct(Punct::OpenBrace) => Ok(Stmt::Block(self.parse_block()?)),
			TokenKind::Punct(Punct::Semicolon) => {
				let token = self.advance();
				Ok(Stmt::Empty(EmptyStmt { range: token.range }))
			}
			TokenKind::Keyword(Keyword::If) => self.parse_if(),
			TokenKind::Keyword(Keyword::While) => self.parse_while(),
			TokenKind::Keyword(Keyword::Do) => self.parse_do(),
			TokenKind::Keyword(Keyword::For) => self.parse_for(),
			TokenKind::Keyword(Keyword::Foreach) => self.parse_foreach(),
			TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
			TokenKind::Keyword(Keyword::Return) => {
				let start = self.advance().range;
				let value = match self.at_punct(Punct::Semicolon) {
					true => None,
					false => Some(self.parse_expr()?),
				};
				let end = self.expect_punct(Punct::Semicolon)?.range;
				Ok(Stmt::Return(ReturnStmt { value, range: start.through(end) }))
			}
			TokenKind::Keyword(Keyword::Throw) => {
				let start = self.advance().range;
				let value = match self.at_punct(Punct::Semicolon) {
					true => None,
					false => Some(self.parse_expr()?),
				};
				let end = self.expect_punct(Punct::Semicolon)?.range;
				Ok(Stmt::Throw(ThrowStmt { value, range: start.through(end) }))
			}
			TokenKind::Keyword(Keyword::Try) => self.parse_try(),
			TokenKind::Keyword(Keyword::Goto) => {
				let start = self.advance().range;
				let label = self.expect_identifier("a label name")?;
				let end = self.expect_punct(Punct::Semicolon)?.range;
				Ok(Stmt::Goto(GotoStmt { label, target: None, range: start.through(end) }))
			}
			TokenKind::Keyword(Keyword::Break) => {
				let start = self.advance().range;
				let end = self.expect_punct(Punct::Semicolon)?.range;
				Ok(Stmt::Break(BreakStmt { range: start.through(end) }))
			}
			TokenKind::Keyword(Keyword::Continue) => {
				let start = self.advance().range;
				let end = self.expect_punct(Punct::Semicolon)?.range;
				Ok(Stmt::Continue(ContinueStmt { range: start.through(end) }))
			}
			_ => {
				let expr = self.parse_expr()?;
				self.finish_expr_statement(expr)
			}
		}
	}

	/// A statement beginning with a name: an expression statement, a label,
	/// or a local declaration. The expression is parsed first and
	/// reinterpreted as a type signature when an identifier follows; this
	/// is what the TempType scaffolding exists for.
	fn parse_expr_or_decl_into(&mut self, block: &mut BlockStmt) -> PResult<()> {
		let expr = self.parse_expr()?;
		if let TokenKind::Identifier(_) = self.peek_kind() {
			let range = expr.range();
			let Some(sig) = expr.into_type_sig() else {
				return Err(self.fail(codes::BAD_TYPE_SIGNATURE, range, "expected a type".to_string()));
			};
			loop {
				let name = self.expect_identifier("a variable name")?;
				block.locals.push(LocalVarDecl { name, sig: sig.clone(), sym: None, range: sig.range().through(name.range) });
				if self.eat_punct(Punct::Assign).is_some() {
					let value = self.parse_expr()?;
					let range = name.range.through(value.range());
					let target = Expr::SimpleName(Box::new(SimpleNameExpr { ident: name }));
					block.stmts.push(Stmt::Expr(ExprStmt {
						expr: Expr::Assign(Box::new(AssignExpr { target, value, range, ty: None })),
						range,
					}));
				}
				if self.eat_punct(Punct::Comma).is_none() {
					break;
				}
			}
			self.expect_punct(Punct::Semicolon)?;
			return Ok(());
		}
		if self.at_punct(Punct::Colon) {
			if let Expr::SimpleName(simple) = &expr {
				let name = simple.ident;
				let end = self.advance().range;
				block.stmts.push(Stmt::Label(LabelStmt { name, sym: None, range: name.range.through(end) }));
				return Ok(());
			}
		}
		let stmt = self.finish_expr_statement(expr)?;
		block.stmts.push(stmt);
		Ok(())
	}

	fn finish_expr_statement(&mut self, expr: Expr) -> PResult<Stmt> {
		if !expr.is_statement_expr() {
			let range = expr.range();
			return Err(self.fail(
				codes::NOT_A_STATEMENT,
				range,
				"only assignment, call, increment, decrement and new expressions can be used as a statement".to_string(),
			));
		}
		let end = self.expect_punct(Punct::Semicolon)?.range;
		let range = expr.range().through(end);
		Ok(Stmt::Expr(ExprStmt { expr, range }))
	}

	fn parse_if(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::If)?.range;
		self.expect_punct(Punct::OpenParen)?;
		let cond = self.parse_expr()?;
		self.expect_punct(Punct::CloseParen)?;
		let then = self.parse_embedded_statement()?;
		let (other, end) = match self.eat_keyword(Keyword::Else) {
			Some(_) => {
				let stmt = self.parse_embedded_statement()?;
				let end = stmt.range();
				(Some(stmt), end)
			}
			None => (None, then.range()),
		};
		Ok(Stmt::If(Box::new(IfStmt { cond, then, other, range: start.through(end) })))
	}

	fn parse_while(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::While)?.range;
		self.expect_punct(Punct::OpenParen)?;
		let cond = self.parse_expr()?;
		self.expect_punct(Punct::CloseParen)?;
		let body = self.parse_embedded_statement()?;
		let range = start.through(body.range());
		Ok(Stmt::While(Box::new(WhileStmt { cond, body, range })))
	}

	fn parse_do(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::Do)?.range;
		let body = self.parse_embedded_statement()?;
		self.expect_keyword(Keyword::While)?;
		self.expect_punct(Punct::OpenParen)?;
		let cond = self.parse_expr()?;
		self.expect_punct(Punct::CloseParen)?;
		let end = self.expect_punct(Punct::Semicolon)?.range;
		Ok(Stmt::Do(Box::new(DoStmt { body, cond, range: start.through(end) })))
	}

	/// A declaring initializer desugars the whole loop into a block that
	/// declares the local and contains the for.
	fn parse_for(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::For)?.range;
		self.expect_punct(Punct::OpenParen)?;

		let mut decl = None;
		let init = match self.at_punct(Punct::Semicolon) {
			true => None,
			false => {
				let expr = self.parse_expr()?;
				match self.peek_kind() {
					TokenKind::Identifier(_) => {
						let range = expr.range();
						let Some(sig) = expr.into_type_sig() else {
							return Err(self.fail(codes::BAD_TYPE_SIGNATURE, range, "expected a type".to_string()));
						};
						let name = self.expect_identifier("a variable name")?;
						decl = Some(LocalVarDecl {
							name,
							sig: sig.clone(),
							sym: None,
							range: sig.range().through(name.range),
						});
						match self.eat_punct(Punct::Assign) {
							Some(_) => {
								let value = self.parse_expr()?;
								let range = name.range.through(value.range());
								let target = Expr::SimpleName(Box::new(SimpleNameExpr { ident: name }));
								Some(Expr::Assign(Box::new(AssignExpr { target, value, range, ty: None })))
							}
							None => None,
						}
					}
					_ => Some(expr),
				}
			}
		};
		self.expect_punct(Punct::Semicolon)?;
		let cond = match self.at_punct(Punct::Semicolon) {
			true => None,
			false => Some(self.parse_expr()?),
		};
		self.expect_punct(Punct::Semicolon)?;
		let update = match self.at_punct(Punct::CloseParen) {
			true => None,
			false => Some(self.parse_expr()?),
		};
		self.expect_punct(Punct::CloseParen)?;
		let body = self.parse_embedded_statement()?;
		let range = start.through(body.range());
		let for_stmt = Stmt::For(Box::new(ForStmt { init, cond, update, body, range }));
		match decl {
			None => Ok(for_stmt),
			Some(decl) => Ok(Stmt::Block(BlockStmt { locals: vec![decl], stmts: vec![for_stmt], scope: None, range })),
		}
	}

	fn parse_foreach(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::Foreach)?.range;
		self.expect_punct(Punct::OpenParen)?;
		let sig = self.parse_type_sig()?;
		let name = self.expect_identifier("a variable name")?;
		self.expect_keyword(Keyword::In)?;
		let source = self.parse_expr()?;
		self.expect_punct(Punct::CloseParen)?;
		let body = self.parse_embedded_statement()?;
		let range = start.through(body.range());
		Ok(Stmt::Foreach(Box::new(ForeachStmt { sig, name, source, body, range })))
	}

	fn parse_switch(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::Switch)?.range;
		self.expect_punct(Punct::OpenParen)?;
		let value = self.parse_expr()?;
		self.expect_punct(Punct::CloseParen)?;
		self.expect_punct(Punct::OpenBrace)?;
		let mut sections = Vec::new();
		while !self.at_punct(Punct::CloseBrace) {
			let section = self.parse_switch_section()?;
			sections.push(section);
		}
		let end = self.expect_punct(Punct::CloseBrace)?.range;
		Ok(Stmt::Switch(Box::new(SwitchStmt { value, sections, range: start.through(end) })))
	}

	fn parse_switch_section(&mut self) -> PResult<SwitchSection> {
		let start = self.peek().range;
		let mut labels = Vec::new();
		loop {
			match self.peek_kind() {
				TokenKind::Keyword(Keyword::Case) => {
					self.advance();
					let value = self.parse_expr()?;
					self.expect_punct(Punct::Colon)?;
					labels.push(SwitchLabel::Case(value));
				}
				TokenKind::Keyword(Keyword::Default) => {
					let token = self.advance();
					self.expect_punct(Punct::Colon)?;
					labels.push(SwitchLabel::Default(token.range));
				}
				_ if labels.is_empty() => return Err(self.unexpected("'case' or 'default'")),
				_ => break,
			}
		}
		let mut stmts = Vec::new();
		loop {
			match self.peek_kind() {
				TokenKind::Keyword(Keyword::Case | Keyword::Default) | TokenKind::Punct(Punct::CloseBrace) => break,
				_ => stmts.push(self.parse_embedded_statement()?),
			}
		}
		let end = stmts.last().map(Stmt::range).unwrap_or(start);
		Ok(SwitchSection { labels, stmts, range: start.through(end) })
	}

	fn parse_try(&mut self) -> PResult<Stmt> {
		let start = self.expect_keyword(Keyword::Try)?.range;
		let body = self.parse_block()?;
		let mut catches = Vec::new();
		while self.at_keyword(Keyword::Catch) {
			let catch_start = self.advance().range;
			let (sig, name) = match self.eat_punct(Punct::OpenParen) {
				Some(_) => {
					let sig = self.parse_type_sig()?;
					let name = match self.peek_kind() {
						TokenKind::Identifier(_) => Some(self.expect_identifier("a variable name")?),
						_ => None,
					};
					self.expect_punct(Punct::CloseParen)?;
					(Some(sig), name)
				}
				None => (None, None),
			};
			let handler = self.parse_block()?;
			let range = catch_start.through(handler.range);
			catches.push(CatchClause { sig, name, local: None, body: handler, range });
		}
		let finally = match self.eat_keyword(Keyword::Finally) {
			Some(_) => Some(self.parse_block()?),
			None => None,
		};
		let end = finally
			.as_ref()
			.map(|block| block.range)
			.or_else(|| catches.last().map(|c| c.range))
			.unwrap_or(body.range);
		if catches.is_empty() && finally.is_none() {
			return Err(self.unexpected("'catch' or 'finally'"));
		}
		Ok(Stmt::Try(Box::new(TryStmt { body, catches, finally, range: start.through(end) })))
	}

	pub(crate) fn parse_ctor_chain(&mut self) -> PResult<CtorChainStmt> {
		let (target, start) = match self.peek_kind() {
			TokenKind::Keyword(Keyword::Base) => (CtorChainTarget::Base, self.advance().range),
			TokenKind::Keyword(Keyword::This) => (CtorChainTarget::This, self.advance().range),
			_ => return Err(self.unexpected("'base' or 'this'")),
		};
		let (args, end) = self.parse_args()?;
		Ok(CtorChainStmt { target, args, method: None, range: start.through(end) })
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use crate::ast::{Expr, Stmt, TypeDecl, TypeSig};
	use crate::diagnostics::Reporter;
	use crate::names::NamePool;
	use crate::parse::parse_source_file;

	fn parse_body(stmts: &str) -> (NamePool, crate::ast::BlockStmt) {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let text = format!("class C {{ void M() {{ {stmts} }} }}");
		let unit = parse_source_file(&pool, &mut reporter, "test.cob", &text);
		assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
		let mut unit = unit.unwrap();
		let TypeDecl::Class(mut class) = unit.types.remove(0) else { panic!() };
		let body = class.methods.remove(0).body.unwrap();
		(pool, body)
	}

	fn parse_body_err(stmts: &str) -> u32 {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let text = format!("class C {{ void M() {{ {stmts} }} }}");
		let unit = parse_source_file(&pool, &mut reporter, "test.cob", &text);
		assert!(unit.is_none());
		reporter.diagnostics()[0].code
	}

	#[test]
	fn local_declarations_split_into_local_and_assignment() {
		let (pool, body) = parse_body("int x = 1; A.B[] ys;");
		assert_eq!(body.locals.len(), 2);
		assert_eq!(pool.get(body.locals[0].name.name), "x");
		assert!(matches!(body.locals[1].sig, TypeSig::Array(_)));
		// Only the initialized declaration produced a statement.
		assert_eq!(body.stmts.len(), 1);
		let Stmt::Expr(stmt) = &body.stmts[0] else { panic!() };
		assert!(matches!(stmt.expr, Expr::Assign(_)));
	}

	#[test]
	fn declaring_for_loops_desugar_into_blocks() {
		let (pool, body) = parse_body("for (int i = 0; i < 10; i++) { }");
		let Stmt::Block(block) = &body.stmts[0] else { panic!("expected a block wrapper") };
		assert_eq!(pool.get(block.locals[0].name.name), "i");
		let Stmt::For(for_stmt) = &block.stmts[0] else { panic!("expected the for inside") };
		assert!(matches!(for_stmt.init, Some(Expr::Assign(_))));
		assert!(for_stmt.cond.is_some());
		assert!(for_stmt.update.is_some());
	}

	#[test]
	fn labels_and_gotos() {
		let (pool, body) = parse_body("top: x = 1; goto top;");
		let Stmt::Label(label) = &body.stmts[0] else { panic!() };
		assert_eq!(pool.get(label.name.name), "top");
		let Stmt::Goto(goto) = &body.stmts[2] else { panic!() };
		assert_eq!(pool.get(goto.label.name), "top");
	}

	#[test]
	fn switch_sections_carry_label_lists() {
		let (_, body) = parse_body("switch (x) { case 1: case 2: return; default: break; }");
		let Stmt::Switch(switch) = &body.stmts[0] else { panic!() };
		assert_eq!(switch.sections.len(), 2);
		assert_eq!(switch.sections[0].labels.len(), 2);
	}

	#[test]
	fn try_requires_a_handler() {
		let (_, body) = parse_body("try { } catch (E e) { } catch { } finally { }");
		let Stmt::Try(try_stmt) = &body.stmts[0] else { panic!() };
		assert_eq!(try_stmt.catches.len(), 2);
		assert!(try_stmt.catches[0].sig.is_some());
		assert!(try_stmt.catches[1].sig.is_none());
		assert!(try_stmt.finally.is_some());
		assert_eq!(parse_body_err("try { }"), crate::diagnostics::codes::UNEXPECTED_TOKEN);
	}

	#[test]
	fn non_statement_expressions_are_rejected() {
		assert_eq!(parse_body_err("x + 1;"), crate::diagnostics::codes::NOT_A_STATEMENT);
	}
}
