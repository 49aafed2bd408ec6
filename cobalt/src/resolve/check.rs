use crate::ast::{Expr, Stmt, TypeDecl};
use crate::diagnostics::FileRange;
use crate::symbols::TypeState;

use super::Compilation;

impl Compilation {
	/// Invariant sweep over the typed AST and the symbol table. Violations
	/// are compiler bugs, reported through the internal-error channel and
	/// never panicked on. Only meaningful for clean builds; user errors
	/// legitimately leave partial trees behind.
	#[tracing::instrument(skip_all)]
	pub(crate) fn debug_check(&mut self) {
		if self.reporter.has_errors() {
			return;
		}

		// A method symbol appears in exactly one overload list.
		let mut seen = vec![0u32; self.symbols.methods_iter().count()];
		for header in self.symbols.headers_iter() {
			for method in self.symbols.overloads(header) {
				seen[method.index()] += 1;
			}
		}
		for (index, count) in seen.iter().enumerate() {
			if *count > 1 {
				self.reporter.internal("check", format!("method #{index} is linked into {count} overload lists"));
			}
		}

		let decls = std::mem::take(&mut self.type_decls);
		for decl in decls.iter().filter_map(|slot| slot.as_ref()) {
			self.check_type_decl(decl);
		}
		self.type_decls = decls;
	}

	fn check_type_decl(&mut self, decl: &TypeDecl) {
		let Some(ty) = decl.sym() else {
			self.reporter.internal("check", "a declaration kept no type symbol".to_string());
			return;
		};
		let entry = self.symbols.ty(ty);
		if entry.handle.is_none() {
			let name = self.pool.get(entry.full_name).to_string();
			self.reporter.internal("check", format!("'{name}' carries no runtime handle"));
		}
		match entry.scope {
			Some(scope) if !self.symbols.scope(self.symbols.storage_scope(scope)).locked => {
				let name = self.pool.get(entry.full_name).to_string();
				self.reporter.internal("check", format!("the member scope of '{name}' was never locked"));
			}
			Some(_) => {}
			None => {
				self.reporter.internal("check", "a resolved type has no member scope".to_string());
			}
		}
		if entry.state < TypeState::MembersReady {
			let name = self.pool.get(entry.full_name).to_string();
			self.reporter.internal("check", format!("'{name}' never finished member resolution"));
		}

		if let TypeDecl::Class(class) = decl {
			for method in &class.methods {
				if method.sym.is_none() {
					self.reporter.internal("check", "a method declaration kept no symbol".to_string());
					continue;
				}
				if let Some(chain) = &method.ctor_chain {
					if chain.method.is_none() {
						self.reporter.internal("check", "an unresolved constructor chain survived".to_string());
					}
				}
				if let Some(body) = &method.body {
					for stmt in &body.stmts {
						self.check_stmt(stmt);
					}
				}
			}
		}
	}

	fn check_stmt(&mut self, stmt: &Stmt) {
		if stmt.range() == FileRange::NONE {
			self.reporter.internal("check", "a statement lost its source range".to_string());
		}
		match stmt {
			Stmt::Block(block) => {
				for stmt in &block.stmts {
					self.check_stmt(stmt);
				}
			}
			Stmt::Expr(stmt) => self.check_expr(&stmt.expr),
			Stmt::If(stmt) => {
				self.check_expr(&stmt.cond);
				self.check_stmt(&stmt.then);
				if let Some(other) = &stmt.other {
					self.check_stmt(other);
				}
			}
			Stmt::While(stmt) => {
				self.check_expr(&stmt.cond);
				self.check_stmt(&stmt.body);
			}
			Stmt::Do(stmt) => {
				self.check_stmt(&stmt.body);
				self.check_expr(&stmt.cond);
			}
			Stmt::For(stmt) => {
				if let Some(init) = &stmt.init {
					self.check_expr(init);
				}
				if let Some(cond) = &stmt.cond {
					self.check_expr(cond);
				}
				if let Some(update) = &stmt.update {
					self.check_expr(update);
				}
				self.check_stmt(&stmt.body);
			}
			Stmt::Foreach(stmt) => {
				self.reporter.internal("check", "a foreach statement survived lowering".to_string());
				self.check_stmt(&stmt.body);
			}
			Stmt::Switch(stmt) => {
				self.check_expr(&stmt.value);
				for section in &stmt.sections {
					for label in &section.labels {
						if let crate::ast::SwitchLabel::Case(value) = label {
							self.check_expr(value);
						}
					}
					for stmt in &section.stmts {
						self.check_stmt(stmt);
					}
				}
			}
			Stmt::Return(stmt) => {
				if let Some(value) = &stmt.value {
					self.check_expr(value);
				}
			}
			Stmt::Throw(stmt) => {
				if let Some(value) = &stmt.value {
					self.check_expr(value);
				}
			}
			Stmt::Try(stmt) => {
				for inner in &stmt.body.stmts {
					self.check_stmt(inner);
				}
				for clause in &stmt.catches {
					for inner in &clause.body.stmts {
						self.check_stmt(inner);
					}
				}
				if let Some(finally) = &stmt.finally {
					for inner in &finally.stmts {
						self.check_stmt(inner);
					}
				}
			}
			Stmt::Goto(stmt) => {
				if stmt.target.is_none() {
					self.reporter.internal("check", "an unresolved goto survived".to_string());
				}
			}
			Stmt::Label(stmt) => {
				if stmt.sym.is_none() {
					self.reporter.internal("check", "an unresolved label survived".to_string());
				}
			}
			Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::CtorChain(_) => {}
		}
	}

	/// Lowering completeness and the null-type rule: after pass 4 no
	/// placeholder or sugar node remains, and only the enumerated forms
	/// may carry no resolved type.
	fn check_expr(&mut self, expr: &Expr) {
		let forbidden = match expr {
			Expr::SimpleName(_) => Some("a bare name"),
			Expr::DotName(_) => Some("a dotted name"),
			Expr::TempType(_) => Some("type scaffolding"),
			Expr::Base(_) => Some("a base reference"),
			Expr::MethodGroup(_) => Some("a method group"),
			Expr::TypeRef(_) => Some("a type reference"),
			Expr::NamespaceRef(_) => Some("a namespace reference"),
			Expr::Prop(_) => Some("a property access"),
			Expr::Event(_) => Some("an event access"),
			Expr::Index(index) if index.ty.is_none() => Some("an unlowered indexer access"),
			_ => None,
		};
		if let Some(what) = forbidden {
			self.reporter.internal("check", format!("{what} survived body resolution"));
			return;
		}

		let null_ok = match expr {
			Expr::Literal(literal) => literal.kind == crate::ast::LiteralKind::Null,
			Expr::Cond(cond) => cond.then.ty().is_none() && cond.other.ty().is_none(),
			Expr::Arg(arg) => arg.operand.ty().is_none(),
			_ => false,
		};
		if expr.ty().is_none() && !null_ok {
			self.reporter.internal("check", "an expression has no resolved type".to_string());
		}
		if expr.range() == FileRange::NONE {
			self.reporter.internal("check", "an expression lost its source range".to_string());
		}

		match expr {
			Expr::Binary(e) => {
				self.check_expr(&e.left);
				self.check_expr(&e.right);
			}
			Expr::Unary(e) => self.check_expr(&e.operand),
			Expr::Is(e) => self.check_expr(&e.operand),
			Expr::Cast(e) => self.check_expr(&e.operand),
			Expr::Cond(e) => {
				self.check_expr(&e.cond);
				self.check_expr(&e.then);
				self.check_expr(&e.other);
			}
			Expr::New(e) => {
				if e.ctor.is_none() && !e.ty.map(|ty| self.symbols.is_value_type(ty)).unwrap_or(false) {
					self.reporter.internal("check", "an unresolved construction survived".to_string());
				}
				for arg in &e.args {
					self.check_expr(arg);
				}
			}
			Expr::NewArray(e) => {
				for length in &e.lengths {
					self.check_expr(length);
				}
			}
			Expr::Index(e) => {
				self.check_expr(&e.target);
				for index in &e.indices {
					self.check_expr(index);
				}
			}
			Expr::Call(e) => {
				if e.method.is_none() || e.callee.is_some() {
					self.reporter.internal("check", "an unresolved call survived".to_string());
				}
				if let Some(receiver) = &e.receiver {
					self.check_expr(receiver);
				}
				for arg in &e.args {
					self.check_expr(arg);
				}
			}
			Expr::Arg(e) => self.check_expr(&e.operand),
			Expr::Assign(e) => {
				self.check_expr(&e.target);
				self.check_expr(&e.value);
			}
			Expr::IncDec(e) => self.check_expr(&e.target),
			Expr::Compound(e) => {
				for effect in &e.effects {
					self.check_expr(effect);
				}
				self.check_expr(&e.value);
			}
			Expr::Field(e) => {
				if let Some(receiver) = &e.receiver {
					self.check_expr(receiver);
				}
			}
			_ => {}
		}
	}
}
