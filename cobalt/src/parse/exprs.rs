use crate::ast::{
	ArgExpr, AssignExpr, BaseExpr, BinOp, BinaryExpr, CallExpr, CastExpr, CondExpr, DotNameExpr, Expr, Flow,
	IncDecExpr, IncDecOp, IndexExpr, IsExpr, Literal, LiteralKind, NewArrayExpr, NewObjExpr, SimpleNameExpr,
	TempTypeExpr, ThisExpr, TypeOfExpr, TypeSig, UnOp, UnaryExpr,
};
use crate::diagnostics::{codes, FileRange};
use crate::lexis::{Keyword, Punct, TokenKind, TokenSource};

use super::{PResult, Parser};

impl<T: TokenSource> Parser<'_, T> {
	/// Weakest level: assignment and compound assignment, right
	/// associative. `a op= b` lowers to `a = (a op b)` here so the
	/// resolver sees one shape.
	pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
		let left = self.parse_cond()?;
		let compound = match self.peek_kind() {
			TokenKind::Punct(Punct::Assign) => None,
			TokenKind::Punct(Punct::PlusAssign) => Some(BinOp::Add),
			TokenKind::Punct(Punct::MinusAssign) => Some(BinOp::Sub),
			TokenKind::Punct(Punct::StarAssign) => Some(BinOp::Mul),
			TokenKind::Punct(Punct::SlashAssign) => Some(BinOp::Div),
			TokenKind::Punct(Punct::PercentAssign) => Some(BinOp::Rem),
			TokenKind::Punct(Punct::AmpAssign) => Some(BinOp::BitAnd),
			TokenKind::Punct(Punct::PipeAssign) => Some(BinOp::BitOr),
			TokenKind::Punct(Punct::CaretAssign) => Some(BinOp::BitXor),
			TokenKind::Punct(Punct::ShlAssign) => Some(BinOp::Shl),
			TokenKind::Punct(Punct::ShrAssign) => Some(BinOp::Shr),
			_ => return Ok(left),
		};
		self.advance();
		let rhs = self.parse_expr()?;
		let range = left.range().through(rhs.range());
		let value = match compound {
			None => rhs,
			Some(op) => Expr::Binary(Box::new(BinaryExpr { op, left: left.clone(), right: rhs, range, ty: None })),
		};
		Ok(Expr::Assign(Box::new(AssignExpr { target: left, value, range, ty: None })))
	}

	fn parse_cond(&mut self) -> PResult<Expr> {
		let cond = self.parse_or()?;
		if self.eat_punct(Punct::Question).is_none() {
			return Ok(cond);
		}
		let then = self.parse_cond()?;
		self.expect_punct(Punct::Colon)?;
		let other = self.parse_cond()?;
		let range = cond.range().through(other.range());
		Ok(Expr::Cond(Box::new(CondExpr { cond, then, other, range, ty: None })))
	}

	/// Left-factored tail shared by every left-associative binary level;
	/// `a op b op c` always comes out `((a op b) op c)`.
	fn binary_level(&mut self, ops: &[(Punct, BinOp)], next: fn(&mut Self) -> PResult<Expr>) -> PResult<Expr> {
		let mut left = next(self)?;
		loop {
			let kind = self.peek_kind();
			let Some((_, op)) = ops.iter().find(|(punct, _)| kind == TokenKind::Punct(*punct)) else {
				return Ok(left);
			};
			let op = *op;
			self.advance();
			let right = next(self)?;
			let range = left.range().through(right.range());
			left = Expr::Binary(Box::new(BinaryExpr { op, left, right, range, ty: None }));
		}
	}

	fn parse_or(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::PipePipe, BinOp::Or)], Self::parse_and)
	}

	fn parse_and(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::AmpAmp, BinOp::And)], Self::parse_bit_or)
	}

	fn parse_bit_or(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::Pipe, BinOp::BitOr)], Self::parse_bit_xor)
	}

	fn parse_bit_xor(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::Caret, BinOp::BitXor)], Self::parse_bit_and)
	}

	fn parse_bit_and(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::Amp, BinOp::BitAnd)], Self::parse_equality)
	}

	/// Equality and relational share a level, including `is` and `as`.
	fn parse_equality(&mut self) -> PResult<Expr> {
		let mut left = self.parse_shift()?;
		loop {
			let op = match self.peek_kind() {
				TokenKind::Punct(Punct::Eq) => Some(BinOp::Eq),
				TokenKind::Punct(Punct::NotEq) => Some(BinOp::NotEq),
				TokenKind::Punct(Punct::Less) => Some(BinOp::Less),
				TokenKind::Punct(Punct::Greater) => Some(BinOp::Greater),
				TokenKind::Punct(Punct::LessEq) => Some(BinOp::LessEq),
				TokenKind::Punct(Punct::GreaterEq) => Some(BinOp::GreaterEq),
				TokenKind::Keyword(Keyword::Is) => {
					self.advance();
					let target = self.parse_type_sig()?;
					let range = left.range().through(target.range());
					left = Expr::Is(Box::new(IsExpr { operand: left, target, range, ty: None }));
					continue;
				}
				TokenKind::Keyword(Keyword::As) => {
					self.advance();
					let target = self.parse_type_sig()?;
					let range = left.range().through(target.range());
					left = Expr::Cast(Box::new(CastExpr { operand: left, target, as_style: true, range, ty: None }));
					continue;
				}
				_ => None,
			};
			let Some(op) = op else {
				return Ok(left);
			};
			self.advance();
			let right = self.parse_shift()?;
			let range = left.range().through(right.range());
			left = Expr::Binary(Box::new(BinaryExpr { op, left, right, range, ty: None }));
		}
	}

	fn parse_shift(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::Shl, BinOp::Shl), (Punct::Shr, BinOp::Shr)], Self::parse_additive)
	}

	fn parse_additive(&mut self) -> PResult<Expr> {
		self.binary_level(&[(Punct::Plus, BinOp::Add), (Punct::Minus, BinOp::Sub)], Self::parse_multiplicative)
	}

	fn parse_multiplicative(&mut self) -> PResult<Expr> {
		self.binary_level(
			&[(Punct::Star, BinOp::Mul), (Punct::Slash, BinOp::Div), (Punct::Percent, BinOp::Rem)],
			Self::parse_unary,
		)
	}

	fn parse_unary(&mut self) -> PResult<Expr> {
		match self.peek_kind() {
			TokenKind::Punct(Punct::Bang) => {
				let start = self.advance().range;
				let operand = self.parse_unary()?;
				let range = start.through(operand.range());
				Ok(Expr::Unary(Box::new(UnaryExpr { op: UnOp::Not, operand, range, ty: None })))
			}
			TokenKind::Punct(Punct::Minus) => {
				let start = self.advance().range;
				// A minus directly over an integer literal folds here; this
				// is the only spelling that reaches `int.MinValue`.
				if let TokenKind::Int(value) = self.peek_kind() {
					let token = self.advance();
					let literal = Expr::Literal(Literal {
						kind: LiteralKind::Int(value.wrapping_neg()),
						range: start.through(token.range),
						ty: None,
					});
					return self.parse_postfix(literal);
				}
				let operand = self.parse_unary()?;
				let range = start.through(operand.range());
				Ok(Expr::Unary(Box::new(UnaryExpr { op: UnOp::Neg, operand, range, ty: None })))
			}
			TokenKind::Punct(Punct::Increment) => {
				let start = self.advance().range;
				let target = self.parse_unary()?;
				let range = start.through(target.range());
				Ok(Expr::IncDec(Box::new(IncDecExpr { op: IncDecOp::Increment, prefix: true, target, range, ty: None })))
			}
			TokenKind::Punct(Punct::Decrement) => {
				let start = self.advance().range;
				let target = self.parse_unary()?;
				let range = start.through(target.range());
				Ok(Expr::IncDec(Box::new(IncDecExpr { op: IncDecOp::Decrement, prefix: true, target, range, ty: None })))
			}
			_ => {
				let primary = self.parse_primary()?;
				self.parse_postfix(primary)
			}
		}
	}

	fn parse_primary(&mut self) -> PResult<Expr> {
		let token = self.peek();
		match token.kind {
			TokenKind::Int(value) => {
				self.advance();
				// The wrapped 2^31 magnitude is legal only under the folding
				// unary minus.
				if value == i32::MIN {
					return Err(self.fail(
						codes::INT_LITERAL_OVERFLOW,
						token.range,
						"integer literal out of range".to_string(),
					));
				}
				Ok(Expr::Literal(Literal { kind: LiteralKind::Int(value), range: token.range, ty: None }))
			}
			TokenKind::Bool(value) => {
				self.advance();
				Ok(Expr::Literal(Literal { kind: LiteralKind::Bool(value), range: token.range, ty: None }))
			}
			TokenKind::Char(value) => {
				self.advance();
				Ok(Expr::Literal(Literal { kind: LiteralKind::Char(value), range: token.range, ty: None }))
			}
			TokenKind::Str(value) => {
				self.advance();
				Ok(Expr::Literal(Literal { kind: LiteralKind::Str(value), range: token.range, ty: None }))
			}
			TokenKind::Keyword(Keyword::Null) => {
				self.advance();
				Ok(Expr::Literal(Literal { kind: LiteralKind::Null, range: token.range, ty: None }))
			}
			TokenKind::Identifier(name) => {
				self.advance();
				Ok(Expr::SimpleName(Box::new(SimpleNameExpr { ident: crate::ast::Ident::new(name, token.range) })))
			}
			TokenKind::Keyword(Keyword::This) => {
				self.advance();
				Ok(Expr::This(ThisExpr { range: token.range, ty: None }))
			}
			TokenKind::Keyword(Keyword::Base) => {
				self.advance();
				Ok(Expr::Base(BaseExpr { range: token.range }))
			}
			TokenKind::Keyword(Keyword::Typeof) => {
				self.advance();
				self.expect_punct(Punct::OpenParen)?;
				let target = self.parse_type_sig()?;
				let end = self.expect_punct(Punct::CloseParen)?.range;
				Ok(Expr::TypeOf(Box::new(TypeOfExpr { target, range: token.range.through(end), ty: None })))
			}
			TokenKind::Keyword(Keyword::New) => self.parse_new(),
			TokenKind::Punct(Punct::OpenParen) => self.parse_paren_or_cast(),
			_ => Err(self.unexpected("an expression")),
		}
	}

	/// `(T) e` versus `(e)`: the parenthesized expression is parsed first
	/// and treated as a cast when it spells a type and the next token can
	/// begin a cast operand.
	fn parse_paren_or_cast(&mut self) -> PResult<Expr> {
		let start = self.expect_punct(Punct::OpenParen)?.range;
		let inner = self.parse_expr()?;
		self.expect_punct(Punct::CloseParen)?;
		let looks_like_type = matches!(inner, Expr::SimpleName(_) | Expr::DotName(_) | Expr::TempType(_));
		if looks_like_type && self.starts_cast_operand() {
			let target = inner.into_type_sig().expect("name shapes reinterpret as signatures");
			let operand = self.parse_unary()?;
			let range = start.through(operand.range());
			return Ok(Expr::Cast(Box::new(CastExpr { operand, target, as_style: false, range, ty: None })));
		}
		Ok(inner)
	}

	fn starts_cast_operand(&mut self) -> bool {
		match self.peek_kind() {
			TokenKind::Identifier(_)
			| TokenKind::Int(_)
			| TokenKind::Char(_)
			| TokenKind::Str(_)
			| TokenKind::Bool(_)
			| TokenKind::Punct(Punct::OpenParen)
			| TokenKind::Punct(Punct::Bang)
			| TokenKind::Keyword(Keyword::Null)
			| TokenKind::Keyword(Keyword::This)
			| TokenKind::Keyword(Keyword::Base)
			| TokenKind::Keyword(Keyword::New)
			| TokenKind::Keyword(Keyword::Typeof) => true,
			_ => false,
		}
	}

	fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
		loop {
			match self.peek_kind() {
				TokenKind::Punct(Punct::Dot) => {
					self.advance();
					let member = self.expect_identifier("a member name")?;
					let range = expr.range().through(member.range);
					expr = Expr::DotName(Box::new(DotNameExpr { left: expr, member, range }));
				}
				TokenKind::Punct(Punct::OpenParen) => {
					let (args, end) = self.parse_args()?;
					let range = expr.range().through(end);
					expr = Expr::Call(Box::new(CallExpr {
						callee: Some(expr),
						receiver: None,
						args,
						method: None,
						virtual_call: true,
						vararg: false,
						range,
						ty: None,
					}));
				}
				TokenKind::Punct(Punct::OpenBracket) => {
					self.advance();
					let mut indices = Vec::new();
					loop {
						let index = self.parse_expr()?;
						indices.push(index);
						if self.eat_punct(Punct::Comma).is_none() {
							break;
						}
					}
					let end = self.expect_punct(Punct::CloseBracket)?.range;
					let range = expr.range().through(end);
					expr = Expr::Index(Box::new(IndexExpr { target: expr, indices, range, ty: None }));
				}
				TokenKind::Rank(_) => {
					let range = expr.range();
					let Some(base) = expr.into_type_sig() else {
						return Err(self.fail(codes::BAD_TYPE_SIGNATURE, range, "expected a type".to_string()));
					};
					let sig = self.parse_rank_suffixes(base);
					let range = sig.range();
					expr = Expr::TempType(Box::new(TempTypeExpr { sig, range }));
				}
				TokenKind::Punct(Punct::Increment) => {
					let end = self.advance().range;
					let range = expr.range().through(end);
					expr = Expr::IncDec(Box::new(IncDecExpr {
						op: IncDecOp::Increment,
						prefix: false,
						target: expr,
						range,
						ty: None,
					}));
				}
				TokenKind::Punct(Punct::Decrement) => {
					let end = self.advance().range;
					let range = expr.range().through(end);
					expr = Expr::IncDec(Box::new(IncDecExpr {
						op: IncDecOp::Decrement,
						prefix: false,
						target: expr,
						range,
						ty: None,
					}));
				}
				_ => return Ok(expr),
			}
		}
	}

	/// `new T(args)`, `new T[len]`, `new T[] { ... }`.
	fn parse_new(&mut self) -> PResult<Expr> {
		let start = self.expect_keyword(Keyword::New)?.range;
		let path = self.parse_dotted_path()?;
		let sig_range = path.range();
		let base = crate::ast::TypeSig::Simple(crate::ast::SimpleTypeSig { path, range: sig_range });
		match self.peek_kind() {
			TokenKind::Punct(Punct::OpenParen) => {
				let (args, end) = self.parse_args()?;
				Ok(Expr::New(Box::new(NewObjExpr {
					target: base,
					args,
					ctor: None,
					range: start.through(end),
					ty: None,
				})))
			}
			TokenKind::Punct(Punct::OpenBracket) => {
				self.advance();
				let mut lengths = Vec::new();
				loop {
					let length = self.parse_expr()?;
					lengths.push(length);
					if self.eat_punct(Punct::Comma).is_none() {
						break;
					}
				}
				let close = self.expect_punct(Punct::CloseBracket)?.range;
				// Trailing rank specifiers belong to the element type:
				// `new int[3][]` allocates three `int[]` slots.
				let elem = self.parse_rank_suffixes(base);
				let end = match &elem {
					TypeSig::Array(sig) => close.through(sig.range),
					_ => close,
				};
				let rank = lengths.len() as u32;
				Ok(Expr::NewArray(Box::new(NewArrayExpr {
					elem,
					rank,
					lengths,
					init: None,
					range: start.through(end),
					ty: None,
				})))
			}
			TokenKind::Rank(rank) => {
				self.advance();
				let elem = self.parse_rank_suffixes(base);
				self.expect_punct(Punct::OpenBrace)?;
				let mut values = Vec::new();
				if !self.at_punct(Punct::CloseBrace) {
					loop {
						let value = self.parse_expr()?;
						values.push(value);
						if self.eat_punct(Punct::Comma).is_none() {
							break;
						}
					}
				}
				let end = self.expect_punct(Punct::CloseBrace)?.range;
				Ok(Expr::NewArray(Box::new(NewArrayExpr {
					elem,
					rank,
					lengths: Vec::new(),
					init: Some(values),
					range: start.through(end),
					ty: None,
				})))
			}
			_ => Err(self.unexpected("'(' or an array specifier")),
		}
	}

	/// Call and constructor arguments; `ref`/`out` arguments keep their
	/// flow in an arg wrapper.
	pub(crate) fn parse_args(&mut self) -> PResult<(Vec<Expr>, FileRange)> {
		self.expect_punct(Punct::OpenParen)?;
		let mut args = Vec::new();
		if !self.at_punct(Punct::CloseParen) {
			loop {
				let flow = match self.peek_kind() {
					TokenKind::Keyword(Keyword::Ref) => Some((Flow::Ref, self.advance().range)),
					TokenKind::Keyword(Keyword::Out) => Some((Flow::Out, self.advance().range)),
					_ => None,
				};
				let value = self.parse_expr()?;
				let arg = match flow {
					Some((flow, flow_range)) => {
						let range = flow_range.through(value.range());
						Expr::Arg(Box::new(ArgExpr { flow, operand: value, range }))
					}
					None => value,
				};
				args.push(arg);
				if self.eat_punct(Punct::Comma).is_none() {
					break;
				}
			}
		}
		let end = self.expect_punct(Punct::CloseParen)?.range;
		Ok((args, end))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use crate::ast::{BinOp, Expr, LiteralKind, TypeSig};
	use crate::diagnostics::Reporter;
	use crate::lexis::Lexer;
	use crate::names::NamePool;

	use super::super::Parser;

	fn parse_expr(text: &str) -> (NamePool, Expr) {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let mut lexer = Lexer::new(&pool, "t", text);
		let expr = {
			let mut parser = Parser::new(&mut lexer, &pool, &mut reporter);
			parser.parse_expr().ok()
		};
		assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
		(pool, expr.unwrap())
	}

	#[test]
	fn binary_chains_are_left_linear() {
		let (_, expr) = parse_expr("a + b + c");
		let Expr::Binary(outer) = expr else { panic!() };
		assert_eq!(outer.op, BinOp::Add);
		let Expr::Binary(inner) = &outer.left else { panic!("left operand must hold the earlier addition") };
		assert_eq!(inner.op, BinOp::Add);
		assert!(matches!(outer.right, Expr::SimpleName(_)));
	}

	#[test]
	fn precedence_orders_the_ladder() {
		let (_, expr) = parse_expr("a + b * c == d && e");
		let Expr::Binary(and) = expr else { panic!() };
		assert_eq!(and.op, BinOp::And);
		let Expr::Binary(eq) = &and.left else { panic!() };
		assert_eq!(eq.op, BinOp::Eq);
		let Expr::Binary(add) = &eq.left else { panic!() };
		assert_eq!(add.op, BinOp::Add);
		let Expr::Binary(mul) = &add.right else { panic!() };
		assert_eq!(mul.op, BinOp::Mul);
	}

	#[test]
	fn compound_assignment_lowers_at_parse_time() {
		let (_, expr) = parse_expr("a += b");
		let Expr::Assign(assign) = expr else { panic!() };
		assert!(matches!(assign.target, Expr::SimpleName(_)));
		let Expr::Binary(op) = &assign.value else { panic!("value must be the lowered binop") };
		assert_eq!(op.op, BinOp::Add);
		assert_eq!(op.left, assign.target);
	}

	#[test]
	fn suffixes_build_calls_indexes_and_members() {
		let (pool, expr) = parse_expr("a.b.M(1)[2]");
		let Expr::Index(index) = expr else { panic!() };
		let Expr::Call(call) = &index.target else { panic!() };
		let Some(Expr::DotName(dot)) = &call.callee else { panic!() };
		assert_eq!(pool.get(dot.member.name), "M");
		assert_eq!(call.args.len(), 1);
	}

	#[test]
	fn casts_and_parens_disambiguate() {
		let (_, cast) = parse_expr("(T) x");
		assert!(matches!(cast, Expr::Cast(_)));
		let (_, paren) = parse_expr("(x) + 1");
		let Expr::Binary(add) = paren else { panic!("parenthesized name plus value is addition") };
		assert!(matches!(add.left, Expr::SimpleName(_)));
		let (_, minus) = parse_expr("(x) - 1");
		assert!(matches!(minus, Expr::Binary(_)));
	}

	#[test]
	fn is_and_as_take_type_signatures() {
		let (_, expr) = parse_expr("x is A.B[]");
		let Expr::Is(is) = expr else { panic!() };
		assert!(matches!(is.target, TypeSig::Array(_)));
		let (_, expr) = parse_expr("x as T");
		let Expr::Cast(cast) = expr else { panic!() };
		assert!(cast.as_style);
	}

	#[test]
	fn new_forms() {
		let (_, obj) = parse_expr("new C(1, 2)");
		let Expr::New(obj) = obj else { panic!() };
		assert_eq!(obj.args.len(), 2);

		let (_, arr) = parse_expr("new int[3]");
		let Expr::NewArray(arr) = arr else { panic!() };
		assert_eq!(arr.rank, 1);
		assert_eq!(arr.lengths.len(), 1);
		assert!(arr.init.is_none());

		let (_, jagged) = parse_expr("new int[3][]");
		let Expr::NewArray(jagged) = jagged else { panic!() };
		assert!(matches!(jagged.elem, TypeSig::Array(_)));

		let (_, init) = parse_expr("new int[] { 10, 20, 30 }");
		let Expr::NewArray(init) = init else { panic!() };
		assert_eq!(init.rank, 1);
		assert_eq!(init.init.as_ref().unwrap().len(), 3);
	}

	#[test]
	fn literals_and_null() {
		let (_, expr) = parse_expr("null");
		assert!(matches!(expr, Expr::Literal(l) if l.kind == LiteralKind::Null));
		let (_, expr) = parse_expr("'x'");
		assert!(matches!(expr, Expr::Literal(l) if l.kind == LiteralKind::Char('x')));
	}

	#[test]
	fn negated_literals_fold_down_to_int_min() {
		let (_, expr) = parse_expr("-5");
		assert!(matches!(expr, Expr::Literal(l) if l.kind == LiteralKind::Int(-5)));
		let (_, expr) = parse_expr("-2147483648");
		assert!(matches!(expr, Expr::Literal(l) if l.kind == LiteralKind::Int(i32::MIN)));

		// Without the minus, the wrapped magnitude is out of range.
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let mut lexer = Lexer::new(&pool, "t", "2147483648");
		let failed = {
			let mut parser = Parser::new(&mut lexer, &pool, &mut reporter);
			parser.parse_expr().is_err()
		};
		assert!(failed);
		assert_eq!(reporter.diagnostics()[0].code, crate::diagnostics::codes::INT_LITERAL_OVERFLOW);
	}

	#[test]
	fn ref_and_out_arguments_are_wrapped() {
		let (_, expr) = parse_expr("M(ref x, out y, z)");
		let Expr::Call(call) = expr else { panic!() };
		assert!(matches!(call.args[0], Expr::Arg(_)));
		assert!(matches!(call.args[1], Expr::Arg(_)));
		assert!(matches!(call.args[2], Expr::SimpleName(_)));
	}

	#[test]
	fn ternary_nests_to_the_right() {
		let (_, expr) = parse_expr("a ? b : c ? d : e");
		let Expr::Cond(outer) = expr else { panic!() };
		assert!(matches!(outer.other, Expr::Cond(_)));
	}
}
