use crate::ast::{BinOp, BinaryExpr, CallExpr, CastExpr, Expr, Flow, TypeSig};
use crate::diagnostics::{codes, CompileResult};
use crate::symbols::{ArgInfo, HeaderId, TypeId, TypeShape};

use super::Compilation;

impl Compilation {
	/// Binary operator resolution: the special string and delegate forms,
	/// then the predefined operator table, then a user-defined operator
	/// method. `==`/`!=` on reference types silently fall back to
	/// reference equality.
	pub(crate) fn resolve_binary(&mut self, mut binary: BinaryExpr) -> CompileResult<Expr> {
		let range = binary.range;
		let op = binary.op;
		let left = self.resolve_rvalue(std::mem::replace(&mut binary.left, placeholder()))?;
		let right = self.resolve_rvalue(std::mem::replace(&mut binary.right, placeholder()))?;
		let (lty, rty) = (left.ty(), right.ty());
		let bool_ty = self.well_known.boolean;
		let int_ty = self.well_known.int32;

		// The short-circuiting forms take booleans and nothing else.
		if matches!(op, BinOp::And | BinOp::Or) {
			if self.both(lty, rty, bool_ty) {
				return Ok(self.finish(binary, left, right, bool_ty));
			}
			return self.no_operator(op, lty, rty, range);
		}

		// `s + t` with a string operand becomes `String.Concat(s, t)`.
		if op == BinOp::Add && (self.is_string(lty) || self.is_string(rty)) {
			return self.string_concat(left, right, range);
		}

		// Delegate combination: `(D) MulticastDelegate.Combine(d1, d2)`.
		if matches!(op, BinOp::Add | BinOp::Sub) {
			if let (Some(l), Some(r)) = (lty, rty) {
				if self.symbols.ty(l).is_delegate && self.symbols.types_equal(l, r) {
					return self.delegate_combine(op, l, left, right, range);
				}
			}
		}

		// Predefined forms.
		if self.both_numeric(lty, rty) {
			let result = match op {
				BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => Some(int_ty),
				BinOp::Shl | BinOp::Shr => Some(int_ty),
				BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => Some(int_ty),
				_ if op.is_comparison() => Some(bool_ty),
				_ => None,
			};
			if let Some(result) = result {
				return Ok(self.finish(binary, left, right, result));
			}
		}
		if self.both(lty, rty, bool_ty)
			&& matches!(op, BinOp::Eq | BinOp::NotEq | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor)
		{
			return Ok(self.finish(binary, left, right, bool_ty));
		}
		if let (Some(l), Some(r)) = (lty, rty) {
			let same_enum = matches!(self.symbols.ty(l).shape, TypeShape::Enum { .. })
				&& self.symbols.types_equal(l, r);
			if same_enum {
				if op.is_comparison() {
					return Ok(self.finish(binary, left, right, bool_ty));
				}
				if matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
					return Ok(self.finish(binary, left, right, l));
				}
			}
		}

		// User-defined operator.
		if let Some(result) = self.user_operator(op, lty, rty, &left, &right, range)? {
			return Ok(result);
		}

		// Reference equality is an acceptable meaning for a failed
		// `==`/`!=` match, so that case stays silent.
		if matches!(op, BinOp::Eq | BinOp::NotEq) && self.reference_comparable(lty, rty) {
			return Ok(self.finish(binary, left, right, bool_ty));
		}

		self.no_operator(op, lty, rty, range)
	}

	fn finish(&self, mut binary: BinaryExpr, left: Expr, right: Expr, ty: TypeId) -> Expr {
		binary.left = left;
		binary.right = right;
		binary.ty = Some(ty);
		Expr::Binary(Box::new(binary))
	}

	fn both(&self, lty: Option<TypeId>, rty: Option<TypeId>, wanted: TypeId) -> bool {
		let fits = |ty: Option<TypeId>| matches!(ty, Some(ty) if self.symbols.types_equal(ty, wanted));
		fits(lty) && fits(rty)
	}

	fn is_numeric(&self, ty: Option<TypeId>) -> bool {
		matches!(ty, Some(ty) if self.symbols.types_equal(ty, self.well_known.int32)
			|| self.symbols.types_equal(ty, self.well_known.char_))
	}

	fn both_numeric(&self, lty: Option<TypeId>, rty: Option<TypeId>) -> bool {
		self.is_numeric(lty) && self.is_numeric(rty)
	}

	fn is_string(&self, ty: Option<TypeId>) -> bool {
		matches!(ty, Some(ty) if self.symbols.types_equal(ty, self.well_known.string))
	}

	fn reference_comparable(&self, lty: Option<TypeId>, rty: Option<TypeId>) -> bool {
		let reference = |ty: Option<TypeId>| match ty {
			None => true,
			Some(ty) => self.symbols.is_reference_type(ty),
		};
		if !reference(lty) || !reference(rty) {
			return false;
		}
		match (lty, rty) {
			(Some(l), Some(r)) => {
				self.symbols.is_assignable(Some(l), r) || self.symbols.is_assignable(Some(r), l)
			}
			_ => true,
		}
	}

	fn string_concat(&mut self, left: Expr, right: Expr, range: crate::diagnostics::FileRange) -> CompileResult<Expr> {
		let concat = self.pool.intern("Concat");
		let headers = self.symbols.member_headers(self.well_known.string, concat);
		let args = vec![left, right];
		let infos: Vec<ArgInfo> = args.iter().map(|arg| self.arg_info(arg)).collect();
		match self.symbols.resolve_call(&headers, &infos, Some(true)) {
			Ok((method, _)) => {
				let ret = self.symbols.method(method).ret;
				Ok(Expr::Call(Box::new(CallExpr {
					callee: None,
					receiver: None,
					args,
					method: Some(method),
					virtual_call: false,
					vararg: false,
					range,
					ty: Some(ret),
				})))
			}
			Err(_) => Err(self.reporter.error(
				codes::NO_SUCH_OPERATOR,
				range,
				"these operands cannot be concatenated".to_string(),
			)),
		}
	}

	fn delegate_combine(
		&mut self,
		op: BinOp,
		delegate_ty: TypeId,
		left: Expr,
		right: Expr,
		range: crate::diagnostics::FileRange,
	) -> CompileResult<Expr> {
		let name = self.pool.intern(match op {
			BinOp::Add => "Combine",
			_ => "Remove",
		});
		let headers = self.symbols.member_headers(self.well_known.multicast, name);
		let args = vec![left, right];
		let infos: Vec<ArgInfo> = args.iter().map(|arg| self.arg_info(arg)).collect();
		let (method, _) = self
			.symbols
			.resolve_call(&headers, &infos, Some(true))
			.map_err(|_| self.reporter.internal("resolve", "Delegate.Combine is missing".to_string()))?;
		let ret = self.symbols.method(method).ret;
		let call = Expr::Call(Box::new(CallExpr {
			callee: None,
			receiver: None,
			args,
			method: Some(method),
			virtual_call: false,
			vararg: false,
			range,
			ty: Some(ret),
		}));
		Ok(Expr::Cast(Box::new(CastExpr {
			operand: call,
			target: TypeSig::resolved(delegate_ty, range),
			as_style: false,
			range,
			ty: Some(delegate_ty),
		})))
	}

	/// A user-defined operator is a public static special method named by
	/// the fixed table, sought on both operand types.
	fn user_operator(
		&mut self,
		op: BinOp,
		lty: Option<TypeId>,
		rty: Option<TypeId>,
		left: &Expr,
		right: &Expr,
		range: crate::diagnostics::FileRange,
	) -> CompileResult<Option<Expr>> {
		let Some(method_name) = op.method_name() else {
			return Ok(None);
		};
		let name = self.pool.intern(method_name);
		let mut headers: Vec<HeaderId> = Vec::new();
		for ty in [lty, rty].into_iter().flatten() {
			for header in self.symbols.member_headers(ty, name) {
				if !headers.contains(&header) {
					headers.push(header);
				}
			}
		}
		if headers.is_empty() {
			return Ok(None);
		}
		let infos = [
			ArgInfo { ty: lty, flow: Flow::In },
			ArgInfo { ty: rty, flow: Flow::In },
		];
		match self.symbols.resolve_call(&headers, &infos, Some(true)) {
			Ok((method, _)) => {
				let ret = self.symbols.method(method).ret;
				Ok(Some(Expr::Call(Box::new(CallExpr {
					callee: None,
					receiver: None,
					args: vec![left.clone(), right.clone()],
					method: Some(method),
					virtual_call: false,
					vararg: false,
					range,
					ty: Some(ret),
				}))))
			}
			Err(_) => Ok(None),
		}
	}

	fn no_operator(
		&mut self,
		op: BinOp,
		lty: Option<TypeId>,
		rty: Option<TypeId>,
		range: crate::diagnostics::FileRange,
	) -> CompileResult<Expr> {
		let render = |this: &Self, ty: Option<TypeId>| match ty {
			Some(ty) => this.type_name(ty),
			None => "null".to_string(),
		};
		let (l, r) = (render(self, lty), render(self, rty));
		Err(self.reporter.error(
			codes::NO_SUCH_OPERATOR,
			range,
			format!("operator '{}' cannot be applied to operands of type '{l}' and '{r}'", op.text()),
		))
	}
}

fn placeholder() -> Expr {
	Expr::Literal(crate::ast::Literal {
		kind: crate::ast::LiteralKind::Null,
		range: crate::diagnostics::FileRange::NONE,
		ty: None,
	})
}
