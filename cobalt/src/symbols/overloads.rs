use crate::ast::Flow;

use super::{HeaderId, MethodId, ParamSig, Symbols, TypeGenre, TypeId, TypeShape};

/// Argument shape handed to overload resolution: the resolved type (`None`
/// for the null literal) and the written flow.
#[derive(Debug, Copy, Clone)]
pub struct ArgInfo {
	pub ty: Option<TypeId>,
	pub flow: Flow,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OverloadError {
	NoMatch,
}

impl Symbols {
	/// Structural type equality: identity for named types, element + rank
	/// for arrays, pointee for byrefs.
	pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
		if a == b {
			return true;
		}
		match (self.ty(a).shape, self.ty(b).shape) {
			(TypeShape::Array { elem: ea, rank: ra }, TypeShape::Array { elem: eb, rank: rb }) => {
				ra == rb && self.types_equal(ea, eb)
			}
			(TypeShape::Ref { inner: ia }, TypeShape::Ref { inner: ib }) => self.types_equal(ia, ib),
			_ => false,
		}
	}

	pub fn is_reference_type(&self, ty: TypeId) -> bool {
		let entry = self.ty(ty);
		match entry.shape {
			TypeShape::Array { .. } => true,
			TypeShape::Ref { .. } | TypeShape::Enum { .. } => false,
			TypeShape::Named => entry.genre != TypeGenre::Struct,
		}
	}

	/// Strict derivation: identity excluded. Catch-handler ordering needs
	/// this variant.
	pub fn is_derived_from(&self, derived: TypeId, base: TypeId) -> bool {
		let mut current = self.ty(derived).base;
		while let Some(t) = current {
			if self.types_equal(t, base) {
				return true;
			}
			current = self.ty(t).base;
		}
		false
	}

	/// Whether `ty` implements `iface`, through bases and through each base
	/// interface of the interfaces it names.
	pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
		let entry = self.ty(ty);
		for implemented in &entry.interfaces {
			if self.types_equal(*implemented, iface) || self.implements(*implemented, iface) {
				return true;
			}
		}
		match entry.base {
			Some(base) => self.implements(base, iface),
			None => false,
		}
	}

	/// "from is assignable to to". `from` of `None` is the null literal.
	pub fn is_assignable(&self, from: Option<TypeId>, to: TypeId) -> bool {
		let Some(from) = from else {
			return self.is_reference_type(to);
		};
		if self.types_equal(from, to) {
			return true;
		}
		let from_shape = self.ty(from).shape;
		let to_entry = self.ty(to);
		if let (TypeShape::Array { elem: fe, rank: fr }, TypeShape::Array { elem: te, rank: tr }) =
			(from_shape, to_entry.shape)
		{
			if fr == tr && self.is_assignable(Some(fe), te) {
				return true;
			}
		}
		if self.is_derived_from(from, to) {
			return true;
		}
		to_entry.is_interface() && self.implements(from, to)
	}

	/// Overload resolution over a most-derived-first header chain. Matches
	/// exact signatures first, then implicit conversions, then the
	/// last-parameter varargs form (the returned flag marks the latter).
	pub fn resolve_call(
		&self,
		headers: &[HeaderId],
		args: &[ArgInfo],
		expect_static: Option<bool>,
	) -> Result<(MethodId, bool), OverloadError> {
		for &header in headers {
			for method in self.overloads(header) {
				if self.static_fits(method, expect_static) && self.args_fit(method, args, false) {
					return Ok((method, false));
				}
			}
		}
		for &header in headers {
			for method in self.overloads(header) {
				if self.static_fits(method, expect_static) && self.args_fit(method, args, true) {
					return Ok((method, false));
				}
			}
		}
		for &header in headers {
			for method in self.overloads(header) {
				if self.static_fits(method, expect_static) && self.args_fit_vararg(method, args) {
					return Ok((method, true));
				}
			}
		}
		Err(OverloadError::NoMatch)
	}

	/// First overload whose declared parameter list is exactly `params`;
	/// delegate construction selects its target this way.
	pub fn resolve_by_signature(&self, headers: &[HeaderId], params: &[ParamSig]) -> Option<MethodId> {
		for &header in headers {
			for method in self.overloads(header) {
				if self.params_match(&self.method(method).params, params) {
					return Some(method);
				}
			}
		}
		None
	}

	pub fn params_match(&self, a: &[ParamSig], b: &[ParamSig]) -> bool {
		a.len() == b.len()
			&& a.iter().zip(b).all(|(pa, pb)| pa.flow == pb.flow && self.types_equal(pa.ty, pb.ty))
	}

	/// Identical parameter lists and return type; override and interface
	/// mapping both key on this.
	pub fn signatures_match(&self, a: MethodId, b: MethodId) -> bool {
		let (a, b) = (self.method(a), self.method(b));
		self.types_equal(a.ret, b.ret) && self.params_match(&a.params, &b.params)
	}

	fn static_fits(&self, method: MethodId, expect_static: Option<bool>) -> bool {
		match expect_static {
			Some(expected) => self.method(method).is_static == expected,
			None => true,
		}
	}

	fn args_fit(&self, method: MethodId, args: &[ArgInfo], convert: bool) -> bool {
		let params = &self.method(method).params;
		params.len() == args.len() && params.iter().zip(args).all(|(param, arg)| self.arg_fits(param, arg, convert))
	}

	fn arg_fits(&self, param: &ParamSig, arg: &ArgInfo, convert: bool) -> bool {
		if param.flow != arg.flow {
			return false;
		}
		match param.flow {
			// Byref arguments admit no variance.
			Flow::Ref | Flow::Out => {
				let inner = match self.ty(param.ty).shape {
					TypeShape::Ref { inner } => inner,
					_ => param.ty,
				};
				matches!(arg.ty, Some(ty) if self.types_equal(ty, inner))
			}
			Flow::In => match convert {
				true => self.is_assignable(arg.ty, param.ty),
				false => matches!(arg.ty, Some(ty) if self.types_equal(ty, param.ty)),
			},
		}
	}

	fn args_fit_vararg(&self, method: MethodId, args: &[ArgInfo]) -> bool {
		let params = &self.method(method).params;
		let Some((last, fixed)) = params.split_last() else {
			return false;
		};
		if last.flow != Flow::In || args.len() < fixed.len() {
			return false;
		}
		let elem = match self.ty(last.ty).shape {
			TypeShape::Array { elem, rank: 1 } => elem,
			_ => return false,
		};
		let fits_fixed = fixed.iter().zip(args).all(|(param, arg)| self.arg_fits(param, arg, true));
		fits_fixed
			&& args[fixed.len()..]
				.iter()
				.all(|arg| arg.flow == Flow::In && self.is_assignable(arg.ty, elem))
	}
}

#[cfg(test)]
mod tests {
	use crate::names::NamePool;
	use crate::symbols::tests::test_type;
	use crate::symbols::{HeaderSymbol, MethodSymbol, Modifiers, Symbols, TypeSymbol, TypeState};

	use super::*;

	struct Fixture {
		pool: NamePool,
		symbols: Symbols,
		object: TypeId,
		int32: TypeId,
		base: TypeId,
		derived: TypeId,
	}

	fn fixture() -> Fixture {
		let pool = NamePool::new();
		let mut symbols = Symbols::new();
		let object = test_type(&mut symbols, &pool, "System.Object");
		let int32 = test_type(&mut symbols, &pool, "System.Int32");
		symbols.ty_mut(int32).genre = TypeGenre::Struct;
		symbols.ty_mut(int32).base = Some(object);
		let base = test_type(&mut symbols, &pool, "A");
		let derived = test_type(&mut symbols, &pool, "B");
		symbols.ty_mut(base).base = Some(object);
		symbols.ty_mut(derived).base = Some(base);
		Fixture { pool, symbols, object, int32, base, derived }
	}

	fn array_of(fx: &mut Fixture, elem: TypeId, rank: u32) -> TypeId {
		let array_base = fx.symbols.ty(elem).base;
		fx.symbols.add_ty(TypeSymbol {
			name: fx.pool.intern("[]"),
			full_name: fx.pool.intern("[]"),
			genre: TypeGenre::Class,
			shape: TypeShape::Array { elem, rank },
			base: array_base,
			interfaces: Vec::new(),
			scope: None,
			containing: None,
			namespace: None,
			modifiers: Modifiers::PUBLIC,
			imported: true,
			is_delegate: false,
			state: TypeState::Linked,
			handle: None,
		})
	}

	#[test]
	fn assignability() {
		let fx = fixture();
		assert!(fx.symbols.is_assignable(Some(fx.derived), fx.base));
		assert!(fx.symbols.is_assignable(Some(fx.derived), fx.object));
		assert!(!fx.symbols.is_assignable(Some(fx.base), fx.derived));
		// Boxing rides the base chain.
		assert!(fx.symbols.is_assignable(Some(fx.int32), fx.object));
		// Null goes to reference types only.
		assert!(fx.symbols.is_assignable(None, fx.base));
		assert!(!fx.symbols.is_assignable(None, fx.int32));
	}

	#[test]
	fn array_covariance_is_recursive() {
		let mut fx = fixture();
		let (derived, base) = (fx.derived, fx.base);
		let derived_arr = array_of(&mut fx, derived, 1);
		let base_arr = array_of(&mut fx, base, 1);
		let base_arr_2d = array_of(&mut fx, base, 2);
		assert!(fx.symbols.is_assignable(Some(derived_arr), base_arr));
		assert!(!fx.symbols.is_assignable(Some(base_arr), derived_arr));
		assert!(!fx.symbols.is_assignable(Some(derived_arr), base_arr_2d));
		let nested_derived = array_of(&mut fx, derived_arr, 1);
		let nested_base = array_of(&mut fx, base_arr, 1);
		assert!(fx.symbols.is_assignable(Some(nested_derived), nested_base));
	}

	fn method(fx: &mut Fixture, params: &[TypeId], is_static: bool) -> MethodId {
		let name = fx.pool.intern("M");
		let params = params
			.iter()
			.map(|ty| ParamSig { name: fx.pool.intern("x"), ty: *ty, flow: Flow::In })
			.collect();
		fx.symbols.add_method(MethodSymbol {
			name,
			owner: fx.base,
			ret: fx.object,
			params,
			modifiers: Modifiers::PUBLIC,
			is_static,
			special_name: false,
			next_overload: None,
			handle: None,
		})
	}

	fn arg(ty: TypeId) -> ArgInfo {
		ArgInfo { ty: Some(ty), flow: Flow::In }
	}

	#[test]
	fn exact_match_beats_conversion() {
		let mut fx = fixture();
		let (derived, base) = (fx.derived, fx.base);
		let exact = method(&mut fx, &[derived], false);
		let loose = method(&mut fx, &[base], false);
		let header = fx.symbols.add_header(HeaderSymbol { name: fx.pool.intern("M"), first: None });
		// Head insertion puts `loose` first; exactness must still win.
		fx.symbols.link_overload(header, exact);
		fx.symbols.link_overload(header, loose);
		let (chosen, vararg) = fx.symbols.resolve_call(&[header], &[arg(fx.derived)], None).unwrap();
		assert_eq!(chosen, exact);
		assert!(!vararg);
	}

	#[test]
	fn varargs_is_the_last_resort() {
		let mut fx = fixture();
		let object = fx.object;
		let obj_arr = array_of(&mut fx, object, 1);
		let catch_all = method(&mut fx, &[obj_arr], false);
		let header = fx.symbols.add_header(HeaderSymbol { name: fx.pool.intern("M"), first: None });
		fx.symbols.link_overload(header, catch_all);
		let (chosen, vararg) =
			fx.symbols.resolve_call(&[header], &[arg(fx.base), arg(fx.derived)], None).unwrap();
		assert_eq!(chosen, catch_all);
		assert!(vararg);
		// Passing the array itself is an ordinary conversion, not varargs.
		let (_, vararg) = fx.symbols.resolve_call(&[header], &[arg(obj_arr)], None).unwrap();
		assert!(!vararg);
	}

	#[test]
	fn staticness_hint_filters() {
		let mut fx = fixture();
		let instance = method(&mut fx, &[], false);
		let header = fx.symbols.add_header(HeaderSymbol { name: fx.pool.intern("M"), first: None });
		fx.symbols.link_overload(header, instance);
		assert!(fx.symbols.resolve_call(&[header], &[], Some(true)).is_err());
		assert_eq!(fx.symbols.resolve_call(&[header], &[], Some(false)).unwrap().0, instance);
	}
}
