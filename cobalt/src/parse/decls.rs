use crate::ast::{
	AccessorDecl, BinOp, ClassDecl, EnumDecl, EnumMemberDecl, EventDecl, Expr, FieldDecl, Flow, Ident, MethodDecl,
	ParamVarDecl, PropertyDecl, RefTypeSig, TypeDecl, TypeSig,
};
use crate::diagnostics::codes;
use crate::lexis::{Keyword, Punct, TokenKind, TokenSource};
use crate::symbols::{Modifiers, TypeGenre};

use super::{PResult, Parser};

const MODIFIER_KEYWORDS: &[(Keyword, Modifiers)] = &[
	(Keyword::Public, Modifiers::PUBLIC),
	(Keyword::Private, Modifiers::PRIVATE),
	(Keyword::Protected, Modifiers::PROTECTED),
	(Keyword::Internal, Modifiers::INTERNAL),
	(Keyword::Static, Modifiers::STATIC),
	(Keyword::Virtual, Modifiers::VIRTUAL),
	(Keyword::Override, Modifiers::OVERRIDE),
	(Keyword::Abstract, Modifiers::ABSTRACT),
	(Keyword::Sealed, Modifiers::SEALED),
	(Keyword::New, Modifiers::NEW),
	(Keyword::Readonly, Modifiers::READONLY),
	(Keyword::Const, Modifiers::CONST),
];

impl<T: TokenSource> Parser<'_, T> {
	pub(crate) fn parse_modifiers(&mut self) -> PResult<Modifiers> {
		let mut modifiers = Modifiers::default();
		loop {
			let kind = self.peek_kind();
			let flag = MODIFIER_KEYWORDS.iter().find(|(kw, _)| kind == TokenKind::Keyword(*kw));
			let Some((_, flag)) = flag else {
				return Ok(modifiers);
			};
			let token = self.advance();
			if let Err(err) = modifiers.add(*flag) {
				let message = match err {
					crate::symbols::ModifierError::Duplicate(name) => format!("duplicate modifier '{name}'"),
					crate::symbols::ModifierError::Conflict(a, b) => {
						format!("modifier '{a}' conflicts with '{b}'")
					}
				};
				return Err(self.fail(codes::DUPLICATE_MODIFIER, token.range, message));
			}
		}
	}

	pub(crate) fn parse_type_decl(&mut self) -> PResult<TypeDecl> {
		let modifiers = self.parse_modifiers()?;
		match self.peek_kind() {
			TokenKind::Keyword(Keyword::Class) => self.parse_class_like(TypeGenre::Class, modifiers),
			TokenKind::Keyword(Keyword::Struct) => self.parse_class_like(TypeGenre::Struct, modifiers),
			TokenKind::Keyword(Keyword::Interface) => self.parse_class_like(TypeGenre::Interface, modifiers),
			TokenKind::Keyword(Keyword::Enum) => self.parse_enum(modifiers),
			TokenKind::Keyword(Keyword::Delegate) => self.parse_delegate(modifiers),
			_ => Err(self.unexpected("a type declaration")),
		}
	}

	fn parse_class_like(&mut self, genre: TypeGenre, modifiers: Modifiers) -> PResult<TypeDecl> {
		let start = self.advance().range;
		let name = self.expect_identifier("a type name")?;
		let mut bases = Vec::new();
		if self.eat_punct(Punct::Colon).is_some() {
			loop {
				let base = self.parse_type_sig()?;
				bases.push(base);
				if self.eat_punct(Punct::Comma).is_none() {
					break;
				}
			}
		}
		self.expect_punct(Punct::OpenBrace)?;
		let mut decl = ClassDecl {
			name,
			genre,
			modifiers,
			bases,
			fields: Vec::new(),
			methods: Vec::new(),
			properties: Vec::new(),
			events: Vec::new(),
			nested: Vec::new(),
			is_delegate: false,
			sym: None,
			range: start,
		};
		while !self.at_punct(Punct::CloseBrace) {
			self.parse_member(&mut decl)?;
		}
		let end = self.expect_punct(Punct::CloseBrace)?.range;
		decl.range = start.through(end);
		Ok(TypeDecl::Class(decl))
	}

	/// One member: event, nested type, constructor, method, field,
	/// property, indexer or operator overload.
	fn parse_member(&mut self, class: &mut ClassDecl) -> PResult<()> {
		let modifiers = self.parse_modifiers()?;
		match self.peek_kind() {
			TokenKind::Keyword(Keyword::Event) => {
				let event = self.parse_event(class, modifiers)?;
				class.events.push(event);
				Ok(())
			}
			TokenKind::Keyword(Keyword::Class | Keyword::Struct | Keyword::Interface | Keyword::Enum | Keyword::Delegate) => {
				let nested = match self.peek_kind() {
					TokenKind::Keyword(Keyword::Class) => self.parse_class_like(TypeGenre::Class, modifiers)?,
					TokenKind::Keyword(Keyword::Struct) => self.parse_class_like(TypeGenre::Struct, modifiers)?,
					TokenKind::Keyword(Keyword::Interface) => self.parse_class_like(TypeGenre::Interface, modifiers)?,
					TokenKind::Keyword(Keyword::Enum) => self.parse_enum(modifiers)?,
					_ => self.parse_delegate(modifiers)?,
				};
				class.nested.push(nested);
				Ok(())
			}
			TokenKind::Identifier(name) => {
				let first = self.advance();
				let first = Ident::new(name, first.range);
				// After the modifier set, an identifier directly followed by
				// `(` names a constructor.
				if self.at_punct(Punct::OpenParen) {
					let ctor = self.parse_constructor(class, modifiers, first)?;
					class.methods.push(ctor);
					return Ok(());
				}
				let sig = self.parse_type_sig_from(first)?;
				self.parse_typed_member(class, modifiers, sig)
			}
			_ => Err(self.unexpected("a member declaration")),
		}
	}

	/// Continue a type signature whose first identifier was already
	/// consumed by member dispatch.
	fn parse_type_sig_from(&mut self, first: Ident) -> PResult<TypeSig> {
		let mut path = crate::ast::DottedPath::single(first);
		while self.eat_punct(Punct::Dot).is_some() {
			let part = self.expect_identifier("an identifier")?;
			path.parts.push(part);
		}
		let range = path.range();
		let sig = TypeSig::Simple(crate::ast::SimpleTypeSig { path, range });
		Ok(self.parse_rank_suffixes(sig))
	}

	fn parse_typed_member(&mut self, class: &mut ClassDecl, modifiers: Modifiers, sig: TypeSig) -> PResult<()> {
		match self.peek_kind() {
			TokenKind::Keyword(Keyword::Operator) => {
				let method = self.parse_operator(modifiers, sig)?;
				class.methods.push(method);
				Ok(())
			}
			TokenKind::Keyword(Keyword::This) => {
				let indexer = self.parse_indexer(class, modifiers, sig)?;
				class.properties.push(indexer);
				Ok(())
			}
			TokenKind::Identifier(name) => {
				let token = self.advance();
				let ident = Ident::new(name, token.range);
				match self.peek_kind() {
					TokenKind::Punct(Punct::OpenParen) => {
						let method = self.parse_method(class, modifiers, sig, ident)?;
						class.methods.push(method);
						Ok(())
					}
					TokenKind::Punct(Punct::OpenBrace) => {
						let property = self.parse_property(class, modifiers, sig, ident)?;
						class.properties.push(property);
						Ok(())
					}
					_ => self.parse_fields(class, modifiers, sig, ident),
				}
			}
			_ => Err(self.unexpected("a member name")),
		}
	}

	fn parse_constructor(&mut self, class: &ClassDecl, modifiers: Modifiers, name: Ident) -> PResult<MethodDecl> {
		if name.name != class.name.name {
			let found = self.pool.get(name.name).to_string();
			let expected = self.pool.get(class.name.name).to_string();
			return Err(self.fail(
				codes::CONSTRUCTOR_NAME_MISMATCH,
				name.range,
				format!("constructor name '{found}' does not match type name '{expected}'"),
			));
		}
		let params = self.parse_params()?;
		let ctor_chain = match self.eat_punct(Punct::Colon) {
			Some(_) => Some(self.parse_ctor_chain()?),
			None => None,
		};
		let body = self.parse_block()?;
		let range = name.range.through(body.range);
		Ok(MethodDecl {
			name,
			ret: None,
			params,
			body: Some(body),
			modifiers,
			ctor_chain,
			special_name: true,
			synthesized: false,
			sym: None,
			scope: None,
			range,
		})
	}

	fn parse_method(&mut self, class: &ClassDecl, modifiers: Modifiers, ret: TypeSig, name: Ident) -> PResult<MethodDecl> {
		let params = self.parse_params()?;
		let abstract_body = modifiers.contains(Modifiers::ABSTRACT) || class.genre == TypeGenre::Interface;
		let (body, end) = match abstract_body {
			true => {
				let end = self.expect_punct(Punct::Semicolon)?.range;
				(None, end)
			}
			false => {
				let block = self.parse_block()?;
				let end = block.range;
				(Some(block), end)
			}
		};
		let range = ret.range().through(end);
		Ok(MethodDecl {
			name,
			ret: Some(ret),
			params,
			body,
			modifiers,
			ctor_chain: None,
			special_name: false,
			synthesized: false,
			sym: None,
			scope: None,
			range,
		})
	}

	fn parse_fields(&mut self, class: &mut ClassDecl, modifiers: Modifiers, sig: TypeSig, first: Ident) -> PResult<()> {
		let mut name = first;
		loop {
			let init = match self.eat_punct(Punct::Assign) {
				Some(_) => Some(self.parse_expr()?),
				None => None,
			};
			let end = init.as_ref().map(Expr::range).unwrap_or(name.range);
			class.fields.push(FieldDecl {
				name,
				sig: sig.clone(),
				modifiers,
				init,
				sym: None,
				range: sig.range().through(end),
			});
			if self.eat_punct(Punct::Comma).is_none() {
				break;
			}
			name = self.expect_identifier("a field name")?;
		}
		self.expect_punct(Punct::Semicolon)?;
		Ok(())
	}

	fn parse_property(&mut self, class: &ClassDecl, modifiers: Modifiers, sig: TypeSig, name: Ident) -> PResult<PropertyDecl> {
		let (getter, setter, end) = self.parse_accessors(class, modifiers, self.name_get, self.name_set)?;
		if getter.is_none() && setter.is_none() {
			return Err(self.fail(
				codes::BAD_ACCESSOR,
				name.range,
				"a property requires at least one accessor".to_string(),
			));
		}
		Ok(PropertyDecl {
			name,
			sig: sig.clone(),
			modifiers,
			params: Vec::new(),
			getter,
			setter,
			is_indexer: false,
			sym: None,
			range: sig.range().through(end),
		})
	}

	/// `T this[params] { get ... set ... }`; lowered onto the reserved
	/// member name during resolution.
	fn parse_indexer(&mut self, class: &ClassDecl, modifiers: Modifiers, sig: TypeSig) -> PResult<PropertyDecl> {
		let this = self.expect_keyword(Keyword::This)?;
		self.expect_punct(Punct::OpenBracket)?;
		let mut params = Vec::new();
		loop {
			let param = self.parse_param()?;
			params.push(param);
			if self.eat_punct(Punct::Comma).is_none() {
				break;
			}
		}
		self.expect_punct(Punct::CloseBracket)?;
		let (getter, setter, end) = self.parse_accessors(class, modifiers, self.name_get, self.name_set)?;
		if getter.is_none() && setter.is_none() {
			return Err(self.fail(
				codes::BAD_ACCESSOR,
				this.range,
				"an indexer requires at least one accessor".to_string(),
			));
		}
		Ok(PropertyDecl {
			name: Ident::new(self.pool.intern(crate::resolve::INDEXER_NAME), this.range),
			sig: sig.clone(),
			modifiers,
			params,
			getter,
			setter,
			is_indexer: true,
			sym: None,
			range: sig.range().through(end),
		})
	}

	/// At most one of each accessor, in either order. Abstract members and
	/// interface members take `;` bodies; everything else takes a block.
	fn parse_accessors(
		&mut self,
		class: &ClassDecl,
		modifiers: Modifiers,
		first_name: crate::names::Name,
		second_name: crate::names::Name,
	) -> PResult<(Option<AccessorDecl>, Option<AccessorDecl>, crate::diagnostics::FileRange)> {
		self.expect_punct(Punct::OpenBrace)?;
		let abstract_body = modifiers.contains(Modifiers::ABSTRACT) || class.genre == TypeGenre::Interface;
		let mut first = None;
		let mut second = None;
		while !self.at_punct(Punct::CloseBrace) {
			let ident = self.expect_identifier("an accessor")?;
			let slot = match ident.name {
				name if name == first_name => &mut first,
				name if name == second_name => &mut second,
				_ => {
					let found = self.pool.get(ident.name).to_string();
					return Err(self.fail(codes::BAD_ACCESSOR, ident.range, format!("unknown accessor '{found}'")));
				}
			};
			if slot.is_some() {
				let found = self.pool.get(ident.name).to_string();
				return Err(self.fail(codes::BAD_ACCESSOR, ident.range, format!("duplicate accessor '{found}'")));
			}
			let accessor = match abstract_body {
				true => {
					let end = self.expect_punct(Punct::Semicolon)?.range;
					AccessorDecl { body: None, range: ident.range.through(end) }
				}
				false => {
					let body = self.parse_block()?;
					let range = ident.range.through(body.range);
					AccessorDecl { body: Some(body), range }
				}
			};
			*slot = Some(accessor);
		}
		let end = self.expect_punct(Punct::CloseBrace)?.range;
		Ok((first, second, end))
	}

	/// Operator overloads must be public static with exactly two value
	/// parameters; the name comes from the fixed operator table.
	fn parse_operator(&mut self, modifiers: Modifiers, ret: TypeSig) -> PResult<MethodDecl> {
		let keyword = self.expect_keyword(Keyword::Operator)?;
		let token = self.advance();
		let op = match token.kind {
			TokenKind::Punct(punct) => operator_decl_op(punct),
			_ => None,
		};
		let Some(method_name) = op.and_then(BinOp::method_name) else {
			let found = token.describe(self.pool);
			return Err(self.fail(
				codes::BAD_OPERATOR_DECLARATION,
				token.range,
				format!("{found} is not an overloadable operator"),
			));
		};
		let params = self.parse_params()?;
		if !modifiers.contains(Modifiers::PUBLIC) || !modifiers.contains(Modifiers::STATIC) {
			return Err(self.fail(
				codes::BAD_OPERATOR_DECLARATION,
				keyword.range,
				"operator overloads must be declared public static".to_string(),
			));
		}
		if params.len() != 2 || params.iter().any(|p| p.flow != Flow::In) {
			return Err(self.fail(
				codes::BAD_OPERATOR_DECLARATION,
				keyword.range,
				"operator overloads take exactly two value parameters".to_string(),
			));
		}
		let body = self.parse_block()?;
		let range = ret.range().through(body.range);
		Ok(MethodDecl {
			name: Ident::new(self.pool.intern(method_name), token.range),
			ret: Some(ret),
			params,
			body: Some(body),
			modifiers,
			ctor_chain: None,
			special_name: true,
			synthesized: false,
			sym: None,
			scope: None,
			range,
		})
	}

	fn parse_event(&mut self, class: &ClassDecl, modifiers: Modifiers) -> PResult<EventDecl> {
		let start = self.expect_keyword(Keyword::Event)?.range;
		let sig = self.parse_type_sig()?;
		let name = self.expect_identifier("an event name")?;
		let (add, remove, end) = match self.at_punct(Punct::OpenBrace) {
			true => {
				let (add, remove, end) = self.parse_accessors(class, modifiers, self.name_add, self.name_remove)?;
				if add.is_none() || remove.is_none() {
					return Err(self.fail(
						codes::BAD_ACCESSOR,
						name.range,
						"an event with explicit accessors requires both add and remove".to_string(),
					));
				}
				(add, remove, end)
			}
			false => {
				let end = self.expect_punct(Punct::Semicolon)?.range;
				(None, None, end)
			}
		};
		Ok(EventDecl { name, sig, modifiers, add, remove, sym: None, range: start.through(end) })
	}

	fn parse_enum(&mut self, modifiers: Modifiers) -> PResult<TypeDecl> {
		let start = self.expect_keyword(Keyword::Enum)?.range;
		let name = self.expect_identifier("an enum name")?;
		self.expect_punct(Punct::OpenBrace)?;
		let mut members = Vec::new();
		while !self.at_punct(Punct::CloseBrace) {
			let member_name = self.expect_identifier("an enum member")?;
			let value = match self.eat_punct(Punct::Assign) {
				Some(_) => Some(self.parse_enum_value()?),
				None => None,
			};
			members.push(EnumMemberDecl { name: member_name, value, sym: None, range: member_name.range });
			if self.eat_punct(Punct::Comma).is_none() {
				break;
			}
		}
		let end = self.expect_punct(Punct::CloseBrace)?.range;
		Ok(TypeDecl::Enum(EnumDecl { name, modifiers, members, sym: None, range: start.through(end) }))
	}

	/// Enum initializers fold trivially: an integer literal, possibly
	/// negated.
	fn parse_enum_value(&mut self) -> PResult<i32> {
		let negative = self.eat_punct(Punct::Minus).is_some();
		match self.peek_kind() {
			TokenKind::Int(value) => {
				let token = self.advance();
				// The wrapped 2^31 magnitude needs the minus in front.
				if value == i32::MIN && !negative {
					return Err(self.fail(
						codes::INT_LITERAL_OVERFLOW,
						token.range,
						"integer literal out of range".to_string(),
					));
				}
				Ok(match negative {
					true => value.wrapping_neg(),
					false => value,
				})
			}
			_ => Err(self.unexpected("an integer literal")),
		}
	}

	/// `delegate R D(params);` lowers at parse time to a sealed class
	/// flagged as a delegate, carrying the synthesized `Invoke` signature.
	fn parse_delegate(&mut self, modifiers: Modifiers) -> PResult<TypeDecl> {
		let start = self.expect_keyword(Keyword::Delegate)?.range;
		let ret = self.parse_type_sig()?;
		let name = self.expect_identifier("a delegate name")?;
		let params = self.parse_params()?;
		let end = self.expect_punct(Punct::Semicolon)?.range;
		let range = start.through(end);

		let mut invoke_modifiers = Modifiers::PUBLIC;
		invoke_modifiers |= Modifiers::VIRTUAL;
		let invoke = MethodDecl {
			name: Ident::new(self.pool.intern("Invoke"), name.range),
			ret: Some(ret),
			params,
			body: None,
			modifiers: invoke_modifiers,
			ctor_chain: None,
			special_name: false,
			synthesized: true,
			sym: None,
			scope: None,
			range,
		};

		let mut class_modifiers = modifiers;
		class_modifiers.insert(Modifiers::SEALED);
		Ok(TypeDecl::Class(ClassDecl {
			name,
			genre: TypeGenre::Class,
			modifiers: class_modifiers,
			bases: Vec::new(),
			fields: Vec::new(),
			methods: vec![invoke],
			properties: Vec::new(),
			events: Vec::new(),
			nested: Vec::new(),
			is_delegate: true,
			sym: None,
			range,
		}))
	}

	pub(crate) fn parse_params(&mut self) -> PResult<Vec<ParamVarDecl>> {
		self.expect_punct(Punct::OpenParen)?;
		let mut params = Vec::new();
		if !self.at_punct(Punct::CloseParen) {
			loop {
				let param = self.parse_param()?;
				params.push(param);
				if self.eat_punct(Punct::Comma).is_none() {
					break;
				}
			}
		}
		self.expect_punct(Punct::CloseParen)?;
		Ok(params)
	}

	fn parse_param(&mut self) -> PResult<ParamVarDecl> {
		let flow = match self.peek_kind() {
			TokenKind::Keyword(Keyword::Ref) => {
				self.advance();
				Flow::Ref
			}
			TokenKind::Keyword(Keyword::Out) => {
				self.advance();
				Flow::Out
			}
			_ => Flow::In,
		};
		let sig = self.parse_type_sig()?;
		let sig = match flow {
			Flow::In => sig,
			_ => {
				let range = sig.range();
				TypeSig::Ref(Box::new(RefTypeSig { inner: sig, range }))
			}
		};
		let name = self.expect_identifier("a parameter name")?;
		let range = sig.range().through(name.range);
		Ok(ParamVarDecl { name, sig, flow, sym: None, range })
	}
}

fn operator_decl_op(punct: Punct) -> Option<BinOp> {
	match punct {
		Punct::Plus => Some(BinOp::Add),
		Punct::Minus => Some(BinOp::Sub),
		Punct::Star => Some(BinOp::Mul),
		Punct::Slash => Some(BinOp::Div),
		Punct::Percent => Some(BinOp::Rem),
		Punct::Eq => Some(BinOp::Eq),
		Punct::NotEq => Some(BinOp::NotEq),
		Punct::Less => Some(BinOp::Less),
		Punct::Greater => Some(BinOp::Greater),
		Punct::LessEq => Some(BinOp::LessEq),
		Punct::GreaterEq => Some(BinOp::GreaterEq),
		Punct::Amp => Some(BinOp::BitAnd),
		Punct::Pipe => Some(BinOp::BitOr),
		Punct::Caret => Some(BinOp::BitXor),
		Punct::Shl => Some(BinOp::Shl),
		Punct::Shr => Some(BinOp::Shr),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use crate::ast::{TypeDecl, UsingDirective};
	use crate::diagnostics::Reporter;
	use crate::names::NamePool;
	use crate::parse::parse_source_file;
	use crate::symbols::{Modifiers, TypeGenre};

	fn parse_one(text: &str) -> (NamePool, TypeDecl) {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let unit = parse_source_file(&pool, &mut reporter, "test.cob", text);
		assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
		let mut unit = unit.unwrap();
		assert_eq!(unit.types.len(), 1);
		(pool, unit.types.remove(0))
	}

	fn parse_err(text: &str) -> u32 {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let unit = parse_source_file(&pool, &mut reporter, "test.cob", text);
		assert!(unit.is_none());
		assert_eq!(reporter.error_count(), 1);
		reporter.diagnostics()[0].code
	}

	#[test]
	fn class_with_members() {
		let (pool, decl) = parse_one(
			"public class C : A, B { int f = 1; public C() : base() { } void M(int x, ref int y) { } }",
		);
		let TypeDecl::Class(class) = decl else { panic!() };
		assert_eq!(pool.get(class.name.name), "C");
		assert_eq!(class.genre, TypeGenre::Class);
		assert_eq!(class.bases.len(), 2);
		assert_eq!(class.fields.len(), 1);
		assert_eq!(class.methods.len(), 2);
		let ctor = &class.methods[0];
		assert!(ctor.ret.is_none());
		assert!(ctor.ctor_chain.is_some());
		let method = &class.methods[1];
		assert_eq!(method.params.len(), 2);
	}

	#[test]
	fn constructor_name_must_match() {
		assert_eq!(parse_err("class C { D() { } }"), crate::diagnostics::codes::CONSTRUCTOR_NAME_MISMATCH);
	}

	#[test]
	fn property_accessor_rules() {
		let (_, decl) = parse_one("class C { int P { get { return 1; } set { } } }");
		let TypeDecl::Class(class) = decl else { panic!() };
		let property = &class.properties[0];
		assert!(property.getter.is_some());
		assert!(property.setter.is_some());
		assert_eq!(parse_err("class C { int P { } }"), crate::diagnostics::codes::BAD_ACCESSOR);
		assert_eq!(
			parse_err("class C { int P { get { return 1; } get { return 2; } } }"),
			crate::diagnostics::codes::BAD_ACCESSOR
		);
	}

	#[test]
	fn abstract_property_takes_semicolon_bodies() {
		let (_, decl) = parse_one("abstract class C { public abstract int P { get; set; } }");
		let TypeDecl::Class(class) = decl else { panic!() };
		let property = &class.properties[0];
		assert!(property.getter.as_ref().unwrap().body.is_none());
		assert!(property.setter.as_ref().unwrap().body.is_none());
	}

	#[test]
	fn operator_overloads_are_checked() {
		let (pool, decl) = parse_one("struct V { public static V operator+(V a, V b) { return a; } }");
		let TypeDecl::Class(class) = decl else { panic!() };
		assert_eq!(pool.get(class.methods[0].name.name), "op_Addition");
		assert!(class.methods[0].special_name);
		assert_eq!(
			parse_err("struct V { static V operator+(V a, V b) { return a; } }"),
			crate::diagnostics::codes::BAD_OPERATOR_DECLARATION
		);
		assert_eq!(
			parse_err("struct V { public static V operator+(V a) { return a; } }"),
			crate::diagnostics::codes::BAD_OPERATOR_DECLARATION
		);
	}

	#[test]
	fn delegates_become_sealed_classes() {
		let (pool, decl) = parse_one("public delegate int D(int x);");
		let TypeDecl::Class(class) = decl else { panic!() };
		assert!(class.is_delegate);
		assert!(class.modifiers.contains(Modifiers::SEALED));
		assert_eq!(class.methods.len(), 1);
		assert_eq!(pool.get(class.methods[0].name.name), "Invoke");
		assert!(class.methods[0].synthesized);
	}

	#[test]
	fn enums_fold_member_values() {
		let (pool, decl) = parse_one("enum E { A, B = 5, C, D = -1, }");
		let TypeDecl::Enum(decl) = decl else { panic!() };
		assert_eq!(decl.members.len(), 4);
		assert_eq!(pool.get(decl.members[0].name.name), "A");
		assert_eq!(decl.members[0].value, None);
		assert_eq!(decl.members[1].value, Some(5));
		assert_eq!(decl.members[3].value, Some(-1));
	}

	#[test]
	fn events_parse_with_and_without_accessors() {
		let (_, decl) = parse_one("class C { public event D E; }");
		let TypeDecl::Class(class) = decl else { panic!() };
		assert!(class.events[0].add.is_none());
		let (_, decl) = parse_one("class C { public event D E { add { } remove { } } }");
		let TypeDecl::Class(class) = decl else { panic!() };
		assert!(class.events[0].add.is_some());
		assert!(class.events[0].remove.is_some());
	}

	#[test]
	fn usings_only_at_block_heads() {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let unit = parse_source_file(&pool, &mut reporter, "t", "namespace N { using System; class C { } }");
		assert!(!reporter.has_errors());
		let unit = unit.unwrap();
		assert!(matches!(unit.namespaces[0].usings[0], UsingDirective::Path { .. }));
	}
}
