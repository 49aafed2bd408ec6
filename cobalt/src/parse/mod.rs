mod decls;
mod exprs;
mod stmts;

use tracing::debug;

use crate::ast::{ArrayTypeSig, DottedPath, Ident, NamespaceDecl, SimpleTypeSig, TypeSig, UsingDirective};
use crate::diagnostics::{codes, FileRange, Reporter};
use crate::lexis::{Keyword, Lexer, Punct, Token, TokenKind, TokenSource};
use crate::names::{Name, NamePool};

/// Private unwind value for syntax errors. The diagnostic is emitted once
/// at the throw site; [`parse_source_file`] is the catch boundary.
#[derive(Debug)]
pub(crate) struct ParseAbort;

pub(crate) type PResult<T> = Result<T, ParseAbort>;

/// Parse one source file into its global namespace block, or report at
/// least one error and yield nothing.
pub fn parse_source_file(pool: &NamePool, reporter: &mut Reporter, file_name: &str, text: &str) -> Option<NamespaceDecl> {
	let mut lexer = Lexer::new(pool, file_name, text);
	let result = {
		let mut parser = Parser::new(&mut lexer, pool, reporter);
		parser.parse_compilation_unit()
	};
	for diagnostic in lexer.take_diagnostics() {
		reporter.error(diagnostic.code, diagnostic.range, diagnostic.message);
	}
	match result {
		Ok(unit) => {
			debug!(file = file_name, "parsed source file");
			Some(unit)
		}
		Err(ParseAbort) => None,
	}
}

/// Recursive-descent parser over a one-token-lookahead stream. Performs no
/// name lookup; context-sensitive spots produce placeholder nodes.
pub struct Parser<'a, T: TokenSource> {
	tokens: &'a mut T,
	pub(crate) pool: &'a NamePool,
	pub(crate) reporter: &'a mut Reporter,
	// Contextual (non-keyword) accessor names.
	pub(crate) name_get: Name,
	pub(crate) name_set: Name,
	pub(crate) name_add: Name,
	pub(crate) name_remove: Name,
}

impl<'a, T: TokenSource> Parser<'a, T> {
	pub fn new(tokens: &'a mut T, pool: &'a NamePool, reporter: &'a mut Reporter) -> Self {
		Parser {
			tokens,
			pool,
			reporter,
			name_get: pool.intern("get"),
			name_set: pool.intern("set"),
			name_add: pool.intern("add"),
			name_remove: pool.intern("remove"),
		}
	}

	// Token plumbing.

	pub(crate) fn peek(&mut self) -> Token {
		*self.tokens.peek()
	}

	pub(crate) fn peek_kind(&mut self) -> TokenKind {
		self.tokens.peek().kind
	}

	pub(crate) fn advance(&mut self) -> Token {
		self.tokens.advance()
	}

	pub(crate) fn at_punct(&mut self, punct: Punct) -> bool {
		self.peek_kind() == TokenKind::Punct(punct)
	}

	pub(crate) fn at_keyword(&mut self, keyword: Keyword) -> bool {
		self.peek_kind() == TokenKind::Keyword(keyword)
	}

	pub(crate) fn eat_punct(&mut self, punct: Punct) -> Option<Token> {
		match self.at_punct(punct) {
			true => Some(self.advance()),
			false => None,
		}
	}

	pub(crate) fn eat_keyword(&mut self, keyword: Keyword) -> Option<Token> {
		match self.at_keyword(keyword) {
			true => Some(self.advance()),
			false => None,
		}
	}

	pub(crate) fn fail(&mut self, code: u32, range: FileRange, message: String) -> ParseAbort {
		self.reporter.error(code, range, message);
		ParseAbort
	}

	pub(crate) fn unexpected(&mut self, expected: &str) -> ParseAbort {
		let token = self.peek();
		// A lexical error has already been reported by the scanner.
		if token.kind == TokenKind::Error {
			return ParseAbort;
		}
		let found = token.describe(self.pool);
		self.fail(codes::UNEXPECTED_TOKEN, token.range, format!("expected {expected}, found {found}"))
	}

	pub(crate) fn expect_punct(&mut self, punct: Punct) -> PResult<Token> {
		match self.at_punct(punct) {
			true => Ok(self.advance()),
			false => Err(self.unexpected(&format!("'{}'", punct.text()))),
		}
	}

	pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> PResult<Token> {
		match self.at_keyword(keyword) {
			true => Ok(self.advance()),
			false => Err(self.unexpected(&format!("'{}'", keyword.text()))),
		}
	}

	pub(crate) fn expect_identifier(&mut self, what: &str) -> PResult<Ident> {
		match self.peek_kind() {
			TokenKind::Identifier(name) => {
				let token = self.advance();
				Ok(Ident::new(name, token.range))
			}
			_ => Err(self.unexpected(what)),
		}
	}

	// Compilation units.

	/// using-directives followed by namespaces and type declarations.
	pub fn parse_compilation_unit(&mut self) -> PResult<NamespaceDecl> {
		let start = self.peek().range;
		let mut unit = NamespaceDecl {
			name: None,
			usings: Vec::new(),
			namespaces: Vec::new(),
			types: Vec::new(),
			sym: None,
			scope: None,
			range: start,
		};
		while self.at_keyword(Keyword::Using) {
			let using = self.parse_using()?;
			unit.usings.push(using);
		}
		loop {
			match self.peek_kind() {
				TokenKind::Eof => break,
				TokenKind::Keyword(Keyword::Namespace) => {
					let nested = self.parse_namespace()?;
					unit.namespaces.push(nested);
				}
				_ => {
					let decl = self.parse_type_decl()?;
					unit.types.push(decl);
				}
			}
		}
		let end = self.peek().range;
		unit.range = start.through(end);
		Ok(unit)
	}

	fn parse_namespace(&mut self) -> PResult<NamespaceDecl> {
		let start = self.expect_keyword(Keyword::Namespace)?.range;
		let name = self.parse_dotted_path()?;
		self.expect_punct(Punct::OpenBrace)?;
		let mut decl = NamespaceDecl {
			name: Some(name),
			usings: Vec::new(),
			namespaces: Vec::new(),
			types: Vec::new(),
			sym: None,
			scope: None,
			range: start,
		};
		while self.at_keyword(Keyword::Using) {
			let using = self.parse_using()?;
			decl.usings.push(using);
		}
		loop {
			match self.peek_kind() {
				TokenKind::Punct(Punct::CloseBrace) => break,
				TokenKind::Keyword(Keyword::Namespace) => {
					let nested = self.parse_namespace()?;
					decl.namespaces.push(nested);
				}
				_ => {
					let ty = self.parse_type_decl()?;
					decl.types.push(ty);
				}
			}
		}
		let end = self.expect_punct(Punct::CloseBrace)?.range;
		decl.range = start.through(end);
		Ok(decl)
	}

	/// `using A.B;` or `using N = A.B;`.
	fn parse_using(&mut self) -> PResult<UsingDirective> {
		let start = self.expect_keyword(Keyword::Using)?.range;
		let first = self.expect_identifier("a namespace or alias name")?;
		if self.eat_punct(Punct::Assign).is_some() {
			let target = self.parse_dotted_path()?;
			let end = self.expect_punct(Punct::Semicolon)?.range;
			return Ok(UsingDirective::Alias { alias: first, target, range: start.through(end) });
		}
		let mut target = DottedPath::single(first);
		while self.eat_punct(Punct::Dot).is_some() {
			let part = self.expect_identifier("a namespace name")?;
			target.parts.push(part);
		}
		let end = self.expect_punct(Punct::Semicolon)?.range;
		Ok(UsingDirective::Path { target, range: start.through(end) })
	}

	pub(crate) fn parse_dotted_path(&mut self) -> PResult<DottedPath> {
		let first = self.expect_identifier("an identifier")?;
		let mut path = DottedPath::single(first);
		while self.eat_punct(Punct::Dot).is_some() {
			let part = self.expect_identifier("an identifier")?;
			path.parts.push(part);
		}
		Ok(path)
	}

	// Type signatures.

	/// Dotted name plus rank suffixes; `X[][,,][,]` chains left-to-right
	/// with the leftmost brackets outermost.
	pub(crate) fn parse_type_sig(&mut self) -> PResult<TypeSig> {
		let path = self.parse_dotted_path()?;
		let range = path.range();
		let sig = TypeSig::Simple(SimpleTypeSig { path, range });
		Ok(self.parse_rank_suffixes(sig))
	}

	pub(crate) fn parse_rank_suffixes(&mut self, base: TypeSig) -> TypeSig {
		let mut ranks = Vec::new();
		let mut end = base.range();
		while let TokenKind::Rank(dim) = self.peek_kind() {
			let token = self.advance();
			ranks.push(dim);
			end = token.range;
		}
		let mut sig = base;
		for rank in ranks.into_iter().rev() {
			let range = sig.range().through(end);
			sig = TypeSig::Array(Box::new(ArrayTypeSig { elem: sig, rank, range }));
		}
		sig
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use crate::ast::TypeSig;
	use crate::diagnostics::Reporter;
	use crate::names::NamePool;

	use super::*;

	fn parse(text: &str) -> (NamePool, Option<NamespaceDecl>, Reporter) {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let unit = parse_source_file(&pool, &mut reporter, "test.cob", text);
		(pool, unit, reporter)
	}

	#[test]
	fn empty_unit_parses() {
		let (_, unit, reporter) = parse("");
		assert!(unit.is_some());
		assert!(!reporter.has_errors());
	}

	#[test]
	fn usings_and_namespaces() {
		let (pool, unit, reporter) = parse(
			"using System;\nusing IO = System.Collections;\nnamespace A.B { namespace C { } }\n",
		);
		assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
		let unit = unit.unwrap();
		assert_eq!(unit.usings.len(), 2);
		assert!(matches!(unit.usings[0], UsingDirective::Path { .. }));
		assert!(matches!(unit.usings[1], UsingDirective::Alias { .. }));
		assert_eq!(unit.namespaces.len(), 1);
		let ab = &unit.namespaces[0];
		assert_eq!(ab.name.as_ref().unwrap().render(&pool), "A.B");
		assert_eq!(ab.namespaces.len(), 1);
	}

	#[test]
	fn parse_twice_yields_equal_trees() {
		let text = "namespace N { class C { int f; public C() { f = 3; } } }";
		let (_, first, _) = parse(text);
		let (_, second, _) = parse(text);
		assert_eq!(first.unwrap(), second.unwrap());
	}

	#[test]
	fn syntax_error_yields_no_ast() {
		let (_, unit, reporter) = parse("namespace { }");
		assert!(unit.is_none());
		assert_eq!(reporter.error_count(), 1);
	}

	#[test]
	fn array_sig_nesting_is_leftmost_outermost() {
		let pool = NamePool::new();
		let mut reporter = Reporter::new();
		let mut lexer = crate::lexis::Lexer::new(&pool, "t", "X[][,,][,]");
		let mut parser = Parser::new(&mut lexer, &pool, &mut reporter);
		let sig = parser.parse_type_sig().unwrap();
		let TypeSig::Array(outer) = sig else { panic!("expected an array sig") };
		assert_eq!(outer.rank, 1);
		let TypeSig::Array(mid) = outer.elem else { panic!("expected a nested array") };
		assert_eq!(mid.rank, 3);
		let TypeSig::Array(inner) = mid.elem else { panic!("expected a nested array") };
		assert_eq!(inner.rank, 2);
		assert!(matches!(inner.elem, TypeSig::Simple(_)));
	}
}
