use crate::diagnostics::{codes, Diagnostic, FileRange, Severity};
use crate::names::{Name, NamePool};

use super::{Keyword, Punct, Token, TokenKind, TokenSource};

/// Hand-written scanner. Preprocessor directives are consumed transparently
/// (a `#` line is skipped whole); a lexical error yields one ERROR token and
/// EOF from then on.
pub struct Lexer<'a> {
	pool: &'a NamePool,
	file: Name,
	chars: Vec<char>,
	pos: usize,
	line: u32,
	col: u32,
	/// No token scanned yet on the current line; trivia does not clear it.
	line_start: bool,
	lookahead: Option<Token>,
	failed: bool,
	diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
	pub fn new(pool: &'a NamePool, file_name: &str, text: &str) -> Self {
		Lexer {
			pool,
			file: pool.intern(file_name),
			chars: text.chars().collect(),
			pos: 0,
			line: 1,
			col: 1,
			line_start: true,
			lookahead: None,
			failed: false,
			diagnostics: Vec::new(),
		}
	}

	#[inline]
	pub fn file(&self) -> Name {
		self.file
	}

	/// Diagnostics recorded while scanning, drained by the driver.
	pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
		std::mem::take(&mut self.diagnostics)
	}

	#[inline]
	fn current(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	#[inline]
	fn at(&self, offset: usize) -> Option<char> {
		self.chars.get(self.pos + offset).copied()
	}

	fn step(&mut self) -> Option<char> {
		let c = self.current()?;
		self.pos += 1;
		match c == '\n' {
			true => {
				self.line += 1;
				self.col = 1;
				self.line_start = true;
			}
			false => self.col += 1,
		}
		Some(c)
	}

	fn mark(&self) -> (u32, u32) {
		(self.line, self.col)
	}

	fn range_from(&self, start: (u32, u32)) -> FileRange {
		FileRange::new(self.file, start.0, start.1, self.line, self.col)
	}

	fn error(&mut self, code: u32, range: FileRange, message: String) -> Token {
		self.failed = true;
		self.diagnostics.push(Diagnostic { severity: Severity::Error, code, range, message });
		Token { kind: TokenKind::Error, range }
	}

	fn skip_trivia(&mut self) {
		loop {
			match self.current() {
				Some(c) if c.is_whitespace() => {
					self.step();
				}
				// A directive line is the preprocessor's business, not ours.
				// `#` opens one only before the first token of its line.
				Some('#') if self.line_start => {
					while let Some(c) = self.step() {
						if c == '\n' {
							break;
						}
					}
				}
				Some('/') if self.at(1) == Some('/') => {
					while let Some(c) = self.step() {
						if c == '\n' {
							break;
						}
					}
				}
				Some('/') if self.at(1) == Some('*') => {
					let start = self.mark();
					self.step();
					self.step();
					let mut closed = false;
					while let Some(c) = self.step() {
						if c == '*' && self.current() == Some('/') {
							self.step();
							closed = true;
							break;
						}
					}
					if !closed {
						let range = self.range_from(start);
						self.failed = true;
						self.diagnostics.push(Diagnostic {
							severity: Severity::Error,
							code: codes::UNTERMINATED_COMMENT,
							range,
							message: "unterminated block comment".to_string(),
						});
						return;
					}
				}
				_ => return,
			}
		}
	}

	fn scan_identifier(&mut self, start: (u32, u32)) -> Token {
		let begin = self.pos;
		while let Some(c) = self.current() {
			match c.is_alphanumeric() || c == '_' {
				true => {
					self.step();
				}
				false => break,
			}
		}
		let text: String = self.chars[begin..self.pos].iter().collect();
		let range = self.range_from(start);
		let kind = match text.as_str() {
			"true" => TokenKind::Bool(true),
			"false" => TokenKind::Bool(false),
			_ => match Keyword::from_text(&text) {
				Some(kw) => TokenKind::Keyword(kw),
				None => TokenKind::Identifier(self.pool.intern(&text)),
			},
		};
		Token { kind, range }
	}

	fn scan_number(&mut self, start: (u32, u32)) -> Token {
		let (radix, begin) = match self.current() == Some('0') && matches!(self.at(1), Some('x') | Some('X')) {
			true => {
				self.step();
				self.step();
				(16, self.pos)
			}
			false => (10, self.pos),
		};
		while let Some(c) = self.current() {
			match c.is_digit(radix) {
				true => {
					self.step();
				}
				false => break,
			}
		}
		let text: String = self.chars[begin..self.pos].iter().collect();
		let range = self.range_from(start);
		// Magnitudes up to 2^31 lex; the extra one wraps to `int.MinValue`
		// and only survives under a folding unary minus, which the parser
		// enforces.
		match i64::from_str_radix(&text, radix) {
			Ok(value) if value <= i32::MAX as i64 + 1 => Token { kind: TokenKind::Int(value as i32), range },
			_ => self.error(codes::INT_LITERAL_OVERFLOW, range, format!("integer literal '{text}' out of range")),
		}
	}

	fn scan_escape(&mut self, start: (u32, u32)) -> Result<char, Token> {
		match self.step() {
			Some('n') => Ok('\n'),
			Some('t') => Ok('\t'),
			Some('r') => Ok('\r'),
			Some('0') => Ok('\0'),
			Some('\\') => Ok('\\'),
			Some('\'') => Ok('\''),
			Some('"') => Ok('"'),
			other => {
				let range = self.range_from(start);
				let what = other.map(|c| c.to_string()).unwrap_or_else(|| "end of file".to_string());
				Err(self.error(codes::BAD_ESCAPE, range, format!("unrecognized escape '\\{what}'")))
			}
		}
	}

	fn scan_char(&mut self, start: (u32, u32)) -> Token {
		self.step();
		let value = match self.current() {
			None | Some('\n') | Some('\'') => {
				let range = self.range_from(start);
				return self.error(codes::UNTERMINATED_CHAR, range, "bad character literal".to_string());
			}
			Some('\\') => {
				self.step();
				match self.scan_escape(start) {
					Ok(c) => c,
					Err(token) => return token,
				}
			}
			Some(c) => {
				self.step();
				c
			}
		};
		match self.current() == Some('\'') {
			true => {
				self.step();
				Token { kind: TokenKind::Char(value), range: self.range_from(start) }
			}
			false => {
				let range = self.range_from(start);
				self.error(codes::UNTERMINATED_CHAR, range, "unterminated character literal".to_string())
			}
		}
	}

	fn scan_string(&mut self, start: (u32, u32)) -> Token {
		self.step();
		let mut value = String::new();
		loop {
			match self.current() {
				None | Some('\n') => {
					let range = self.range_from(start);
					return self.error(codes::UNTERMINATED_STRING, range, "unterminated string literal".to_string());
				}
				Some('"') => {
					self.step();
					let range = self.range_from(start);
					return Token { kind: TokenKind::Str(self.pool.intern(&value)), range };
				}
				Some('\\') => {
					self.step();
					match self.scan_escape(start) {
						Ok(c) => value.push(c),
						Err(token) => return token,
					}
				}
				Some(c) => {
					self.step();
					value.push(c);
				}
			}
		}
	}

	/// `[` directly followed by commas and `]` is a rank specifier; anything
	/// else is a plain open bracket.
	fn scan_bracket(&mut self, start: (u32, u32)) -> Token {
		self.step();
		let mut offset = 0;
		let mut commas = 0u32;
		loop {
			match self.at(offset) {
				Some(c) if c == ' ' || c == '\t' => offset += 1,
				Some(',') => {
					commas += 1;
					offset += 1;
				}
				Some(']') => {
					for _ in 0..=offset {
						self.step();
					}
					return Token { kind: TokenKind::Rank(commas + 1), range: self.range_from(start) };
				}
				_ => return Token { kind: TokenKind::Punct(Punct::OpenBracket), range: self.range_from(start) },
			}
		}
	}

	fn scan_punct(&mut self, start: (u32, u32)) -> Token {
		let first = self.step().unwrap();
		let second = self.current();
		let punct = match (first, second) {
			('<', Some('<')) => {
				self.step();
				match self.current() {
					Some('=') => {
						self.step();
						Punct::ShlAssign
					}
					_ => Punct::Shl,
				}
			}
			('>', Some('>')) => {
				self.step();
				match self.current() {
					Some('=') => {
						self.step();
						Punct::ShrAssign
					}
					_ => Punct::Shr,
				}
			}
			('=', Some('=')) => { self.step(); Punct::Eq }
			('!', Some('=')) => { self.step(); Punct::NotEq }
			('<', Some('=')) => { self.step(); Punct::LessEq }
			('>', Some('=')) => { self.step(); Punct::GreaterEq }
			('&', Some('&')) => { self.step(); Punct::AmpAmp }
			('|', Some('|')) => { self.step(); Punct::PipePipe }
			('+', Some('+')) => { self.step(); Punct::Increment }
			('-', Some('-')) => { self.step(); Punct::Decrement }
			('+', Some('=')) => { self.step(); Punct::PlusAssign }
			('-', Some('=')) => { self.step(); Punct::MinusAssign }
			('*', Some('=')) => { self.step(); Punct::StarAssign }
			('/', Some('=')) => { self.step(); Punct::SlashAssign }
			('%', Some('=')) => { self.step(); Punct::PercentAssign }
			('&', Some('=')) => { self.step(); Punct::AmpAssign }
			('|', Some('=')) => { self.step(); Punct::PipeAssign }
			('^', Some('=')) => { self.step(); Punct::CaretAssign }
			('(', _) => Punct::OpenParen,
			(')', _) => Punct::CloseParen,
			('{', _) => Punct::OpenBrace,
			('}', _) => Punct::CloseBrace,
			(']', _) => Punct::CloseBracket,
			('.', _) => Punct::Dot,
			(',', _) => Punct::Comma,
			(';', _) => Punct::Semicolon,
			(':', _) => Punct::Colon,
			('?', _) => Punct::Question,
			('+', _) => Punct::Plus,
			('-', _) => Punct::Minus,
			('*', _) => Punct::Star,
			('/', _) => Punct::Slash,
			('%', _) => Punct::Percent,
			('&', _) => Punct::Amp,
			('|', _) => Punct::Pipe,
			('^', _) => Punct::Caret,
			('!', _) => Punct::Bang,
			('=', _) => Punct::Assign,
			('<', _) => Punct::Less,
			('>', _) => Punct::Greater,
			other => {
				let range = self.range_from(start);
				return self.error(codes::UNEXPECTED_CHARACTER, range, format!("unexpected character '{}'", other.0));
			}
		};
		Token { kind: TokenKind::Punct(punct), range: self.range_from(start) }
	}

	fn scan_token(&mut self) -> Token {
		if self.failed {
			return Token { kind: TokenKind::Eof, range: FileRange::new(self.file, self.line, self.col, self.line, self.col) };
		}
		self.skip_trivia();
		if self.failed {
			let range = FileRange::new(self.file, self.line, self.col, self.line, self.col);
			return Token { kind: TokenKind::Error, range };
		}
		self.line_start = false;
		let start = self.mark();
		match self.current() {
			None => Token { kind: TokenKind::Eof, range: self.range_from(start) },
			Some(c) if c.is_alphabetic() || c == '_' => self.scan_identifier(start),
			Some(c) if c.is_ascii_digit() => self.scan_number(start),
			Some('\'') => self.scan_char(start),
			Some('"') => self.scan_string(start),
			Some('[') => self.scan_bracket(start),
			Some(_) => self.scan_punct(start),
		}
	}
}

impl TokenSource for Lexer<'_> {
	fn peek(&mut self) -> &Token {
		if self.lookahead.is_none() {
			self.lookahead = Some(self.scan_token());
		}
		self.lookahead.as_ref().unwrap()
	}

	fn advance(&mut self) -> Token {
		match self.lookahead.take() {
			Some(token) => token,
			None => self.scan_token(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(text: &str) -> Vec<TokenKind> {
		let pool = NamePool::new();
		let mut lexer = Lexer::new(&pool, "test.cob", text);
		let mut out = Vec::new();
		loop {
			let token = lexer.advance();
			let done = token.kind == TokenKind::Eof || token.kind == TokenKind::Error;
			out.push(token.kind);
			if done {
				return out;
			}
		}
	}

	#[test]
	fn scans_declaration_tokens() {
		let pool = NamePool::new();
		let mut lexer = Lexer::new(&pool, "test.cob", "class C { int f; }");
		assert_eq!(lexer.advance().kind, TokenKind::Keyword(Keyword::Class));
		assert_eq!(lexer.advance().kind, TokenKind::Identifier(pool.intern("C")));
		assert_eq!(lexer.advance().kind, TokenKind::Punct(Punct::OpenBrace));
		// `int` is an ordinary identifier, bound through the global scope.
		assert_eq!(lexer.advance().kind, TokenKind::Identifier(pool.intern("int")));
		assert_eq!(lexer.advance().kind, TokenKind::Identifier(pool.intern("f")));
		assert_eq!(lexer.advance().kind, TokenKind::Punct(Punct::Semicolon));
		assert_eq!(lexer.advance().kind, TokenKind::Punct(Punct::CloseBrace));
		assert_eq!(lexer.advance().kind, TokenKind::Eof);
		assert_eq!(lexer.advance().kind, TokenKind::Eof);
	}

	#[test]
	fn peek_is_idempotent() {
		let pool = NamePool::new();
		let mut lexer = Lexer::new(&pool, "test.cob", "a b");
		let first = *lexer.peek();
		assert_eq!(*lexer.peek(), first);
		assert_eq!(lexer.advance(), first);
		assert_ne!(*lexer.peek(), first);
	}

	#[test]
	fn rank_specifiers() {
		assert_eq!(kinds("[]")[0], TokenKind::Rank(1));
		assert_eq!(kinds("[,,]")[0], TokenKind::Rank(3));
		assert_eq!(kinds("[ , ]")[0], TokenKind::Rank(2));
		assert_eq!(kinds("[1]")[0], TokenKind::Punct(Punct::OpenBracket));
	}

	#[test]
	fn maximal_munch_operators() {
		assert_eq!(
			kinds("<<= >> >= = == ++ +="),
			vec![
				TokenKind::Punct(Punct::ShlAssign),
				TokenKind::Punct(Punct::Shr),
				TokenKind::Punct(Punct::GreaterEq),
				TokenKind::Punct(Punct::Assign),
				TokenKind::Punct(Punct::Eq),
				TokenKind::Punct(Punct::Increment),
				TokenKind::Punct(Punct::PlusAssign),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn literals() {
		assert_eq!(kinds("42")[0], TokenKind::Int(42));
		assert_eq!(kinds("0x10")[0], TokenKind::Int(16));
		assert_eq!(kinds("2147483647")[0], TokenKind::Int(i32::MAX));
		// The extra magnitude wraps; the parser decides whether a leading
		// minus made it legal.
		assert_eq!(kinds("2147483648")[0], TokenKind::Int(i32::MIN));
		assert_eq!(kinds("2147483649")[0], TokenKind::Error);
		assert_eq!(kinds("'a'")[0], TokenKind::Char('a'));
		assert_eq!(kinds("'\\n'")[0], TokenKind::Char('\n'));
		assert_eq!(kinds("true")[0], TokenKind::Bool(true));
		let pool = NamePool::new();
		let mut lexer = Lexer::new(&pool, "t", "\"hi\\t\"");
		assert_eq!(lexer.advance().kind, TokenKind::Str(pool.intern("hi\t")));
	}

	#[test]
	fn comments_and_directives_are_transparent() {
		let tokens = kinds("// line\n/* block */ #pragma whatever\nx");
		assert!(matches!(tokens[0], TokenKind::Identifier(_)));
		assert_eq!(tokens[1], TokenKind::Eof);

		let tokens = kinds("    #if DEBUG\nx");
		assert!(matches!(tokens[0], TokenKind::Identifier(_)));
		assert_eq!(tokens[1], TokenKind::Eof);

		// Mid-line `#` after a token is no directive.
		let tokens = kinds("x #pragma");
		assert!(matches!(tokens[0], TokenKind::Identifier(_)));
		assert_eq!(tokens[1], TokenKind::Error);
	}

	#[test]
	fn error_then_eof() {
		let pool = NamePool::new();
		let mut lexer = Lexer::new(&pool, "t", "\"unterminated\nnext");
		assert_eq!(lexer.advance().kind, TokenKind::Error);
		assert_eq!(lexer.advance().kind, TokenKind::Eof);
		assert_eq!(lexer.advance().kind, TokenKind::Eof);
		let diagnostics = lexer.take_diagnostics();
		assert_eq!(diagnostics.len(), 1);
		assert_eq!(diagnostics[0].code, codes::UNTERMINATED_STRING);
	}

	#[test]
	fn tracks_locations() {
		let pool = NamePool::new();
		let mut lexer = Lexer::new(&pool, "t", "a\n  bb");
		let a = lexer.advance();
		assert_eq!((a.range.start_line, a.range.start_col), (1, 1));
		let b = lexer.advance();
		assert_eq!((b.range.start_line, b.range.start_col), (2, 3));
		assert_eq!((b.range.end_line, b.range.end_col), (2, 5));
	}
}
