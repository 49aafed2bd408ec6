use std::fmt::{Display, Formatter};
use std::io::Write;

use crate::names::{Name, NamePool};

/// Half-open source span. `file` is an interned file name; `NONE` marks
/// diagnostics with no usable location.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FileRange {
	pub file: Name,
	pub start_line: u32,
	pub start_col: u32,
	pub end_line: u32,
	pub end_col: u32,
}

impl FileRange {
	pub const NONE: FileRange = FileRange {
		file: Name::NONE,
		start_line: 0,
		start_col: 0,
		end_line: 0,
		end_col: 0,
	};

	pub fn new(file: Name, start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
		FileRange { file, start_line, start_col, end_line, end_col }
	}

	#[inline]
	pub fn is_none(&self) -> bool {
		self.file.is_none()
	}

	/// Smallest range covering `self` through `other`.
	pub fn through(self, other: FileRange) -> FileRange {
		match (self.is_none(), other.is_none()) {
			(true, _) => other,
			(_, true) => self,
			_ => FileRange {
				file: self.file,
				start_line: self.start_line,
				start_col: self.start_col,
				end_line: other.end_line,
				end_col: other.end_col,
			},
		}
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Severity {
	Warning,
	Error,
}

impl Display for Severity {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Severity::Warning => write!(f, "warning"),
			Severity::Error => write!(f, "error"),
		}
	}
}

/// Diagnostic codes, partitioned by subsystem: general 1000+, lexer 2000+,
/// parser 2100+, resolver 3000+, codegen 5000+.
pub mod codes {
	pub const INTERNAL_ERROR: u32 = 1001;

	pub const UNEXPECTED_CHARACTER: u32 = 2001;
	pub const UNTERMINATED_STRING: u32 = 2002;
	pub const UNTERMINATED_CHAR: u32 = 2003;
	pub const UNTERMINATED_COMMENT: u32 = 2004;
	pub const BAD_ESCAPE: u32 = 2005;
	pub const INT_LITERAL_OVERFLOW: u32 = 2006;

	pub const UNEXPECTED_TOKEN: u32 = 2101;
	pub const EXPECTED_IDENTIFIER: u32 = 2102;
	pub const DUPLICATE_MODIFIER: u32 = 2103;
	pub const CONSTRUCTOR_NAME_MISMATCH: u32 = 2104;
	pub const BAD_ACCESSOR: u32 = 2105;
	pub const BAD_OPERATOR_DECLARATION: u32 = 2106;
	pub const NOT_A_STATEMENT: u32 = 2107;
	pub const BAD_TYPE_SIGNATURE: u32 = 2108;
	pub const BAD_ENUM_VALUE: u32 = 2109;
	pub const LEXICAL_ERROR: u32 = 2110;

	pub const UNDEFINED_SYMBOL: u32 = 3001;
	pub const DUPLICATE_SYMBOL: u32 = 3002;
	pub const CIRCULAR_INHERITANCE: u32 = 3003;
	pub const BAD_BASE_TYPE: u32 = 3004;
	pub const TYPE_MISMATCH: u32 = 3005;
	pub const NO_MATCHING_OVERLOAD: u32 = 3006;
	pub const NOT_A_VALUE: u32 = 3007;
	pub const NOT_CALLABLE: u32 = 3008;
	pub const NO_SUCH_MEMBER: u32 = 3009;
	pub const MISSING_OVERRIDE_TARGET: u32 = 3010;
	pub const INTERFACE_NOT_IMPLEMENTED: u32 = 3011;
	pub const NONPUBLIC_INTERFACE_IMPL: u32 = 3012;
	pub const ABSTRACT_MEMBER_IN_CONCRETE_CLASS: u32 = 3013;
	pub const STRUCT_INSTANCE_INITIALIZER: u32 = 3014;
	pub const EVENT_NOT_A_VALUE: u32 = 3015;
	pub const STATIC_MISMATCH: u32 = 3016;
	pub const NOT_ASSIGNABLE: u32 = 3017;
	pub const NOT_AN_LVALUE: u32 = 3018;
	pub const BREAK_OUTSIDE_LOOP: u32 = 3019;
	pub const UNDEFINED_LABEL: u32 = 3020;
	pub const UNREACHABLE_CATCH: u32 = 3021;
	pub const RETURN_MISMATCH: u32 = 3022;
	pub const CONDITION_NOT_BOOLEAN: u32 = 3023;
	pub const GENERIC_TYPE_REJECTED: u32 = 3024;
	pub const VISIBILITY_MISMATCH: u32 = 3025;
	pub const STRUCT_DEFAULT_CONSTRUCTOR: u32 = 3026;
	pub const BAD_CONSTRUCTOR_CHAIN: u32 = 3027;
	pub const NO_SUCH_OPERATOR: u32 = 3028;
	pub const BAD_CATCH_TYPE: u32 = 3029;
	pub const AMBIGUOUS_ENUMERATOR: u32 = 3030;

	pub const EMIT_FAILURE: u32 = 5001;
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
	pub severity: Severity,
	pub code: u32,
	pub range: FileRange,
	pub message: String,
}

impl Diagnostic {
	pub fn render(&self, pool: &NamePool) -> String {
		match self.range.is_none() {
			true => format!("{} B{}:{}", self.severity, self.code, self.message),
			false => format!(
				"{}({},{}): {} B{}:{}",
				pool.get(self.range.file),
				self.range.start_line,
				self.range.start_col,
				self.severity,
				self.code,
				self.message,
			),
		}
	}
}

/// Marker for "a diagnostic has already been recorded"; pass boundaries
/// catch it and carry on with the next independent unit of work.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ErrorReported;

pub type CompileResult<T> = Result<T, ErrorReported>;

/// Diagnostic sink shared by every subsystem.
#[derive(Debug, Default)]
pub struct Reporter {
	diagnostics: Vec<Diagnostic>,
	errors: usize,
	warnings: usize,
}

impl Reporter {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn error(&mut self, code: u32, range: FileRange, message: String) -> ErrorReported {
		self.errors += 1;
		self.diagnostics.push(Diagnostic { severity: Severity::Error, code, range, message });
		ErrorReported
	}

	pub fn warning(&mut self, code: u32, range: FileRange, message: String) {
		self.warnings += 1;
		self.diagnostics.push(Diagnostic { severity: Severity::Warning, code, range, message });
	}

	/// Catch-all for violated internal invariants; distinct from user errors.
	pub fn internal(&mut self, subsystem: &str, message: String) -> ErrorReported {
		self.error(codes::INTERNAL_ERROR, FileRange::NONE, format!("internal {subsystem} error: {message}"))
	}

	#[inline]
	pub fn has_errors(&self) -> bool {
		self.errors != 0
	}

	#[inline]
	pub fn error_count(&self) -> usize {
		self.errors
	}

	#[inline]
	pub fn warning_count(&self) -> usize {
		self.warnings
	}

	pub fn diagnostics(&self) -> &[Diagnostic] {
		&self.diagnostics
	}

	pub fn summary(&self) -> String {
		fn counted(count: usize, what: &str) -> String {
			match count {
				1 => format!("1 {what}"),
				n => format!("{n} {what}s"),
			}
		}
		format!("{}, {}", counted(self.errors, "error"), counted(self.warnings, "warning"))
	}

	pub fn write_all(&self, pool: &NamePool, out: &mut dyn Write) -> std::io::Result<()> {
		for diagnostic in &self.diagnostics {
			writeln!(out, "{}", diagnostic.render(pool))?;
		}
		writeln!(out, "{}", self.summary())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_with_and_without_location() {
		let pool = NamePool::new();
		let file = pool.intern("a.cob");
		let mut reporter = Reporter::new();
		reporter.error(codes::UNDEFINED_SYMBOL, FileRange::new(file, 3, 7, 3, 9), "undefined symbol 'x'".into());
		reporter.warning(codes::UNREACHABLE_CATCH, FileRange::NONE, "unreachable".into());

		let rendered: Vec<_> = reporter.diagnostics().iter().map(|d| d.render(&pool)).collect();
		assert_eq!(rendered[0], "a.cob(3,7): error B3001:undefined symbol 'x'");
		assert_eq!(rendered[1], "warning B3021:unreachable");
	}

	#[test]
	fn summary_pluralizes() {
		let mut reporter = Reporter::new();
		assert_eq!(reporter.summary(), "0 errors, 0 warnings");
		reporter.error(codes::TYPE_MISMATCH, FileRange::NONE, "x".into());
		reporter.warning(codes::UNREACHABLE_CATCH, FileRange::NONE, "y".into());
		assert_eq!(reporter.summary(), "1 error, 1 warning");
	}

	#[test]
	fn ranges_merge() {
		let a = FileRange::new(Name::NONE, 0, 0, 0, 0);
		assert!(a.is_none());
		let pool = NamePool::new();
		let file = pool.intern("a.cob");
		let b = FileRange::new(file, 1, 1, 1, 4);
		let c = FileRange::new(file, 2, 1, 2, 9);
		assert_eq!(b.through(c), FileRange::new(file, 1, 1, 2, 9));
		assert_eq!(FileRange::NONE.through(c), c);
	}
}
