use std::cell::RefCell;
use std::pin::Pin;

use bumpalo::Bump;
use derivative::Derivative;
use fxhash::FxHashMap;
use nohash_hasher::IsEnabled;

/// Dense id of an interned identifier. All name comparisons in the symbol
/// engine are id comparisons.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
	pub const NONE: Name = Name(u32::MAX);

	#[inline]
	pub fn index(self) -> usize {
		self.0 as usize
	}

	#[inline]
	pub fn is_none(self) -> bool {
		self.0 == u32::MAX
	}
}

impl IsEnabled for Name {}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct NamePool {
	#[derivative(Debug = "ignore")]
	bump: Pin<Box<Bump>>,
	#[derivative(Debug = "ignore")]
	map: RefCell<FxHashMap<&'static str, Name>>,
	#[derivative(Debug(format_with = "NamePool::fmt_names"))]
	names: RefCell<Vec<&'static str>>,
}

impl NamePool {
	pub fn new() -> Self {
		NamePool {
			bump: Pin::new(Box::new(Bump::new())),
			map: Default::default(),
			names: Default::default(),
		}
	}

	pub fn intern(&self, text: &str) -> Name {
		let mut map = self.map.borrow_mut();
		if let Some(name) = map.get(text) {
			return *name;
		}
		// The bump is pinned and never reset; every allocated string lives
		// as long as the pool itself.
		let stored = unsafe { std::mem::transmute::<&str, &'static str>(self.bump.alloc_str(text)) };
		let mut names = self.names.borrow_mut();
		let name = Name(names.len() as u32);
		names.push(stored);
		map.insert(stored, name);
		name
	}

	pub fn get(&self, name: Name) -> &str {
		match name.is_none() {
			true => "",
			false => self.names.borrow()[name.index()],
		}
	}

	pub fn len(&self) -> usize {
		self.names.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.borrow().is_empty()
	}

	fn fmt_names(names: &RefCell<Vec<&'static str>>, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
		let names = names.borrow();
		let header = format!("[{}]", names.len());
		let mut dbg = fmt.debug_list();
		dbg.entry(&format_args!("{header}"));
		dbg.finish()
	}
}

impl Default for NamePool {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn interning_is_idempotent() {
		let pool = NamePool::new();
		let a = pool.intern("Console");
		let b = pool.intern("Console");
		let c = pool.intern("console");
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(pool.get(a), "Console");
		assert_eq!(pool.get(c), "console");
	}

	#[test]
	fn none_name_renders_empty() {
		let pool = NamePool::new();
		assert_eq!(pool.get(Name::NONE), "");
	}
}
