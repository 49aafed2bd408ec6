use bitflags::bitflags;

bitflags! {
	#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct Modifiers: u32 {
		const PUBLIC = 1 << 0;
		const PRIVATE = 1 << 1;
		const PROTECTED = 1 << 2;
		const INTERNAL = 1 << 3;
		const STATIC = 1 << 4;
		const VIRTUAL = 1 << 5;
		const OVERRIDE = 1 << 6;
		const ABSTRACT = 1 << 7;
		const SEALED = 1 << 8;
		const NEW = 1 << 9;
		const READONLY = 1 << 10;
		const CONST = 1 << 11;
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModifierError {
	Duplicate(&'static str),
	Conflict(&'static str, &'static str),
}

impl Modifiers {
	pub const VISIBILITY: Modifiers =
		Modifiers::PUBLIC.union(Modifiers::PRIVATE).union(Modifiers::PROTECTED).union(Modifiers::INTERNAL);

	/// Add one modifier, rejecting repeats and contradictory combinations
	/// at set time.
	pub fn add(&mut self, flag: Modifiers) -> Result<(), ModifierError> {
		if self.contains(flag) {
			return Err(ModifierError::Duplicate(name_of(flag)));
		}
		if Modifiers::VISIBILITY.contains(flag) && self.visibility_set() {
			return Err(ModifierError::Conflict(name_of(flag), name_of(self.visibility())));
		}
		let conflicts: &[(Modifiers, Modifiers)] = &[
			(Modifiers::VIRTUAL, Modifiers::OVERRIDE),
			(Modifiers::VIRTUAL, Modifiers::STATIC),
			(Modifiers::ABSTRACT, Modifiers::SEALED),
			(Modifiers::ABSTRACT, Modifiers::STATIC),
			(Modifiers::OVERRIDE, Modifiers::STATIC),
			(Modifiers::OVERRIDE, Modifiers::NEW),
			(Modifiers::READONLY, Modifiers::CONST),
		];
		for (a, b) in conflicts {
			let (a, b) = (*a, *b);
			if (flag == a && self.contains(b)) || (flag == b && self.contains(a)) {
				return Err(ModifierError::Conflict(name_of(flag), name_of(if flag == a { b } else { a })));
			}
		}
		self.insert(flag);
		Ok(())
	}

	#[inline]
	pub fn visibility_set(&self) -> bool {
		self.intersects(Modifiers::VISIBILITY)
	}

	#[inline]
	pub fn visibility(&self) -> Modifiers {
		self.intersection(Modifiers::VISIBILITY)
	}

	#[inline]
	pub fn is_static(&self) -> bool {
		self.contains(Modifiers::STATIC)
	}

	#[inline]
	pub fn is_public(&self) -> bool {
		self.contains(Modifiers::PUBLIC)
	}

	/// Default visibility applies when no visibility modifier was written.
	pub fn or_private(self) -> Modifiers {
		match self.visibility_set() {
			true => self,
			false => self | Modifiers::PRIVATE,
		}
	}
}

fn name_of(flag: Modifiers) -> &'static str {
	const NAMES: &[(Modifiers, &str)] = &[
		(Modifiers::PUBLIC, "public"),
		(Modifiers::PRIVATE, "private"),
		(Modifiers::PROTECTED, "protected"),
		(Modifiers::INTERNAL, "internal"),
		(Modifiers::STATIC, "static"),
		(Modifiers::VIRTUAL, "virtual"),
		(Modifiers::OVERRIDE, "override"),
		(Modifiers::ABSTRACT, "abstract"),
		(Modifiers::SEALED, "sealed"),
		(Modifiers::NEW, "new"),
		(Modifiers::READONLY, "readonly"),
		(Modifiers::CONST, "const"),
	];
	NAMES.iter().find(|(candidate, _)| *candidate == flag).map(|(_, name)| *name).unwrap_or("modifier")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_duplicates_and_conflicts() {
		let mut m = Modifiers::default();
		m.add(Modifiers::PUBLIC).unwrap();
		assert_eq!(m.add(Modifiers::PUBLIC), Err(ModifierError::Duplicate("public")));
		assert_eq!(m.add(Modifiers::PRIVATE), Err(ModifierError::Conflict("private", "public")));
		m.add(Modifiers::VIRTUAL).unwrap();
		assert_eq!(m.add(Modifiers::OVERRIDE), Err(ModifierError::Conflict("override", "virtual")));
	}

	#[test]
	fn default_visibility_is_private() {
		let mut m = Modifiers::default();
		assert!(!m.visibility_set());
		assert_eq!(m.or_private().visibility(), Modifiers::PRIVATE);
		m.add(Modifiers::PUBLIC).unwrap();
		assert_eq!(m.or_private().visibility(), Modifiers::PUBLIC);
	}
}
