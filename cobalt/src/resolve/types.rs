use nohash_hasher::IntMap;
use tracing::debug;

use crate::ast::TypeDecl;
use crate::diagnostics::codes;
use crate::symbols::{TypeGenre, TypeId, TypeShape, TypeState};

use super::Compilation;

#[derive(Copy, Clone, Eq, PartialEq)]
enum Mark {
	Visiting,
	Done,
}

impl Compilation {
	/// Pass 2: resolve supertype signatures, enforce genre rules, detect
	/// inheritance cycles, then acquire runtime handles and register every
	/// clean type in the full-name map.
	#[tracing::instrument(skip_all)]
	pub(crate) fn pass2_types(&mut self) {
		for index in 0..self.type_decls.len() {
			let Some(mut decl) = self.type_decls[index].take() else { continue };
			self.link_type(&mut decl);
			self.type_decls[index] = Some(decl);
		}

		self.check_inheritance_cycles();

		for index in 0..self.type_decls.len() {
			let Some(ty) = self.type_decls[index].as_ref().and_then(TypeDecl::sym) else { continue };
			if self.poisoned.contains(&ty) {
				continue;
			}
			let handle = match self.symbols.ty(ty).shape {
				TypeShape::Enum { .. } => self.provider.create_enum_type_handle(&self.symbols, ty),
				_ => self.provider.create_type_handle(&self.symbols, ty),
			};
			self.symbols.ty_mut(ty).handle = Some(handle);
			let full_name = self.pool.get(self.symbols.ty(ty).full_name).to_string();
			self.importer.register_user_type(full_name, ty);
		}
	}

	/// Set the super-link and interface links for one declaration. Errors
	/// leave the default supertype in place so later passes can limp on.
	fn link_type(&mut self, decl: &mut TypeDecl) {
		let Some(ty) = decl.sym() else { return };
		let scope = self.symbols.ty(ty).scope.expect("pass 1 created the member scope");

		let class = match decl {
			TypeDecl::Enum(_) => {
				let entry = self.symbols.ty_mut(ty);
				entry.base = Some(self.well_known.enum_base);
				entry.state = TypeState::Linked;
				return;
			}
			TypeDecl::Class(class) => class,
		};

		let genre = class.genre;
		let mut base: Option<TypeId> = None;
		let mut interfaces = Vec::new();
		let bases = class.bases.clone();
		for sig in &bases {
			let Ok(resolved) = self.resolve_type_sig(scope, sig) else { continue };
			let resolved_genre = self.symbols.ty(resolved).genre;
			match resolved_genre {
				TypeGenre::Interface => interfaces.push(resolved),
				TypeGenre::Class if genre == TypeGenre::Class => match base {
					None => base = Some(resolved),
					Some(_) => {
						let rendered = self.type_name(resolved);
						self.reporter.error(
							codes::BAD_BASE_TYPE,
							sig.range(),
							format!("'{rendered}' cannot be a second base class"),
						);
					}
				},
				_ => {
					let rendered = self.type_name(resolved);
					let message = match genre {
						TypeGenre::Class => format!("'{rendered}' cannot be a base class"),
						_ => format!("'{rendered}' is not an interface"),
					};
					self.reporter.error(codes::BAD_BASE_TYPE, sig.range(), message);
				}
			}
		}

		let base = match (genre, base) {
			(TypeGenre::Class, Some(base)) => Some(base),
			(TypeGenre::Class, None) if class.is_delegate => Some(self.well_known.multicast),
			(TypeGenre::Class, None) => Some(self.well_known.object),
			(TypeGenre::Struct, _) => Some(self.well_known.value_type),
			(TypeGenre::Interface, _) => None,
		};

		let entry = self.symbols.ty_mut(ty);
		entry.base = base;
		entry.interfaces = interfaces;
		entry.state = TypeState::Linked;
		debug!(name = self.pool.get(self.symbols.ty(ty).full_name), "linked type");
	}

	/// Depth-first sweep over the super-graph. Every type on a cycle is
	/// poisoned; the cycle reports once and no handle is requested for any
	/// of its members.
	fn check_inheritance_cycles(&mut self) {
		let roots: Vec<TypeId> =
			self.type_decls.iter().filter_map(|slot| slot.as_ref().and_then(TypeDecl::sym)).collect();
		let mut marks: IntMap<TypeId, Mark> = Default::default();
		let mut stack = Vec::new();
		for ty in roots {
			self.visit_for_cycles(ty, &mut marks, &mut stack);
		}
	}

	fn visit_for_cycles(&mut self, ty: TypeId, marks: &mut IntMap<TypeId, Mark>, stack: &mut Vec<TypeId>) {
		match marks.get(&ty) {
			Some(Mark::Done) => return,
			Some(Mark::Visiting) => {
				let position = stack.iter().position(|t| *t == ty).unwrap_or(0);
				let members: Vec<TypeId> = stack[position..].to_vec();
				if !self.poisoned.contains(&ty) {
					let rendered = self.type_name(ty);
					let range = self
						.decl_index
						.get(&ty)
						.and_then(|index| self.type_decls[*index as usize].as_ref())
						.map(|decl| decl.range())
						.unwrap_or(crate::diagnostics::FileRange::NONE);
					self.reporter.error(
						codes::CIRCULAR_INHERITANCE,
						range,
						format!("'{rendered}' is part of a circular inheritance chain"),
					);
				}
				for member in members {
					self.poisoned.insert(member);
				}
				return;
			}
			None => {}
		}
		if self.symbols.ty(ty).imported {
			marks.insert(ty, Mark::Done);
			return;
		}
		marks.insert(ty, Mark::Visiting);
		stack.push(ty);
		let mut edges = Vec::new();
		if let Some(base) = self.symbols.ty(ty).base {
			edges.push(base);
		}
		edges.extend(self.symbols.ty(ty).interfaces.iter().copied());
		for edge in edges {
			self.visit_for_cycles(edge, marks, stack);
		}
		stack.pop();
		marks.insert(ty, Mark::Done);
	}
}
