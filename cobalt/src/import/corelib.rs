use fxhash::FxHashMap;

use crate::symbols::TypeGenre;

use super::{ExternalMethod, ExternalProperty, ExternalType, MetadataSource};

/// Built-in description of the system assembly: the types the resolver and
/// the lowering catalog depend on. A real metadata reader would sit behind
/// the same trait.
#[derive(Debug)]
pub struct CoreLibrary {
	types: FxHashMap<String, ExternalType>,
}

fn entry(full_name: &str, genre: TypeGenre, base: Option<&str>) -> ExternalType {
	ExternalType {
		full_name: full_name.to_string(),
		genre,
		is_public: true,
		is_delegate: false,
		base: base.map(str::to_string),
		interfaces: Vec::new(),
		enum_underlying: None,
		fields: Vec::new(),
		methods: Vec::new(),
		properties: Vec::new(),
		nested: Vec::new(),
	}
}

fn class(full_name: &str, base: &str) -> ExternalType {
	entry(full_name, TypeGenre::Class, Some(base))
}

fn value(full_name: &str) -> ExternalType {
	entry(full_name, TypeGenre::Struct, Some("System.ValueType"))
}

fn interface(full_name: &str) -> ExternalType {
	entry(full_name, TypeGenre::Interface, None)
}

fn method(name: &str, ret: &str, params: &[(&str, &str)]) -> ExternalMethod {
	ExternalMethod {
		name: name.to_string(),
		ret: ret.to_string(),
		params: params.iter().map(|(n, s)| (n.to_string(), s.to_string())).collect(),
		is_static: false,
		is_virtual: false,
		special_name: false,
	}
}

fn virtual_method(name: &str, ret: &str, params: &[(&str, &str)]) -> ExternalMethod {
	ExternalMethod { is_virtual: true, ..method(name, ret, params) }
}

fn static_method(name: &str, ret: &str, params: &[(&str, &str)]) -> ExternalMethod {
	ExternalMethod { is_static: true, ..method(name, ret, params) }
}

fn ctor(params: &[(&str, &str)]) -> ExternalMethod {
	ExternalMethod { special_name: true, ..method(".ctor", "System.Void", params) }
}

fn getter(name: &str, sig: &str) -> ExternalProperty {
	ExternalProperty {
		name: name.to_string(),
		sig: sig.to_string(),
		params: Vec::new(),
		has_getter: true,
		has_setter: false,
		is_static: false,
	}
}

impl CoreLibrary {
	pub fn new() -> Self {
		let mut types = Vec::new();

		let mut object = entry("System.Object", TypeGenre::Class, None);
		object.methods = vec![
			ctor(&[]),
			virtual_method("ToString", "System.String", &[]),
			virtual_method("Equals", "System.Boolean", &[("obj", "System.Object")]),
			virtual_method("GetHashCode", "System.Int32", &[]),
		];
		types.push(object);

		types.push(class("System.ValueType", "System.Object"));
		types.push(class("System.Enum", "System.ValueType"));
		types.push(value("System.Void"));
		types.push(value("System.Int32"));
		types.push(value("System.Boolean"));
		types.push(value("System.Char"));
		types.push(value("System.IntPtr"));

		let mut string = class("System.String", "System.Object");
		string.methods = vec![
			static_method("Concat", "System.String", &[("str0", "System.String"), ("str1", "System.String")]),
			static_method("Concat", "System.String", &[("arg0", "System.Object"), ("arg1", "System.Object")]),
			static_method("Concat", "System.String", &[("values", "System.String[]")]),
		];
		string.properties = vec![getter("Length", "System.Int32")];
		types.push(string);

		let mut array = class("System.Array", "System.Object");
		array.methods =
			vec![virtual_method("GetEnumerator", "System.Collections.IEnumerator", &[])];
		array.properties = vec![getter("Length", "System.Int32")];
		array.interfaces = vec!["System.Collections.IEnumerable".to_string()];
		types.push(array);

		let mut delegate = class("System.Delegate", "System.Object");
		delegate.methods = vec![
			static_method("Combine", "System.Delegate", &[("a", "System.Delegate"), ("b", "System.Delegate")]),
			static_method("Remove", "System.Delegate", &[("source", "System.Delegate"), ("value", "System.Delegate")]),
		];
		types.push(delegate);
		types.push(class("System.MulticastDelegate", "System.Delegate"));

		let mut exception = class("System.Exception", "System.Object");
		exception.methods = vec![ctor(&[]), ctor(&[("message", "System.String")])];
		exception.properties = vec![getter("Message", "System.String")];
		types.push(exception);

		let mut system_exception = class("System.SystemException", "System.Exception");
		system_exception.methods = vec![ctor(&[]), ctor(&[("message", "System.String")])];
		types.push(system_exception);
		for name in ["System.NullReferenceException", "System.InvalidCastException"] {
			let mut derived = class(name, "System.SystemException");
			derived.methods = vec![ctor(&[])];
			types.push(derived);
		}

		types.push(class("System.Type", "System.Object"));

		let mut enumerable = interface("System.Collections.IEnumerable");
		enumerable.methods = vec![virtual_method("GetEnumerator", "System.Collections.IEnumerator", &[])];
		types.push(enumerable);

		let mut enumerator = interface("System.Collections.IEnumerator");
		enumerator.methods = vec![
			virtual_method("MoveNext", "System.Boolean", &[]),
			virtual_method("Reset", "System.Void", &[]),
		];
		enumerator.properties = vec![getter("Current", "System.Object")];
		types.push(enumerator);

		CoreLibrary { types: types.into_iter().map(|t| (t.full_name.clone(), t)).collect() }
	}

	/// Extend the library with additional external types; tests use this to
	/// model third-party assemblies.
	pub fn with_types(mut self, extra: impl IntoIterator<Item = ExternalType>) -> Self {
		for ty in extra {
			self.types.insert(ty.full_name.clone(), ty);
		}
		self
	}
}

impl Default for CoreLibrary {
	fn default() -> Self {
		Self::new()
	}
}

impl MetadataSource for CoreLibrary {
	fn find_type(&self, full_name: &str) -> Option<&ExternalType> {
		self.types.get(full_name)
	}

	fn namespaces(&self) -> Vec<String> {
		let mut out: Vec<String> = self
			.types
			.keys()
			.filter_map(|name| name.rsplit_once('.').map(|(ns, _)| ns.to_string()))
			.collect();
		out.sort();
		out.dedup();
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn core_types_are_described() {
		let lib = CoreLibrary::new();
		assert!(lib.find_type("System.Object").is_some());
		assert!(lib.find_type("System.MulticastDelegate").is_some());
		assert!(lib.find_type("System.Missing").is_none());
		assert!(lib.namespaces().contains(&"System.Collections".to_string()));
	}

	#[test]
	fn object_has_no_base() {
		let lib = CoreLibrary::new();
		assert_eq!(lib.find_type("System.Object").unwrap().base, None);
		assert_eq!(lib.find_type("System.String").unwrap().base.as_deref(), Some("System.Object"));
	}
}
