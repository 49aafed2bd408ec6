use cobalt::ast::{ClassDecl, MethodDecl, TypeDecl};
use cobalt::{Compilation, CompileOptions, CoreLibrary, TokenProvider};

pub fn compile(sources: &[(&str, &str)]) -> Compilation {
	let mut compilation = Compilation::new(CompileOptions::default(), CoreLibrary::new(), TokenProvider::new());
	for (name, text) in sources {
		compilation.add_source(name, text);
	}
	let _ = compilation.resolve();
	compilation
}

pub fn compile_ok(source: &str) -> Compilation {
	let compilation = compile(&[("test.cob", source)]);
	let rendered: Vec<String> =
		compilation.reporter.diagnostics().iter().map(|d| d.render(&compilation.pool)).collect();
	assert!(!compilation.reporter.has_errors(), "unexpected diagnostics: {rendered:?}");
	compilation
}

pub fn compile_err(source: &str) -> Vec<u32> {
	let compilation = compile(&[("test.cob", source)]);
	assert!(compilation.reporter.has_errors(), "expected the build to fail");
	compilation.reporter.diagnostics().iter().map(|d| d.code).collect()
}

pub fn find_class<'a>(compilation: &'a Compilation, name: &str) -> &'a ClassDecl {
	let wanted = compilation.pool.intern(name);
	compilation
		.type_decls()
		.find_map(|decl| match decl {
			TypeDecl::Class(class) if class.name.name == wanted => Some(class),
			_ => None,
		})
		.unwrap_or_else(|| panic!("no class named {name}"))
}

pub fn find_method<'a>(compilation: &Compilation, class: &'a ClassDecl, name: &str) -> &'a MethodDecl {
	let wanted = compilation.pool.intern(name);
	class
		.methods
		.iter()
		.find(|method| method.name.name == wanted)
		.unwrap_or_else(|| panic!("no method named {name}"))
}
