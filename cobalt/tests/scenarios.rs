mod common;

use cobalt::ast::{CtorChainTarget, Expr, LiteralKind, Stmt, TypeDecl};
use cobalt::diagnostics::codes;

use common::{compile, compile_ok, find_class, find_method};

#[test]
fn s1_field_assignment_in_constructor() {
	let compilation = compile_ok("namespace N { class C { int f; public C() { f = 3; } } }");

	// One file root holding namespace N.
	assert_eq!(compilation.program.namespaces.len(), 1);
	let root = &compilation.program.namespaces[0];
	assert_eq!(root.namespaces.len(), 1);
	let n = &root.namespaces[0];
	assert_eq!(n.name.as_ref().unwrap().render(&compilation.pool), "N");

	let class = find_class(&compilation, "C");
	assert_eq!(class.fields.len(), 1);
	let field = class.fields[0].sym.unwrap();
	let field_ty = compilation.symbols.field(field).ty;
	assert_eq!(compilation.symbols.type_display(&compilation.pool, field_ty), "System.Int32");

	let ctor = find_method(&compilation, class, "C");
	assert!(ctor.ret.is_none());
	let chain = ctor.ctor_chain.as_ref().unwrap();
	assert_eq!(chain.target, CtorChainTarget::Base);
	assert!(chain.method.is_some(), "the chain must bind to the base constructor");

	// `f = 3` lowers to an assignment through an implicit-this field access.
	let body = ctor.body.as_ref().unwrap();
	let Stmt::Expr(stmt) = &body.stmts[0] else { panic!("expected the assignment") };
	let Expr::Assign(assign) = &stmt.expr else { panic!("expected an assignment") };
	let Expr::Field(target) = &assign.target else { panic!("expected a field target") };
	assert_eq!(target.field, field);
	assert!(matches!(target.receiver, Some(Expr::This(_))));
	assert!(matches!(&assign.value, Expr::Literal(lit) if lit.kind == LiteralKind::Int(3)));
}

#[test]
fn s2_property_use_lowers_to_accessor_calls() {
	let compilation = compile_ok(
		"class C { public int P { get { return 1; } set { } } }\n\
		 class U { void M() { C c; c = new C(); c.P = c.P + 1; } }",
	);
	let user = find_class(&compilation, "U");
	let method = find_method(&compilation, user, "M");
	let body = method.body.as_ref().unwrap();

	let Stmt::Expr(stmt) = &body.stmts[1] else { panic!("expected the property statement") };
	let Expr::Call(set_call) = &stmt.expr else { panic!("expected c.set_P(...)") };
	let setter = set_call.method.unwrap();
	assert_eq!(compilation.pool.get(compilation.symbols.method(setter).name), "set_P");

	let Expr::Binary(add) = &set_call.args[0] else { panic!("expected c.get_P() + 1") };
	let Expr::Call(get_call) = &add.left else { panic!("expected the getter call") };
	let getter = get_call.method.unwrap();
	assert_eq!(compilation.pool.get(compilation.symbols.method(getter).name), "get_P");
}

#[test]
fn s3_default_event_accessors_and_subscription() {
	let compilation = compile_ok(
		"public delegate void D();\n\
		 class A { public event D E; }\n\
		 class B { void M(A a, D h) { a.E += h; } }",
	);
	let owner = find_class(&compilation, "A");
	let event = owner.events[0].sym.unwrap();
	let entry = compilation.symbols.event(event);
	let backing = entry.backing_field.expect("a private backing field is synthesized");
	assert_eq!(compilation.pool.get(compilation.symbols.field(backing).name), "E");
	let add = entry.add.expect("add_E is synthesized");
	let remove = entry.remove.expect("remove_E is synthesized");
	assert_eq!(compilation.pool.get(compilation.symbols.method(add).name), "add_E");
	assert_eq!(compilation.pool.get(compilation.symbols.method(remove).name), "remove_E");

	let user = find_class(&compilation, "B");
	let body = find_method(&compilation, user, "M").body.as_ref().unwrap();
	let Stmt::Expr(stmt) = &body.stmts[0] else { panic!() };
	let Expr::Call(call) = &stmt.expr else { panic!("expected a.add_E(h)") };
	assert_eq!(call.method.unwrap(), add);
	assert!(matches!(&call.receiver, Some(Expr::Param(_))));
	assert!(matches!(&call.args[0], Expr::Param(_)));
}

#[test]
fn s4_operator_overload_call() {
	let compilation = compile_ok(
		"public struct V { public static V operator+(V a, V b) { return a; } }\n\
		 class U { static V M(V x, V y) { return x + y; } }",
	);
	let user = find_class(&compilation, "U");
	let body = find_method(&compilation, user, "M").body.as_ref().unwrap();
	let Stmt::Return(ret) = &body.stmts[0] else { panic!() };
	let Expr::Call(call) = ret.value.as_ref().unwrap() else { panic!("expected op_Addition(x, y)") };
	let method = call.method.unwrap();
	assert_eq!(compilation.pool.get(compilation.symbols.method(method).name), "op_Addition");
	assert!(compilation.symbols.method(method).is_static);
	assert!(call.receiver.is_none());
	assert_eq!(call.args.len(), 2);
}

#[test]
fn s5_delegate_construction() {
	let compilation = compile_ok(
		"public delegate int D(int x);\n\
		 class C {\n\
		 \tint m(int x) { return x; }\n\
		 \tstatic int s(int x) { return x; }\n\
		 \tD f() { return new D(this.m); }\n\
		 \tstatic D g() { return new D(C.s); }\n\
		 }",
	);
	let class = find_class(&compilation, "C");

	let f = find_method(&compilation, class, "f").body.as_ref().unwrap();
	let Stmt::Return(ret) = &f.stmts[0] else { panic!() };
	let Expr::New(new) = ret.value.as_ref().unwrap() else { panic!("expected new D(...)") };
	assert!(new.ctor.is_some());
	assert!(matches!(&new.args[0], Expr::This(_)));
	let Expr::MethodPtr(ptr) = &new.args[1] else { panic!("expected a method pointer") };
	assert_eq!(compilation.pool.get(compilation.symbols.method(ptr.method).name), "m");

	// A static target passes null for the instance slot.
	let g = find_method(&compilation, class, "g").body.as_ref().unwrap();
	let Stmt::Return(ret) = &g.stmts[0] else { panic!() };
	let Expr::New(new) = ret.value.as_ref().unwrap() else { panic!() };
	assert!(matches!(&new.args[0], Expr::Literal(lit) if lit.kind == LiteralKind::Null));
	let Expr::MethodPtr(ptr) = &new.args[1] else { panic!() };
	assert_eq!(compilation.pool.get(compilation.symbols.method(ptr.method).name), "s");
}

#[test]
fn s6_array_initializer_lowers_to_a_compound() {
	let compilation = compile_ok("class C { static int[] F() { return new int[] { 10, 20, 30 }; } }");
	let class = find_class(&compilation, "C");
	let body = find_method(&compilation, class, "F").body.as_ref().unwrap();
	let Stmt::Return(ret) = &body.stmts[0] else { panic!() };
	let Expr::Compound(compound) = ret.value.as_ref().unwrap() else {
		panic!("expected <declare; allocate; fill; value>")
	};
	assert!(matches!(compound.effects[0], Expr::DeclareLocal(_)));
	let Expr::Assign(alloc) = &compound.effects[1] else { panic!("expected the allocation") };
	let Expr::NewArray(alloc) = &alloc.value else { panic!("expected new int[3]") };
	assert!(matches!(&alloc.lengths[0], Expr::Literal(lit) if lit.kind == LiteralKind::Int(3)));
	for (offset, expected) in [(2, 10), (3, 20), (4, 30)] {
		let Expr::Assign(element) = &compound.effects[offset] else { panic!("expected an element store") };
		assert!(matches!(&element.target, Expr::Index(_)));
		assert!(matches!(&element.value, Expr::Literal(lit) if lit.kind == LiteralKind::Int(expected)));
	}
	assert!(matches!(&compound.value, Expr::Local(_)));
}

#[test]
fn s7_circular_inheritance_reports_and_blocks_later_passes() {
	let compilation = compile(&[("test.cob", "class B : A { }\nclass A : B { }")]);
	let circular: Vec<_> = compilation
		.reporter
		.diagnostics()
		.iter()
		.filter(|d| d.code == codes::CIRCULAR_INHERITANCE)
		.collect();
	assert_eq!(circular.len(), 1, "one report per cycle");

	for decl in compilation.type_decls() {
		let TypeDecl::Class(class) = decl else { panic!() };
		let sym = class.sym.unwrap();
		let entry = compilation.symbols.ty(sym);
		assert!(entry.handle.is_none(), "no runtime handle may be requested inside a cycle");
		assert!(entry.state < cobalt::symbols::TypeState::MembersReady, "pass 3 must not run for cycle members");
	}
}
