// Integration tests for the Bob interpreter.
//
// These tests run complete Bob programs through the lexer, parser, and
// interpreter, capturing print output through the interpreter's sink.
// Coverage: arithmetic and promotion, scoping and closures, control flow,
// classes with inheritance and super, extensions and overloads, tail calls,
// error handling, and the module system.

use bob::errors::RuntimeError;
use bob::interpreter::{Interpreter, Value};
use bob::lexer::Lexer;
use bob::parser::Parser;
use bob::stdlib;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

fn unique_dir(prefix: &str) -> std::path::PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("bob_{}_{}_{}", prefix, std::process::id(), id));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn run_named(code: &str, file_name: &str) -> (Interpreter, String, Result<(), RuntimeError>) {
    let mut interp = Interpreter::new(false);
    stdlib::install_stdlib(&mut interp);
    let sink = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Rc::clone(&sink));

    let reporter = interp.error_reporter();
    reporter.borrow_mut().load_source(code, file_name);
    let mut lexer = Lexer::new();
    lexer.set_error_reporter(Rc::clone(&reporter));
    let tokens = lexer.tokenize(code);
    let mut parser = Parser::new(tokens);
    parser.set_error_reporter(Rc::clone(&reporter));
    let program = parser.parse();

    let result = interp.interpret(&program);
    let output = String::from_utf8(sink.borrow().clone()).expect("output should be utf-8");
    (interp, output, result)
}

fn run_code(code: &str) -> (Interpreter, String, Result<(), RuntimeError>) {
    run_named(code, "<test>")
}

fn output_of(code: &str) -> String {
    let (_, output, result) = run_code(code);
    assert!(result.is_ok(), "program failed: {:?}", result.err());
    output
}

fn lines_of(code: &str) -> Vec<String> {
    output_of(code).lines().map(str::to_string).collect()
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(output_of("var a = 2; var b = 3; print(a + b * 4);"), "14\n");
}

#[test]
fn fibonacci_recursion() {
    let code = "func f(n){ if (n<=1) return n; return f(n-1)+f(n-2); } print(f(10));";
    assert_eq!(output_of(code), "55\n");
}

#[test]
fn tail_recursive_sum_runs_in_bounded_stack() {
    let code = "func sum(n,acc){ if (n==0) return acc; return sum(n-1, acc+n); } \
                print(sum(100000, 0));";
    assert_eq!(output_of(code), "5000050000\n");
}

#[test]
fn mutual_tail_recursion() {
    let code = "func even(n){ if (n==0) return true; return odd(n-1); } \
                func odd(n){ if (n==0) return false; return even(n-1); } \
                print(even(50000));";
    assert_eq!(output_of(code), "true\n");
}

#[test]
fn class_inheritance_and_super() {
    let code = r#"
        class A { func greet(){ return "a"; } }
        class B extends A { func greet(){ return "b-" + super.greet(); } }
        print((B()).greet());
    "#;
    assert_eq!(output_of(code), "b-a\n");
}

#[test]
fn super_dispatches_through_grandparent() {
    let code = r#"
        class A { func name(){ return "a"; } }
        class B extends A { func name(){ return "b<" + super.name() + ">"; } }
        class C extends B { }
        var c = C();
        print(c.name());
    "#;
    assert_eq!(output_of(code), "b<a>\n");
}

#[test]
fn try_catch_finally_ordering() {
    let code = r#"try { throw "x"; } catch (e) { print("got " + e); } finally { print("done"); }"#;
    assert_eq!(lines_of(code), vec!["got x", "done"]);
}

#[test]
fn dict_keys_len() {
    let code = r#"var d = {"a": 1}; d["b"] = 2; print(d.keys().len);"#;
    assert_eq!(output_of(code), "2\n");
}

#[test]
fn integer_overflow_promotes_to_bigint() {
    assert_eq!(output_of("print(9223372036854775807 + 1);"), "9223372036854775808\n");
    assert_eq!(output_of("var n = 9223372036854775807; n++; print(n);"), "9223372036854775808\n");
    assert_eq!(output_of("print(-(9223372036854775807 + 1) - 1);"), "-9223372036854775809\n");
}

#[test]
fn bigint_literals_and_arithmetic() {
    assert_eq!(
        output_of("print(99999999999999999999 + 1);"),
        "100000000000000000000\n"
    );
    assert_eq!(output_of("print(99999999999999999999 == 99999999999999999999);"), "true\n");
}

#[test]
fn number_widening_and_float_formatting() {
    assert_eq!(output_of("print(1 + 0.5);"), "1.5\n");
    assert_eq!(output_of("print(3.0);"), "3\n");
    assert_eq!(output_of("print(7 / 2.0);"), "3.5\n");
    assert_eq!(output_of("print(7 / 2);"), "3\n");
}

#[test]
fn string_concat_repeat_and_index() {
    assert_eq!(output_of(r#"print("n=" + 5);"#), "n=5\n");
    assert_eq!(output_of(r#"print(5 + "!");"#), "5!\n");
    assert_eq!(output_of(r#"print("ab" * 3);"#), "ababab\n");
    assert_eq!(output_of(r#"print("hello"[1]);"#), "e\n");
    assert_eq!(output_of(r#"print("hello"[-1]);"#), "o\n");
}

#[test]
fn logical_operators_return_deciding_operand() {
    assert_eq!(output_of(r#"print(0 || "x");"#), "x\n");
    assert_eq!(output_of("print(1 && 2);"), "2\n");
    assert_eq!(output_of("print(0 && 2);"), "0\n");
    assert_eq!(output_of(r#"print("" or "fallback");"#), "fallback\n");
    // Short circuit: the right side must not run.
    let code = r#"
        func boom(){ throw "ran"; }
        print(false && boom());
        print(true || boom());
    "#;
    assert_eq!(lines_of(code), vec!["false", "true"]);
}

#[test]
fn ternary_evaluates_one_branch() {
    let code = r#"
        func boom(){ throw "ran"; }
        print(1 < 2 ? "yes" : boom());
    "#;
    assert_eq!(output_of(code), "yes\n");
}

#[test]
fn shared_containers_alias() {
    let code = "var a = [1]; var b = a; push(b, 2); print(len(a));";
    assert_eq!(output_of(code), "2\n");
    let code = r#"var d = {"k": 1}; var e = d; e["k"] = 5; print(d["k"]);"#;
    assert_eq!(output_of(code), "5\n");
}

#[test]
fn dict_missing_key_reads_none() {
    assert_eq!(output_of(r#"var d = {}; print(d["nope"]);"#), "none\n");
    assert_eq!(output_of(r#"var d = {}; d["k"] = 7; print(d["k"]);"#), "7\n");
}

#[test]
fn closures_capture_frame_with_pruned_containers() {
    // Scalars copy through; arrays and dicts in the captured frame are
    // replaced with fresh empty containers.
    let code = r#"
        var n = 10;
        var arr = [1, 2, 3];
        var f = func(){ return n + arr.len; };
        print(f());
    "#;
    assert_eq!(output_of(code), "10\n");
}

#[test]
fn closures_keep_scalar_bindings() {
    let code = r#"
        func make_adder(k){ return func(x){ return x + k; }; }
        var add5 = make_adder(5);
        print(add5(3));
    "#;
    assert_eq!(output_of(code), "8\n");
}

#[test]
fn loops_and_control_flow() {
    let code = r#"
        var total = 0;
        for (var i = 0; i < 10; i++) {
            if (i == 3) continue;
            if (i == 7) break;
            total += i;
        }
        print(total);
    "#;
    // 0+1+2+4+5+6 = 18
    assert_eq!(output_of(code), "18\n");

    let code = r#"
        var i = 0;
        do { i++; } while (i < 5);
        print(i);
    "#;
    assert_eq!(output_of(code), "5\n");

    let code = r#"
        var n = 3;
        while (n > 0) { n--; }
        print(n);
    "#;
    assert_eq!(output_of(code), "0\n");
}

#[test]
fn foreach_iterates_arrays_dict_keys_and_strings() {
    let code = r#"
        foreach (x in [1, 2, 3]) { printRaw(x); }
        print("");
        foreach (k in {"a": 1, "b": 2}) { printRaw(k); }
        print("");
        foreach (c in "hey") { printRaw(c); }
        print("");
    "#;
    assert_eq!(lines_of(code), vec!["123", "ab", "hey"]);
}

#[test]
fn foreach_respects_break_and_return() {
    let code = r#"
        func first_even(items) {
            foreach (x in items) {
                if (x % 2 == 0) return x;
            }
            return none;
        }
        print(first_even([3, 5, 8, 9]));
    "#;
    assert_eq!(output_of(code), "8\n");
}

#[test]
fn increment_prefix_and_postfix() {
    let code = r#"
        var x = 5;
        print(x++);
        print(x);
        print(++x);
        var a = [10];
        a[0]++;
        print(a[0]);
    "#;
    assert_eq!(lines_of(code), vec!["5", "6", "7", "11"]);
}

#[test]
fn compound_assignment_operators() {
    let code = r#"
        var x = 8;
        x += 2; print(x);
        x -= 1; print(x);
        x *= 3; print(x);
        x /= 9; print(x);
        x <<= 4; print(x);
        x >>= 2; print(x);
    "#;
    assert_eq!(lines_of(code), vec!["10", "9", "27", "3", "48", "12"]);
}

#[test]
fn bitwise_operators() {
    let code = "print(6 & 3); print(6 | 3); print(6 ^ 3); print(1 << 10); print(~0);";
    assert_eq!(lines_of(code), vec!["2", "7", "5", "1024", "-1"]);
}

#[test]
fn class_fields_and_init_constructor() {
    let code = r#"
        class Point {
            var x = 0;
            var y = 0;
            func init(a, b) { this.x = a; this.y = b; }
            func sum() { return this.x + this.y; }
        }
        var p = Point(3, 4);
        print(p.sum());
        print(p.x);
    "#;
    assert_eq!(lines_of(code), vec!["7", "3"]);
}

#[test]
fn class_field_defaults_without_init() {
    let code = r#"
        class Counter { var count = 100; }
        var c = Counter();
        print(c.count);
        c.count = 7;
        print(c.count);
    "#;
    assert_eq!(lines_of(code), vec!["100", "7"]);
}

#[test]
fn inherited_fields_merge_parent_first() {
    let code = r#"
        class Base { var kind = "base"; var shared = 1; }
        class Child extends Base { var kind = "child"; }
        var c = Child();
        print(c.kind);
        print(c.shared);
    "#;
    assert_eq!(lines_of(code), vec!["child", "1"]);
}

#[test]
fn method_overloads_select_by_arity() {
    let code = r#"
        class Vec {
            var x = 1;
            func scale(k) { return this.x * k; }
            func scale(k, extra) { return this.x * k + extra; }
        }
        var v = Vec();
        print(v.scale(10));
        print(v.scale(10, 5));
    "#;
    assert_eq!(lines_of(code), vec!["10", "15"]);
}

#[test]
fn extension_methods_on_builtin_targets() {
    let code = r#"
        extension string {
            func shout() { return this + "!"; }
        }
        extension number {
            func doubled() { return this * 2; }
        }
        print("hi".shout());
        print(21.doubled());
    "#;
    assert_eq!(lines_of(code), vec!["hi!", "42"]);
}

#[test]
fn extension_methods_on_classes() {
    let code = r#"
        class Robot { var id = 9; }
        extension Robot {
            func describe() { return "robot-" + this.id; }
        }
        var r = Robot();
        print(r.describe());
    "#;
    assert_eq!(output_of(code), "robot-9\n");
}

#[test]
fn builtin_container_methods_and_properties() {
    let code = r#"
        var a = [1, 2, 3];
        print(a.len);
        print(a.first);
        print(a.last);
        a.push(4);
        print(a.len);
        print(a.pop());
        var d = {"k": 1};
        print(d.has("k"));
        print(d.has("missing"));
        print("abc".len);
        print(3.9.toInt());
    "#;
    assert_eq!(
        lines_of(code),
        vec!["3", "1", "3", "4", "4", "true", "false", "3", "3"]
    );
}

#[test]
fn native_errors_are_catchable() {
    let code = r#"
        try { var x = 1 / 0; } catch (e) { print("caught " + e); }
        try { var a = [1]; print(a[5]); } catch (e) { print("caught " + e); }
        try { print(missing_var); } catch (e) { print("caught " + e); }
    "#;
    assert_eq!(
        lines_of(code),
        vec![
            "caught Division by zero",
            "caught Array index out of bounds",
            "caught Undefined variable 'missing_var'",
        ]
    );
}

#[test]
fn modulo_by_zero_is_catchable() {
    let code = r#"try { var x = 5 % 0; } catch (e) { print(e); }"#;
    assert_eq!(output_of(code), "Modulo by zero\n");
}

#[test]
fn finally_supersedes_pending_transfer() {
    let code = r#"
        func f() {
            try { return 1; } finally { return 2; }
        }
        print(f());
    "#;
    assert_eq!(output_of(code), "2\n");
}

#[test]
fn finally_runs_on_uncaught_throw() {
    let code = r#"
        func f() {
            try {
                try { throw "inner"; } finally { print("cleanup"); }
            } catch (e) {
                print("outer caught " + e);
            }
        }
        f();
    "#;
    assert_eq!(lines_of(code), vec!["cleanup", "outer caught inner"]);
}

#[test]
fn throw_propagates_through_calls() {
    let code = r#"
        func inner() { throw "deep"; }
        func middle() { inner(); return "unreachable"; }
        try { middle(); } catch (e) { print("caught " + e); }
    "#;
    assert_eq!(output_of(code), "caught deep\n");
}

#[test]
fn uncaught_throw_fails_the_program() {
    let (_, _, result) = run_code(r#"throw "boom";"#);
    let error = result.expect_err("uncaught throw should fail");
    assert!(error.message.contains("boom"));
}

#[test]
fn assert_failure_is_catchable() {
    let code = r#"try { assert(false, "invariant"); } catch (e) { print(e); }"#;
    assert_eq!(output_of(code), "condition is false - invariant\n");
    let (_, output, result) = run_code("assert(1 == 1); print(\"ok\");");
    assert!(result.is_ok());
    assert_eq!(output, "ok\n");
}

#[test]
fn stdlib_conversions() {
    let code = r#"
        print(toString(42) + "!");
        print(toNumber("3.5"));
        print(toNumber("nope"));
        print(toInt(3.9));
        print(toBoolean(""));
        print(toBoolean([1]));
        print(type(1));
        print(type(1.5));
        print(type("s"));
        print(type(none));
    "#;
    assert_eq!(
        lines_of(code),
        vec!["42!", "3.5", "none", "3", "false", "true", "integer", "number", "string", "none"]
    );
}

#[test]
fn eval_runs_in_current_scope() {
    let code = r#"
        eval("var z = 40;");
        print(z + 2);
    "#;
    assert_eq!(output_of(code), "42\n");
}

#[test]
fn variable_reassignment_compacts_registries() {
    let code = r#"
        var f = func(){ return 1; };
        f = func(){ return 2; };
        print(f());
    "#;
    assert_eq!(output_of(code), "2\n");
}

#[test]
fn undefined_assignment_fails() {
    let (_, _, result) = run_code("ghost = 1;");
    let error = result.expect_err("assignment to undefined should fail");
    assert!(error.message.contains("Undefined variable 'ghost'"));
}

#[test]
fn equality_follows_value_semantics() {
    let code = r#"
        print([1, 2] == [1, 2]);
        print({"a": 1} == {"a": 1});
        print({"a": 1} == {"a": 2});
        print(1 == 1.0);
        print(0 == false);
        print(none == false);
        print("1" == 1);
    "#;
    assert_eq!(
        lines_of(code),
        vec!["true", "true", "false", "true", "true", "false", "false"]
    );
}

#[test]
fn dict_iteration_follows_insertion_order() {
    let code = r#"
        var d = {"first": 1, "second": 2, "third": 3};
        d["fourth"] = 4;
        foreach (k in d) { print(k); }
    "#;
    assert_eq!(lines_of(code), vec!["first", "second", "third", "fourth"]);
}

#[test]
fn stringification_of_containers() {
    let code = r#"
        print([1, "a", true, none]);
        print({"k": [1, 2]});
        print(3.25);
    "#;
    assert_eq!(lines_of(code), vec!["[1, a, true, none]", "{\"k\": [1, 2]}", "3.25"]);
}

// Module system

#[test]
fn file_modules_import_and_cache() {
    let dir = unique_dir("modules");
    std::fs::write(
        dir.join("util.bob"),
        "print(\"loaded\");\nvar half = 21;\nfunc twice(x){ return x * 2; }\n",
    )
    .expect("failed to write module");
    let main_path = dir.join("main.bob");

    let code = r#"
        import util;
        print(util.twice(util.half));
        import util;
        import util as u2;
        print(u2.half);
    "#;
    let (_, output, result) = run_named(code, &main_path.to_string_lossy());
    assert!(result.is_ok(), "program failed: {:?}", result.err());
    // The module body runs exactly once despite three imports.
    assert_eq!(output.lines().collect::<Vec<_>>(), vec!["loaded", "42", "21"]);
}

#[test]
fn from_import_binds_names_and_aliases() {
    let dir = unique_dir("from_import");
    std::fs::write(dir.join("shapes.bob"), "func area(w, h){ return w * h; }\nvar sides = 4;\n")
        .expect("failed to write module");
    let main_path = dir.join("main.bob");

    let code = r#"
        from shapes import area, sides as n;
        print(area(3, n));
    "#;
    let (_, output, result) = run_named(code, &main_path.to_string_lossy());
    assert!(result.is_ok(), "program failed: {:?}", result.err());
    assert_eq!(output, "12\n");
}

#[test]
fn from_import_star_binds_every_export() {
    let dir = unique_dir("star_import");
    std::fs::write(dir.join("consts.bob"), "var alpha = 1;\nvar beta = 2;\n")
        .expect("failed to write module");
    let main_path = dir.join("main.bob");

    let code = "from consts import *;\nprint(alpha + beta);\n";
    let (_, output, result) = run_named(code, &main_path.to_string_lossy());
    assert!(result.is_ok(), "program failed: {:?}", result.err());
    assert_eq!(output, "3\n");
}

#[test]
fn relative_path_imports_resolve_against_importer() {
    let dir = unique_dir("relative");
    std::fs::create_dir_all(dir.join("lib")).expect("failed to create lib dir");
    std::fs::write(dir.join("lib/helper.bob"), "var marker = \"from-lib\";\n")
        .expect("failed to write module");
    let main_path = dir.join("main.bob");

    let code = r#"
        import "./lib/helper.bob" as helper;
        print(helper.marker);
    "#;
    let (_, output, result) = run_named(code, &main_path.to_string_lossy());
    assert!(result.is_ok(), "program failed: {:?}", result.err());
    assert_eq!(output, "from-lib\n");
}

#[test]
fn missing_module_and_missing_name_fail() {
    let (_, _, result) = run_code("import definitely_not_a_module;");
    let error = result.expect_err("missing module should fail");
    assert!(error.message.contains("Module not found"));

    let dir = unique_dir("missing_name");
    std::fs::write(dir.join("m.bob"), "var present = 1;\n").expect("failed to write module");
    let main_path = dir.join("main.bob");
    let (_, _, result) = run_named("from m import absent;", &main_path.to_string_lossy());
    let error = result.expect_err("missing name should fail");
    assert!(error.message.contains("Name not found in module: absent"));
}

#[test]
fn builtin_math_module() {
    let code = r#"
        import math;
        print(math.floor(3.7));
        print(math.pow(2, 10));
        print(math.max(1, 9, 4));
        print(math.pi > 3.14 && math.pi < 3.15);
    "#;
    assert_eq!(lines_of(code), vec!["3", "1024", "9", "true"]);
}

#[test]
fn builtin_random_module_is_seedable() {
    let code = r#"
        import random;
        random.seed(42);
        var a = random.randint(0, 1000000);
        random.seed(42);
        var b = random.randint(0, 1000000);
        print(a == b);
        var c = random.choice([7]);
        print(c);
    "#;
    assert_eq!(lines_of(code), vec!["true", "7"]);
}

#[test]
fn builtin_json_module_round_trip() {
    let code = r#"
        import json;
        var d = json.parse("{\"n\": 3, \"arr\": [1, 2.5], \"ok\": true}");
        print(d["n"]);
        print(d["arr"][1]);
        print(d["ok"]);
        print(json.stringify([1, "two"]));
    "#;
    assert_eq!(lines_of(code), vec!["3", "2.5", "true", "[1,\"two\"]"]);
}

#[test]
fn builtin_base64_module() {
    let code = r#"
        import base64;
        var encoded = base64.encode("bob");
        print(encoded);
        print(base64.decode(encoded));
    "#;
    assert_eq!(lines_of(code), vec!["Ym9i", "bob"]);
}

#[test]
fn builtin_module_deny_list_blocks_import() {
    let mut interp = Interpreter::new(false);
    stdlib::install_stdlib(&mut interp);
    interp.set_builtin_module_deny_list(vec!["math".to_string()]);
    let sink = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Rc::clone(&sink));

    let reporter = interp.error_reporter();
    reporter.borrow_mut().load_source("import math;", "<test>");
    let mut lexer = Lexer::new();
    lexer.set_error_reporter(Rc::clone(&reporter));
    let tokens = lexer.tokenize("import math;");
    let mut parser = Parser::new(tokens);
    parser.set_error_reporter(Rc::clone(&reporter));
    let program = parser.parse();

    let result = interp.interpret(&program);
    let error = result.expect_err("denied module should fail");
    assert!(error.message.contains("Module not found"));
}

#[test]
fn file_import_policy_disables_path_specs() {
    let mut interp = Interpreter::new(false);
    stdlib::install_stdlib(&mut interp);
    interp.set_module_policy(false, false, vec![]);

    let reporter = interp.error_reporter();
    let code = "import \"./x.bob\";";
    reporter.borrow_mut().load_source(code, "<test>");
    let mut lexer = Lexer::new();
    lexer.set_error_reporter(Rc::clone(&reporter));
    let tokens = lexer.tokenize(code);
    let mut parser = Parser::new(tokens);
    parser.set_error_reporter(Rc::clone(&reporter));
    let program = parser.parse();

    let error = interp.interpret(&program).expect_err("file import should be disabled");
    assert!(error.message.contains("File imports are disabled"));
}

#[test]
fn module_properties_are_immutable() {
    let code = r#"
        import math;
        try { math.pi = 1; } catch (e) { print("caught " + e); }
    "#;
    assert_eq!(
        output_of(code),
        "caught Cannot assign property 'pi' on module (immutable)\n"
    );
}

#[test]
fn repeated_imports_return_the_same_module() {
    // Cache hits hand back the identical module value.
    let code = r#"
        import math;
        import math as m2;
        print(math == m2);
    "#;
    assert_eq!(output_of(code), "true\n");
}

#[test]
fn module_missing_export_reads_none() {
    let code = r#"
        import math;
        print(math.no_such_export);
    "#;
    assert_eq!(output_of(code), "none\n");
}

#[test]
fn host_registered_modules_are_importable() {
    let mut interp = Interpreter::new(false);
    stdlib::install_stdlib(&mut interp);
    interp.register_module("host", |m| {
        m.val("flag", Value::Integer(11));
        m.func("triple", Box::new(|_, args, _, _| {
            let n = args.first().map(|v| v.to_f64()).unwrap_or(0.0);
            Ok(Value::Number(n * 3.0))
        }));
    });
    let sink = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Rc::clone(&sink));

    let code = "import host; print(host.flag); print(host.triple(7));";
    let reporter = interp.error_reporter();
    reporter.borrow_mut().load_source(code, "<test>");
    let mut lexer = Lexer::new();
    lexer.set_error_reporter(Rc::clone(&reporter));
    let tokens = lexer.tokenize(code);
    let mut parser = Parser::new(tokens);
    parser.set_error_reporter(Rc::clone(&reporter));
    let program = parser.parse();

    interp.interpret(&program).expect("host module program should run");
    let output = String::from_utf8(sink.borrow().clone()).unwrap();
    assert_eq!(output.lines().collect::<Vec<_>>(), vec!["11", "21"]);
}

#[test]
fn sys_module_reports_argv() {
    let mut interp = Interpreter::new(false);
    stdlib::install_stdlib(&mut interp);
    interp.set_argv(vec!["script.bob".to_string(), "--flag".to_string()], "/bin/bob".to_string());
    let sink = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Rc::clone(&sink));

    let code = "import sys; print(len(sys.argv())); print(sys.executable());";
    let reporter = interp.error_reporter();
    reporter.borrow_mut().load_source(code, "<test>");
    let mut lexer = Lexer::new();
    lexer.set_error_reporter(Rc::clone(&reporter));
    let tokens = lexer.tokenize(code);
    let mut parser = Parser::new(tokens);
    parser.set_error_reporter(Rc::clone(&reporter));
    let program = parser.parse();

    interp.interpret(&program).expect("sys program should run");
    let output = String::from_utf8(sink.borrow().clone()).unwrap();
    assert_eq!(output.lines().collect::<Vec<_>>(), vec!["2", "/bin/bob"]);
}

#[test]
fn globals_survive_across_interpret_calls() {
    let mut interp = Interpreter::new(false);
    stdlib::install_stdlib(&mut interp);
    interp.eval_string("var counter = 1;", "<session>").expect("first chunk");
    interp.eval_string("counter = counter + 1;", "<session>").expect("second chunk");
    let value = interp.globals().get("counter").expect("counter should exist");
    assert!(value.equals(&Value::Integer(2)));
}

#[test]
fn string_writes_are_rejected() {
    let code = r#"try { var s = "abc"; s[0] = "z"; } catch (e) { print(e); }"#;
    assert_eq!(output_of(code), "Cannot assign to string characters (strings are immutable)\n");
}

#[test]
fn array_negative_index_is_out_of_bounds() {
    let code = r#"try { var a = [1, 2]; print(a[-1]); } catch (e) { print(e); }"#;
    assert_eq!(output_of(code), "Array index out of bounds\n");
}

#[test]
fn functions_stringify_with_names() {
    let code = r#"
        func named(){ return 1; }
        print(named);
        print(print);
    "#;
    assert_eq!(lines_of(code), vec!["<function named>", "<builtin_function print>"]);
}
