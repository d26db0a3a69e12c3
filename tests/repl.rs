use anyhow::Result;
use pyrepl::{Config, ExecutionError, PythonRepl};
use serde_json::json;

fn repl() -> PythonRepl {
    PythonRepl::new(&Config::from_pairs([("PYREPL_HOST_STDLIB", "false")]))
}

#[test]
fn test_assignment_prints_nothing_and_persists() {
    let mut repl = repl();
    assert_eq!(repl.run("x = 1"), "");
    assert_eq!(repl.run("print(x)"), "1\n");
}

#[test]
fn test_print_literal() {
    let mut repl = repl();
    assert_eq!(repl.run("print(\"hi\")"), "hi\n");
}

#[test]
fn test_multiple_prints_are_concatenated() {
    let mut repl = repl();
    assert_eq!(repl.run("for i in range(3):\n    print(i)"), "0\n1\n2\n");
    assert_eq!(repl.run("print('a', 'b', sep='-', end='!')"), "a-b!");
}

#[test]
fn test_syntax_error_is_reported_as_text() {
    let mut repl = repl();
    let out = repl.run("def f(:");
    assert!(!out.is_empty());
}

#[test]
fn test_runtime_error_is_reported_as_text() {
    let mut repl = repl();
    let out = repl.run("1/0");
    assert!(out.contains("division by zero"), "got: {out}");

    let out = repl.run("print(undefined_name)");
    assert!(out.contains("undefined_name"), "got: {out}");
}

#[test]
fn test_output_before_error_is_dropped_by_run() {
    let mut repl = repl();
    let out = repl.run("print('partial')\nraise ValueError('boom')");
    assert_eq!(out, "boom");
}

#[test]
fn test_function_definitions_persist() {
    let mut repl = repl();
    assert_eq!(repl.run("def f(): return 42"), "");
    assert_eq!(repl.run("print(f())"), "42\n");
}

#[test]
fn test_functions_from_separate_calls_see_each_other() {
    let mut repl = repl();
    repl.run("def double(n):\n    return n * 2");
    repl.run("def quadruple(n):\n    return double(double(n))");
    assert_eq!(repl.run("print(quadruple(3))"), "12\n");
}

#[test]
fn test_instances_do_not_share_namespaces() {
    let mut first = repl();
    let mut second = repl();
    first.run("x = 'mine'");
    let out = second.run("print(x)");
    assert!(out.contains("not defined"), "got: {out}");
    assert_eq!(first.run("print(x)"), "mine\n");
}

#[test]
fn test_failed_call_keeps_earlier_bindings() {
    let mut repl = repl();
    repl.run("total = 10");
    repl.run("total = total + 1\nraise KeyError('stop')");
    assert_eq!(repl.run("print(total)"), "11\n");
}

#[test]
fn test_system_exit_is_caught() {
    let mut repl = repl();
    let out = repl.run("raise SystemExit('bye')");
    assert_eq!(out, "bye");
    assert_eq!(repl.run("print('still alive')"), "still alive\n");
}

#[test]
fn test_execute_reports_failure_details() {
    let mut repl = repl();
    let result = repl.execute("print('before')\nraise ValueError('boom')");
    assert!(!result.success);
    assert_eq!(result.output, "before\n");
    assert_eq!(result.errors, vec!["boom".to_string()]);
    match result.error {
        Some(ExecutionError::Runtime { message, traceback }) => {
            assert_eq!(message, "boom");
            assert!(traceback.contains("ValueError"), "traceback: {traceback}");
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
}

#[test]
fn test_execute_lists_user_variables() {
    let mut repl = repl();
    let result = repl.execute("a = 1\nb = 'two'\nc = [a, b]");
    assert!(result.success);
    assert!(result.errors.is_empty());
    assert_eq!(result.variables.get("a").map(String::as_str), Some("1"));
    assert_eq!(result.variables.get("b").map(String::as_str), Some("'two'"));
    assert_eq!(result.variables.get("c").map(String::as_str), Some("[1, 'two']"));
    assert!(result.variables.keys().all(|k| !k.starts_with("__")));
}

#[test]
fn test_seeded_namespace_is_visible() -> Result<()> {
    let seed = json!({"greeting": "hello", "count": 3});
    let seed = seed.as_object().cloned().unwrap_or_default();
    let mut repl = PythonRepl::with_namespace(
        &Config::from_pairs([("PYREPL_HOST_STDLIB", "false")]),
        seed,
    );
    assert_eq!(repl.run("print(greeting * count)"), "hellohellohello\n");

    repl.set("count", &json!(1))?;
    assert_eq!(repl.run("print(greeting * count)"), "hello\n");
    assert_eq!(repl.get("greeting").as_deref(), Some("'hello'"));
    assert_eq!(repl.get("missing"), None);
    Ok(())
}

#[test]
fn test_sanitize_input_config() {
    let mut repl = PythonRepl::new(&Config::from_pairs([
        ("PYREPL_HOST_STDLIB", "false"),
        ("PYREPL_SANITIZE_INPUT", "true"),
    ]));
    assert_eq!(repl.run("```python\nprint('fenced')\n```"), "fenced\n");
}

#[test]
fn test_fences_fail_without_sanitizing() {
    let mut repl = repl();
    let out = repl.run("```python\nprint('fenced')\n```");
    assert_ne!(out, "fenced\n");
    assert!(!out.is_empty());
}

#[test]
fn test_unbounded_recursion_is_reported_as_text() {
    let mut repl = repl();
    let out = repl.run("def f(n):\n    return f(n + 1)\nf(0)");
    assert!(out.contains("recursion"), "got: {out}");
    assert_eq!(repl.run("print('recovered')"), "recovered\n");
}

#[test]
fn test_deep_but_bounded_recursion_succeeds() {
    let mut repl = repl();
    let out = repl.run("def depth(n):\n    return 0 if n == 0 else 1 + depth(n - 1)\nprint(depth(900))");
    assert_eq!(out, "900\n");
}

#[test]
fn test_lower_recursion_limit_from_config() {
    let mut repl = PythonRepl::new(&Config::from_pairs([
        ("PYREPL_HOST_STDLIB", "false"),
        ("PYREPL_RECURSION_LIMIT", "50"),
    ]));
    let out = repl.run("def depth(n):\n    return 0 if n == 0 else 1 + depth(n - 1)\nprint(depth(200))");
    assert!(out.contains("recursion"), "got: {out}");
}

#[test]
fn test_imports_module_from_configured_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("greeting_helper.py"),
        "GREETING = 'hello from disk'\n\ndef shout(s):\n    return s.upper()\n",
    )?;
    let path = dir.path().to_string_lossy().into_owned();
    let mut repl = PythonRepl::new(&Config::from_pairs([
        ("PYREPL_HOST_STDLIB", "false".to_string()),
        ("PYREPL_STDLIB_PATHS", path),
    ]));

    assert_eq!(repl.run("import greeting_helper"), "");
    assert_eq!(
        repl.run("print(greeting_helper.shout(greeting_helper.GREETING))"),
        "HELLO FROM DISK\n"
    );
    assert_eq!(repl.run("from greeting_helper import GREETING\nprint(GREETING)"), "hello from disk\n");
    Ok(())
}

#[test]
fn test_missing_module_is_reported_as_text() {
    let mut repl = repl();
    let out = repl.run("import no_such_module_here");
    assert!(out.contains("no_such_module_here"), "got: {out}");
}

#[test]
fn test_stdout_behaves_like_a_text_stream() {
    let mut repl = repl();
    assert_eq!(repl.run("import sys\nsys.stdout.writelines(['a', 'b'])"), "ab");
    assert_eq!(repl.run("import sys\nprint(sys.stdout.isatty())"), "False\n");
    assert_eq!(repl.run("import sys\nn = sys.stdout.write('xyz')\nprint(n)"), "xyz3\n");
    assert_eq!(repl.run("import sys\nprint('to file', file=sys.stdout)\nsys.stdout.flush()"), "to file\n");
}

#[test]
fn test_stdout_write_rejects_non_text() {
    let mut repl = repl();
    let result = repl.execute("import sys\nsys.stdout.write(5)");
    assert!(!result.success);
    assert_eq!(result.output, "");
    match result.error {
        Some(ExecutionError::Runtime { traceback, .. }) => {
            assert!(traceback.contains("TypeError"), "traceback: {traceback}");
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
}
