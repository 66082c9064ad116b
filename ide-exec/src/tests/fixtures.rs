/// Programs that finish normally
pub mod code_samples {
    pub const PYTHON_HELLO: &str = r#"print("hi")"#;

    pub const PYTHON_MULTILINE: &str = r#"def factorial(n):
    if n <= 1:
        return 1
    return n * factorial(n - 1)

result = factorial(5)
print(f"Factorial of 5 is {result}")"#;

    pub const PYTHON_WARNING: &str = r#"import sys
sys.stderr.write("warning: careful\n")
print("ok")"#;

    pub const PYTHON_READS_STDIN: &str = r#"try:
    input()
    print("got input")
except EOFError:
    print("no input")"#;
}

/// Programs that fail or never finish
pub mod test_scenarios {
    pub const PYTHON_RAISES: &str = r#"raise ValueError("boom")"#;

    pub const PYTHON_EXIT_CODE: &str = r#"import sys
sys.exit(3)"#;

    pub const PYTHON_INFINITE_LOOP: &str = r#"print("started", flush=True)
while True:
    pass"#;

    pub const PYTHON_SYNTAX_ERROR: &str = r#"def broken(:
    pass"#;
}
