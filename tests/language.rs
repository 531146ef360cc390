use indoc::indoc;

use quill::error::Stage;
use quill::{Interpreter, Value};

fn run(source: &str) -> (Value, Vec<String>) {
    let mut interpreter = Interpreter::new(source);
    let value = interpreter.interpret().expect("program should run");
    (value, interpreter.take_output())
}

#[test]
fn factorial() {
    let source = indoc! {"
        let result : int;

        define fact(n : int) {
            let acc : int;
            acc := 1;
            loop from 1 to n using i {
                acc := acc * i
            }
            return acc
        }

        result := fact(6);
        output(result);
        result
    "};
    let (value, output) = run(source);
    assert_eq!(value, Value::Integer(720));
    assert_eq!(output, vec!["720"]);
}

#[test]
fn fibonacci() {
    let source = indoc! {"
        define fib(count : int) {
            let a, b, next : int;
            a := 0;
            b := 1;
            loop from 1 to count using i {
                next := a + b;
                a := b;
                b := next
            }
            return a
        }

        output(fib(10));
        fib(10)
    "};
    let (value, output) = run(source);
    assert_eq!(value, Value::Integer(55));
    assert_eq!(output, vec!["55"]);
}

#[test]
fn primes() {
    let source = indoc! {"
        define is_prime(candidate : int) {
            let divisors : int;
            divisors := 0;
            loop from 2 to candidate using d {
                if candidate % d == 0 {
                    divisors := divisors + 1
                }
            }
            return divisors == 1
        }

        loop from 2 to 12 using n {
            if is_prime(n) {
                output(n)
            }
        }
    "};
    let (_, output) = run(source);
    assert_eq!(output, vec!["2", "3", "5", "7", "11"]);
}

#[test]
fn mixed_numeric_and_string_program() {
    let source = indoc! {"
        let label : string, half : float;

        define banner(text : string, width : int) {
            return \"=\" * width + text + \"=\" * width
        }

        label := banner(\"quill\", 3);
        half := 7 / 2;
        output(label);
        output(half, 2 ^ 3);
        label == \"===quill===\"
    "};
    let (value, output) = run(source);
    assert_eq!(value, Value::Boolean(true));
    assert_eq!(output, vec!["===quill===", "3.5 8"]);
}

#[test]
fn nested_calls_and_conditionals() {
    let source = indoc! {"
        define classify(n : int) {
            let verdict : string;
            if n % 2 == 0 and n > 0 {
                verdict := \"even\"
            } elif n > 0 {
                verdict := \"odd\"
            } else {
                verdict := \"non-positive\"
            }
            return verdict
        }

        output(classify(4), classify(7), classify(0 - 2))
    "};
    let (_, output) = run(source);
    assert_eq!(output, vec!["even odd non-positive"]);
}

#[test]
fn first_error_halts_the_run_with_its_stage() {
    let cases = [
        ("1 $ 2", Stage::Lexer),
        ("loop from 1 using i { }", Stage::Parser),
        ("undeclared := 1", Stage::Semantic),
        ("output(1 / 0)", Stage::Runtime),
        ("\"text\" ^ 2", Stage::Type),
    ];
    for (source, expected) in cases {
        let mut interpreter = Interpreter::new(source);
        let error = interpreter
            .interpret()
            .expect_err("program should fail");
        assert_eq!(error.stage(), expected, "wrong stage for {source:?}");
    }
}

#[test]
fn output_printed_before_an_error_is_preserved() {
    let source = indoc! {"
        output(\"before\");
        1 / 0
    "};
    let mut interpreter = Interpreter::new(source);
    interpreter.interpret().expect_err("division should fail");
    assert_eq!(interpreter.take_output(), vec!["before"]);
}
