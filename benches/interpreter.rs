use criterion::{Criterion, black_box, criterion_group, criterion_main};
use indoc::indoc;

use quill::Interpreter;

const WORKLOADS: [(&str, &str); 2] = [
    (
        "factorial",
        indoc! {"
            let result : int;
            define fact(n : int) {
                let acc : int;
                acc := 1;
                loop from 1 to n using i {
                    acc := acc * i
                }
                return acc
            }
            result := fact(18);
            result
        "},
    ),
    (
        "primes",
        indoc! {"
            let found : int;
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
            found := 0;
            loop from 2 to 200 using n {
                if is_prime(n) {
                    found := found + 1
                }
            };
            found
        "},
    ),
];

fn bench_interpreter(c: &mut Criterion) {
    for (label, source) in WORKLOADS {
        c.bench_function(&format!("interpret_{label}"), |b| {
            b.iter(|| {
                let mut interpreter = Interpreter::new(black_box(source));
                let value = interpreter.interpret().expect("run");
                black_box(value);
            })
        });
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
