use std::path::Path;

use test_utils::{check_run, check_run_with_input, Expected};

#[test]
fn recursive_fib_exits_clean() {
    check_run(
        Path::new("tests/fixtures/fib.sa"),
        Expected {
            stdout: "120\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn python_style_indentation() {
    check_run(
        Path::new("tests/fixtures/python_style.sa"),
        Expected {
            stdout: "5\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn class_with_dunder_str() {
    check_run(
        Path::new("tests/fixtures/class_str.sa"),
        Expected {
            stdout: "A=7\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn try_except_finally_runs_on_handled_raise() {
    check_run(
        Path::new("tests/fixtures/try_finally.sa"),
        Expected {
            stdout: "caught ValueError: bad\ndone\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn list_comprehension_with_filter() {
    check_run(
        Path::new("tests/fixtures/listcomp.sa"),
        Expected {
            stdout: "[0, 4, 16]\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn printf_width_and_zero_pad() {
    check_run(
        Path::new("tests/fixtures/printf_spec.sa"),
        Expected {
            stdout: "hi   =007\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn closures_capture_independent_state() {
    check_run(
        Path::new("tests/fixtures/closures.sa"),
        Expected {
            stdout: "2\n1\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn arrays_share_by_reference_strings_do_not() {
    check_run(
        Path::new("tests/fixtures/reference_vs_value.sa"),
        Expected {
            stdout: "3\nhi\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn truthiness_matches_spec_table() {
    check_run(
        Path::new("tests/fixtures/truthiness.sa"),
        Expected {
            stdout: "falsy\nfalsy\nfalsy\nfalsy\nfalsy\ntruthy\ntruthy\ntruthy\ntruthy\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn slice_identity_and_reverse() {
    check_run(
        Path::new("tests/fixtures/slice_identity.sa"),
        Expected {
            stdout: "[1, 2, 3, 4]\n[4, 3, 2, 1]\nabcd\ndcba\n",
            stderr: "",
        },
    )
    .unwrap();
}

#[test]
fn input_reads_a_line_from_stdin() {
    check_run_with_input(
        Path::new("tests/fixtures/greet.sa"),
        "Ada\n",
        Expected {
            stdout: "hello Ada\n",
            stderr: "",
        },
    )
    .unwrap();
}
