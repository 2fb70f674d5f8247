//! Demo target: print the argument vector and the environment
//!
//! Usage: print-env [args...]
//! Outputs:
//!   ARGC:<n>
//!   ARG<i>:<arg> (for each argument, argument 0 included)
//!   ALL_ENV:<key>=<value> (for each env var, sorted)
//!
//! Installed as `<prefix>/bin/opal_wrapper`, this shows exactly what the shim handed over.

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    println!("ARGC:{}", args.len());
    for (index, arg) in args.iter().enumerate() {
        println!("ARG{}:{}", index, arg);
    }

    // Sorted for consistent output
    println!("---ALL_ENV_START---");
    let mut all_vars: Vec<(String, String)> = env::vars_os()
        .map(|(key, value)| {
            (
                key.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect();
    all_vars.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in all_vars {
        println!("ALL_ENV:{}={}", key, value);
    }
    println!("---ALL_ENV_END---");

    ExitCode::SUCCESS
}
