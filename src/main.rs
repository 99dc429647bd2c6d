//! photoprune command-line entry point.

use clap::Parser;
use photoprune::{
    cli::Cli,
    error::{error_message, exit_code_for, StructuredError},
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match photoprune::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = exit_code_for(&err);
            let message = error_message(&err);

            if json_errors {
                let structured = StructuredError::new(message.as_str(), exit_code);
                match serde_json::to_string_pretty(&structured) {
                    Ok(json) => eprintln!("{}", json),
                    Err(_) => eprintln!("[{}] Error: {}", exit_code.code_prefix(), message),
                }
            } else {
                eprintln!("[{}] Error: {}", exit_code.code_prefix(), message);
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
