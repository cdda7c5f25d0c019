use std::process::ExitCode;

fn main() -> ExitCode {
    bespoke_cli::run()
}
