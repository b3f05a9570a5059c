use std::process::ExitCode;

fn main() -> ExitCode {
    smartcrm_cli::run()
}
