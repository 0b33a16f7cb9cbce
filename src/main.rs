//! myvmm: run one or more register VMs in sequence.

use std::env;
use std::io::Write;
use std::process::ExitCode;

use myvmm::config::Settings;
use myvmm::session::{self, Command, USAGE};

fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    env_logger::init();

    let specs = match session::parse_args(env::args().skip(1)) {
        Ok(Command::Run(specs)) => specs,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return Ok(ExitCode::SUCCESS);
        }
        Ok(Command::PrintConfig) => {
            print!("{}", Settings::sample());
            if let Some(path) = Settings::user_config_path() {
                eprintln!("# user settings path: {}", path.display());
            }
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return Ok(ExitCode::from(1));
        }
    };

    let settings = Settings::load();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = session::run_session(&specs, &settings, &mut out);
    out.flush()?;

    log::info!(
        "Session finished: {} VM(s) completed, {} skipped",
        report.completed(),
        report.skipped()
    );

    Ok(ExitCode::SUCCESS)
}
