//! Command-line parsing.
//!
//! ```text
//! myvmm [-s <snapshot>] -v <config> [[-s <snapshot>] -v <config> ...]
//! myvmm --print-config
//! ```
//!
//! `-v` opens a new VM spec. `-s` attaches a snapshot to the spec being
//! built, whether it comes before or after that spec's `-v`.

use std::path::PathBuf;

use thiserror::Error;

/// Usage line printed on argument errors.
pub const USAGE: &str = "Usage: myvmm [-s <snapshot_file>] -v <config_file> [...]\n       myvmm --print-config";

/// Argument parsing error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    /// A flag was given without its value.
    #[error("missing value for {0}")]
    MissingValue(String),

    /// Unrecognized argument.
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),

    /// No `-v` was given.
    #[error("no VM configuration given")]
    NoVms,
}

/// One VM as requested on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmSpec {
    /// VM configuration file.
    pub config_file: PathBuf,
    /// Snapshot override from `-s`.
    pub snapshot_file: Option<PathBuf>,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the listed VMs in order.
    Run(Vec<VmSpec>),
    /// Print usage and exit.
    Help,
    /// Print a sample settings file and exit.
    PrintConfig,
}

/// Parse arguments (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<Command, ArgsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut specs = Vec::new();
    let mut pending: Option<PathBuf> = None;
    let mut pending_snapshot: Option<PathBuf> = None;

    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--print-config" => return Ok(Command::PrintConfig),
            "-v" => {
                let value = args
                    .next()
                    .ok_or_else(|| ArgsError::MissingValue(arg.clone()))?;
                if let Some(config_file) = pending.take() {
                    specs.push(VmSpec {
                        config_file,
                        snapshot_file: pending_snapshot.take(),
                    });
                }
                pending = Some(PathBuf::from(value));
            }
            "-s" => {
                let value = args
                    .next()
                    .ok_or_else(|| ArgsError::MissingValue(arg.clone()))?;
                pending_snapshot = Some(PathBuf::from(value));
            }
            _ => return Err(ArgsError::UnexpectedArgument(arg)),
        }
    }

    match pending {
        Some(config_file) => specs.push(VmSpec {
            config_file,
            snapshot_file: pending_snapshot,
        }),
        None if pending_snapshot.is_some() => {
            log::warn!("Ignoring trailing -s with no VM after it");
        }
        None => {}
    }

    if specs.is_empty() {
        return Err(ArgsError::NoVms);
    }
    Ok(Command::Run(specs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(config: &str, snapshot: Option<&str>) -> VmSpec {
        VmSpec {
            config_file: PathBuf::from(config),
            snapshot_file: snapshot.map(PathBuf::from),
        }
    }

    #[test]
    fn test_single_vm() {
        let cmd = parse_args(["-v", "vm1.cfg"]).unwrap();
        assert_eq!(cmd, Command::Run(vec![spec("vm1.cfg", None)]));
    }

    #[test]
    fn test_snapshot_before_and_after() {
        let cmd = parse_args(["-s", "a.bin", "-v", "vm1.cfg", "-v", "vm2.cfg", "-s", "b.bin"]).unwrap();
        assert_eq!(
            cmd,
            Command::Run(vec![spec("vm1.cfg", Some("a.bin")), spec("vm2.cfg", Some("b.bin"))])
        );
    }

    #[test]
    fn test_later_snapshot_replaces_earlier() {
        let cmd = parse_args(["-s", "a.bin", "-v", "vm1.cfg", "-s", "b.bin"]).unwrap();
        assert_eq!(cmd, Command::Run(vec![spec("vm1.cfg", Some("b.bin"))]));
    }

    #[test]
    fn test_order_preserved() {
        let cmd = parse_args(["-v", "c.cfg", "-v", "a.cfg", "-v", "b.cfg"]).unwrap();
        assert_eq!(
            cmd,
            Command::Run(vec![spec("c.cfg", None), spec("a.cfg", None), spec("b.cfg", None)])
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_args(Vec::<String>::new()), Err(ArgsError::NoVms));
        assert_eq!(parse_args(["-s", "a.bin"]), Err(ArgsError::NoVms));
        assert_eq!(
            parse_args(["-v"]),
            Err(ArgsError::MissingValue("-v".to_string()))
        );
        assert_eq!(
            parse_args(["-v", "a.cfg", "-s"]),
            Err(ArgsError::MissingValue("-s".to_string()))
        );
        assert_eq!(
            parse_args(["vm.cfg"]),
            Err(ArgsError::UnexpectedArgument("vm.cfg".to_string()))
        );
    }

    #[test]
    fn test_help() {
        assert_eq!(parse_args(["--help"]), Ok(Command::Help));
        assert_eq!(parse_args(["-v", "a.cfg", "-h"]), Ok(Command::Help));
    }

    #[test]
    fn test_print_config() {
        assert_eq!(parse_args(["--print-config"]), Ok(Command::PrintConfig));
        assert_eq!(parse_args(["-v", "a.cfg", "--print-config"]), Ok(Command::PrintConfig));
        assert!(USAGE.contains("--print-config"));
    }
}
