//! Session runner.
//!
//! Runs one or more independently configured VMs strictly in order. Each
//! VM gets its own [`Machine`]; nothing is shared between them.
//!
//! Failure policy per VM:
//! - config or program load failure: VM is skipped, the session continues
//! - snapshot restore failure: VM starts from zeroed state
//! - instruction-level problems: never surface here (see [`crate::cpu`])

pub mod args;
pub mod vm_config;

pub use args::{parse_args, ArgsError, Command, VmSpec, USAGE};
pub use vm_config::{ConfigError, VmConfig, DEFAULT_SLICE};

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::cpu::{Machine, RunSummary, VmState};
use crate::loader::Program;

/// What happened to one VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmOutcome {
    /// VM ran until halt.
    Completed(RunSummary),
    /// VM never started.
    Skipped(String),
}

/// Per-VM entry in a [`SessionReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmReport {
    /// 1-based position in the session.
    pub number: usize,
    /// Config file the VM came from.
    pub config_file: PathBuf,
    /// Outcome.
    pub outcome: VmOutcome,
}

/// Result of a whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// One entry per requested VM, in run order.
    pub vms: Vec<VmReport>,
}

impl SessionReport {
    /// Number of VMs that ran to halt.
    pub fn completed(&self) -> usize {
        self.vms
            .iter()
            .filter(|vm| matches!(vm.outcome, VmOutcome::Completed(_)))
            .count()
    }

    /// Number of VMs that were skipped.
    pub fn skipped(&self) -> usize {
        self.vms.len() - self.completed()
    }
}

/// Run every VM in `specs` in order, writing observation output to `out`.
pub fn run_session<W: Write + ?Sized>(
    specs: &[VmSpec],
    settings: &Settings,
    out: &mut W,
) -> SessionReport {
    let mut report = SessionReport::default();

    for (idx, spec) in specs.iter().enumerate() {
        let number = idx + 1;
        if let Err(e) = writeln!(out, "====== VM #{} ======", number) {
            log::warn!("Failed to write output: {}", e);
        }

        let outcome = match run_vm(spec, settings, out) {
            Ok(summary) => {
                log::info!(
                    "VM #{} halted ({:?}) at PC={}: {} executed, {} skipped",
                    number,
                    summary.halt,
                    summary.pc,
                    summary.executed,
                    summary.skipped
                );
                VmOutcome::Completed(summary)
            }
            Err(e) => {
                log::error!("VM #{} skipped: {:#}", number, e);
                VmOutcome::Skipped(format!("{:#}", e))
            }
        };

        report.vms.push(VmReport {
            number,
            config_file: spec.config_file.clone(),
            outcome,
        });
    }

    report
}

/// Configure, restore, load and run a single VM.
pub fn run_vm<W: Write + ?Sized>(
    spec: &VmSpec,
    settings: &Settings,
    out: &mut W,
) -> Result<RunSummary> {
    let config = VmConfig::from_file(&spec.config_file, settings.default_slice())
        .with_context(|| format!("VM config {}", spec.config_file.display()))?;

    // Command line snapshot wins over the config file
    let snapshot_file = spec.snapshot_file.as_ref().or(config.snapshot_file.as_ref());
    let restored = snapshot_file.and_then(|path| match VmState::load(path) {
        Ok(state) => {
            log::info!("Loaded snapshot {} (PC={})", path.display(), state.pc);
            writeln!(out, "Loaded snapshot: {}", path.display()).ok();
            Some(state)
        }
        Err(e) => {
            log::error!("Failed to load snapshot: {}; starting from zero state", e);
            None
        }
    });

    let program = Program::from_file(&config.instruction_file)?;
    if program.is_empty() {
        log::warn!(
            "{} contains no instructions",
            config.instruction_file.display()
        );
    }

    if let Some(state) = &restored {
        writeln!(
            out,
            "Resuming at instruction #{} / total instructions = {}",
            state.pc,
            program.len()
        )
        .ok();
    }

    let mut machine = Machine::with_state(
        program.into_instructions(),
        restored.unwrap_or_default(),
        config.slice,
    );
    machine.set_echo(settings.echo_instructions());

    Ok(machine.run(out))
}
