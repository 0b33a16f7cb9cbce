//! VM state machine.
//!
//! A [`Machine`] owns one program, one [`VmState`] and a quota. It runs
//! the fetch-decode-execute loop until either the quota is used up or the
//! program counter walks off the end of the program.
//!
//! ```text
//!   Ready --run/step--> Running --quota or end--> Halted
//! ```
//!
//! Malformed instructions are never fatal. They show up as
//! [`StepOutcome::Skipped`], consume one step of the quota and advance the
//! program counter like any other instruction.

use std::io::Write;

use super::execute::{execute, Effect};
use super::instruction::{DecodeError, Instruction};
use super::registers::RegisterFile;
use super::snapshot::VmState;

/// Machine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineStatus {
    /// Constructed; state initialized or restored.
    Ready,
    /// Executing instructions.
    Running,
    /// Terminal.
    Halted(HaltReason),
}

/// Why a machine halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The per-run instruction quota was reached.
    QuotaExhausted,
    /// The program counter ran past the last instruction.
    EndOfProgram,
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Instruction decoded and executed.
    Executed(Effect),
    /// Instruction could not be decoded and was treated as a no-op.
    Skipped(DecodeError),
}

/// Summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps taken (executed + skipped).
    pub steps: u32,
    /// Instructions that were executed.
    pub executed: u32,
    /// Instructions that were skipped.
    pub skipped: u32,
    /// Snapshots that failed to save.
    pub snapshot_failures: u32,
    /// Program counter at halt.
    pub pc: u32,
    /// Why the run stopped.
    pub halt: HaltReason,
}

/// Single virtual CPU instance.
#[derive(Debug)]
pub struct Machine {
    program: Vec<Instruction>,
    state: VmState,
    quota: u32,
    steps: u32,
    executed: u32,
    skipped: u32,
    snapshot_failures: u32,
    status: MachineStatus,
    echo: bool,
}

impl Machine {
    /// Create a machine with zeroed state.
    pub fn new(program: Vec<Instruction>, quota: u32) -> Self {
        Self::with_state(program, VmState::default(), quota)
    }

    /// Create a machine starting from a restored state.
    pub fn with_state(program: Vec<Instruction>, state: VmState, quota: u32) -> Self {
        Self {
            program,
            state,
            quota,
            steps: 0,
            executed: 0,
            skipped: 0,
            snapshot_failures: 0,
            status: MachineStatus::Ready,
            echo: false,
        }
    }

    /// Write `Executing PC=<pc>: <instruction>` before each step.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Replace the whole state (registers and PC).
    ///
    /// Only allowed before the first step; returns false otherwise.
    pub fn restore(&mut self, state: VmState) -> bool {
        if self.status != MachineStatus::Ready {
            log::warn!("Ignoring state restore on a machine that already ran");
            return false;
        }
        self.state = state;
        true
    }

    /// Current state.
    pub fn state(&self) -> &VmState {
        &self.state
    }

    /// Current register file.
    pub fn registers(&self) -> &RegisterFile {
        &self.state.registers
    }

    /// Current program counter.
    pub fn pc(&self) -> u32 {
        self.state.pc
    }

    /// Current status.
    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// Loaded program.
    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// Per-run quota.
    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Steps taken in this run.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Check the loop bounds; halts the machine if either is reached.
    fn check_halt(&mut self) -> Option<HaltReason> {
        if let MachineStatus::Halted(reason) = self.status {
            return Some(reason);
        }

        let reason = if (self.state.pc as usize) >= self.program.len() {
            Some(HaltReason::EndOfProgram)
        } else if self.steps >= self.quota {
            Some(HaltReason::QuotaExhausted)
        } else {
            None
        };

        if let Some(reason) = reason {
            log::debug!(
                "Machine halted at PC={} after {} steps: {:?}",
                self.state.pc,
                self.steps,
                reason
            );
            self.status = MachineStatus::Halted(reason);
        }
        reason
    }

    /// Execute one instruction.
    ///
    /// Observation output (dumps, snapshot notices, echo) goes to `out`.
    /// Returns None once the machine is halted.
    pub fn step<W: Write + ?Sized>(&mut self, out: &mut W) -> Option<StepOutcome> {
        if self.check_halt().is_some() {
            return None;
        }
        self.status = MachineStatus::Running;

        // Fetch
        let pc = self.state.pc;
        let inst = &self.program[pc as usize];
        log::trace!("PC={} line {}: {}", pc, inst.line, inst);
        if self.echo {
            write_line(out, format_args!("Executing PC={}: {}", pc, inst));
        }

        // Decode + execute
        let outcome = match inst.decode() {
            Ok(op) => {
                let effect = execute(&op, &mut self.state.registers);
                self.apply_effect(&effect, pc, out);
                self.executed += 1;
                StepOutcome::Executed(effect)
            }
            Err(e) => {
                log::debug!("Skipping PC={} (line {}): {}", pc, inst.line, e);
                self.skipped += 1;
                StepOutcome::Skipped(e)
            }
        };

        // Advance
        self.state.pc = pc.wrapping_add(1);
        self.steps += 1;

        Some(outcome)
    }

    /// Perform the side effect of an executed instruction.
    fn apply_effect<W: Write + ?Sized>(&mut self, effect: &Effect, pc: u32, out: &mut W) {
        match effect {
            Effect::None => {}
            Effect::Dump => {
                if let Err(e) = self.state.registers.dump(out) {
                    log::warn!("Failed to write register dump: {}", e);
                }
            }
            Effect::Snapshot { path } => {
                // Resume point is the instruction after this one
                let saved = VmState {
                    registers: self.state.registers.clone(),
                    pc: pc.wrapping_add(1),
                };
                match saved.save(path) {
                    Ok(()) => {
                        log::info!("Snapshot saved to {} (resume PC={})", path, saved.pc);
                        write_line(out, format_args!("Snapshot saved to {}", path));
                    }
                    Err(e) => {
                        log::error!("Failed to save snapshot: {}", e);
                        self.snapshot_failures += 1;
                    }
                }
            }
        }
    }

    /// Run until halted.
    pub fn run<W: Write + ?Sized>(&mut self, out: &mut W) -> RunSummary {
        while self.step(out).is_some() {}
        self.summary()
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> RunSummary {
        let halt = match self.status {
            MachineStatus::Halted(reason) => reason,
            // Not halted yet: report what would stop it next
            _ if (self.state.pc as usize) >= self.program.len() => HaltReason::EndOfProgram,
            _ => HaltReason::QuotaExhausted,
        };
        RunSummary {
            steps: self.steps,
            executed: self.executed,
            skipped: self.skipped,
            snapshot_failures: self.snapshot_failures,
            pc: self.state.pc,
            halt,
        }
    }
}

fn write_line<W: Write + ?Sized>(out: &mut W, args: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{}", args) {
        log::warn!("Failed to write output: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::instruction::Opcode;

    fn parse(lines: &[&str]) -> Vec<Instruction> {
        lines
            .iter()
            .map(|line| {
                let line: &str = line;
                let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
                Instruction::new(
                    mnemonic,
                    rest.split(',').map(str::trim).filter(|s| !s.is_empty()),
                )
            })
            .collect()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("myvmm_machine_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_new_machine_is_ready() {
        let machine = Machine::new(parse(&["li $t0, 1"]), 10);
        assert_eq!(machine.status(), MachineStatus::Ready);
        assert_eq!(machine.pc(), 0);
        assert_eq!(machine.registers(), &RegisterFile::new());
    }

    #[test]
    fn test_add_scenario_dump() {
        let mut machine = Machine::new(
            parse(&["li $v0, 10", "li $v1, 20", "add $v0, $v0, $v1", "DUMP_PROCESSOR_STATE"]),
            10,
        );
        let mut out = Vec::new();
        let summary = machine.run(&mut out);

        assert_eq!(summary.halt, HaltReason::EndOfProgram);
        assert_eq!(summary.executed, 4);
        assert_eq!(summary.pc, 4);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 32);
        for (i, line) in lines.iter().enumerate() {
            let expected = match i {
                2 => 30,
                3 => 20,
                _ => 0,
            };
            assert_eq!(*line, format!("$r{}={}", i, expected));
        }
    }

    #[test]
    fn test_quota_smaller_than_program() {
        let program = parse(&["li $t0, 1", "li $t1, 2", "li $t2, 3", "li $t3, 4", "li $t4, 5"]);
        for quota in 0..5u32 {
            let mut machine = Machine::new(program.clone(), quota);
            let summary = machine.run(&mut std::io::sink());
            assert_eq!(summary.steps, quota);
            assert_eq!(summary.pc, quota);
            assert_eq!(summary.halt, HaltReason::QuotaExhausted);
            assert_eq!(
                machine.status(),
                MachineStatus::Halted(HaltReason::QuotaExhausted)
            );
        }
    }

    #[test]
    fn test_quota_at_least_program_length() {
        let program = parse(&["li $t0, 1", "li $t1, 2", "li $t2, 3"]);
        for quota in [3u32, 4, 100, u32::MAX] {
            let mut machine = Machine::new(program.clone(), quota);
            let summary = machine.run(&mut std::io::sink());
            assert_eq!(summary.steps, 3);
            assert_eq!(summary.pc, 3);
            assert_eq!(summary.halt, HaltReason::EndOfProgram);
        }
    }

    #[test]
    fn test_empty_program_halts_immediately() {
        let mut machine = Machine::new(Vec::new(), 10);
        assert!(machine.step(&mut std::io::sink()).is_none());
        assert_eq!(
            machine.status(),
            MachineStatus::Halted(HaltReason::EndOfProgram)
        );
    }

    #[test]
    fn test_unknown_mnemonic_is_skipped() {
        let mut machine = Machine::new(parse(&["li $t1, 4", "foo $t0, $t1, $t2"]), 10);
        let mut out = std::io::sink();

        machine.step(&mut out);
        let before = machine.registers().clone();

        let outcome = machine.step(&mut out).unwrap();
        assert!(matches!(
            outcome,
            StepOutcome::Skipped(DecodeError::UnknownMnemonic(_))
        ));
        assert_eq!(machine.registers(), &before);
        assert_eq!(machine.pc(), 2);
    }

    #[test]
    fn test_skipped_instructions_count_against_quota() {
        let mut machine = Machine::new(
            parse(&["add $t0", "li $bad, 1", "li $t0, 0x10", "li $t0, 7"]),
            3,
        );
        let summary = machine.run(&mut std::io::sink());
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.executed, 0);
        assert_eq!(summary.pc, 3);
        assert_eq!(machine.registers().read(8), 0);
    }

    #[test]
    fn test_step_outcomes() {
        let mut machine = Machine::new(parse(&["li $t0, 1", "DUMP_PROCESSOR_STATE"]), 10);
        let mut out = Vec::new();

        assert_eq!(machine.step(&mut out), Some(StepOutcome::Executed(Effect::None)));
        assert_eq!(machine.status(), MachineStatus::Running);
        assert_eq!(machine.step(&mut out), Some(StepOutcome::Executed(Effect::Dump)));
        assert_eq!(machine.step(&mut out), None);
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 32);
    }

    #[test]
    fn test_restore_before_run() {
        let mut state = VmState::new();
        state.registers.write(9, 41);
        state.pc = 1;

        let mut machine = Machine::new(parse(&["li $t1, 0", "addi $t1, $t1, 1"]), 10);
        assert!(machine.restore(state));
        let summary = machine.run(&mut std::io::sink());

        assert_eq!(summary.steps, 1);
        assert_eq!(machine.registers().read(9), 42);
    }

    #[test]
    fn test_restore_after_run_is_rejected() {
        let mut machine = Machine::new(parse(&["li $t0, 1"]), 10);
        machine.run(&mut std::io::sink());
        assert!(!machine.restore(VmState::new()));
        assert_eq!(machine.registers().read(8), 1);
    }

    #[test]
    fn test_restored_pc_past_end() {
        let state = VmState { registers: RegisterFile::new(), pc: 50 };
        let mut machine = Machine::with_state(parse(&["li $t0, 1"]), state, 10);
        let summary = machine.run(&mut std::io::sink());
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.halt, HaltReason::EndOfProgram);
        assert_eq!(summary.pc, 50);
    }

    #[test]
    fn test_snapshot_records_next_pc() {
        let path = temp_path("next_pc.bin");
        let snapshot_line = format!("SNAPSHOT {}", path.display());
        let program = parse(&["li $t0, 5", "li $t1, 6", snapshot_line.as_str(), "li $t2, 7"]);

        let mut machine = Machine::new(program, 10);
        let mut out = Vec::new();
        let summary = machine.run(&mut out);
        assert_eq!(summary.snapshot_failures, 0);

        let saved = VmState::load(&path).unwrap();
        assert_eq!(saved.pc, 3);
        assert_eq!(saved.registers.read(8), 5);
        assert_eq!(saved.registers.read(9), 6);
        assert_eq!(saved.registers.read(10), 0);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("Snapshot saved to {}", path.display())));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_snapshot_failure_continues() {
        let path = temp_path("missing_dir").join("snap.bin");
        let snapshot_line = format!("SNAPSHOT {}", path.display());
        let mut machine = Machine::new(parse(&[snapshot_line.as_str(), "li $t0, 9"]), 10);

        let summary = machine.run(&mut std::io::sink());
        assert_eq!(summary.snapshot_failures, 1);
        assert_eq!(summary.executed, 2);
        assert_eq!(machine.registers().read(8), 9);
    }

    #[test]
    fn test_echo() {
        let mut machine = Machine::new(parse(&["li $t0, 1", "bogus"]), 10);
        machine.set_echo(true);
        let mut out = Vec::new();
        machine.run(&mut out);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Executing PC=0: li $t0, 1\nExecuting PC=1: bogus\n");
    }

    #[test]
    fn test_every_opcode_advances_pc_by_one() {
        let path = temp_path("advance.bin");
        let snapshot_line = format!("SNAPSHOT {}", path.display());
        let lines: Vec<String> = Opcode::ALL
            .iter()
            .map(|op| match op {
                Opcode::Li => "li $t0, 1".to_string(),
                Opcode::DumpProcessorState => "DUMP_PROCESSOR_STATE".to_string(),
                Opcode::Snapshot => snapshot_line.clone(),
                other => format!("{} $t0, $t0, 1", other.mnemonic()),
            })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let mut machine = Machine::new(parse(&refs), 100);
        let mut out = std::io::sink();
        let mut expected_pc = 0;
        while machine.step(&mut out).is_some() {
            expected_pc += 1;
            assert_eq!(machine.pc(), expected_pc);
        }
        assert_eq!(machine.pc() as usize, Opcode::ALL.len());

        std::fs::remove_file(&path).ok();
    }
}
