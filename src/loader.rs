//! Program loader.
//!
//! Reads instruction source text and tokenizes it into [`Instruction`]s.
//!
//! # Source Format
//!
//! ```text
//! # comment lines and trailing comments are ignored
//! li   $v0, 10        # load 10
//! add  $v0, $v0, $v1
//! DUMP_PROCESSOR_STATE
//! ```
//!
//! - `#` starts a comment that runs to the end of the line
//! - blank lines (after comment removal) are not instructions
//! - the mnemonic is the first whitespace-delimited word
//! - the rest of the line is split on `,`; each operand is trimmed and
//!   empty operands are dropped

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cpu::Instruction;

/// Program load error.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Instruction file could not be read.
    #[error("cannot open instruction file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded program, indexable by program counter.
#[derive(Debug, Clone, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Parse program text.
    pub fn parse(source: &str) -> Self {
        let instructions: Vec<Instruction> = source
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| parse_line(line).map(|inst| inst.at_line(idx + 1)))
            .collect();

        log::debug!("Parsed {} instructions", instructions.len());
        Self { instructions }
    }

    /// Load and parse a program file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Stray non-UTF-8 bytes (usually in comments) must not sink the program
        let source = String::from_utf8_lossy(&bytes);
        if let std::borrow::Cow::Owned(_) = source {
            log::warn!("{} is not valid UTF-8; invalid bytes replaced", path.display());
        }

        let program = Self::parse(&source);
        log::info!(
            "Loaded {} instructions from {}",
            program.len(),
            path.display()
        );
        Ok(program)
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Consume into the instruction list.
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

/// Tokenize one source line. Returns None for blank/comment-only lines.
pub fn parse_line(line: &str) -> Option<Instruction> {
    let code = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let code = code.trim();
    if code.is_empty() {
        return None;
    }

    let (mnemonic, rest) = match code.find(char::is_whitespace) {
        Some(pos) => (&code[..pos], &code[pos..]),
        None => (code, ""),
    };

    let operands = rest
        .split(',')
        .map(str::trim)
        .filter(|operand| !operand.is_empty());

    Some(Instruction::new(mnemonic, operands))
}
