//! Seccomp-like System Call Filtering
//!
//! BPF-style programs over a fixed-width syscall record.
//!
//! Programs are validated once, when they are attached: non-empty, bounded
//! length, argument indices in range, every jump forward and in-bounds, and
//! a `Return` as the last instruction. Forward-only jumps plus a trailing
//! `Return` mean every execution path ends in a `Return`. The interpreter
//! still carries a step budget and fails closed if it is ever exhausted.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

/// `AUDIT_ARCH_X86_64`
pub const ARCH_X86_64: u32 = 0xC000_003E;

/// Seccomp Action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,      // Allow the syscall
    Kill,       // Kill the thread
    Trap,       // Send SIGSYS
    Log,        // Allow but log
    Errno(u16), // Fail the syscall with this errno
}

impl Action {
    /// Fixed outcome mapping: Allow and Log permit, everything else denies
    #[inline]
    pub fn permits(self) -> bool {
        matches!(self, Action::Allow | Action::Log)
    }
}

/// Syscall description handed to filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SyscallRecord {
    pub nr: u32,
    pub arch: u32,
    pub instruction_pointer: u64,
    pub args: [u64; 6],
}

impl SyscallRecord {
    pub const fn new(nr: u32) -> Self {
        Self {
            nr,
            arch: ARCH_X86_64,
            instruction_pointer: 0,
            args: [0; 6],
        }
    }

    pub const fn with_args(mut self, args: [u64; 6]) -> Self {
        self.args = args;
        self
    }
}

/// Record field a `Load` reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Nr,
    Arch,
    InstructionPointer,
    /// Argument 0-5
    Arg(u8),
}

/// Filter instruction
///
/// Jump offsets are relative to the next instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Load a record field into the accumulator
    Load(Field),
    /// Bitwise AND accumulator with constant
    And(u64),
    /// Jump if accumulator == k
    JumpEq { k: u64, jt: u8, jf: u8 },
    /// Jump if accumulator > k
    JumpGt { k: u64, jt: u8, jf: u8 },
    /// Jump if accumulator >= k
    JumpGe { k: u64, jt: u8, jf: u8 },
    /// Jump if accumulator & k != 0
    JumpSet { k: u64, jt: u8, jf: u8 },
    /// Unconditional jump
    Jump(u8),
    /// Terminate with action
    Return(Action),
}

impl Instruction {
    /// `JumpEq` shorthand
    pub const fn jeq(k: u64, jt: u8, jf: u8) -> Self {
        Self::JumpEq { k, jt, jf }
    }
}

/// Program validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    Empty,
    TooLong,
    InvalidJump,
    InvalidArgIndex,
    NoTerminator,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty program"),
            Self::TooLong => write!(f, "program exceeds the instruction limit"),
            Self::InvalidJump => write!(f, "jump target out of bounds"),
            Self::InvalidArgIndex => write!(f, "argument index out of range"),
            Self::NoTerminator => write!(f, "program does not end in a return"),
        }
    }
}

/// Seccomp Filter
///
/// Immutable once built; contexts hold it behind an `Arc` and swap the whole
/// filter, never patch it.
#[derive(Debug, Clone)]
pub struct SeccompFilter {
    program: Arc<[Instruction]>,
}

impl SeccompFilter {
    /// Validate and build a filter
    pub fn new(program: &[Instruction], max_insns: usize) -> Result<Self, FilterError> {
        validate_program(program, max_insns)?;
        Ok(Self {
            program: program.into(),
        })
    }

    /// Strict profile (see [`program::strict`])
    pub fn strict() -> Self {
        Self {
            program: program::strict().into(),
        }
    }

    /// Deny `nrs` with `action`, allow everything else
    pub fn deny_syscalls(nrs: &[u32], action: Action, max_insns: usize) -> Result<Self, FilterError> {
        Self::new(&program::deny_list(nrs, action)?, max_insns)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.program.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.program
    }

    /// Run the program against a syscall
    pub fn evaluate(&self, record: &SyscallRecord) -> Action {
        let prog = &self.program;
        let mut acc: u64 = 0;
        let mut pc: usize = 0;
        // Forward-only jumps: a valid program never needs more steps than
        // it has instructions.
        let mut budget = prog.len();

        while budget > 0 {
            budget -= 1;
            let Some(insn) = prog.get(pc) else {
                return Action::Kill;
            };

            match *insn {
                Instruction::Load(field) => {
                    acc = load(record, field);
                    pc += 1;
                }
                Instruction::And(k) => {
                    acc &= k;
                    pc += 1;
                }
                Instruction::JumpEq { k, jt, jf } => pc = branch(pc, acc == k, jt, jf),
                Instruction::JumpGt { k, jt, jf } => pc = branch(pc, acc > k, jt, jf),
                Instruction::JumpGe { k, jt, jf } => pc = branch(pc, acc >= k, jt, jf),
                Instruction::JumpSet { k, jt, jf } => pc = branch(pc, acc & k != 0, jt, jf),
                Instruction::Jump(off) => pc += 1 + off as usize,
                Instruction::Return(action) => return action,
            }
        }

        log::warn!("seccomp: step budget exhausted at pc {}, killing", pc);
        Action::Kill
    }
}

#[inline]
fn load(record: &SyscallRecord, field: Field) -> u64 {
    match field {
        Field::Nr => record.nr as u64,
        Field::Arch => record.arch as u64,
        Field::InstructionPointer => record.instruction_pointer,
        Field::Arg(idx) => record.args.get(idx as usize).copied().unwrap_or(0),
    }
}

#[inline]
fn branch(pc: usize, taken: bool, jt: u8, jf: u8) -> usize {
    pc + 1 + if taken { jt as usize } else { jf as usize }
}

fn validate_program(prog: &[Instruction], max_insns: usize) -> Result<(), FilterError> {
    if prog.is_empty() {
        return Err(FilterError::Empty);
    }
    if prog.len() > max_insns {
        return Err(FilterError::TooLong);
    }

    for (i, insn) in prog.iter().enumerate() {
        match *insn {
            Instruction::Load(Field::Arg(idx)) if idx >= 6 => {
                return Err(FilterError::InvalidArgIndex);
            }
            Instruction::JumpEq { jt, jf, .. }
            | Instruction::JumpGt { jt, jf, .. }
            | Instruction::JumpGe { jt, jf, .. }
            | Instruction::JumpSet { jt, jf, .. } => {
                if i + 1 + jt as usize >= prog.len() || i + 1 + jf as usize >= prog.len() {
                    return Err(FilterError::InvalidJump);
                }
            }
            Instruction::Jump(off) => {
                if i + 1 + off as usize >= prog.len() {
                    return Err(FilterError::InvalidJump);
                }
            }
            _ => {}
        }
    }

    // Anything but a Return at the end would fall off the program
    match prog.last() {
        Some(Instruction::Return(_)) => Ok(()),
        _ => Err(FilterError::NoTerminator),
    }
}

/// Program builders
pub mod program {
    use super::*;

    /// Allow only `allowed`, answer `otherwise` for everything else
    pub fn allow_list(allowed: &[u32], otherwise: Action) -> Result<Vec<Instruction>, FilterError> {
        if allowed.len() > u8::MAX as usize {
            return Err(FilterError::TooLong);
        }
        let n = allowed.len();
        let mut prog = Vec::with_capacity(n + 3);
        prog.push(Instruction::Load(Field::Nr));
        for (i, nr) in allowed.iter().enumerate() {
            // Allow sits after the n jumps and the fallback return
            prog.push(Instruction::jeq(*nr as u64, (n - i) as u8, 0));
        }
        prog.push(Instruction::Return(otherwise));
        prog.push(Instruction::Return(Action::Allow));
        Ok(prog)
    }

    /// Answer `action` for `denied`, allow everything else
    pub fn deny_list(denied: &[u32], action: Action) -> Result<Vec<Instruction>, FilterError> {
        if denied.len() > u8::MAX as usize {
            return Err(FilterError::TooLong);
        }
        let n = denied.len();
        let mut prog = Vec::with_capacity(n + 3);
        prog.push(Instruction::Load(Field::Nr));
        for (i, nr) in denied.iter().enumerate() {
            prog.push(Instruction::jeq(*nr as u64, (n - i) as u8, 0));
        }
        prog.push(Instruction::Return(Action::Allow));
        prog.push(Instruction::Return(action));
        Ok(prog)
    }

    /// Strict profile: read, write, exit, exit_group; kill the rest
    pub fn strict() -> Vec<Instruction> {
        let mut prog = alloc::vec![Instruction::Load(Field::Nr)];
        prog.extend_from_slice(&[
            Instruction::jeq(0, 4, 0),   // read
            Instruction::jeq(1, 3, 0),   // write
            Instruction::jeq(60, 2, 0),  // exit
            Instruction::jeq(231, 1, 0), // exit_group
            Instruction::Return(Action::Kill),
            Instruction::Return(Action::Allow),
        ]);
        prog
    }
}
