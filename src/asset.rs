use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AssetLoadError;
use crate::registers::Reg;

/// Maximum nesting depth supported by the loop controller.
pub const MAX_LOOPS: usize = 6;

/// The microcode shipped with the crate: a single loop advancing `a`/`b` by
/// `iter_stride` and `c`/`d` by `one_stride`.
pub const BUILTIN_ASSET: &str = include_str!("../microcode/uloop.yml");

/// A single register operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// `dst = dst + src`
    Add,
    /// `dst = src`
    Mv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MicroOp {
    pub op: OpKind,
    pub dst: Reg,
    pub src: Reg,
}

/// One microcode instruction. All of its ops read the register file as it
/// was at the start of the cycle and are applied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub ops: Vec<MicroOp>,
}

/// A loop level as declared by the asset, resolved to the address of the
/// instruction it issues on each iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOp {
    pub name: String,
    pub addr: usize,
}

#[derive(Deserialize)]
struct RawAsset {
    code: Vec<RawInstruction>,
    loops: Vec<RawLoop>,
}

#[derive(Deserialize)]
struct RawInstruction {
    mnemonic: String,
    #[serde(default)]
    ops: Vec<MicroOp>,
}

#[derive(Deserialize)]
struct RawLoop {
    name: String,
    code: String,
}

/// A loaded microcode program: loop operations (innermost level first), the
/// instruction stream, and the mnemonic table used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Microcode {
    pub loops: Vec<LoopOp>,
    pub code: Vec<Instruction>,
    pub mnemonics: Vec<String>,
}

impl Microcode {
    /// Parse and validate a YAML microcode description.
    pub fn from_yaml(yaml: &str) -> Result<Self, AssetLoadError> {
        let raw: RawAsset = serde_yaml::from_str(yaml)?;

        if raw.code.is_empty() {
            return Err(AssetLoadError::Invalid("no instructions in `code`".to_string()));
        }
        if raw.loops.is_empty() {
            return Err(AssetLoadError::Invalid("no loops declared".to_string()));
        }
        if raw.loops.len() > MAX_LOOPS {
            return Err(AssetLoadError::Invalid(format!(
                "{} loops declared, at most {MAX_LOOPS} are supported",
                raw.loops.len()
            )));
        }

        let mut addr_of: HashMap<&str, usize> = HashMap::new();
        for (addr, instr) in raw.code.iter().enumerate() {
            if addr_of.insert(instr.mnemonic.as_str(), addr).is_some() {
                return Err(AssetLoadError::Invalid(format!(
                    "duplicate mnemonic `{}`",
                    instr.mnemonic
                )));
            }
            if let Some(op) = instr.ops.iter().find(|op| !op.dst.is_accumulator()) {
                return Err(AssetLoadError::Invalid(format!(
                    "`{}` writes read-only register {}",
                    instr.mnemonic, op.dst
                )));
            }
        }

        let loops = raw
            .loops
            .iter()
            .map(|l| match addr_of.get(l.code.as_str()) {
                Some(&addr) => Ok(LoopOp {
                    name: l.name.clone(),
                    addr,
                }),
                None => Err(AssetLoadError::Invalid(format!(
                    "loop `{}` references unknown instruction `{}`",
                    l.name, l.code
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mnemonics = raw.code.iter().map(|i| i.mnemonic.clone()).collect();
        let code = raw
            .code
            .into_iter()
            .map(|i| Instruction { ops: i.ops })
            .collect();

        Ok(Self {
            loops,
            code,
            mnemonics,
        })
    }

    /// Load a microcode description from a YAML file.
    pub fn load(path: &Path) -> Result<Self, AssetLoadError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// The built-in single-loop microcode.
    pub fn builtin() -> Result<Self, AssetLoadError> {
        Self::from_yaml(BUILTIN_ASSET)
    }

    pub fn nb_loops(&self) -> usize {
        self.loops.len()
    }

    pub fn mnemonic(&self, addr: usize) -> &str {
        self.mnemonics.get(addr).map(String::as_str).unwrap_or("???")
    }

    /// Pretty-print the program for human inspection.
    pub fn disassemble(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (addr, instr) in self.code.iter().enumerate() {
            let _ = writeln!(out, "{addr:02}: {}", self.mnemonic(addr));
            for op in &instr.ops {
                let _ = match op.op {
                    OpKind::Add => writeln!(out, "      {} += {}", op.dst, op.src),
                    OpKind::Mv => writeln!(out, "      {} = {}", op.dst, op.src),
                };
            }
        }
        for (level, l) in self.loops.iter().enumerate() {
            let _ = writeln!(out, "loop {level} ({}) -> {:02}", l.name, l.addr);
        }
        out
    }
}
