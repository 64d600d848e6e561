use crate::asset::{LoopOp, MAX_LOOPS};
use crate::error::AssetLoadError;

/// Bound and step metadata for one nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLevel {
    /// Trip count of this level.
    pub range: u32,
    /// Address of the instruction issued when this level advances.
    pub addr: usize,
}

/// Concrete per-level loop bounds, innermost level first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopGeometry {
    levels: Vec<LoopLevel>,
}

impl LoopGeometry {
    /// Pair the asset's loop operations with a trip count per level.
    ///
    /// The nest must have between 1 and `MAX_LOOPS` levels.
    pub fn new(loops_ops: &[LoopOp], loops_range: &[u32]) -> Result<Self, AssetLoadError> {
        if loops_ops.is_empty() || loops_ops.len() > MAX_LOOPS {
            return Err(AssetLoadError::UnsupportedDepth {
                depth: loops_ops.len(),
            });
        }
        if loops_ops.len() != loops_range.len() {
            return Err(AssetLoadError::ConfigMismatch {
                loops: loops_ops.len(),
                ranges: loops_range.len(),
            });
        }
        let levels = loops_ops
            .iter()
            .zip(loops_range)
            .enumerate()
            .map(|(level, (op, &range))| {
                if range == 0 {
                    return Err(AssetLoadError::InvalidRange { level, count: range });
                }
                Ok(LoopLevel {
                    range,
                    addr: op.addr,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels })
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &LoopLevel {
        &self.levels[level]
    }

    pub fn levels(&self) -> &[LoopLevel] {
        &self.levels
    }

    /// Total number of logical iterations across the whole nest, saturating
    /// at `u64::MAX`.
    pub fn total_iterations(&self) -> u64 {
        self.levels
            .iter()
            .fold(1u64, |acc, l| acc.saturating_mul(u64::from(l.range)))
    }
}
