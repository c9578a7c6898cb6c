//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::{segment, PcScan, Phase, PhaseMasks, Thresholds};

pub use crate::{estimate_tortuosity, FailureKind, TauError, TauResult};

pub use crate::walk::{LatticeWalker, WalkConfig, WalkEngine};

pub use crate::dataset::{discover_repeats, PatternSource, RepeatDir, ScanPattern, ScanSource};

pub use crate::batch::{run_batch, BatchConfig, BatchError, ErrorPolicy, TauCell, TauTable};
