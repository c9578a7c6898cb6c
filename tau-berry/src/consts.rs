//! 通用常量. 均为默认值, 运行时可通过配置覆盖.

/// 默认阈值. 灰度值按 8-bit 重建结果计.
pub mod gray {
    /// 孔隙相上界 (同时是沉淀相下界).
    pub const POROSITY_UPPER: f32 = 60.0;

    /// 沉淀相上界 (同时是总空隙相上界).
    pub const PRECIPITATE_UPPER: f32 = 120.0;
}

/// 随机游走默认参数.
pub mod walk {
    /// 模拟步数.
    pub const TIME_STEPS: usize = 10_000;

    /// 游走粒子个数.
    pub const WALKERS: usize = 20_000;

    /// 每步位移 (体素).
    pub const STRIDE: usize = 1;

    /// 并行度.
    pub const NUM_PROC: usize = 4;
}

/// 数据集命名规则.
pub mod naming {
    /// 重复组目录前缀. 目录名形如 `PCScan4_R3`.
    pub const REPEAT_PREFIX: &str = "PCScan4_R";

    /// 扫描文件名模式. `{t}` 会被替换为时间点.
    pub const SCAN_PATTERN: &str = "PCScan4_t{t}.nrrd";

    /// 时间点占位符.
    pub const TIME_PLACEHOLDER: &str = "{t}";

    /// 默认丢弃的最大编号重复组个数.
    pub const DROP_LAST_REPEATS: usize = 2;

    /// 数据集在 `$HOME/dataset` 下的默认子目录.
    pub const HOME_SUBDIR: &str = "pcscan";
}

/// 默认扫描时间点.
pub const TIME_POINTS: [u32; 6] = [0, 2, 4, 6, 8, 10];
