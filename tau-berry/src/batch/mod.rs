//! 批处理驱动.
//!
//! 按重复组、时间点的嵌套顺序依次处理每张扫描: 加载 → 三相分割 → 三次迂曲度估计 → 写入结果表.
//! 处理过程严格串行, `(t, r)` 的结果写入后才会开始下一对.

use crate::dataset::{time_loader, RepeatDir, ScanSource};
use crate::walk::{WalkConfig, WalkEngine};
use crate::{estimate_tortuosity, FailureKind, Phase, PhaseMasks, TauError, Thresholds};
use std::io::{self, Write};
use std::path::PathBuf;

mod table;

pub use table::{PhaseSummary, TauCell, TauRecord, TauTable};

const SEP: &str = "--------------------------------------------------------";

/// 单张扫描或单个相失败时的处理策略.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ErrorPolicy {
    /// 立即终止整个批处理.
    #[default]
    FailFast,

    /// 在结果表中记录失败种类, 然后继续.
    FailSoft,
}

/// 批处理配置.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// 分相阈值.
    pub thresholds: Thresholds,

    /// 时间点, 按此顺序处理.
    pub times: Vec<u32>,

    /// 随机游走参数.
    pub walk: WalkConfig,

    /// 失败处理策略.
    pub policy: ErrorPolicy,

    /// 若非空, 把每张扫描的三相掩膜中间层保存到该目录.
    pub preview: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            times: crate::consts::TIME_POINTS.to_vec(),
            walk: WalkConfig::default(),
            policy: ErrorPolicy::default(),
            preview: None,
        }
    }
}

/// 批处理错误.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// 某个 (重复组, 时间点, 相) 处理失败. 加载或分割失败时 `phase` 为 `None`.
    #[error("{repeat} @ t={time} [{}]: {source}", phase_label(.phase))]
    Cell {
        /// 重复组名称.
        repeat: String,

        /// 时间点.
        time: u32,

        /// 相.
        phase: Option<Phase>,

        /// 底层错误.
        #[source]
        source: TauError,
    },

    /// 写进度报告失败.
    #[error("cannot write progress: {0}")]
    Report(#[from] io::Error),
}

/// 报告中的相名称. `None` 表示三相都受影响.
fn phase_label(phase: &Option<Phase>) -> &'static str {
    phase.map_or("all phases", Phase::name)
}

/// 运行批处理.
///
/// 对 `repeats` 中的每个重复组 (按给定顺序) 和 `config.times` 中的每个时间点 (按给定顺序),
/// 从 `source` 加载扫描并计算三相迂曲度, 结果写入返回的表中. 每处理完一对
/// (重复组, 时间点) 就向 `out` 写一行进度, 每个重复组之后写一条分隔线.
///
/// # 错误
///
/// 在 [`ErrorPolicy::FailFast`] 下, 第一个失败会终止批处理并返回 [`BatchError::Cell`].
/// 在 [`ErrorPolicy::FailSoft`] 下, 失败会被记录为 [`TauCell::Failed`] 并继续.
pub fn run_batch<S, E, W>(
    repeats: &[RepeatDir],
    source: &S,
    config: &BatchConfig,
    engine: &mut E,
    out: &mut W,
) -> Result<TauTable, BatchError>
where
    S: ScanSource + ?Sized,
    E: WalkEngine + ?Sized,
    W: Write + ?Sized,
{
    let mut table = TauTable::new(
        config.times.clone(),
        repeats.iter().map(RepeatDir::name).collect(),
    );
    log::info!(
        "running {} repeat(s) x {} time point(s), thresholds ({}, {})",
        repeats.len(),
        config.times.len(),
        config.thresholds.lower(),
        config.thresholds.upper()
    );

    for (ri, repeat) in repeats.iter().enumerate() {
        let name = repeat.name();
        let loader = time_loader(source, repeat, config.times.iter().copied());
        for (ti, (time, scan)) in loader.enumerate() {
            let fail = |phase: Option<Phase>, err: TauError| BatchError::Cell {
                repeat: name.clone(),
                time,
                phase,
                source: err,
            };

            let masks = match scan {
                Ok(scan) => config.thresholds.segment(&scan),
                Err(e) => {
                    let err = TauError::Load {
                        path: source.locate(repeat, time),
                        source: e,
                    };
                    match config.policy {
                        ErrorPolicy::FailFast => return Err(fail(None, err)),
                        ErrorPolicy::FailSoft => {
                            log::warn!("{}", fail(None, err));
                            for p in Phase::ALL {
                                table.set(ti, ri, p, TauCell::Failed(FailureKind::LoadFailure));
                            }
                            report_line(out, &table, &name, time, ti, ri)?;
                            continue;
                        }
                    }
                }
            };
            save_preview(config, &masks, &name, time);

            for (phase, mask) in masks.iter() {
                log::debug!(
                    "{name} @ t={time}: {phase} fraction {:.4}",
                    masks.fraction(phase)
                );
                let cell = match estimate_tortuosity(mask, &config.walk, engine) {
                    Ok(tau) => TauCell::Value(tau),
                    Err(e) => match config.policy {
                        ErrorPolicy::FailFast => return Err(fail(Some(phase), e)),
                        ErrorPolicy::FailSoft => {
                            let kind = e.kind();
                            log::warn!("{} ({kind}), skipped", fail(Some(phase), e));
                            TauCell::Failed(kind)
                        }
                    },
                };
                table.set(ti, ri, phase, cell);
            }
            report_line(out, &table, &name, time, ti, ri)?;
        }
        writeln!(out, "{SEP}")?;
    }

    Ok(table)
}

/// 写一行进度: 三个相的迂曲度, 保留三位小数.
fn report_line<W: Write + ?Sized>(
    out: &mut W,
    table: &TauTable,
    repeat: &str,
    time: u32,
    ti: usize,
    ri: usize,
) -> io::Result<()> {
    let [a, b, c] = Phase::ALL.map(|p| table.get(ti, ri, p).rounded());
    let line = format!("{repeat} t={time}: porosity {a}, precipitate {b}, total {c}");
    log::info!("{line}");
    writeln!(out, "{line}")
}

fn save_preview(config: &BatchConfig, masks: &PhaseMasks, repeat: &str, time: u32) {
    let Some(dir) = config.preview.as_ref() else {
        return;
    };
    match masks.save_mid_slices(dir, &format!("{repeat}_t{time}")) {
        Ok(true) => {}
        Ok(false) => log::warn!("{repeat} @ t={time} has no slices, preview skipped"),
        Err(e) => log::warn!("cannot save mask preview for {repeat} @ t={time}: {e}"),
    }
}
