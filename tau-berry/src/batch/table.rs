//! 结果表.

use crate::{FailureKind, Phase};
use ndarray::{Array3, Axis};
use std::io::{self, Write};

/// 结果表中的一个格子.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TauCell {
    /// 尚未计算.
    #[default]
    Pending,

    /// 迂曲度.
    Value(f64),

    /// 计算失败 (仅在 fail-soft 模式下出现).
    Failed(FailureKind),
}

impl TauCell {
    /// 获取迂曲度值.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// 是否已经计算 (无论成功与否).
    #[inline]
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// 保留三位小数的显示形式. 未成功的格子显示为 `/`.
    pub fn rounded(&self) -> String {
        match self {
            Self::Value(v) => format!("{v:.3}"),
            _ => "/".to_string(),
        }
    }
}

/// 以 (时间点, 重复组, 相) 为索引的迂曲度结果表.
#[derive(Debug, Clone, PartialEq)]
pub struct TauTable {
    times: Vec<u32>,
    repeats: Vec<String>,
    cells: Array3<TauCell>,
}

/// 表中的一条记录.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TauRecord {
    /// 时间点.
    pub time: u32,

    /// 重复组名称.
    pub repeat: String,

    /// 相.
    pub phase: Phase,

    /// 迂曲度. 失败或未计算时为 `None`.
    pub tau: Option<f64>,

    /// 失败种类.
    pub failure: Option<FailureKind>,
}

/// 某个 (时间点, 相) 在所有重复组上的统计.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PhaseSummary {
    /// 时间点.
    pub time: u32,

    /// 相.
    pub phase: Phase,

    /// 成功计算的重复组个数.
    pub n: usize,

    /// 平均值. `n == 0` 时为 `None`.
    pub mean: Option<f64>,

    /// 样本标准差. `n < 2` 时为 `None`.
    pub std: Option<f64>,
}

impl TauTable {
    /// 创建全部为 [`TauCell::Pending`] 的结果表.
    pub fn new(times: Vec<u32>, repeats: Vec<String>) -> Self {
        let cells = Array3::default((times.len(), repeats.len(), Phase::ALL.len()));
        Self {
            times,
            repeats,
            cells,
        }
    }

    /// 时间点.
    #[inline]
    pub fn times(&self) -> &[u32] {
        &self.times
    }

    /// 重复组名称.
    #[inline]
    pub fn repeats(&self) -> &[String] {
        &self.repeats
    }

    /// 获取格子. 下标越界时 panic.
    #[inline]
    pub fn get(&self, time_index: usize, repeat_index: usize, phase: Phase) -> TauCell {
        self.cells[(time_index, repeat_index, phase.index())]
    }

    /// 写入格子. 下标越界时 panic.
    #[inline]
    pub fn set(&mut self, time_index: usize, repeat_index: usize, phase: Phase, cell: TauCell) {
        self.cells[(time_index, repeat_index, phase.index())] = cell;
    }

    /// 是否所有格子都已计算.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(TauCell::is_done)
    }

    /// 失败的格子个数.
    pub fn failures(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, TauCell::Failed(_)))
            .count()
    }

    /// 按 (时间点, 重复组, 相) 顺序展开所有格子.
    pub fn records(&self) -> Vec<TauRecord> {
        self.cells
            .indexed_iter()
            .map(|((t, r, p), cell)| TauRecord {
                time: self.times[t],
                repeat: self.repeats[r].clone(),
                phase: Phase::ALL[p],
                tau: cell.value(),
                failure: match cell {
                    TauCell::Failed(k) => Some(*k),
                    _ => None,
                },
            })
            .collect()
    }

    /// 每个 (时间点, 相) 在重复组上的均值与标准差.
    pub fn summary(&self) -> Vec<PhaseSummary> {
        let mut ans = Vec::with_capacity(self.times.len() * Phase::ALL.len());
        for (t, plane) in self.cells.axis_iter(Axis(0)).enumerate() {
            for phase in Phase::ALL {
                let values: Vec<f64> = plane
                    .index_axis(Axis(1), phase.index())
                    .iter()
                    .filter_map(TauCell::value)
                    .collect();
                let n = values.len();
                let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
                let std = mean.filter(|_| n >= 2).map(|m| {
                    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
                    (ss / (n - 1) as f64).sqrt()
                });
                ans.push(PhaseSummary {
                    time: self.times[t],
                    phase,
                    n,
                    mean,
                    std,
                });
            }
        }
        ans
    }

    /// 以 CSV 格式写出所有记录. 含逗号或引号的字段会按 CSV 规则加引号.
    pub fn write_csv<W: Write>(&self, w: W) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(w);
        wtr.write_record(["time", "repeat", "phase", "tau", "status"])?;
        for rec in self.records() {
            let tau = rec.tau.map(|v| v.to_string()).unwrap_or_default();
            let status = match (rec.tau, rec.failure) {
                (_, Some(k)) => k.to_string(),
                (Some(_), None) => "ok".to_string(),
                (None, None) => "pending".to_string(),
            };
            wtr.write_record([
                rec.time.to_string().as_str(),
                rec.repeat.as_str(),
                rec.phase.name(),
                tau.as_str(),
                status.as_str(),
            ])?;
        }
        wtr.flush()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TauTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("TauTable", 4)?;
        s.serialize_field("times", &self.times)?;
        s.serialize_field("repeats", &self.repeats)?;
        s.serialize_field("records", &self.records())?;
        s.serialize_field("summary", &self.summary())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::{TauCell, TauTable};
    use crate::{FailureKind, Phase};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    fn table() -> TauTable {
        TauTable::new(vec![0, 4], vec!["R1".to_string(), "R2".to_string()])
    }

    #[test]
    fn test_fill_and_complete() {
        let mut t = table();
        assert!(!t.is_complete());
        assert_eq!(t.get(1, 1, Phase::Total), TauCell::Pending);

        for ti in 0..2 {
            for ri in 0..2 {
                for p in Phase::ALL {
                    t.set(ti, ri, p, TauCell::Value(1.0 + ti as f64));
                }
            }
        }
        t.set(0, 1, Phase::Precipitate, TauCell::Failed(FailureKind::EmptyPhase));
        assert!(t.is_complete());
        assert_eq!(t.failures(), 1);
        assert_eq!(t.records().len(), 12);
    }

    #[test]
    fn test_summary() {
        let mut t = table();
        t.set(0, 0, Phase::Porosity, TauCell::Value(1.0));
        t.set(0, 1, Phase::Porosity, TauCell::Value(3.0));
        t.set(1, 0, Phase::Total, TauCell::Value(2.5));
        t.set(1, 1, Phase::Total, TauCell::Failed(FailureKind::DegenerateFit));

        let s = t.summary();
        assert_eq!(s.len(), 6);

        let por0 = s[0];
        assert_eq!((por0.time, por0.phase, por0.n), (0, Phase::Porosity, 2));
        assert!(f64_eq(por0.mean.unwrap(), 2.0));
        assert!(f64_eq(por0.std.unwrap(), 2f64.sqrt()));

        let tot1 = s[5];
        assert_eq!((tot1.time, tot1.phase, tot1.n), (4, Phase::Total, 1));
        assert!(f64_eq(tot1.mean.unwrap(), 2.5));
        assert_eq!(tot1.std, None);

        assert_eq!(s[1].mean, None);
    }

    #[test]
    fn test_csv() {
        let mut t = TauTable::new(vec![2], vec!["R1".to_string()]);
        t.set(0, 0, Phase::Porosity, TauCell::Value(1.5));
        t.set(0, 0, Phase::Precipitate, TauCell::Failed(FailureKind::EmptyPhase));

        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "time,repeat,phase,tau,status",
                "2,R1,porosity,1.5,ok",
                "2,R1,precipitate,,EmptyPhase",
                "2,R1,total,,pending",
            ]
        );
    }

    #[test]
    fn test_csv_quotes_names() {
        let mut t = TauTable::new(vec![0], vec!["PC,Scan_R1".to_string()]);
        t.set(0, 0, Phase::Porosity, TauCell::Value(1.0));

        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("0,\"PC,Scan_R1\",porosity,1,ok"));

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let first = rdr.records().next().unwrap().unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(&first[1], "PC,Scan_R1");
    }

    #[test]
    fn test_rounded() {
        assert_eq!(TauCell::Value(1.23456).rounded(), "1.235");
        assert_eq!(TauCell::Pending.rounded(), "/");
    }
}
