//! 研究结果.

use anyhow::Context;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tau_berry::batch::{PhaseSummary, TauTable};

/// 将 `summary` 写进 `w` 中.
fn describe_into<W: Write>(summary: &[PhaseSummary], w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    let mut last = None;
    for s in summary {
        if last != Some(s.time) {
            writeln!(w, "t = {}:", s.time)?;
            last = Some(s.time);
        }
        writeln!(
            w,
            "{S4}{:<12}{} ± {} (n = {})",
            s.phase.name(),
            f64_to_display(s.mean),
            f64_to_display(s.std),
            s.n
        )?;
    }
    Ok(())
}

/// 迂曲度研究最终结果.
#[derive(Debug)]
pub struct StudyResult {
    table: TauTable,
    elapsed: Duration,
}

impl StudyResult {
    pub fn new(table: TauTable, elapsed: Duration) -> Self {
        Self { table, elapsed }
    }

    /// 结果表.
    #[allow(dead_code)]
    pub fn table(&self) -> &TauTable {
        &self.table
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        let mut buf = Vec::with_capacity(512);
        match describe_into(&self.table.summary(), &mut buf) {
            Ok(()) => print!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => log::error!("cannot format summary: {e}"),
        }
        utils::sep();

        let failures = self.table.failures();
        if failures > 0 {
            log::warn!("{failures} cell(s) failed");
        }
        println!("Finished in {:.1} s", self.elapsed.as_secs_f64());
    }

    /// 以 JSON 格式保存结果表.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path).with_context(|| format!("cannot create `{}`", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.table)
            .with_context(|| format!("cannot write `{}`", path.display()))?;
        log::info!("results written to `{}`", path.display());
        Ok(())
    }

    /// 以 CSV 格式保存结果表.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path).with_context(|| format!("cannot create `{}`", path.display()))?;
        let mut w = BufWriter::new(file);
        self.table
            .write_csv(&mut w)
            .and_then(|_| w.flush())
            .with_context(|| format!("cannot write `{}`", path.display()))?;
        log::info!("results written to `{}`", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_into, StudyResult};
    use std::time::Duration;
    use tau_berry::batch::{TauCell, TauTable};
    use tau_berry::{FailureKind, Phase};

    fn table() -> TauTable {
        let mut t = TauTable::new(vec![0], vec!["R1".to_string(), "R2".to_string()]);
        t.set(0, 0, Phase::Porosity, TauCell::Value(2.0));
        t.set(0, 1, Phase::Porosity, TauCell::Value(4.0));
        t.set(0, 0, Phase::Precipitate, TauCell::Value(3.0));
        t.set(0, 1, Phase::Precipitate, TauCell::Failed(FailureKind::EmptyPhase));
        t
    }

    #[test]
    fn test_describe() {
        let mut buf = Vec::new();
        describe_into(&table().summary(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "t = 0:");
        assert_eq!(lines[1], "    porosity    3.000 ± 1.414 (n = 2)");
        assert_eq!(lines[2], "    precipitate 3.000 ± / (n = 1)");
        assert_eq!(lines[3], "    total       / ± / (n = 0)");
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let r = StudyResult::new(table(), Duration::from_secs(1));

        let json = dir.path().join("tau.json");
        r.write_json(&json).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(v["records"].as_array().unwrap().len(), 6);
        assert_eq!(v["repeats"][1], "R2");

        let csv = dir.path().join("tau.csv");
        r.write_csv(&csv).unwrap();
        let text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(text.lines().count(), 7);
        assert!(text.contains("0,R2,precipitate,,EmptyPhase"));
    }
}
