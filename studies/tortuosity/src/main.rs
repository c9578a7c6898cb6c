//! 批量计算多孔介质 CT 扫描序列的三相路径迂曲度.
//!
//! # Usage
//! ```bash
//! tortuosity --root /data/pcscan --times 0,2,4 --nt 2000 --nw 5000 --json tau.json
//! ```

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use utils::config::StudyConfig;

mod result;
mod runner;

#[derive(Parser, Debug)]
#[command(name = "tortuosity")]
#[command(about = "Path tortuosity of segmented porous CT scans via random-walk MSD fitting")]
#[command(version)]
struct Args {
    /// TOML configuration file. Flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset root containing the repeat directories. Falls back to the config file,
    /// then `$PCSCAN_DIR`, then `$HOME/dataset/pcscan`
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Upper intensity bound of the porosity phase
    #[arg(long)]
    lower: Option<f32>,

    /// Upper intensity bound of the precipitate phase
    #[arg(long)]
    upper: Option<f32>,

    /// Scan time points, in processing order
    #[arg(short, long, value_delimiter = ',')]
    times: Option<Vec<u32>>,

    /// Number of simulated time steps
    #[arg(long)]
    nt: Option<usize>,

    /// Number of walkers
    #[arg(long)]
    nw: Option<usize>,

    /// Voxels moved per step
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    stride: Option<u64>,

    /// Worker threads used by the random walk
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    num_proc: Option<u64>,

    /// Start every walker from the same random voxel
    #[arg(long)]
    same_start: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Repeat directory prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Scan file name pattern; `{t}` is replaced by the time point
    #[arg(long)]
    pattern: Option<String>,

    /// Exclude this many highest-indexed repeats
    #[arg(long)]
    drop_last: Option<usize>,

    /// Record failed cells and keep going instead of aborting
    #[arg(long)]
    fail_soft: bool,

    /// Save the middle slice of every phase mask as PNG into this directory
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Write the results table as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the results table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl Args {
    /// 在 `base` 上应用命令行覆盖项.
    fn apply(self, mut base: StudyConfig) -> StudyConfig {
        macro_rules! set {
            ($($field: expr => $value: expr),+ $(,)?) => {
                $(if let Some(v) = $value {
                    $field = v;
                })+
            };
        }
        set! {
            base.thresholds.lower => self.lower,
            base.thresholds.upper => self.upper,
            base.times => self.times,
            base.walk.nt => self.nt,
            base.walk.nw => self.nw,
            base.walk.stride => self.stride.map(|v| v as usize),
            base.walk.num_proc => self.num_proc.map(|v| v as usize),
            base.dataset.prefix => self.prefix,
            base.dataset.pattern => self.pattern,
            base.dataset.drop_last => self.drop_last,
        }
        if self.root.is_some() {
            base.root = self.root;
        }
        if self.seed.is_some() {
            base.walk.seed = self.seed;
        }
        if self.preview.is_some() {
            base.preview = self.preview;
        }
        base.walk.same_start |= self.same_start;
        if self.fail_soft {
            base.policy = tau_berry::batch::ErrorPolicy::FailSoft;
        }
        base
    }
}

fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let args = Args::parse();
    let base = match args.config.as_ref() {
        Some(p) => StudyConfig::load(p)?,
        None => StudyConfig::default(),
    };
    let (json, csv) = (args.json.clone(), args.csv.clone());
    let config = args.apply(base);

    let outcome = runner::run(&config)?;
    outcome.analyze();
    if let Some(p) = json {
        outcome.write_json(&p)?;
    }
    if let Some(p) = csv {
        outcome.write_csv(&p)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use tau_berry::batch::ErrorPolicy;
    use utils::config::StudyConfig;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "tortuosity",
            "--root",
            "/tmp/pc",
            "--times",
            "4,0,2",
            "--lower",
            "30",
            "--nt",
            "100",
            "--stride",
            "2",
            "--same-start",
            "--fail-soft",
        ]);
        let c = args.apply(StudyConfig::default());
        assert_eq!(c.root.as_deref(), Some(std::path::Path::new("/tmp/pc")));
        assert_eq!(c.times, [4, 0, 2]);
        assert_eq!(c.thresholds.lower, 30.0);
        assert_eq!(c.thresholds.upper, 120.0);
        assert_eq!(c.walk.nt, 100);
        assert_eq!(c.walk.nw, 20_000);
        assert_eq!(c.walk.stride, 2);
        assert!(c.walk.same_start);
        assert_eq!(c.policy, ErrorPolicy::FailSoft);
    }

    #[test]
    fn test_zero_stride_rejected() {
        assert!(Args::try_parse_from(["tortuosity", "--stride", "0"]).is_err());
    }
}
