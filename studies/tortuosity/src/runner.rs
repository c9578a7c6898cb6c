//! 程序运行函数.

use crate::result::StudyResult;
use anyhow::{bail, Context};
use std::io;
use std::path::PathBuf;
use std::time::Instant;
use tau_berry::batch::run_batch;
use tau_berry::dataset::{discover_repeats, PatternSource};
use tau_berry::walk::LatticeWalker;
use utils::config::StudyConfig;
use utils::loader;

/// 数据集根目录: 命令行或配置文件给出的优先, 否则从环境变量或主目录推断.
fn resolve_root(config: &StudyConfig) -> anyhow::Result<PathBuf> {
    let root = match config.root.clone() {
        Some(r) => r,
        None => loader::dataset_dir_from_env_or_home()
            .context("cannot locate the dataset: pass --root or set $PCSCAN_DIR")?,
    };
    if !root.is_dir() {
        bail!("dataset root `{}` is not a directory", root.display());
    }
    Ok(root)
}

/// 实际运行.
pub fn run(config: &StudyConfig) -> anyhow::Result<StudyResult> {
    let batch = config.batch_config()?;
    let source = PatternSource::new(config.pattern()?);
    let root = resolve_root(config)?;

    let repeats = discover_repeats(&root, &config.dataset.prefix, config.dataset.drop_last)
        .with_context(|| format!("cannot list repeats under `{}`", root.display()))?;
    if repeats.is_empty() {
        bail!(
            "no `{}*` repeat left under `{}` (drop_last = {})",
            config.dataset.prefix,
            root.display(),
            config.dataset.drop_last
        );
    }

    println!(
        "Running tortuosity study on {} repeat(s) under `{}`...",
        repeats.len(),
        root.display()
    );
    utils::sep();

    let start = Instant::now();
    let mut engine = LatticeWalker::new();
    let stdout = io::stdout();
    let table = run_batch(&repeats, &source, &batch, &mut engine, &mut stdout.lock())?;
    Ok(StudyResult::new(table, start.elapsed()))
}
