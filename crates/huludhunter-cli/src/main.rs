use anyhow::{bail, Context, Result};
use clap::Parser;
use huludhunter_core::{scan_and_write, IndicatorLists, ScanStats, Scanner};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// 指定清单目录的环境变量（包含 susfiles.txt 与 hashes.txt）
const LISTS_DIR_ENV: &str = "HULUD_LISTS_DIR";

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "huludhunter", version, about = "Scan a directory tree for Shai-Hulud worm indicators of compromise")]
struct Cli {
    /// 扫描起始目录（支持 ~ 展开），缺省为当前用户主目录
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级）；stdout 留给命中结果
    init_tracing();
    let cli = Cli::parse();

    let start = resolve_start_path(cli.path)?;
    let lists = load_lists()?;
    let scanner = Scanner::new(&lists).context("build detections")?;
    info!(
        start = %start.display(),
        filenames = lists.filename_count(),
        hashes = lists.hash_count(),
        "starting scan"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stats = match scan_and_write(&start, &mut out, &scanner) {
        Ok(stats) => stats,
        // 下游停止读取（如管道到 head）视为正常结束
        Err(err) if is_broken_pipe(&err) => return Ok(()),
        Err(err) => return Err(err.context("scan and write failed")),
    };
    if let Err(err) = out.flush() {
        if err.kind() != io::ErrorKind::BrokenPipe {
            return Err(err).context("flush output");
        }
    }

    log_stats(&stats);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).with_writer(io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn log_stats(stats: &ScanStats) {
    info!(
        files_scanned = stats.files_scanned,
        findings = stats.findings,
        dirs_skipped = stats.dirs_skipped,
        rule_faults = stats.rule_faults,
        "scan finished"
    );
}

/// 加载清单：设置了环境变量则从目录读取，否则使用内置清单。失败即退出。
fn load_lists() -> Result<IndicatorLists> {
    match std::env::var_os(LISTS_DIR_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            IndicatorLists::load_dir(&dir).with_context(|| format!("load indicator lists from {}", dir.display()))
        }
        None => IndicatorLists::bundled().context("load bundled indicator lists"),
    }
}

fn home_dir() -> Result<PathBuf> {
    match std::env::var_os("HOME") {
        Some(h) if !h.is_empty() => Ok(PathBuf::from(h)),
        _ => bail!("HOME is not set; pass a start path explicitly"),
    }
}

/// 解析起始路径：`~` 展开 → 规范化为绝对路径（不存在时退化为词法绝对路径）
fn resolve_start_path(arg: Option<PathBuf>) -> Result<PathBuf> {
    let path = match arg {
        Some(p) => expand_tilde(&p)?,
        None => home_dir()?,
    };
    match std::fs::canonicalize(&path) {
        Ok(p) => Ok(p),
        Err(_) => std::path::absolute(&path).with_context(|| format!("resolve {}", path.display())),
    }
}

fn expand_tilde(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|e| e.downcast_ref::<io::Error>().is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe))
}
