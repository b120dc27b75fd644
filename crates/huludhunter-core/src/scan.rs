//! 扫描主流程：惰性遍历目录树，对每个文件按固定顺序执行全部规则
use anyhow::Result;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

use crate::detectors::{default_detections, Detection};
use crate::findings::Finding;
use crate::indicators::IndicatorLists;
use crate::options::{ScanOptions, ScanStats};

/// 扫描器：持有规则集合，不保存任何跨次扫描的状态
#[derive(Debug)]
pub struct Scanner<'a> {
    detections: Vec<Detection<'a>>,
    options: ScanOptions,
}

impl<'a> Scanner<'a> {
    /// 基于只读清单构建默认 8 条规则
    pub fn new(lists: &'a IndicatorLists) -> Result<Self> {
        Ok(Self::with_detections(default_detections(lists)?))
    }

    /// 使用自定义规则集合（顺序即求值顺序）
    pub fn with_detections(detections: Vec<Detection<'a>>) -> Self {
        Self { detections, options: ScanOptions::default() }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// 从 `start` 开始递归扫描，返回惰性命中序列。
    /// 调用方停止拉取即放弃遍历，目录句柄随迭代器一并释放。
    pub fn scan(&self, start: &Path) -> Findings<'_, 'a> {
        let walker = WalkDir::new(start)
            .follow_links(self.options.follow_links)
            .sort_by_file_name()
            .into_iter();
        Findings { detections: &self.detections, walker, current: None, next_rule: 0, stats: ScanStats::default() }
    }
}

/// 惰性命中序列
///
/// 同一文件的命中按规则顺序产出；单条 (规则, 文件) 的失败被丢弃，不影响其余规则与文件。
pub struct Findings<'s, 'a> {
    detections: &'s [Detection<'a>],
    walker: walkdir::IntoIter,
    /// 当前文件：(所在目录, 文件名)
    current: Option<(PathBuf, OsString)>,
    next_rule: usize,
    stats: ScanStats,
}

impl Findings<'_, '_> {
    /// 截至目前的统计
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// 取下一个待检查的普通文件；不可进入的目录视为空目录
    fn next_file(&mut self) -> Option<(PathBuf, OsString)> {
        loop {
            let entry = match self.walker.next()? {
                Ok(e) => e,
                Err(err) => {
                    self.stats.dirs_skipped += 1;
                    trace!(path = ?err.path(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !is_regular_file(&entry) {
                continue;
            }
            let Some(dir) = entry.path().parent() else { continue };
            self.stats.files_scanned += 1;
            return Some((dir.to_path_buf(), entry.file_name().to_os_string()));
        }
    }
}

/// 只检查普通文件：FIFO、套接字、设备节点一律跳过（读取会阻塞）。
/// 未跟随的符号链接按目标类型判断；悬空链接照常交给规则，读取失败由规则隔离处理。
fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    if !file_type.is_symlink() {
        return false;
    }
    match std::fs::metadata(entry.path()) {
        Ok(md) => md.is_file(),
        Err(_) => true,
    }
}

impl Iterator for Findings<'_, '_> {
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        loop {
            if let Some((dir, name)) = &self.current {
                while let Some(detection) = self.detections.get(self.next_rule) {
                    self.next_rule += 1;
                    match detection.evaluate(dir, name) {
                        Ok(Some(finding)) => {
                            self.stats.findings += 1;
                            return Some(finding);
                        }
                        Ok(None) => {}
                        Err(err) => {
                            self.stats.rule_faults += 1;
                            trace!(rule = detection.name(), dir = %dir.display(), file = ?name, error = %err, "rule evaluation failed");
                        }
                    }
                }
            }
            self.current = Some(self.next_file()?);
            self.next_rule = 0;
        }
    }
}

/// 扫描目录并将命中以 JSON Lines 流式写入 `out`（每条命中一行，写后立即 flush）。
/// 先序列化到缓冲再整行写出，写出端错误以 `io::Error` 原样返回。
pub fn scan_and_write(input_dir: &Path, out: &mut dyn Write, scanner: &Scanner<'_>) -> Result<ScanStats> {
    let mut findings = scanner.scan(input_dir);
    for f in findings.by_ref() {
        let mut line = serde_json::to_vec(&f)?;
        line.push(b'\n');
        out.write_all(&line)?;
        out.flush()?;
    }
    Ok(findings.stats().clone())
}
