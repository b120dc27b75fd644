//! 检测规则：统一签名 `(目录, 文件名) -> bool` 的谓词 + 固定的命中原因
//!
//! 只看文件名/路径的规则不触碰磁盘；需要内容的规则在谓词内部自行读取。
//! 规则本身不吞异常，读取失败原样向上抛给扫描器处理。
use aho_corasick::AhoCorasick;
use anyhow::Result;
use std::ffi::OsStr;
use std::path::{Component, Path};

use crate::findings::{sha1_file, Finding};
use crate::indicators::IndicatorLists;

pub const REASON_SUSPICIOUS_FILENAME: &str = "matches known suspicious filename";
pub const REASON_BUN_PREINSTALL: &str = "contains bun preinstall script";
pub const REASON_BUN_BINARY: &str = "bun binary exists in home directory";
pub const REASON_SUSPICIOUS_HASH: &str = "matches known suspicious file hash";
pub const REASON_GIT_LOG: &str = "Git log indicates campaign activity";
pub const REASON_GIT_REF: &str = "Git reference/tag indicates campaign activity";
pub const REASON_GH_DISCUSSION_WORKFLOW: &str = "GitHub discussion workflow detected";
pub const REASON_GH_WORKFLOW_CONTENT: &str = "GitHub workflow indicates campaign activity";

/// package.json 中引用的投放脚本
const BUN_PREINSTALL_SCRIPTS: [&str; 2] = ["setup_bun.js", "bun_environment.js"];
/// git reflog 中的活动痕迹（大小写不敏感）
const GIT_LOG_MARKERS: [&str; 2] = ["hulud", "add discussion"];
const CAMPAIGN_MARKER: &str = "hulud";

/// 规则谓词；可以读文件，也可以失败。文件名保留原始字节，非 UTF-8 名称同样参与检查
pub type Check<'a> = Box<dyn Fn(&Path, &OsStr) -> Result<bool> + 'a>;

/// 单条检测规则
pub struct Detection<'a> {
    name: &'static str,
    reason: &'static str,
    check: Check<'a>,
}

impl<'a> Detection<'a> {
    pub fn new(
        name: &'static str,
        reason: &'static str,
        check: impl Fn(&Path, &OsStr) -> Result<bool> + 'a,
    ) -> Self {
        Self { name, reason, check: Box::new(check) }
    }

    /// 规则短名（仅用于日志与测试）
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }

    /// 对 (目录, 文件名) 求值：命中则重新计算哈希并返回命中项，否则 `None`。
    /// 谓词或哈希计算中的任何错误都直接返回给调用方。
    pub fn evaluate(&self, dir: &Path, file_name: impl AsRef<OsStr>) -> Result<Option<Finding>> {
        let file_name = file_name.as_ref();
        if (self.check)(dir, file_name)? {
            Finding::report(dir, file_name, self.reason).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl std::fmt::Debug for Detection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detection").field("name", &self.name).field("reason", &self.reason).finish()
    }
}

/// 按固定顺序构建全部 8 条规则
pub fn default_detections(lists: &IndicatorLists) -> Result<Vec<Detection<'_>>> {
    let bun_scripts = AhoCorasick::new(BUN_PREINSTALL_SCRIPTS)?;
    let git_log_markers = AhoCorasick::builder().ascii_case_insensitive(true).build(GIT_LOG_MARKERS)?;
    let campaign_marker = AhoCorasick::builder().ascii_case_insensitive(true).build([CAMPAIGN_MARKER])?;

    Ok(vec![
        Detection::new("filename", REASON_SUSPICIOUS_FILENAME, move |_, file| {
            Ok(file.to_str().is_some_and(|name| lists.is_suspicious_filename(name)))
        }),
        Detection::new("package-json", REASON_BUN_PREINSTALL, move |dir, file| {
            Ok(file == "package.json" && bun_scripts.is_match(&read_text(dir, file)?))
        }),
        Detection::new("bun-binary", REASON_BUN_BINARY, |dir, file| {
            Ok(file == "bun" && dir_ends_with(dir, [".bun", "bin"]))
        }),
        Detection::new("hash", REASON_SUSPICIOUS_HASH, move |dir, file| {
            let Some(name) = file.to_str().filter(|name| lists.is_hashed_filename(name)) else {
                return Ok(false);
            };
            let digest = sha1_file(&dir.join(file))?;
            Ok(lists.expected_filename(&digest) == Some(name))
        }),
        Detection::new("git-log", REASON_GIT_LOG, move |dir, file| {
            Ok(file == "HEAD"
                && dir_ends_with(dir, [".git", "logs"])
                && git_log_markers.is_match(&read_text(dir, file)?))
        }),
        Detection::new("git-ref", REASON_GIT_REF, |dir, file| {
            Ok(dir_has_segment(dir, ".git") && file.to_string_lossy().to_lowercase().contains(CAMPAIGN_MARKER))
        }),
        Detection::new("gh-discussion-workflow", REASON_GH_DISCUSSION_WORKFLOW, |dir, file| {
            Ok(file == "discussion.yaml" && dir_ends_with(dir, [".github", "workflows"]))
        }),
        Detection::new("gh-workflow-content", REASON_GH_WORKFLOW_CONTENT, move |dir, file| {
            Ok(dir_ends_with(dir, [".github", "workflows"]) && campaign_marker.is_match(&read_text(dir, file)?))
        }),
    ])
}

/// 以 UTF-8 文本读取；非法编码视为规则失败
fn read_text(dir: &Path, file: &OsStr) -> Result<String> {
    Ok(std::fs::read_to_string(dir.join(file))?)
}

/// 目录最后两段是否恰好等于 `tail`（区分大小写）
fn dir_ends_with(dir: &Path, tail: [&str; 2]) -> bool {
    let mut comps = dir.components().rev();
    tail.iter()
        .rev()
        .all(|seg| matches!(comps.next(), Some(Component::Normal(c)) if c.to_str() == Some(*seg)))
}

/// 目录路径中任意一段等于 `segment`
fn dir_has_segment(dir: &Path, segment: &str) -> bool {
    dir.components().any(|c| matches!(c, Component::Normal(s) if s.to_str() == Some(segment)))
}
