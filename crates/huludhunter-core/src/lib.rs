//! 供应链蠕虫（Shai-Hulud 类 npm/bun 蠕虫）失陷指标扫描库
//!
//! 设计要点：
//! - 规则统一为 `(目录, 文件名) -> bool` 的谓词，需要内容的规则自行读取文件。
//! - 每个文件按固定顺序执行全部规则；单条 (规则, 文件) 的失败就地丢弃，不影响扫描。
//! - 命中结果以惰性迭代器产出，可逐条输出为 JSON Lines。
//! - 指示器清单在启动时加载一次，之后只读。

mod detectors;
mod findings;
mod indicators;
mod options;
mod scan;

pub use detectors::{
    default_detections, Check, Detection, REASON_BUN_BINARY, REASON_BUN_PREINSTALL, REASON_GH_DISCUSSION_WORKFLOW,
    REASON_GH_WORKFLOW_CONTENT, REASON_GIT_LOG, REASON_GIT_REF, REASON_SUSPICIOUS_FILENAME, REASON_SUSPICIOUS_HASH,
};
pub use findings::{sha1_file, Finding};
pub use indicators::{IndicatorError, IndicatorLists, SUSPICIOUS_FILENAMES_FILE, SUSPICIOUS_HASHES_FILE};
pub use options::{ScanOptions, ScanStats};
pub use scan::{scan_and_write, Findings, Scanner};
