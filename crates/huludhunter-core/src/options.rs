//! 扫描选项与统计信息（模块）

/// 扫描选项
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// 是否跟随符号链接进入目录（默认不跟随）
    pub follow_links: bool,
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub files_scanned: usize,
    /// 无法进入而被跳过的目录
    pub dirs_skipped: usize,
    /// 被静默丢弃的 (规则, 文件) 求值失败
    pub rule_faults: usize,
    pub findings: usize,
}
