//! 指示器清单加载（可疑文件名 / 可疑哈希）
//!
//! 两份清单均为纯文本：
//! - `susfiles.txt`：每行一个文件名
//! - `hashes.txt`：每行 `<sha1-hex>,<filename>`（兼容旧格式 `<filename>,<sha1-hex>`）
//!
//! 清单在进程启动时加载一次，之后只读；加载失败属于致命错误。
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 清单文件名（位于清单目录下）
pub const SUSPICIOUS_FILENAMES_FILE: &str = "susfiles.txt";
pub const SUSPICIOUS_HASHES_FILE: &str = "hashes.txt";

/// 随二进制一同打包的默认清单
const BUNDLED_FILENAMES: &str = include_str!("../lists/susfiles.txt");
const BUNDLED_HASHES: &str = include_str!("../lists/hashes.txt");

/// 清单加载错误
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("failed to read indicator list {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed hash list line {line}: {content:?}")]
    MalformedHashLine { line: usize, content: String },
}

/// 只读的指示器清单快照
#[derive(Debug, Clone, Default)]
pub struct IndicatorLists {
    filenames: HashSet<String>,
    /// sha1 hex（小写） -> 期望文件名
    hashes: HashMap<String, String>,
    /// `hashes` 的值集合，用于先按文件名短路
    hashed_names: HashSet<String>,
}

impl IndicatorLists {
    /// 使用打包进二进制的默认清单
    pub fn bundled() -> Result<Self, IndicatorError> {
        Self::parse(BUNDLED_FILENAMES, BUNDLED_HASHES)
    }

    /// 从目录加载 `susfiles.txt` 与 `hashes.txt`
    pub fn load_dir(dir: &Path) -> Result<Self, IndicatorError> {
        let filenames = read_list(&dir.join(SUSPICIOUS_FILENAMES_FILE))?;
        let hashes = read_list(&dir.join(SUSPICIOUS_HASHES_FILE))?;
        Self::parse(&filenames, &hashes)
    }

    /// 从两份清单文本构建
    pub fn parse(filenames: &str, hashes: &str) -> Result<Self, IndicatorError> {
        let filenames: HashSet<String> = list_lines(filenames).map(|(_, l)| l.to_string()).collect();

        let mut map = HashMap::new();
        for (idx, line) in list_lines(hashes) {
            let (digest, name) = parse_hash_line(line)
                .ok_or_else(|| IndicatorError::MalformedHashLine { line: idx + 1, content: line.to_string() })?;
            map.insert(digest, name);
        }
        let hashed_names = map.values().cloned().collect();

        Ok(Self { filenames, hashes: map, hashed_names })
    }

    pub fn is_suspicious_filename(&self, name: &str) -> bool {
        self.filenames.contains(name)
    }

    /// 文件名是否出现在哈希清单的期望文件名中
    pub fn is_hashed_filename(&self, name: &str) -> bool {
        self.hashed_names.contains(name)
    }

    /// 哈希清单中该摘要对应的期望文件名
    pub fn expected_filename(&self, sha1_hex: &str) -> Option<&str> {
        self.hashes.get(sha1_hex).map(String::as_str)
    }

    pub fn filename_count(&self) -> usize {
        self.filenames.len()
    }

    pub fn hash_count(&self) -> usize {
        self.hashes.len()
    }
}

fn read_list(path: &Path) -> Result<String, IndicatorError> {
    std::fs::read_to_string(path).map_err(|source| IndicatorError::Io { path: path.to_path_buf(), source })
}

/// 有效行（带原始行号）：去除首尾空白，跳过空行与 `#` 注释
fn list_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

/// 解析单行哈希记录，返回 (小写摘要, 文件名)
fn parse_hash_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split(',');
    let a = parts.next()?.trim();
    let b = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    // 两列都像摘要时以第一列为准
    let (digest, name) = if is_sha1_hex(a) {
        (a, b)
    } else if is_sha1_hex(b) {
        (b, a)
    } else {
        return None;
    };
    if name.is_empty() {
        return None;
    }
    Some((digest.to_ascii_lowercase(), name.to_string()))
}

fn is_sha1_hex(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
