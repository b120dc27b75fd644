//! 命中项（单个文件 × 单条规则）
use anyhow::Result;
use serde::{Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// 一次规则命中，对应输出中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// 命中文件的完整路径（目录 + 文件名）
    #[serde(serialize_with = "serialize_path_lossy")]
    pub file: PathBuf,
    /// 文件全部内容的 SHA-1（40 位小写 hex）
    pub hash: String,
    pub reason: &'static str,
}

impl Finding {
    /// 在上报时重新计算文件哈希并构建命中项
    pub(crate) fn report(dir: &Path, file_name: &OsStr, reason: &'static str) -> Result<Self> {
        let file = dir.join(file_name);
        let hash = sha1_file(&file)?;
        Ok(Self { file, hash, reason })
    }
}

/// 流式计算文件 SHA-1
pub fn sha1_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn serialize_path_lossy<S: Serializer>(path: &Path, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let abc = dir.path().join("abc");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&abc, b"abc").unwrap();
        assert_eq!(sha1_file(&empty).unwrap(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_file(&abc).unwrap(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn report_joins_path_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc"), b"abc").unwrap();
        let f = Finding::report(dir.path(), OsStr::new("abc"), "why").unwrap();
        assert_eq!(f.file, dir.path().join("abc"));
        assert_eq!(f.hash, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(f.reason, "why");
    }

    #[test]
    fn report_on_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Finding::report(dir.path(), OsStr::new("gone"), "why").is_err());
    }

    #[test]
    fn serializes_exactly_three_fields() {
        let f = Finding { file: PathBuf::from("/tmp/x"), hash: "0".repeat(40), reason: "r" };
        let v = serde_json::to_value(&f).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["file"], "/tmp/x");
        assert_eq!(obj["reason"], "r");
    }
}
