/// 工具函数
/// Utility helpers
use std::path::{Path, PathBuf};

/// 当前本地时间字符串, 用作默认的运行目录名
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}

/// 路径已存在时追加序号: runs/track/exp → exp2 → exp3 ...
///
/// `exist_ok` 为 true 时直接复用已有路径
pub fn increment_path(path: &Path, exist_ok: bool) -> PathBuf {
    if exist_ok || !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    (2u32..)
        .map(|n| path.with_file_name(format!("{}{}", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
