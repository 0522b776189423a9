//! Security Module
//!
//! XLSXアーカイブを一時ディレクトリへ展開する際の制限を定義するモジュール。
//! ZIP bomb攻撃とパストラバーサル（Zip Slip）への対策を提供します。

use std::path::{Component, Path, PathBuf};

/// 展開制限の設定
///
/// 1ファイルの展開処理に適用される上限値です。
#[derive(Debug, Clone)]
pub(crate) struct ExtractionLimits {
    /// 展開後の合計最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大エントリ数
    /// デフォルト: 10000
    pub max_entry_count: usize,
    /// 単一エントリの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_entry_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_entry_count: 10_000,
            max_entry_size: 104_857_600,        // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

/// ZIPエントリ名を展開先からの相対パスに変換
///
/// # 引数
///
/// * `name` - ZIPアーカイブ内のエントリ名（`/`区切り）
///
/// # 戻り値
///
/// * `Ok(PathBuf)` - 展開先ディレクトリからの相対パス
/// * `Err(String)` - 展開先の外を指す、または不正なエントリ名の場合
pub(crate) fn sanitize_entry_path(name: &str) -> Result<PathBuf, String> {
    if name.is_empty() {
        return Err("Empty entry name is not allowed".to_string());
    }

    // Windows形式の区切り文字やドライブ指定は、展開先OSによって解釈が変わる
    if name.contains('\\') {
        return Err(format!("Backslash in entry name is not allowed: {}", name));
    }
    if name.len() >= 2 && name.as_bytes()[1] == b':' {
        return Err(format!("Drive prefix is not allowed: {}", name));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("Path traversal detected: {}", name));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("Absolute path is not allowed: {}", name));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(format!("Entry name resolves to nothing: {}", name));
    }

    Ok(relative)
}
