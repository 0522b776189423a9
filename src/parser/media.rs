//! Media Extraction Module
//!
//! XLSXファイル（ZIPアーカイブ）を一時ディレクトリへ展開し、
//! `xl/media`フォルダ内の埋め込み画像を抽出順に列挙するモジュール。

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::DiaryError;
use crate::security::{sanitize_entry_path, ExtractionLimits};
use crate::types::{is_image_extension, ImageMapping, ImageRecord};

/// アーカイブ内のメディアフォルダ
pub(crate) const MEDIA_DIR: &str = "xl/media";

/// 埋め込み画像の抽出器
///
/// 一時ディレクトリは全ファイルで使い回され、抽出のたびに空にされます。
/// 前のファイルの画像のコピーが完了してから次の`extract`を呼び出してください。
#[derive(Debug, Clone)]
pub(crate) struct MediaExtractor {
    /// 一時展開ディレクトリ
    scratch_dir: PathBuf,
    /// 展開制限
    limits: ExtractionLimits,
}

impl MediaExtractor {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            limits: ExtractionLimits::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_limits(mut self, limits: ExtractionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// XLSXファイルから画像を抽出
    ///
    /// # 引数
    ///
    /// * `xlsx_path` - XLSXファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(ImageMapping)` - 1始まりの抽出順インデックス -> 画像情報。
    ///   メディアフォルダがない場合は空（エラーではない）
    /// * `Err(DiaryError)` - アーカイブが壊れている、または展開制限に違反した場合
    ///
    /// # 順序
    ///
    /// 画像はメディアフォルダ内のファイル名の辞書順に並びます。
    /// `image1.png`, `image2.png`, ... という通常の命名では作成順と一致しますが、
    /// 10枚以上の場合は`image10.png`が`image2.png`より前に来ます。
    pub fn extract(&self, xlsx_path: &Path) -> Result<ImageMapping, DiaryError> {
        self.reset_scratch_dir()?;
        self.unpack(xlsx_path)?;

        let media_dir = self.scratch_dir.join(MEDIA_DIR);
        if !media_dir.is_dir() {
            debug!("No media folder in {}", xlsx_path.display());
            return Ok(ImageMapping::new());
        }

        let mut entries: Vec<(String, PathBuf)> = fs::read_dir(&media_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                Some((name, entry.path()))
            })
            .filter(|(_, path)| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(is_image_extension)
                    .unwrap_or(false)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mapping: ImageMapping = entries
            .into_iter()
            .enumerate()
            .map(|(i, (name, source))| {
                let ext = source
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| format!(".{}", ext))
                    .unwrap_or_default();
                let index = i + 1;
                (
                    index,
                    ImageRecord {
                        index,
                        source,
                        name,
                        ext,
                    },
                )
            })
            .collect();

        info!("  Found {} image(s)", mapping.len());
        Ok(mapping)
    }

    /// 一時展開ディレクトリを削除
    ///
    /// ディレクトリが存在しない場合は何もしません。
    pub fn cleanup(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.scratch_dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn reset_scratch_dir(&self) -> io::Result<()> {
        self.cleanup()?;
        fs::create_dir_all(&self.scratch_dir)
    }

    /// アーカイブ全体を一時ディレクトリへ展開
    fn unpack(&self, xlsx_path: &Path) -> Result<(), DiaryError> {
        let file = File::open(xlsx_path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| DiaryError::Zip(format!("{}", e)))?;

        // ファイル数の上限
        if archive.len() > self.limits.max_entry_count {
            return Err(DiaryError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.limits.max_entry_count
            )));
        }

        let mut total_size = 0u64;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| DiaryError::Zip(format!("{}", e)))?;

            let relative = sanitize_entry_path(entry.name()).map_err(|e| {
                DiaryError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let entry_size = entry.size();
            if entry_size > self.limits.max_entry_size {
                return Err(DiaryError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    entry.name(),
                    entry_size,
                    self.limits.max_entry_size
                )));
            }

            total_size = total_size.checked_add(entry_size).ok_or_else(|| {
                DiaryError::SecurityViolation(
                    "Total decompressed size calculation overflow".to_string(),
                )
            })?;
            if total_size > self.limits.max_decompressed_size {
                return Err(DiaryError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_size, self.limits.max_decompressed_size
                )));
            }

            let target = self.scratch_dir.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }

        Ok(())
    }
}
