//! Run Orchestrator Module
//!
//! ソースディレクトリのXLSXファイルを順に処理し、新しいレコードを
//! データストアへマージして保存する。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, info, warn};

use crate::builder::ExtractorConfig;
use crate::error::DiaryError;
use crate::parser::{MediaExtractor, WorkbookParser};
use crate::rows::RowExtractor;
use crate::store::DataStore;
use crate::structure::StructureAnalyzer;
use crate::types::{DedupSet, FileExtraction, RecordSchema, RunSummary, SheetReport};

/// Excelが編集中に作成するロックファイルの接頭辞
const LOCK_FILE_PREFIX: &str = "~$";

/// 日記エクストラクター
///
/// `ExtractorBuilder`を使用して構築します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdiary::ExtractorBuilder;
///
/// # fn main() -> Result<(), xlsxdiary::DiaryError> {
/// let extractor = ExtractorBuilder::new().build()?;
///
/// // 設定のパターンで実行
/// let summary = extractor.run(None)?;
///
/// // パターンを上書きして実行
/// let summary = extractor.run(Some("2024*.xlsx"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DiaryExtractor {
    config: ExtractorConfig,
    schema: RecordSchema,
    media: MediaExtractor,
}

impl DiaryExtractor {
    pub(crate) fn new(config: ExtractorConfig) -> Self {
        Self {
            schema: config.schema(),
            media: MediaExtractor::new(&config.temp_dir),
            config,
        }
    }

    /// 構築時の設定
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// 抽出を1回実行
    ///
    /// # 引数
    ///
    /// * `pattern` - ファイル名のグロブパターン。`None`の場合は設定のパターン
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunSummary)` - 実行の集計。個々のファイルの失敗はスキップとして数えられる
    /// * `Err(DiaryError)` - 画像出力ディレクトリを作成できない、パターンが不正、
    ///   またはデータファイルを保存できない場合
    ///
    /// # 処理フロー
    ///
    /// 1. 画像出力ディレクトリを作成
    /// 2. データストアを読み込み、既存の日付を集める
    /// 3. パターンに一致するファイルを名前順に列挙
    /// 4. 各ファイルについて画像抽出・構造解析・行抽出（失敗したファイルはスキップ）
    /// 5. 新規レコードがあればマージして保存（ヘッダーは最初に処理できたファイルのもの）
    ///
    /// 一時展開ディレクトリはファイルごとに、成否にかかわらず削除されます。
    pub fn run(&self, pattern: Option<&str>) -> Result<RunSummary, DiaryError> {
        let pattern = pattern.unwrap_or(&self.config.file_pattern);
        let matcher = Glob::new(pattern)?.compile_matcher();

        fs::create_dir_all(&self.config.images_dir)?;

        let mut store = DataStore::load(&self.config.data_file);
        let mut seen = store.dedup_set(&self.schema);
        info!(
            "Loaded {} existing record(s) from {}",
            store.rows.len(),
            self.config.data_file.display()
        );

        let files = self.discover(&matcher)?;
        info!("Found {} file(s) matching '{}'", files.len(), pattern);

        let mut summary = RunSummary {
            files_found: files.len(),
            ..Default::default()
        };
        let mut new_records = Vec::new();
        let mut headers: Option<Vec<String>> = None;

        for path in &files {
            info!("Processing {}", path.display());

            let result = self.process_file(path, &mut seen);
            if let Err(e) = self.media.cleanup() {
                warn!("Failed to clean up {}: {}", self.config.temp_dir.display(), e);
            }

            match result {
                Ok(Some(extraction)) => {
                    summary.files_processed += 1;
                    info!(
                        "  {} new record(s), {} image(s) assigned",
                        extraction.records.len(),
                        extraction.images_assigned
                    );
                    if extraction.images_missing > 0 {
                        warn!(
                            "  {} marked row(s) left without an image",
                            extraction.images_missing
                        );
                    }
                    // ヘッダーは最初に処理できたファイルのもの
                    if headers.is_none() {
                        headers = Some(extraction.headers);
                    }
                    new_records.extend(extraction.records);
                }
                Ok(None) => summary.files_skipped += 1,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    summary.files_skipped += 1;
                }
            }
        }

        if !new_records.is_empty() {
            let headers = headers.unwrap_or_default();
            summary.new_records = store.merge(new_records, headers, &self.schema);
            store.save(&self.config.data_file)?;
            summary.saved = true;
        } else {
            info!("No new records");
        }

        summary.total_records = store.rows.len();
        summary.image_count = store.image_count;
        info!(
            "Done: {} new, {} total, {} with images",
            summary.new_records, summary.total_records, summary.image_count
        );

        Ok(summary)
    }

    /// 一致するファイルの構造を報告
    ///
    /// 画像出力ディレクトリとデータファイルには何も書き込みません。
    /// 一時展開ディレクトリは画像を数えるために使われ、ファイルごとに削除されます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<SheetReport>)` - 読み込めたファイルのレポート（名前順）。
    ///   読み込めなかったファイルは警告を出して除外される
    /// * `Err(DiaryError)` - パターンが不正、またはソースディレクトリを読めない場合
    pub fn analyze(&self, pattern: Option<&str>) -> Result<Vec<SheetReport>, DiaryError> {
        let pattern = pattern.unwrap_or(&self.config.file_pattern);
        let matcher = Glob::new(pattern)?.compile_matcher();
        let files = self.discover(&matcher)?;

        let mut reports = Vec::with_capacity(files.len());
        for path in &files {
            let result = self.analyze_file(path);
            if let Err(e) = self.media.cleanup() {
                warn!("Failed to clean up {}: {}", self.config.temp_dir.display(), e);
            }

            match result {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(reports)
    }

    fn analyze_file(&self, path: &Path) -> Result<SheetReport, DiaryError> {
        let image_count = self.media.extract(path)?.len();

        let mut parser = WorkbookParser::open(path)?;
        let (sheet, grid) = parser.load_sheet(&self.config.sheet)?;

        let analyzer = StructureAnalyzer::new(&self.schema);
        let structure = analyzer.analyze(&grid);

        Ok(SheetReport {
            file: path.to_path_buf(),
            sheet,
            image_count,
            columns: analyzer.profile_columns(&grid, &structure),
            image_values: analyzer.image_values(&grid, &structure),
            structure,
        })
    }

    /// パターンに一致するファイルを名前順に列挙
    ///
    /// ソースディレクトリが存在しない場合は警告を出して空のリストを返します。
    fn discover(&self, matcher: &GlobMatcher) -> Result<Vec<PathBuf>, DiaryError> {
        let entries = match fs::read_dir(&self.config.source_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Source directory {} does not exist",
                    self.config.source_dir.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                Some((name, entry.path()))
            })
            .filter(|(name, _)| {
                if name.starts_with(LOCK_FILE_PREFIX) {
                    debug!("Ignoring lock file {}", name);
                    return false;
                }
                matcher.is_match(name)
            })
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// 1ファイルを処理
    ///
    /// 画像が1枚もないファイルは`Ok(None)`としてスキップします。
    /// 新規レコードの日付は、ファイルの処理が最後まで成功した場合にのみ`seen`へ反映されます。
    fn process_file(
        &self,
        path: &Path,
        seen: &mut DedupSet,
    ) -> Result<Option<FileExtraction>, DiaryError> {
        let images = self.media.extract(path)?;
        if images.is_empty() {
            info!("  No images found, skipping");
            return Ok(None);
        }

        let mut parser = WorkbookParser::open(path)?;
        let (sheet_name, grid) = parser.load_sheet(&self.config.sheet)?;
        debug!("  Sheet: {}", sheet_name);

        let structure = StructureAnalyzer::new(&self.schema).analyze(&grid);

        let file_stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut file_seen = seen.clone();
        let extraction = RowExtractor::new(&self.schema, &self.config.images_dir).extract(
            &grid,
            &structure,
            &images,
            &file_stem,
            &mut file_seen,
        )?;
        *seen = file_seen;

        Ok(Some(extraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ExtractorBuilder;

    fn extractor_in(dir: &Path) -> DiaryExtractor {
        ExtractorBuilder::new()
            .with_source_dir(dir.join("logs"))
            .with_images_dir(dir.join("images"))
            .with_data_file(dir.join("day_log_data.json"))
            .with_temp_dir(dir.join("scratch"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(logs.join("sub_log.xlsx")).unwrap();
        for name in ["b_log.xlsx", "a_log.xlsx", "~$a_log.xlsx", "notes.xlsx", "c_log.xls"] {
            fs::write(logs.join(name), b"").unwrap();
        }

        let extractor = extractor_in(dir.path());
        let matcher = Glob::new("*log*.xlsx").unwrap().compile_matcher();
        let files = extractor.discover(&matcher).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_log.xlsx", "b_log.xlsx"]);
    }

    #[test]
    fn test_discover_missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor_in(dir.path());
        let matcher = Glob::new("*").unwrap().compile_matcher();
        assert!(extractor.discover(&matcher).unwrap().is_empty());
    }

    #[test]
    fn test_run_with_no_files_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("logs")).unwrap();
        let extractor = extractor_in(dir.path());

        let summary = extractor.run(None).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(!dir.path().join("day_log_data.json").exists());
        // 画像出力ディレクトリは常に作成される
        assert!(dir.path().join("images").is_dir());
    }

    #[test]
    fn test_run_rejects_invalid_pattern_override() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor_in(dir.path());
        assert!(matches!(extractor.run(Some("[")), Err(DiaryError::Glob(_))));
    }

    #[test]
    fn test_analyze_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("broken_log.xlsx"), b"not a zip").unwrap();

        let extractor = extractor_in(dir.path());
        let reports = extractor.analyze(None).unwrap();

        assert!(reports.is_empty());
        assert!(!dir.path().join("images").exists());
        assert!(!dir.path().join("day_log_data.json").exists());
        assert!(!dir.path().join("scratch").exists());
    }

    #[test]
    fn test_corrupt_file_is_skipped_and_scratch_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("broken_log.xlsx"), b"not a zip").unwrap();

        let extractor = extractor_in(dir.path());
        let summary = extractor.run(None).unwrap();

        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.files_skipped, 1);
        assert!(!summary.saved);
        assert!(!dir.path().join("scratch").exists());
    }
}
