//! Builder Module
//!
//! 抽出設定（`ExtractorConfig`）と、`DiaryExtractor`を段階的に構築する
//! Fluent Builder APIを提供する。

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::Glob;
use serde::Deserialize;

use crate::api::SheetSelector;
use crate::error::DiaryError;
use crate::extractor::DiaryExtractor;
use crate::types::RecordSchema;

/// 抽出処理の設定
///
/// TOMLファイルから読み込むことができます。省略したキーはデフォルト値になります。
///
/// ```toml
/// source_dir = "diary"
/// images_dir = "site/images/excel"
/// data_file = "site/day_log_data.json"
/// file_pattern = "*log*.xlsx"
/// date_field = "日期"
/// sheet = { index = 0 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// XLSXファイルを探すディレクトリ
    pub source_dir: PathBuf,

    /// 抽出した画像の出力先
    pub images_dir: PathBuf,

    /// JSONデータファイル
    pub data_file: PathBuf,

    /// アーカイブを展開する一時ディレクトリ
    pub temp_dir: PathBuf,

    /// 対象ファイル名のグロブパターン
    pub file_pattern: String,

    /// 重複判定・並び替えに使う日付フィールド名
    pub date_field: String,

    /// 画像列を識別するキーワード
    pub image_keywords: Vec<String>,

    /// 画像プレースホルダーを示す部分文字列
    pub image_marker: String,

    /// 読み込むワークシート
    pub sheet: SheetSelector,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let schema = RecordSchema::default();
        Self {
            source_dir: PathBuf::from("."),
            images_dir: PathBuf::from("images/excel"),
            data_file: PathBuf::from("day_log_data.json"),
            temp_dir: PathBuf::from("temp_extract"),
            file_pattern: "*log*.xlsx".to_string(),
            date_field: schema.date_field,
            image_keywords: schema.image_keywords,
            image_marker: schema.image_marker,
            sheet: SheetSelector::First,
        }
    }
}

impl ExtractorConfig {
    /// TOML文字列から設定を読み込む
    pub fn from_toml_str(text: &str) -> Result<Self, DiaryError> {
        Ok(toml::from_str(text)?)
    }

    /// TOMLファイルから設定を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExtractorConfig)` - 読み込みに成功した場合
    /// * `Err(DiaryError::Io)` - ファイルを読めない場合
    /// * `Err(DiaryError::Toml)` - TOMLとして不正、または未知のキーを含む場合
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, DiaryError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// 行の解釈に関わる設定を取り出す
    pub fn schema(&self) -> RecordSchema {
        RecordSchema {
            date_field: self.date_field.clone(),
            image_keywords: self.image_keywords.clone(),
            image_marker: self.image_marker.clone(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdiary::{ExtractorBuilder, SheetSelector};
///
/// # fn main() -> Result<(), xlsxdiary::DiaryError> {
/// let extractor = ExtractorBuilder::new()
///     .with_source_dir("diary")
///     .with_images_dir("site/images/excel")
///     .with_sheet_selector(SheetSelector::Name("2024".to_string()))
///     .build()?;
/// let summary = extractor.run(None)?;
/// println!("{} new record(s)", summary.new_records);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ExtractorBuilder {
    config: ExtractorConfig,
}

impl ExtractorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の設定（TOMLから読み込んだものなど）から開始する
    pub fn from_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// XLSXファイルを探すディレクトリを指定する
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = dir.into();
        self
    }

    /// 画像の出力先ディレクトリを指定する
    pub fn with_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    /// JSONデータファイルのパスを指定する
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = path.into();
        self
    }

    /// 一時展開ディレクトリを指定する
    ///
    /// 実行中に中身が削除されるため、ソースディレクトリ・画像出力ディレクトリ・
    /// データファイルのディレクトリと同じか、それらを含むパスは`build()`で拒否されます。
    /// 比較は`..`とシンボリックリンクを解決した絶対パスで行います。
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    /// 対象ファイル名のグロブパターンを指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxdiary::ExtractorBuilder;
    ///
    /// let builder = ExtractorBuilder::new().with_file_pattern("2024*.xlsx");
    /// ```
    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.file_pattern = pattern.into();
        self
    }

    /// 日付フィールド名を指定する
    pub fn with_date_field(mut self, field: impl Into<String>) -> Self {
        self.config.date_field = field.into();
        self
    }

    /// 画像列を識別するキーワードを置き換える
    pub fn with_image_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.image_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// 画像マーカーを指定する
    pub fn with_image_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.image_marker = marker.into();
        self
    }

    /// 読み込むワークシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet = selector;
        self
    }

    /// 設定を検証し、`DiaryExtractor`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `DiaryError::Config` - パスや日付フィールド、マーカー、キーワードが空の場合、
    ///   または一時ディレクトリがソースディレクトリ・画像出力ディレクトリ・
    ///   データファイルのディレクトリと同じかそれらを含む場合
    /// * `DiaryError::Glob` - ファイルパターンが不正なグロブの場合
    pub fn build(self) -> Result<DiaryExtractor, DiaryError> {
        let config = self.config;

        // 1. パスの検証
        for (name, path) in [
            ("source_dir", &config.source_dir),
            ("images_dir", &config.images_dir),
            ("data_file", &config.data_file),
            ("temp_dir", &config.temp_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(DiaryError::Config(format!("{} must not be empty", name)));
            }
        }

        // 2. 一時ディレクトリは実行のたびに削除される
        let temp = resolve(&config.temp_dir)?;
        let data_dir = match config.data_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        for (name, path) in [
            ("source_dir", config.source_dir.as_path()),
            ("images_dir", config.images_dir.as_path()),
            ("data_file directory", data_dir),
        ] {
            if resolve(path)?.starts_with(&temp) {
                return Err(DiaryError::Config(format!(
                    "temp_dir '{}' must not be or contain {} '{}'",
                    config.temp_dir.display(),
                    name,
                    path.display()
                )));
            }
        }

        // 3. パターンの検証
        Glob::new(&config.file_pattern)?;

        // 4. レコード設定の検証
        if config.date_field.trim().is_empty() {
            return Err(DiaryError::Config("date_field must not be empty".to_string()));
        }
        if config.image_marker.is_empty() {
            return Err(DiaryError::Config("image_marker must not be empty".to_string()));
        }
        if config.image_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(DiaryError::Config(
                "image_keywords must contain at least one keyword".to_string(),
            ));
        }

        Ok(DiaryExtractor::new(config))
    }
}

/// シンボリックリンクと`..`を解決した絶対パス
///
/// まだ存在しないパスは、存在する最も近い祖先を正規化してから残りの要素を連結します。
fn resolve(path: &Path) -> Result<PathBuf, DiaryError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let components: Vec<Component> = absolute.components().collect();

    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        let Ok(mut resolved) = prefix.canonicalize() else {
            continue;
        };
        for component in &components[split..] {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::Normal(part) => resolved.push(part),
                _ => {}
            }
        }
        return Ok(resolved);
    }

    Ok(absolute)
}
