//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use serde_json::Value;

/// 1行分の日記レコード（ヘッダー名 -> セル値）
///
/// `serde_json`の`preserve_order`により、フィールドはヘッダー順に並びます。
pub type Record = serde_json::Map<String, Value>;

/// データストアに既に存在する日付値の集合
pub type DedupSet = HashSet<String>;

/// 抽出順のインデックス（1始まり） -> 画像情報
pub type ImageMapping = BTreeMap<usize, ImageRecord>;

/// 画像として扱う拡張子（小文字、ドットなし）
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// 拡張子（ドットの有無を問わない）が画像拡張子かどうかを判定
pub(crate) fn is_image_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// 文字列が画像ファイル名（既知の拡張子で終わる）かどうかを判定
pub(crate) fn is_image_filename(value: &str) -> bool {
    value
        .rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && is_image_extension(ext))
        .unwrap_or(false)
}

/// アーカイブから抽出された画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// 抽出順のインデックス（1始まり）
    pub index: usize,
    /// 一時展開ディレクトリ内の実ファイル
    pub source: PathBuf,
    /// アーカイブ内での元のファイル名（例: `image1.png`）
    pub name: String,
    /// 元の拡張子（ドット付き、大文字小文字は保持。例: `.png`）
    pub ext: String,
}

/// レコードの解釈に関わる設定
///
/// 構造解析・行抽出・マージの各段階で共有されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// 重複判定と並び替えに使う日付フィールド名
    pub date_field: String,
    /// 画像列を識別するキーワード（大文字小文字を区別しない部分一致）
    pub image_keywords: Vec<String>,
    /// 画像プレースホルダーを示す部分文字列
    pub image_marker: String,
}

impl RecordSchema {
    /// ヘッダー名が画像関連キーワードを含むかどうか
    pub fn is_image_header(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        self.image_keywords
            .iter()
            .filter(|keyword| !keyword.trim().is_empty())
            .any(|keyword| header.contains(&keyword.to_lowercase()))
    }

    /// レコードの日付キー
    ///
    /// 文字列はそのまま、数値などはJSON表記で返します。
    /// 日付フィールドが存在しない、null、または空文字列の場合は`None`。
    pub fn date_key(&self, record: &Record) -> Option<String> {
        match record.get(&self.date_field)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            date_field: "date".to_string(),
            image_keywords: ["image", "img", "picture", "图片", "图"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_marker: "DISPIMG".to_string(),
        }
    }
}

/// ワークシートの構造解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetStructure {
    /// 列ヘッダー（1行目）。空のセルは`Column N`で補完
    pub headers: Vec<String>,
    /// 画像列のインデックス（1始まり）
    pub image_col: Option<u32>,
    /// 画像マーカーを含む行のインデックス（1始まり、2以上）
    pub image_rows: BTreeSet<u32>,
    /// 最終行（1始まり）
    pub max_row: u32,
}

/// 1ファイル分の抽出結果
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    /// 新規レコード（既存の日付は除外済み）
    pub records: Vec<Record>,
    /// このファイルのヘッダー
    pub headers: Vec<String>,
    /// 行に割り当てられた画像の数
    pub images_assigned: usize,
    /// マーカーがあるのに画像が残っていなかった行の数
    pub images_missing: usize,
}

/// 1列分の集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    /// 列ヘッダー
    pub header: String,
    /// 値のあるデータ行の数
    pub non_empty: usize,
    /// 空のデータ行の数
    pub empty: usize,
    /// 出現した値の種類（`string`, `number`, `bool`, `date`, `duration`, `error`）
    pub kinds: BTreeSet<&'static str>,
}

/// 1ファイル分の構造レポート
///
/// `DiaryExtractor::analyze`が返します。ファイルは何も書き込まれません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetReport {
    /// XLSXファイルのパス
    pub file: PathBuf,
    /// 読み込んだワークシート名
    pub sheet: String,
    /// 構造解析結果
    pub structure: SheetStructure,
    /// アーカイブ内の画像の数
    pub image_count: usize,
    /// 列ごとの集計（ヘッダー順）
    pub columns: Vec<ColumnReport>,
    /// 画像列の空でない値（行番号, 表示文字列）
    pub image_values: Vec<(u32, String)>,
}

/// 1回の実行の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// パターンに一致したファイル数
    pub files_found: usize,
    /// 行抽出まで完了したファイル数
    pub files_processed: usize,
    /// 画像なし・エラーでスキップしたファイル数
    pub files_skipped: usize,
    /// 今回追加されたレコード数
    pub new_records: usize,
    /// 保存後の総レコード数
    pub total_records: usize,
    /// 保存後の画像付きレコード数
    pub image_count: usize,
    /// データファイルを書き込んだかどうか
    pub saved: bool,
}
