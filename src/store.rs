//! Data Store Module
//!
//! 抽出済みレコードを保持するJSONデータファイルの読み込み・マージ・保存。
//!
//! # 不変条件
//!
//! - 同じ日付のレコードは1件のみ
//! - マージ後のレコードは日付文字列の降順
//!
//! 日付の比較は文字列の辞書順で行うため、`YYYY-MM-DD`に正規化されていることが前提です。

use std::cmp::Reverse;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::DiaryError;
use crate::types::{is_image_filename, DedupSet, Record, RecordSchema};

/// 永続化されるデータストア
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    /// 列ヘッダー
    #[serde(default)]
    pub headers: Vec<String>,
    /// レコード（日付の降順）
    #[serde(default)]
    pub rows: Vec<Record>,
    /// 画像付きレコードの数
    #[serde(default)]
    pub image_count: usize,
}

impl DataStore {
    /// データファイルを読み込む
    ///
    /// ファイルが存在しない、または壊れている場合は空のストアを返します。
    /// 壊れている場合は警告を出力します。
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Failed to read data file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(store) => store,
            Err(e) => {
                warn!("Failed to parse data file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// ストア内の日付の集合
    pub fn dedup_set(&self, schema: &RecordSchema) -> DedupSet {
        self.rows
            .iter()
            .filter_map(|row| schema.date_key(row))
            .collect()
    }

    /// 新規レコードをマージ
    ///
    /// 日付が既に存在するレコード、および日付のないレコードは追加しません。
    /// ヘッダーは`headers`で置き換え、全レコードを日付の降順に並べ替えて
    /// 画像数を再計算します。
    ///
    /// # 戻り値
    ///
    /// 追加されたレコードの数
    pub fn merge(
        &mut self,
        new_records: Vec<Record>,
        headers: Vec<String>,
        schema: &RecordSchema,
    ) -> usize {
        let mut seen = self.dedup_set(schema);
        let before = self.rows.len();

        for record in new_records {
            if let Some(date) = schema.date_key(&record) {
                if seen.insert(date) {
                    self.rows.push(record);
                }
            }
        }

        self.headers = headers;
        // 安定ソートなので同じキー（日付なし）の既存順は保たれる
        self.rows
            .sort_by_cached_key(|row| Reverse(schema.date_key(row).unwrap_or_default()));
        self.image_count = self.count_images(schema);

        self.rows.len() - before
    }

    /// 画像フィールドを持つレコードの数
    ///
    /// 画像関連キーワードを含むキーの値が、画像拡張子で終わる文字列であるレコードを数えます。
    pub fn count_images(&self, schema: &RecordSchema) -> usize {
        self.rows
            .iter()
            .filter(|row| {
                row.iter().any(|(key, value)| {
                    schema.is_image_header(key)
                        && matches!(value, Value::String(s) if is_image_filename(s))
                })
            })
            .count()
    }

    /// データファイルに保存
    ///
    /// 同じディレクトリの一時ファイルに書き込んでからリネームするため、
    /// 書き込み途中で中断しても既存のファイルは壊れません。
    /// 非ASCII文字はエスケープせずそのまま出力します。
    pub fn save(&self, path: &Path) -> Result<(), DiaryError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| DiaryError::Io(e.error))?;

        info!("Data saved to {}", path.display());
        Ok(())
    }
}
