//! Row Extractor Module
//!
//! ワークシートの各データ行をレコードに変換するモジュール。
//! 画像マーカーのある行には、抽出済みの画像を先頭から順に割り当てます。

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DiaryError;
use crate::formatter::CellFormatter;
use crate::parser::SheetGrid;
use crate::types::{DedupSet, FileExtraction, ImageMapping, Record, RecordSchema, SheetStructure};

/// 行エクストラクター
pub(crate) struct RowExtractor<'a> {
    schema: &'a RecordSchema,
    /// 割り当てた画像のコピー先
    images_dir: &'a Path,
    formatter: CellFormatter,
}

impl<'a> RowExtractor<'a> {
    pub fn new(schema: &'a RecordSchema, images_dir: &'a Path) -> Self {
        Self {
            schema,
            images_dir,
            formatter: CellFormatter::new(),
        }
    }

    /// 2行目から最終行までをレコードに変換
    ///
    /// # 引数
    ///
    /// * `grid` - ワークシート
    /// * `structure` - 構造解析結果
    /// * `images` - 抽出順の画像（1始まり）
    /// * `file_stem` - 出力画像名の接頭辞となる元ファイル名（拡張子なし）
    /// * `seen` - 既存の日付の集合。新規レコードの日付が追加される
    ///
    /// # 画像の割り当て
    ///
    /// N番目のマーカー行にN番目の画像を割り当てます。マーカーが参照する画像IDと
    /// 実際の画像が一致するかは検証しません。画像が足りなくなった行は`null`になります。
    ///
    /// # 戻り値
    ///
    /// * `Ok(FileExtraction)` - 既存の日付を除いた新規レコード
    /// * `Err(DiaryError)` - 画像のコピーに失敗した場合
    pub fn extract(
        &self,
        grid: &SheetGrid,
        structure: &SheetStructure,
        images: &ImageMapping,
        file_stem: &str,
        seen: &mut DedupSet,
    ) -> Result<FileExtraction, DiaryError> {
        let mut extraction = FileExtraction {
            headers: structure.headers.clone(),
            ..Default::default()
        };
        let mut next_image = 1usize;

        for row in 2..=structure.max_row {
            let mut record = Record::new();
            let mut has_data = false;

            for (idx, header) in structure.headers.iter().enumerate() {
                let col = idx as u32 + 1;
                let cell = grid.cell(row, col);

                if structure.image_col != Some(col) {
                    if let Some(value) = cell.and_then(|c| self.formatter.to_json(c)) {
                        record.insert(header.clone(), value);
                        has_data = true;
                    }
                    continue;
                }

                if !structure.image_rows.contains(&row) {
                    let text = cell.and_then(|c| self.formatter.to_text(c));
                    record.insert(header.clone(), text.map(Value::String).unwrap_or(Value::Null));
                    continue;
                }

                match images.get(&next_image) {
                    Some(image) => {
                        let file_name = format!("{}_row{}{}", file_stem, row, image.ext);
                        fs::copy(&image.source, self.images_dir.join(&file_name))?;
                        debug!("  Row {}: {} -> {}", row, image.name, file_name);

                        record.insert(header.clone(), Value::String(file_name));
                        has_data = true;
                        next_image += 1;
                        extraction.images_assigned += 1;
                    }
                    None => {
                        warn!(
                            "  Row {} has an image marker but no image is left ({} extracted)",
                            row,
                            images.len()
                        );
                        record.insert(header.clone(), Value::Null);
                        extraction.images_missing += 1;
                    }
                }
            }

            if !has_data {
                continue;
            }

            let Some(date) = self.schema.date_key(&record) else {
                debug!("  Row {} has no '{}' value, dropped", row, self.schema.date_field);
                continue;
            };

            if !seen.insert(date) {
                continue;
            }
            extraction.records.push(record);
        }

        Ok(extraction)
    }
}
