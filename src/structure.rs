//! Structure Analyzer Module
//!
//! ワークシートのヘッダー行・画像列・画像マーカー行を特定するモジュール。

use std::collections::BTreeSet;

use calamine::Data;
use tracing::info;

use crate::formatter::CellFormatter;
use crate::parser::SheetGrid;
use crate::types::{ColumnReport, RecordSchema, SheetStructure};

/// 構造アナライザー
pub(crate) struct StructureAnalyzer<'a> {
    schema: &'a RecordSchema,
    formatter: CellFormatter,
}

impl<'a> StructureAnalyzer<'a> {
    pub fn new(schema: &'a RecordSchema) -> Self {
        Self {
            schema,
            formatter: CellFormatter::new(),
        }
    }

    /// ワークシートの構造を解析
    ///
    /// # 戻り値
    ///
    /// * `headers` - 1行目の各セル。空のセルは`Column N`（Nは1始まりの列番号）
    /// * `image_col` - 画像関連キーワードを含む最初のヘッダーの列（1始まり）
    /// * `image_rows` - 画像列のセルにマーカーを含む行（2行目以降）
    pub fn analyze(&self, grid: &SheetGrid) -> SheetStructure {
        let headers = self.read_headers(grid);
        let image_col = self.find_image_column(&headers);
        let max_row = grid.max_row();

        let image_rows = match image_col {
            Some(col) => (2..=max_row)
                .filter(|&row| self.has_marker(grid, row, col))
                .collect(),
            None => BTreeSet::new(),
        };

        info!("  Columns: {}, rows: {}", headers.len(), max_row);
        match image_col {
            Some(col) => info!(
                "  Image column: {} ({}), marked rows: {}",
                col,
                headers[(col - 1) as usize],
                image_rows.len()
            ),
            None => info!("  No image column found"),
        }

        SheetStructure {
            headers,
            image_col,
            image_rows,
            max_row,
        }
    }

    /// データ行（2行目以降）を列ごとに集計
    pub fn profile_columns(
        &self,
        grid: &SheetGrid,
        structure: &SheetStructure,
    ) -> Vec<ColumnReport> {
        let data_rows = structure.max_row.saturating_sub(1) as usize;

        structure
            .headers
            .iter()
            .zip(1u32..)
            .map(|(header, col)| {
                let kinds: Vec<&'static str> = (2..=structure.max_row)
                    .filter_map(|row| grid.cell(row, col))
                    .filter_map(|cell| self.formatter.kind(cell))
                    .collect();
                ColumnReport {
                    header: header.clone(),
                    non_empty: kinds.len(),
                    empty: data_rows - kinds.len(),
                    kinds: kinds.into_iter().collect(),
                }
            })
            .collect()
    }

    /// 画像列の空でない値
    ///
    /// 数式のあるセルは数式を`=`付きで、それ以外はキャッシュ値を表示します。
    pub fn image_values(
        &self,
        grid: &SheetGrid,
        structure: &SheetStructure,
    ) -> Vec<(u32, String)> {
        let Some(col) = structure.image_col else {
            return Vec::new();
        };

        (2..=structure.max_row)
            .filter_map(|row| {
                let text = match grid.formula(row, col) {
                    Some(formula) => format!("={}", formula.trim_start_matches('=')),
                    None => grid
                        .cell(row, col)
                        .and_then(|cell| self.formatter.to_text(cell))
                        .filter(|text| !text.is_empty())?,
                };
                Some((row, text))
            })
            .collect()
    }

    fn read_headers(&self, grid: &SheetGrid) -> Vec<String> {
        (1..=grid.max_column())
            .map(|col| {
                grid.cell(1, col)
                    .and_then(|cell| self.formatter.to_text(cell))
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| format!("Column {}", col))
            })
            .collect()
    }

    fn find_image_column(&self, headers: &[String]) -> Option<u32> {
        headers
            .iter()
            .position(|header| self.schema.is_image_header(header))
            .map(|idx| idx as u32 + 1)
    }

    /// セルのキャッシュ値または数式にマーカーが含まれるか
    ///
    /// WPSの埋め込み画像は`=DISPIMG("ID_...",1)`という数式として保存され、
    /// キャッシュ値にも同じ文字列が入る場合と入らない場合があります。
    fn has_marker(&self, grid: &SheetGrid, row: u32, col: u32) -> bool {
        let marker = self.schema.image_marker.as_str();
        let in_value = grid
            .cell(row, col)
            .map(|cell| matches!(cell, Data::String(s) if s.contains(marker)))
            .unwrap_or(false);

        in_value
            || grid
                .formula(row, col)
                .map(|f| f.contains(marker))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Range;

    fn grid(rows: &[&[&str]]) -> SheetGrid {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(text.to_string()));
                }
            }
        }
        SheetGrid::new(range, None)
    }

    #[test]
    fn test_headers_with_blank_cells() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);
        let grid = grid(&[&["date", "", "content"], &["2024-01-05", "x", "y"]]);

        let structure = analyzer.analyze(&grid);
        assert_eq!(structure.headers, vec!["date", "Column 2", "content"]);
        assert_eq!(structure.max_row, 2);
    }

    #[test]
    fn test_find_image_column_and_marked_rows() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);
        let grid = grid(&[
            &["date", "content", "Picture"],
            &["2024-01-05", "a", "=DISPIMG(\"ID_A\",1)"],
            &["2024-01-06", "b", ""],
            &["2024-01-07", "c", "=DISPIMG(\"ID_B\",1)"],
            &["2024-01-08", "d", "just text"],
        ]);

        let structure = analyzer.analyze(&grid);
        assert_eq!(structure.image_col, Some(3));
        assert_eq!(structure.image_rows.into_iter().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_first_matching_header_wins() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);
        let grid = grid(&[&["日期", "图片", "image backup"], &["2024-01-05", "", ""]]);

        assert_eq!(analyzer.analyze(&grid).image_col, Some(2));
    }

    #[test]
    fn test_profile_columns() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);

        let mut values = Range::new((0, 0), (3, 2));
        values.set_value((0, 0), Data::String("date".to_string()));
        values.set_value((0, 1), Data::String("steps".to_string()));
        values.set_value((0, 2), Data::String("image".to_string()));
        values.set_value((1, 0), Data::String("2024-01-05".to_string()));
        values.set_value((1, 1), Data::Float(8000.0));
        values.set_value((2, 0), Data::String("2024-01-06".to_string()));
        values.set_value((2, 1), Data::String("rest".to_string()));
        values.set_value((3, 0), Data::Bool(true));
        let grid = SheetGrid::new(values, None);

        let structure = analyzer.analyze(&grid);
        let columns = analyzer.profile_columns(&grid, &structure);

        let kinds = |i: usize| columns[i].kinds.iter().copied().collect::<Vec<_>>();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].header, "date");
        assert_eq!(columns[0].non_empty, 3);
        assert_eq!(kinds(0), vec!["bool", "string"]);
        assert_eq!(columns[1].non_empty, 2);
        assert_eq!(columns[1].empty, 1);
        assert_eq!(kinds(1), vec!["number", "string"]);
        assert_eq!(columns[2].non_empty, 0);
        assert_eq!(columns[2].empty, 3);
        assert!(columns[2].kinds.is_empty());
    }

    #[test]
    fn test_image_values_prefer_formula() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);

        let mut values = Range::new((0, 0), (3, 1));
        values.set_value((0, 0), Data::String("date".to_string()));
        values.set_value((0, 1), Data::String("image".to_string()));
        values.set_value((1, 0), Data::String("2024-01-05".to_string()));
        values.set_value((2, 0), Data::String("2024-01-06".to_string()));
        values.set_value((2, 1), Data::String("sunrise".to_string()));
        values.set_value((3, 0), Data::String("2024-01-07".to_string()));
        let mut formulas = Range::new((1, 1), (1, 1));
        formulas.set_value((1, 1), "DISPIMG(\"ID_A\",1)".to_string());
        let grid = SheetGrid::new(values, Some(formulas));

        let structure = analyzer.analyze(&grid);
        assert_eq!(
            analyzer.image_values(&grid, &structure),
            vec![
                (2, "=DISPIMG(\"ID_A\",1)".to_string()),
                (3, "sunrise".to_string()),
            ]
        );
    }

    #[test]
    fn test_image_values_without_image_column() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);
        let grid = grid(&[&["date", "content"], &["2024-01-05", "x"]]);

        let structure = analyzer.analyze(&grid);
        assert!(analyzer.image_values(&grid, &structure).is_empty());
    }

    #[test]
    fn test_no_image_column() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);
        let grid = grid(&[&["date", "content"], &["2024-01-05", "=DISPIMG(\"ID_A\",1)"]]);

        let structure = analyzer.analyze(&grid);
        assert_eq!(structure.image_col, None);
        assert!(structure.image_rows.is_empty());
    }

    #[test]
    fn test_marker_in_formula_only() {
        let schema = RecordSchema::default();
        let analyzer = StructureAnalyzer::new(&schema);

        let mut values = Range::new((0, 0), (2, 1));
        values.set_value((0, 0), Data::String("date".to_string()));
        values.set_value((0, 1), Data::String("image".to_string()));
        values.set_value((1, 0), Data::String("2024-01-05".to_string()));
        values.set_value((2, 0), Data::String("2024-01-06".to_string()));
        let mut formulas = Range::new((1, 1), (1, 1));
        formulas.set_value((1, 1), "_xlfn.DISPIMG(\"ID_A\",1)".to_string());

        let structure = analyzer.analyze(&SheetGrid::new(values, Some(formulas)));
        assert_eq!(structure.image_rows.into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_custom_marker() {
        let schema = RecordSchema {
            image_marker: "[img]".to_string(),
            ..RecordSchema::default()
        };
        let analyzer = StructureAnalyzer::new(&schema);
        let grid = grid(&[
            &["date", "image"],
            &["2024-01-05", "[img] sunrise"],
            &["2024-01-06", "=DISPIMG(\"ID_A\",1)"],
        ]);

        let structure = analyzer.analyze(&grid);
        assert_eq!(structure.image_rows.into_iter().collect::<Vec<_>>(), vec![2]);
    }
}
