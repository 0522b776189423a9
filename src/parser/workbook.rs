//! Workbook Module
//!
//! calamineを使用したワークブックの読み込み。
//! 選択したワークシートを、1始まりの座標でアクセスできるグリッドとして提供します。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets, Xlsx};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::api::SheetSelector;
use crate::error::DiaryError;
use crate::security::ExtractionLimits;

/// ワークシートのセルグリッド
///
/// キャッシュ値と数式文字列の両方を保持します。座標はすべて1始まり
/// （1行目がヘッダー行）で、calamineの範囲の開始位置に関係なく
/// シート上の絶対位置を指します。
#[derive(Debug, Clone)]
pub(crate) struct SheetGrid {
    values: Range<Data>,
    formulas: Option<Range<String>>,
}

impl SheetGrid {
    pub fn new(values: Range<Data>, formulas: Option<Range<String>>) -> Self {
        Self { values, formulas }
    }

    /// 最終行（1始まり）。空のシートでは0
    pub fn max_row(&self) -> u32 {
        self.values.end().map(|(row, _)| row + 1).unwrap_or(0)
    }

    /// 最終列（1始まり）。空のシートでは0
    pub fn max_column(&self) -> u32 {
        self.values.end().map(|(_, col)| col + 1).unwrap_or(0)
    }

    /// セルの値を取得
    ///
    /// # 引数
    ///
    /// * `row` - 行インデックス（1始まり）
    /// * `col` - 列インデックス（1始まり）
    ///
    /// # 戻り値
    ///
    /// 範囲外または空セルの場合は`None`
    pub fn cell(&self, row: u32, col: u32) -> Option<&Data> {
        if row == 0 || col == 0 {
            return None;
        }
        match self.values.get_value((row - 1, col - 1)) {
            Some(Data::Empty) | None => None,
            Some(data) => Some(data),
        }
    }

    /// セルの数式文字列を取得（1始まり）
    pub fn formula(&self, row: u32, col: u32) -> Option<&str> {
        if row == 0 || col == 0 {
            return None;
        }
        self.formulas
            .as_ref()?
            .get_value((row - 1, col - 1))
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }
}

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
}

impl WorkbookParser {
    /// XLSXファイルを開く
    ///
    /// # 引数
    ///
    /// * `path` - XLSXファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(DiaryError)` - 読み込みに失敗した、またはXLSX形式でない場合
    pub fn open(path: &Path) -> Result<Self, DiaryError> {
        let limits = ExtractionLimits::default();

        // 入力ファイルサイズの上限
        let size = std::fs::metadata(path)?.len();
        if size > limits.max_input_file_size {
            return Err(DiaryError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, limits.max_input_file_size
            )));
        }

        let mut buffer = Vec::with_capacity(size as usize);
        File::open(path)?.read_to_end(&mut buffer)?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(DiaryError::Parse)?;
        match sheets {
            Sheets::Xlsx(workbook) => Ok(Self { workbook }),
            _ => Err(DiaryError::Config(
                "Only XLSX format is supported".to_string(),
            )),
        }
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// シート選択方式に基づいてシート名を解決
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 選択されたシート名
    /// * `Err(DiaryError::Config)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn select_sheet(&self, selector: &SheetSelector) -> Result<String, DiaryError> {
        let names = self.sheet_names();

        match selector {
            SheetSelector::First => names
                .into_iter()
                .next()
                .ok_or_else(|| DiaryError::Config("Workbook has no sheets".to_string())),

            SheetSelector::Index(index) => {
                if *index >= names.len() {
                    return Err(DiaryError::Config(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        names.len()
                    )));
                }
                Ok(names[*index].clone())
            }

            SheetSelector::Name(name) => {
                if !names.contains(name) {
                    return Err(DiaryError::Config(format!("Sheet '{}' not found", name)));
                }
                Ok(name.clone())
            }
        }
    }

    /// シートを読み込んでグリッドを構築
    ///
    /// 数式はマーカー検出にのみ使用するため、取得に失敗しても
    /// 値だけのグリッドとして扱います。
    pub fn load_sheet(
        &mut self,
        selector: &SheetSelector,
    ) -> Result<(String, SheetGrid), DiaryError> {
        let sheet_name = self.select_sheet(selector)?;

        let values = self
            .workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| DiaryError::Parse(e.into()))?;
        let formulas = self.workbook.worksheet_formula(&sheet_name).ok();

        Ok((sheet_name, SheetGrid::new(values, formulas)))
    }
}
