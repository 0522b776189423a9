//! Parser Module
//!
//! XLSXファイルの読み込みを担当するモジュール。
//! セル値の解析はcalamine、埋め込み画像の抽出はzipに委譲します。

mod media;
mod workbook;

pub(crate) use media::MediaExtractor;
pub(crate) use workbook::{SheetGrid, WorkbookParser};
