//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};

/// シート選択方式
///
/// 各ファイルから日記データを読み取るワークシートを指定します。
/// 1ファイルにつき1シートのみを処理します。
///
/// # 設定ファイルでの指定
///
/// ```toml
/// sheet = "first"            # 先頭シート（デフォルト）
/// sheet = { index = 1 }      # インデックス指定（0始まり）
/// sheet = { name = "2024" }  # シート名指定
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SheetSelector {
    /// 先頭のシート（デフォルト）
    #[default]
    First,

    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(1)` は2番目のシートを選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        sheet: SheetSelector,
    }

    #[test]
    fn test_sheet_selector_default() {
        assert_eq!(SheetSelector::default(), SheetSelector::First);
    }

    #[test]
    fn test_sheet_selector_from_toml() {
        let w: Wrapper = toml::from_str(r#"sheet = "first""#).unwrap();
        assert_eq!(w.sheet, SheetSelector::First);

        let w: Wrapper = toml::from_str("sheet = { index = 2 }").unwrap();
        assert_eq!(w.sheet, SheetSelector::Index(2));

        let w: Wrapper = toml::from_str(r#"sheet = { name = "日记" }"#).unwrap();
        assert_eq!(w.sheet, SheetSelector::Name("日记".to_string()));
    }
}
