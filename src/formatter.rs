//! Formatter Module
//!
//! calamineのセル値をレコード用のJSON値・表示文字列に変換するモジュール。
//! 日付型のセルは常に`YYYY-MM-DD`形式に正規化されます。

use calamine::{Data, ExcelDateTime};
use chrono::NaiveDate;
use serde_json::{Number, Value};

/// 正規化後の日付形式
const DATE_FORMAT: &str = "%Y-%m-%d";

/// f64で整数を正確に表現できる上限（2^53）
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug, Default)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new() -> Self {
        Self {
            date_formatter: DateFormatter,
        }
    }

    /// セル値をレコードに格納するJSON値に変換
    ///
    /// # 引数
    ///
    /// * `cell` - calamineのセルデータ
    ///
    /// # 戻り値
    ///
    /// * `Some(Value)` - 値が存在する場合
    /// * `None` - 空セルの場合
    pub fn to_json(&self, cell: &Data) -> Option<Value> {
        let value = match cell {
            Data::Empty => return None,
            Data::String(s) => Value::String(s.clone()),
            Data::Int(i) => Value::from(*i),
            Data::Float(f) => float_to_json(*f),
            Data::Bool(b) => Value::Bool(*b),
            Data::Error(e) => Value::String(e.to_string()),
            Data::DateTime(dt) => match self.date_formatter.format(dt) {
                Some(date) => Value::String(date),
                None => float_to_json(dt.as_f64()),
            },
            Data::DateTimeIso(s) => Value::String(
                self.date_formatter
                    .format_iso(s)
                    .unwrap_or_else(|| s.clone()),
            ),
            Data::DurationIso(s) => Value::String(s.clone()),
        };
        Some(value)
    }

    /// セル値の種類名
    ///
    /// 空セルは`None`です。
    pub fn kind(&self, cell: &Data) -> Option<&'static str> {
        let kind = match cell {
            Data::Empty => return None,
            Data::String(_) => "string",
            Data::Int(_) | Data::Float(_) => "number",
            Data::Bool(_) => "bool",
            Data::Error(_) => "error",
            Data::DateTime(_) | Data::DateTimeIso(_) => "date",
            Data::DurationIso(_) => "duration",
        };
        Some(kind)
    }

    /// セル値を表示用の文字列に変換
    ///
    /// 画像列でマーカーのない行は、元のセル内容をこの形式で保持します。
    pub fn to_text(&self, cell: &Data) -> Option<String> {
        match self.to_json(cell)? {
            Value::String(s) => Some(s),
            Value::Bool(b) => Some(if b { "TRUE" } else { "FALSE" }.to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// 数値をJSON値に変換
///
/// 整数値の浮動小数点数は整数として出力します（`3.0` -> `3`）。
fn float_to_json(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// 日付フォーマッター
///
/// Excelの日付値を`YYYY-MM-DD`に変換します。
/// 1900年/1904年エポックの違いとうるう年バグはcalamine側で処理されます。
#[derive(Debug, Default)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// Excelの日付値をフォーマット
    ///
    /// 期間（duration）型の値は日付ではないため`None`を返します。
    pub fn format(&self, value: &ExcelDateTime) -> Option<String> {
        if value.is_duration() {
            return None;
        }
        value
            .as_datetime()
            .map(|dt| dt.format(DATE_FORMAT).to_string())
    }

    /// ISO 8601形式の日時文字列（`2024-01-05T08:30:00`など）を日付に変換
    pub fn format_iso(&self, value: &str) -> Option<String> {
        let date_part = value.get(..10)?;
        NaiveDate::parse_from_str(date_part, DATE_FORMAT)
            .ok()
            .map(|date| date.format(DATE_FORMAT).to_string())
    }
}
