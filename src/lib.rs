//! xlsxdiary - XLSX日記ログから画像とレコードを抽出するツール
//!
//! WPSスプレッドシートなどで作成された日記形式のXLSXファイル（1行目がヘッダー、
//! 1行が1日分）を読み込み、埋め込み画像を画像マーカーのある行に割り当てて
//! 画像ディレクトリへ書き出し、各行をJSONデータファイルへマージします。
//!
//! データファイル内のレコードは日付フィールドで一意になり、日付の降順に並びます。
//! 既に存在する日付の行は追加されないため、同じ入力で何度実行しても結果は変わりません。
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxdiary::ExtractorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = ExtractorBuilder::new()
//!         .with_source_dir("diary")
//!         .with_images_dir("site/images/excel")
//!         .with_data_file("site/day_log_data.json")
//!         .build()?;
//!
//!     let summary = extractor.run(None)?;
//!     println!("{} new record(s), {} total", summary.new_records, summary.total_records);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration File
//!
//! ```rust,no_run
//! use xlsxdiary::{ExtractorBuilder, ExtractorConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractorConfig::from_toml_file("xlsxdiary.toml")?;
//!     let extractor = ExtractorBuilder::from_config(config).build()?;
//!     extractor.run(Some("2024*.xlsx"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Structure Report
//!
//! `analyze`はファイルを書き込まずに、各シートの列・画像列・画像数を報告します。
//!
//! ```rust,no_run
//! use xlsxdiary::ExtractorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = ExtractorBuilder::new().with_source_dir("diary").build()?;
//!     for report in extractor.analyze(None)? {
//!         println!("{}: {} image(s)", report.file.display(), report.image_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Working with the Data File
//!
//! ```rust,no_run
//! use std::path::Path;
//! use xlsxdiary::{DataStore, RecordSchema};
//!
//! let store = DataStore::load(Path::new("day_log_data.json"));
//! let dates = store.dedup_set(&RecordSchema::default());
//! println!("{} distinct date(s)", dates.len());
//! ```

mod api;
mod builder;
mod error;
mod extractor;
mod formatter;
mod parser;
mod rows;
mod security;
mod store;
mod structure;
mod types;

#[cfg(feature = "cli")]
pub mod logging;

// 公開API
pub use api::SheetSelector;
pub use builder::{ExtractorBuilder, ExtractorConfig};
pub use error::DiaryError;
pub use extractor::DiaryExtractor;
pub use store::DataStore;
pub use types::{
    ColumnReport, DedupSet, FileExtraction, ImageMapping, ImageRecord, Record, RecordSchema,
    RunSummary, SheetReport, SheetStructure, IMAGE_EXTENSIONS,
};
