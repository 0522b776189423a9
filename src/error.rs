//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxdiaryクレート全体で使用するエラー型
///
/// ファイル単位のエラー（破損したアーカイブ、読み込めないワークシートなど）は
/// オーケストレーターで捕捉され、そのファイルをスキップするだけで実行は継続します。
/// 実行全体を中断するのは、画像出力ディレクトリの作成失敗とデータファイルの保存失敗のみです。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー
/// - `Parse`: ワークブックの解析中に発生したエラー（calamine由来）
/// - `Zip`: XLSX（ZIPアーカイブ）の展開に失敗したエラー
/// - `Json`: データファイルのシリアライズに失敗したエラー
/// - `Toml`: 設定ファイルの解析に失敗したエラー
/// - `Glob`: ファイル名パターンが不正なエラー
/// - `Config`: 設定の検証に失敗したエラー
/// - `SecurityViolation`: 展開制限に違反したアーカイブ
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdiary::DiaryError;
/// use std::fs::File;
///
/// fn open_log(path: &str) -> Result<(), DiaryError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum DiaryError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの解析中に発生したエラー
    ///
    /// calamineがワークブックやワークシートを読み込む際に発生したエラーです。
    #[error("Failed to parse workbook: {0}")]
    Parse(#[from] calamine::Error),

    /// ZIPアーカイブの展開エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// データファイルのシリアライズ/デシリアライズエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定ファイル（TOML）の解析エラー
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// ファイル名パターン（glob）が不正
    #[error("Invalid file pattern: {0}")]
    Glob(#[from] globset::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ExtractorBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。例えば、一時展開ディレクトリがソースディレクトリと
    /// 同じ場合や、日付フィールド名が空の場合などです。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxdiary::{ExtractorBuilder, DiaryError};
    ///
    /// let result = ExtractorBuilder::new()
    ///     .with_source_dir("logs")
    ///     .with_temp_dir("logs")
    ///     .build();
    ///
    /// match result {
    ///     Err(DiaryError::Config(msg)) => {
    ///         eprintln!("Configuration error: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 展開制限違反
    ///
    /// エントリ数・展開後サイズの上限超過や、パストラバーサルを含むエントリ名を
    /// 検出した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
