//! 統合テスト用のフィクスチャ
//!
//! `rust_xlsxwriter`でワークブックを作成し、`xl/media`に画像エントリを追加して
//! WPSの埋め込み画像付きファイルを再現します。

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;
use tempfile::TempDir;
use xlsxdiary::{DataStore, DiaryExtractor, ExtractorBuilder};
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

/// WPSが画像セルに書き込む数式
pub fn dispimg(id: &str) -> String {
    format!("=DISPIMG(\"{}\",1)", id)
}

/// テスト用の作業ディレクトリ
pub struct Workspace {
    _dir: TempDir,
    pub root: PathBuf,
    pub logs: PathBuf,
    pub images: PathBuf,
    pub data_file: PathBuf,
    pub scratch: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let logs = root.join("logs");
        fs::create_dir_all(&logs).unwrap();
        Self {
            images: root.join("images").join("excel"),
            data_file: root.join("day_log_data.json"),
            scratch: root.join("temp_extract"),
            logs,
            root,
            _dir: dir,
        }
    }

    pub fn builder(&self) -> ExtractorBuilder {
        ExtractorBuilder::new()
            .with_source_dir(&self.logs)
            .with_images_dir(&self.images)
            .with_data_file(&self.data_file)
            .with_temp_dir(&self.scratch)
    }

    pub fn extractor(&self) -> DiaryExtractor {
        self.builder().build().unwrap()
    }

    /// ワークブックを作成して`logs/{name}`に保存
    ///
    /// `images`は`xl/media/{file name}`として追加されます。
    pub fn write_log<F>(&self, name: &str, images: &[(&str, &[u8])], fill: F) -> PathBuf
    where
        F: FnOnce(&mut Worksheet) -> Result<(), XlsxError>,
    {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        fill(worksheet).unwrap();
        let buffer = workbook.save_to_buffer().unwrap();

        let path = self.logs.join(name);
        fs::write(&path, with_media(&buffer, images)).unwrap();
        path
    }

    /// 文字列だけの表を作成。""は空セル、`=`で始まる値は数式として書き込む
    pub fn write_table(&self, name: &str, images: &[(&str, &[u8])], rows: &[&[&str]]) -> PathBuf {
        self.write_log(name, images, |sheet| {
            for (r, row) in rows.iter().enumerate() {
                for (c, text) in row.iter().enumerate() {
                    if text.is_empty() {
                        continue;
                    }
                    if text.starts_with('=') {
                        sheet.write_formula(r as u32, c as u16, *text)?;
                    } else {
                        sheet.write_string(r as u32, c as u16, *text)?;
                    }
                }
            }
            Ok(())
        })
    }

    pub fn store(&self) -> DataStore {
        DataStore::load(&self.data_file)
    }

    pub fn image_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(&self.images) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

/// XLSXのバイト列に`xl/media`エントリを追加
pub fn with_media(xlsx: &[u8], images: &[(&str, &[u8])]) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(xlsx)).unwrap();
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).unwrap();
            zip.raw_copy_file(entry).unwrap();
        }
        for (name, data) in images {
            zip.start_file(format!("xl/media/{}", name), FileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

/// 任意のエントリだけを持つZIPアーカイブを書き込む
pub fn write_raw_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        for (name, data) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    fs::write(path, buffer).unwrap();
}

/// ストア内の日付（保存順）
pub fn dates(store: &DataStore) -> Vec<String> {
    store
        .rows
        .iter()
        .filter_map(|row| row.get("date").and_then(Value::as_str).map(str::to_string))
        .collect()
}
