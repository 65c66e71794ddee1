//! Payload builders for bundle fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Builds a zip bundle from `(path, contents)` entries.
pub struct ArchiveBuilder {
    entries: Vec<(String, String)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    pub fn manifest(self, manifest: serde_json::Value) -> Self {
        self.file("manifest.json", &manifest.to_string())
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.entries.push((path.to_string(), contents.to_string()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (path, contents) in &self.entries {
            writer
                .start_file(path.as_str(), SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(contents.as_bytes()).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn json_bundle(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec_pretty(&value).expect("serialize bundle")
}
