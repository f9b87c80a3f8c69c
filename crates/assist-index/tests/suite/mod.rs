mod rebuild;
mod watcher;

use std::io::Write;
use std::path::{Path, PathBuf};

use assist_index::FileHandle;

/// Write a jar holding `META-INF/spring-configuration-metadata.json`.
pub(crate) fn write_starter_jar(path: &Path, metadata: &str) -> PathBuf {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
    zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
    zip.start_file("META-INF/spring-configuration-metadata.json", options)
        .unwrap();
    zip.write_all(metadata.as_bytes()).unwrap();
    zip.finish().unwrap();
    path.to_path_buf()
}

pub(crate) fn write_metadata_file(dir: &Path, name: &str, metadata: &str) -> FileHandle {
    let path = dir.join(name);
    std::fs::write(&path, metadata).unwrap();
    FileHandle::File(path)
}

pub(crate) fn properties(names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|name| format!(r#"{{ "name": "{name}", "type": "java.lang.String" }}"#))
        .collect();
    format!(r#"{{ "properties": [ {} ] }}"#, entries.join(", "))
}
