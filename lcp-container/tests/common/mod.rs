//! Shared fixtures for container tests.

#![allow(dead_code)]

use lcp_license::LicenseDocument;
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A parseable License Document with the given id.
pub fn license(id: &str) -> LicenseDocument {
    let value = json!({
        "id": id,
        "provider": "https://provider.test",
        "issued": "2024-01-01T00:00:00Z",
        "encryption": {
            "profile": "http://readium.org/lcp/basic-profile",
            "content_key": {"encrypted_value": "AAAA", "algorithm": "http://www.w3.org/2001/04/xmlenc#aes256-cbc"},
            "user_key": {"text_hint": "hint", "algorithm": "http://www.w3.org/2001/04/xmlenc#sha256", "key_check": "AAAA"}
        },
        "links": [
            {"rel": "hint", "href": "https://provider.test/hint"},
            {"rel": "publication", "href": "https://provider.test/book.epub"}
        ],
        "signature": {
            "algorithm": "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            "certificate": "AAAA",
            "value": "AAAA"
        }
    });
    LicenseDocument::parse(&serde_json::to_vec_pretty(&value).unwrap()).unwrap()
}

/// Writes an EPUB-like archive: stored `mimetype` first, then `entries`.
pub fn write_epub(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    write_entries(&mut zip, entries);
    std::fs::write(path, zip.finish().unwrap().into_inner()).unwrap();
}

/// Writes a plain archive containing only `entries`.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    write_entries(&mut zip, entries);
    std::fs::write(path, zip.finish().unwrap().into_inner()).unwrap();
}

fn write_entries(zip: &mut ZipWriter<Cursor<Vec<u8>>>, entries: &[(&str, &[u8])]) {
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, deflated).unwrap();
        zip.write_all(data).unwrap();
    }
}

/// Entry names in archive order.
pub fn entry_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect::<Vec<_>>()
}

/// Entry names in central directory order.
pub fn ordered_entry_names(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    use std::io::Read;
    let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}
