use anyhow::Result;
use ironcart::io::compression::{auto_detect_reader, auto_detect_writer, codec_for_path};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const TEXT: &str = "InvoiceNo,Description,Quantity,UnitPrice\n1,Pen,2,1.5\n";

fn write_with(path: &Path) -> Result<()> {
    let mut w = auto_detect_writer(File::create(path)?, path)?;
    w.write_all(TEXT.as_bytes())?;
    w.flush()?;
    Ok(())
}

fn read_with(path: &Path, hint: &Path) -> Result<String> {
    let mut r = auto_detect_reader(File::open(path)?, hint)?;
    let mut s = String::new();
    r.read_to_string(&mut s)?;
    Ok(s)
}

#[test]
fn plain_files_pass_through() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("plain.csv");
    write_with(&path)?;
    assert_eq!(std::fs::read_to_string(&path)?, TEXT);
    assert_eq!(read_with(&path, &path)?, TEXT);
    assert!(codec_for_path(&path).is_none());
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_roundtrip_by_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orders.csv.gz");
    write_with(&path)?;
    let raw = std::fs::read(&path)?;
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    assert_eq!(read_with(&path, &path)?, TEXT);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_detected_by_magic_bytes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let gz = dir.path().join("orders.csv.gz");
    write_with(&gz)?;
    let disguised = dir.path().join("orders.csv");
    std::fs::copy(&gz, &disguised)?;
    assert_eq!(read_with(&disguised, &disguised)?, TEXT);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn extension_match_ignores_case() {
    let codec = codec_for_path("ORDERS.CSV.GZ").map(|c| c.name().to_string());
    assert_eq!(codec.as_deref(), Some("gzip"));
}

#[cfg(feature = "compression-zstd")]
#[test]
fn zstd_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orders.csv.zst");
    write_with(&path)?;
    let raw = std::fs::read(&path)?;
    assert_eq!(&raw[..4], &[0x28, 0xb5, 0x2f, 0xfd]);
    assert_eq!(read_with(&path, &path)?, TEXT);
    Ok(())
}
