//! Archive extraction

use bridge_errors::{Error, InstallError};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive as TarArchive;
use tokio::task;

/// Archive container formats recognized by their leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Sniff the format from the first bytes of a file
    #[must_use]
    pub fn detect(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(b"PK\x03\x04") {
            Some(Self::Zip)
        } else if magic.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Extract `archive_path` into `dest_dir`, creating it if needed.
///
/// Entries that would escape `dest_dir` are skipped.
///
/// # Errors
///
/// Returns [`InstallError::ExtractionFailed`] if the archive cannot be read,
/// is of an unknown format, or an entry cannot be written.
pub async fn extract(archive_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| failed(format!("cannot create {}: {e}", dest_dir.display())))?;

    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    task::spawn_blocking(move || extract_blocking(&archive_path, &dest_dir))
        .await
        .map_err(|e| InstallError::TaskError {
            message: e.to_string(),
        })?
}

fn extract_blocking(archive_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    let mut magic = [0u8; 4];
    let read = File::open(archive_path)
        .and_then(|mut f| f.read(&mut magic))
        .map_err(|e| failed(format!("cannot open archive: {e}")))?;

    match ArchiveFormat::detect(&magic[..read]) {
        Some(ArchiveFormat::Zip) => extract_zip(archive_path, dest_dir),
        Some(ArchiveFormat::TarGz) => extract_tar_gz(archive_path, dest_dir),
        None => Err(failed("unsupported archive format".to_string())),
    }
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    let tar_gz = File::open(archive_path).map_err(|e| failed(format!("cannot open archive: {e}")))?;
    let mut archive = TarArchive::new(GzDecoder::new(tar_gz));
    archive
        .unpack(dest_dir)
        .map_err(|e| failed(format!("cannot extract tar.gz: {e}")))
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    let file = File::open(archive_path).map_err(|e| failed(format!("cannot open archive: {e}")))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| failed(format!("cannot read zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| failed(format!("cannot read zip entry: {e}")))?;

        let outpath: PathBuf = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .map_err(|e| failed(format!("cannot create {}: {e}", outpath.display())))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| failed(format!("cannot create {}: {e}", parent.display())))?;
        }
        let mut outfile = File::create(&outpath)
            .map_err(|e| failed(format!("cannot create {}: {e}", outpath.display())))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| failed(format!("cannot write {}: {e}", outpath.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(())
}

fn failed(message: String) -> Error {
    InstallError::ExtractionFailed { message }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn detects_by_magic_bytes() {
        assert_eq!(ArchiveFormat::detect(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect(&[0x1f, 0x8b, 0x08]), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect(b"<html>"), None);
        assert_eq!(ArchiveFormat::detect(b""), None);
    }

    #[tokio::test]
    async fn extracts_zip_with_nested_dirs() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("a.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let opts = zip::write::SimpleFileOptions::default();
            zip.add_directory("widget-main/", opts).unwrap();
            zip.start_file("widget-main/inc/util.php", opts).unwrap();
            zip.write_all(b"<?php // util").unwrap();
            zip.start_file("../escape.txt", opts).unwrap();
            zip.write_all(b"nope").unwrap();
            zip.finish().unwrap();
        }

        let dest = tmp.path().join("out");
        extract(&archive, &dest).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("widget-main/inc/util.php")).unwrap(),
            "<?php // util"
        );
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn extracts_tar_gz() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("a.tar.gz");
        {
            let gz = flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(gz);
            let body = b"hello";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "pkg/hello.txt", &body[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = tmp.path().join("out");
        extract(&archive, &dest).await.unwrap();
        assert_eq!(std::fs::read(dest.join("pkg/hello.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn rejects_unknown_format() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("a.bin");
        std::fs::write(&archive, b"<html>not an archive</html>").unwrap();

        let err = extract(&archive, &tmp.path().join("out")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::ExtractionFailed { .. })
        ));
    }
}
