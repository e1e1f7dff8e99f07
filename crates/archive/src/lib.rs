//! Plate splitter for packaged 3MF print jobs.
//!
//! Slicers produce a single ZIP package that may contain several build
//! plates, but the printer firmware only prints the first plate of a
//! package. [`split`] turns a multi-plate package into one package per
//! plate, renaming each plate's metadata members to `plate_1` so the
//! firmware always finds its gcode at the canonical path.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Prefix under which slicers place per-plate metadata members.
pub const METADATA_PREFIX: &str = "Metadata/";

/// Extension of the machine-code member that defines a plate.
pub const GCODE_SUFFIX: &str = ".gcode";

/// Extension used for split outputs when the upload name has none.
const DEFAULT_EXTENSION: &str = "3mf";

/// One single-plate archive produced by [`split`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlateArchive {
    /// Name the archive should be stored under on the printer.
    pub filename: String,
    /// Complete ZIP bytes.
    pub content: Vec<u8>,
}

/// Errors produced while splitting a package.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("not a valid print package: {0}")]
    Malformed(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Splits a packaged print job into one archive per plate.
///
/// A package with exactly one plate is passed through untouched: the
/// output is the original filename and the original bytes, with no
/// recompression. A package with N plates yields N archives named
/// `<base>-<n>.<ext>`, each containing every shared (non-`Metadata/`)
/// member plus that plate's metadata members renamed to plate 1.
///
/// Plate membership is a substring test of the plate number against the
/// member path before its first dot, which also keeps compound
/// extensions such as `.gcode.md5` intact when renaming.
pub fn split(archive: &[u8], upload_filename: &str) -> Result<Vec<PlateArchive>, ArchiveError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        names.push(zip.by_index(i)?.name().to_string());
    }

    let plate_count = names
        .iter()
        .filter(|n| n.starts_with(METADATA_PREFIX) && n.ends_with(GCODE_SUFFIX))
        .count();

    if plate_count == 1 {
        // Only one plate, send the original package verbatim.
        return Ok(vec![PlateArchive {
            filename: upload_filename.to_string(),
            content: archive.to_vec(),
        }]);
    }

    let (base, ext) = match upload_filename.rsplit_once('.') {
        Some((base, ext)) => (base, ext),
        None => (upload_filename, DEFAULT_EXTENSION),
    };

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut outputs = Vec::with_capacity(plate_count);

    for plate_no in 1..=plate_count {
        let token = plate_no.to_string();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for name in &names {
            let out_name = if name.starts_with(METADATA_PREFIX) {
                // Rename applies to the part before the first dot only;
                // the extension chain (".gcode", ".gcode.md5", ...) is
                // preserved verbatim.
                let (head, tail) = match name.split_once('.') {
                    Some((head, tail)) => (head, Some(tail)),
                    None => (name.as_str(), None),
                };
                // Membership is a plain substring test, matching what
                // the slicer emits. Plate "1" also matches "plate_10";
                // packages with ten or more plates are not split
                // correctly today.
                if !head.contains(&token) {
                    continue;
                }
                let renamed = head.replace(&token, "1");
                match tail {
                    Some(tail) => format!("{renamed}.{tail}"),
                    None => renamed,
                }
            } else {
                // Not plate-specific, keep it in every output.
                name.clone()
            };

            let mut content = Vec::new();
            zip.by_name(name)?.read_to_end(&mut content)?;
            writer.start_file(out_name, options)?;
            writer.write_all(&content)?;
        }

        let content = writer.finish()?.into_inner();
        outputs.push(PlateArchive {
            filename: format!("{base}-{plate_no}.{ext}"),
            content,
        });
    }

    Ok(outputs)
}
