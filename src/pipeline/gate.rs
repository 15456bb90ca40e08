//! Format gate: decide from the declared filename whether we accept a file.
//!
//! Dispatch is extension-based (last `.xxx` suffix, case-insensitive) against
//! a fixed allow-set. Because a filename is only a claim, [`verify_signature`]
//! additionally compares the leading magic bytes with the declared format.

use crate::error::Img2PdfError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions the pipeline accepts, lower-case with the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".heic", ".heif"];

/// Fallback base name when the upload carries no usable filename.
pub const DEFAULT_BASE_NAME: &str = "image";

/// An accepted source image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Heic,
    Heif,
}

impl ImageFormat {
    /// Map a lower-case extension (with dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".jpg" | ".jpeg" => Some(Self::Jpeg),
            ".png" => Some(Self::Png),
            ".heic" => Some(Self::Heic),
            ".heif" => Some(Self::Heif),
            _ => None,
        }
    }

    /// MIME type of the bytes this format is carried as.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
        }
    }

    /// True for the ISO-BMFF family that needs transcoding before display.
    pub fn needs_transcode(self) -> bool {
        matches!(self, Self::Heic | Self::Heif)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Heic => "HEIC",
            Self::Heif => "HEIF",
        })
    }
}

/// Last `.xxx` suffix of `filename`, lower-cased, including the dot.
///
/// Returns an empty string when the name has no suffix or ends in a dot.
pub fn extension_of(filename: &str) -> String {
    let name = base_component(filename);
    match name.rfind('.') {
        Some(i) if i + 1 < name.len() => name[i..].to_lowercase(),
        _ => String::new(),
    }
}

/// Validate `filename` against the allow-set.
pub fn check_format(filename: &str) -> Result<ImageFormat, Img2PdfError> {
    let ext = extension_of(filename);
    ImageFormat::from_extension(&ext).ok_or(Img2PdfError::UnsupportedFormat { ext })
}

/// Name for the generated PDF: base name without its extension, plus `.pdf`.
///
/// `photo.JPG` → `photo.pdf`. Directory components are dropped and characters
/// that would break a quoted `Content-Disposition` value are removed.
pub fn output_filename(filename: &str) -> String {
    let name = base_component(filename);
    let stem = match name.rfind('.') {
        Some(i) if i + 1 < name.len() => &name[..i],
        _ => name,
    };
    let clean: String = stem
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    let clean = clean.trim();
    if clean.is_empty() {
        format!("{DEFAULT_BASE_NAME}.pdf")
    } else {
        format!("{clean}.pdf")
    }
}

fn base_component(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

// ── Magic-byte sniffing ──────────────────────────────────────────────────

/// Container format detected from the leading bytes of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Jpeg,
    Png,
    /// ISO-BMFF `ftyp` box with a HEIF/HEIC brand.
    Heif,
    /// Some other image format the `image` crate recognises.
    Other(String),
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => f.write_str("JPEG"),
            Self::Png => f.write_str("PNG"),
            Self::Heif => f.write_str("HEIF"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const HEIF_BRANDS: [&[u8; 4]; 10] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs", b"mif1", b"msf1",
];

/// Identify the container from magic bytes. `None` if unrecognised.
pub fn sniff(bytes: &[u8]) -> Option<Signature> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(Signature::Jpeg);
    }
    if bytes.starts_with(&PNG_MAGIC) {
        return Some(Signature::Png);
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        let brand = &bytes[8..12];
        if HEIF_BRANDS.iter().any(|b| b.as_slice() == brand) {
            return Some(Signature::Heif);
        }
    }
    image::guess_format(bytes)
        .ok()
        .map(|f| Signature::Other(format!("{f:?}")))
}

/// Check that `bytes` plausibly are the declared `format`.
///
/// HEIC/HEIF buffers that match no known signature are let through so the
/// decoder reports them as corrupt rather than mislabelled.
pub fn verify_signature(format: ImageFormat, bytes: &[u8]) -> Result<(), Img2PdfError> {
    let detected = sniff(bytes);
    let ok = match (format, &detected) {
        (ImageFormat::Jpeg, Some(Signature::Jpeg)) => true,
        (ImageFormat::Png, Some(Signature::Png)) => true,
        (ImageFormat::Heic | ImageFormat::Heif, Some(Signature::Heif) | None) => true,
        _ => false,
    };
    if ok {
        return Ok(());
    }
    Err(Img2PdfError::SignatureMismatch {
        declared: format.to_string(),
        detected: detected
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unrecognised data".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_last_suffix() {
        assert_eq!(extension_of("photo.JPG"), ".jpg");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("IMG_0001.HeIc"), ".heic");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of("trailing."), "");
        assert_eq!(extension_of(""), "");
    }

    #[test]
    fn leading_dot_name_is_all_extension() {
        assert_eq!(extension_of(".bashrc"), ".bashrc");
        assert_eq!(extension_of(".heic"), ".heic");
        assert_eq!(extension_of(".PNG"), ".png");
        assert_eq!(extension_of("uploads/.jpg"), ".jpg");
        assert_eq!(check_format(".heic").unwrap(), ImageFormat::Heic);
        assert_eq!(check_format(".JPEG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(output_filename(".heic"), "image.pdf");
    }

    #[test]
    fn extension_ignores_dots_in_directories() {
        assert_eq!(extension_of("dir.v2/noext"), "");
        assert_eq!(extension_of(r"C:\pics.old\cat.png"), ".png");
    }

    #[test]
    fn allow_set_is_accepted() {
        for ext in ALLOWED_EXTENSIONS {
            let name = format!("file{}", ext.to_uppercase());
            assert!(check_format(&name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn others_are_rejected_with_extension() {
        for (name, ext) in [("a.gif", ".gif"), ("notes.txt", ".txt"), ("noext", "")] {
            match check_format(name) {
                Err(Img2PdfError::UnsupportedFormat { ext: got }) => assert_eq!(got, ext),
                other => panic!("{name}: expected UnsupportedFormat, got {other:?}"),
            }
        }
    }

    #[test]
    fn output_filename_strips_extension_case_insensitively() {
        assert_eq!(output_filename("photo.JPG"), "photo.pdf");
        assert_eq!(output_filename("photo.jpeg"), "photo.pdf");
        assert_eq!(output_filename("my.holiday.heic"), "my.holiday.pdf");
    }

    #[test]
    fn output_filename_sanitises() {
        assert_eq!(output_filename("../../etc/passwd.png"), "passwd.pdf");
        assert_eq!(output_filename("a\"b.png"), "ab.pdf");
        assert_eq!(output_filename(""), "image.pdf");
        assert_eq!(output_filename(".png"), "image.pdf");
    }

    #[test]
    fn sniff_known_magic() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some(Signature::Jpeg));
        assert_eq!(sniff(&PNG_MAGIC), Some(Signature::Png));
        let heic = b"\0\0\0\x18ftypheic\0\0\0\0mif1heic";
        assert_eq!(sniff(heic), Some(Signature::Heif));
        assert_eq!(sniff(b"GIF89a\x01\0\x01\0"), Some(Signature::Other("Gif".into())));
        assert_eq!(sniff(b"hello world"), None);
    }

    #[test]
    fn verify_accepts_matching_content() {
        assert!(verify_signature(ImageFormat::Png, &PNG_MAGIC).is_ok());
        assert!(verify_signature(ImageFormat::Jpeg, &[0xFF, 0xD8, 0xFF, 0xDB]).is_ok());
    }

    #[test]
    fn verify_rejects_mislabelled_content() {
        let err = verify_signature(ImageFormat::Jpeg, &PNG_MAGIC).unwrap_err();
        assert!(matches!(err, Img2PdfError::SignatureMismatch { .. }));
        assert!(verify_signature(ImageFormat::Png, b"plain text").is_err());
        assert!(verify_signature(ImageFormat::Heic, &PNG_MAGIC).is_err());
    }

    #[test]
    fn verify_defers_unknown_heic_to_decoder() {
        assert!(verify_signature(ImageFormat::Heic, b"\0\0\0\x18ftyp").is_ok());
        assert!(verify_signature(ImageFormat::Heif, b"garbage").is_ok());
    }
}
