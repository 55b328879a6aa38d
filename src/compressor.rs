//! Archival compression of canonical JSON batches.
//!
//! Two codecs are supported: gzip (fast) and xz (high ratio). The codec of
//! an existing archive is inferred from its file extension.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::{Result, StoreError};

const XZ_PRESET: u32 = 9;

/// Compression codec for archival files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum Codec {
    /// Fast general-purpose codec, `.json.gz`.
    #[default]
    Gzip,
    /// Slow high-ratio codec, `.json.xz`.
    Xz,
}

impl Codec {
    /// Canonical archive extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Gzip => "json.gz",
            Codec::Xz => "json.xz",
        }
    }

    /// Infer the codec from a file's final extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("gz") => Ok(Codec::Gzip),
            Some("xz") | Some("lzma") => Ok(Codec::Xz),
            _ => Err(StoreError::CodecDetection(path.to_path_buf())),
        }
    }
}

impl FromStr for Codec {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Codec::Gzip),
            "xz" | "lzma" => Ok(Codec::Xz),
            other => Err(StoreError::UnsupportedCodec(other.to_string())),
        }
    }
}

impl TryFrom<String> for Codec {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Gzip => write!(f, "gzip"),
            Codec::Xz => write!(f, "xz"),
        }
    }
}

/// Serialize `data` as JSON and write it to `destination` under `codec`.
pub fn compress<T: Serialize + ?Sized>(data: &T, destination: &Path, codec: Codec) -> Result<()> {
    let json = serde_json::to_vec(data)?;
    let file = File::create(destination)?;
    let writer = BufWriter::new(file);

    let written = match codec {
        Codec::Gzip => {
            let mut encoder = GzEncoder::new(writer, flate2::Compression::default());
            encoder
                .write_all(&json)
                .and_then(|_| encoder.finish())
                .and_then(|mut w| w.flush())
        }
        Codec::Xz => {
            let mut encoder = XzEncoder::new(writer, XZ_PRESET);
            encoder
                .write_all(&json)
                .and_then(|_| encoder.finish())
                .and_then(|mut w| w.flush())
        }
    };

    written.map_err(|e| StoreError::compression(destination, e))?;

    tracing::debug!(
        path = %destination.display(),
        %codec,
        json_bytes = json.len(),
        "compressed batch"
    );
    Ok(())
}

/// Read back an archive written by [`compress`].
///
/// When `codec` is `None` it is inferred from the extension. Any read or
/// parse failure is reported as [`StoreError::Decompression`].
pub fn decompress<T: DeserializeOwned>(source: &Path, codec: Option<Codec>) -> Result<T> {
    let codec = match codec {
        Some(c) => c,
        None => Codec::detect(source)?,
    };

    let file = File::open(source).map_err(|e| StoreError::decompression(source, e))?;
    let reader = BufReader::new(file);

    let mut json = Vec::new();
    let read = match codec {
        Codec::Gzip => GzDecoder::new(reader).read_to_end(&mut json),
        Codec::Xz => XzDecoder::new(reader).read_to_end(&mut json),
    };
    read.map_err(|e| StoreError::decompression(source, e))?;

    serde_json::from_slice(&json).map_err(|e| StoreError::decompression(source, e))
}

/// Compress an existing JSON file.
///
/// Without an explicit `output`, the archive is written next to the input
/// with the codec's extension substituted (`batch.json` → `batch.json.gz`).
/// Returns the path written.
pub fn compress_file(input: &Path, output: Option<&Path>, codec: Codec) -> Result<PathBuf> {
    let output = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension(codec.extension()),
    };

    let content = std::fs::read(input)?;
    let data: serde_json::Value = serde_json::from_slice(&content)?;
    compress(&data, &output, codec)?;

    Ok(output)
}

/// Compressed size divided by original size.
///
/// A raw fraction, not a percentage; values below 1 mean the archive is
/// smaller.
pub fn compression_ratio(original: &Path, compressed: &Path) -> Result<f64> {
    let original_size = std::fs::metadata(original)?.len();
    let compressed_size = std::fs::metadata(compressed)?.len();

    if original_size == 0 {
        return Err(StoreError::compression(
            original,
            "original file is empty, ratio is undefined",
        ));
    }

    Ok(compressed_size as f64 / original_size as f64)
}
