use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;

use crate::app::Result;

/// Decode any supported cover format, drop alpha and palette modes, and
/// write a baseline JPEG at `quality`.
pub fn reencode_cover(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let rgb = image.to_rgb8();

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

/// Re-encode the cover staged at `path` in place, returning the new bytes.
pub fn reencode_file(path: &Path, quality: u8) -> Result<Vec<u8>> {
    let raw = fs::read(path)?;
    let encoded = reencode_cover(&raw, quality)?;
    fs::write(path, &encoded)?;
    Ok(encoded)
}
