use std::io::Cursor;

use binrw::BinRead;

/// Reads pixel dimensions from an encoded image without decoding the pixels.
pub trait ImageProbe: Send + Sync {
    fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), String>;
}

/// Signature plus the mandatory leading IHDR chunk of a PNG file.
#[derive(BinRead, Debug, PartialEq)]
#[br(big, magic = b"\x89PNG\r\n\x1a\n")]
struct PngHeader {
    #[br(assert(_chunk_len == 13))]
    _chunk_len: u32,
    #[br(assert(_chunk_type == *b"IHDR"))]
    _chunk_type: [u8; 4],
    width: u32,
    height: u32,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PngProbe;

impl ImageProbe for PngProbe {
    fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), String> {
        let header = PngHeader::read(&mut Cursor::new(data))
            .map_err(|e| format!("not a PNG image ({})", e))?;
        if header.width == 0 || header.height == 0 {
            return Err(format!("PNG declares empty image {}x{}", header.width, header.height));
        }
        Ok((header.width, header.height))
    }
}

/// Minimal PNG prefix with the given dimensions, enough for [`PngProbe`].
#[cfg(test)]
pub(crate) fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    // bit depth, colour type, compression, filter, interlace, then a dummy crc
    out.extend_from_slice(&[8, 6, 0, 0, 0]);
    out.extend_from_slice(&[0; 4]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_ihdr_dimensions() {
        assert_eq!(PngProbe.dimensions(&png_header(2880, 1440)), Ok((2880, 1440)));
    }

    #[test]
    fn rejects_non_png() {
        assert!(PngProbe.dimensions(b"GIF89a....").is_err());
        assert!(PngProbe.dimensions(b"").is_err());
        assert!(PngProbe.dimensions(&png_header(2880, 1440)[..12]).is_err());
        assert!(PngProbe.dimensions(&png_header(0, 10)).is_err());
    }
}
