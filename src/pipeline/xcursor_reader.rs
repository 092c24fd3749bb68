use anyhow::{Result, anyhow, bail};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;

use super::xcursor_writer::{CHUNK_IMAGE, FILE_HEADER_SIZE, IMAGE_HEADER_SIZE, MAGIC, VERSION};

/// One image chunk, pixels left as stored (premultiplied BGRA).
#[derive(Debug, Clone)]
pub struct XcursorImage {
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub xhot: u32,
    pub yhot: u32,
    pub delay: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub struct XcursorFile {
    /// Images in table-of-contents order.
    pub images: Vec<XcursorImage>,
}

impl XcursorFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            bail!("Invalid Xcursor magic bytes");
        }

        let header_size = cursor.read_u32::<LittleEndian>()?;
        if header_size != FILE_HEADER_SIZE {
            bail!("Invalid Xcursor header size: {}", header_size);
        }

        let version = cursor.read_u32::<LittleEndian>()?;
        if version != VERSION {
            bail!("Unsupported Xcursor version: 0x{:08x}", version);
        }

        let ntoc = cursor.read_u32::<LittleEndian>()?;

        let mut toc_entries = Vec::new();
        for _ in 0..ntoc {
            let chunk_type = cursor.read_u32::<LittleEndian>()?;
            let chunk_subtype = cursor.read_u32::<LittleEndian>()?;
            let chunk_position = cursor.read_u32::<LittleEndian>()?;

            if chunk_type == CHUNK_IMAGE {
                toc_entries.push((chunk_subtype, chunk_position));
            }
        }

        let mut images = Vec::with_capacity(toc_entries.len());
        for (size, position) in toc_entries {
            cursor.set_position(u64::from(position));

            let chunk_header = cursor.read_u32::<LittleEndian>()?;
            let chunk_type = cursor.read_u32::<LittleEndian>()?;
            let nominal = cursor.read_u32::<LittleEndian>()?;

            if chunk_type != CHUNK_IMAGE {
                bail!("TOC entry at {} points at a non-image chunk", position);
            }
            if chunk_header != IMAGE_HEADER_SIZE {
                bail!("Invalid chunk header size: {}", chunk_header);
            }
            if nominal != size {
                bail!("Chunk at {} has size {} but TOC says {}", position, nominal, size);
            }

            let version = cursor.read_u32::<LittleEndian>()?;
            if version != 1 {
                bail!("Unsupported image version: {}", version);
            }

            let width = cursor.read_u32::<LittleEndian>()?;
            let height = cursor.read_u32::<LittleEndian>()?;
            let xhot = cursor.read_u32::<LittleEndian>()?;
            let yhot = cursor.read_u32::<LittleEndian>()?;
            let delay = cursor.read_u32::<LittleEndian>()?;

            let byte_len = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(4))
                .filter(|n| (cursor.position() as usize).saturating_add(*n) <= data.len())
                .ok_or_else(|| anyhow!("Image at {} is truncated ({}x{})", position, width, height))?;
            let mut pixels = vec![0u8; byte_len];
            cursor.read_exact(&mut pixels)?;

            images.push(XcursorImage {
                size,
                width,
                height,
                xhot,
                yhot,
                delay,
                pixels,
            });
        }

        if images.is_empty() {
            return Err(anyhow!("No valid cursor images found"));
        }

        Ok(XcursorFile { images })
    }

    /// Distinct nominal sizes, ascending.
    pub fn sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = self.images.iter().map(|img| img.size).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn images_for_size(&self, size: u32) -> Vec<&XcursorImage> {
        self.images.iter().filter(|img| img.size == size).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Hotspot;
    use crate::pipeline::raster::RasterImage;
    use crate::pipeline::xcursor_writer::to_x11;

    #[test]
    fn rejects_bad_magic() {
        assert!(XcursorFile::from_bytes(b"INVALID").is_err());
    }

    #[test]
    fn reads_hand_built_file() {
        let mut data = Vec::new();
        data.extend_from_slice(b"Xcur");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());

        data.extend_from_slice(&0xfffd0002u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&28u32.to_le_bytes());

        data.extend_from_slice(&36u32.to_le_bytes());
        data.extend_from_slice(&0xfffd0002u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        for _ in 0..4 {
            data.extend_from_slice(&[255, 128, 64, 255]);
        }

        let xcursor = XcursorFile::from_bytes(&data).unwrap();
        assert_eq!(xcursor.images.len(), 1);
        assert_eq!(xcursor.images[0].width, 2);
        assert_eq!(xcursor.images[0].xhot, 1);
        assert_eq!(&xcursor.images[0].pixels[0..4], &[255, 128, 64, 255]);

        data.truncate(data.len() - 1);
        assert!(XcursorFile::from_bytes(&data).is_err());
    }

    #[test]
    fn round_trip_keeps_order_and_metadata() {
        let images: Vec<RasterImage> = [(24, 0, 30), (24, 1, 40), (48, 0, 30), (48, 1, 40)]
            .into_iter()
            .map(|(size, frame, delay_ms)| RasterImage {
                size,
                hotspot: Hotspot::new(size / 4, size / 3),
                pixels: vec![frame as u8; (size * size * 4) as usize],
                delay_ms,
                frame,
            })
            .collect();

        let decoded = XcursorFile::from_bytes(&to_x11(&images)).unwrap();
        assert_eq!(decoded.sizes(), vec![24, 48]);
        assert_eq!(decoded.images_for_size(48).len(), 2);
        for (original, read) in images.iter().zip(&decoded.images) {
            assert_eq!(read.size, original.size);
            assert_eq!(read.width, original.size);
            assert_eq!(read.xhot, original.hotspot.x);
            assert_eq!(read.yhot, original.hotspot.y);
            assert_eq!(read.delay, original.delay_ms);
            assert_eq!(read.pixels, original.pixels);
        }
    }
}
