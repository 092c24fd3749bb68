use byteorder::{ByteOrder, LittleEndian};

use super::raster::RasterImage;

pub const MAGIC: &[u8] = b"Xcur";
pub const VERSION: u32 = 0x0001_0000;
pub const CHUNK_IMAGE: u32 = 0xFFFD_0002;
pub const FILE_HEADER_SIZE: u32 = 16;
pub const TOC_ENTRY_SIZE: u32 = 12;
pub const IMAGE_HEADER_SIZE: u32 = 36;
const IMAGE_VERSION: u32 = 1;

/// Packs `images` into one Xcursor file, in the order given.
///
/// Callers sort by pixel size, then frame index; the encoder never
/// reorders. Images must already be square with `size * size * 4` bytes of
/// premultiplied BGRA.
pub fn to_x11(images: &[RasterImage]) -> Vec<u8> {
    let data_len: usize = images
        .iter()
        .map(|img| (IMAGE_HEADER_SIZE + TOC_ENTRY_SIZE) as usize + img.pixels.len())
        .sum();
    let mut output = Vec::with_capacity(FILE_HEADER_SIZE as usize + data_len);

    output.extend_from_slice(MAGIC);
    push_u32(&mut output, FILE_HEADER_SIZE);
    push_u32(&mut output, VERSION);
    push_u32(&mut output, images.len() as u32);

    let mut offset = FILE_HEADER_SIZE + TOC_ENTRY_SIZE * images.len() as u32;
    for image in images {
        push_u32(&mut output, CHUNK_IMAGE);
        push_u32(&mut output, image.size);
        push_u32(&mut output, offset);
        offset += IMAGE_HEADER_SIZE + image.pixels.len() as u32;
    }

    for image in images {
        debug_assert_eq!(image.pixels.len(), (image.size * image.size * 4) as usize);
        push_u32(&mut output, IMAGE_HEADER_SIZE);
        push_u32(&mut output, CHUNK_IMAGE);
        push_u32(&mut output, image.size);
        push_u32(&mut output, IMAGE_VERSION);
        push_u32(&mut output, image.size);
        push_u32(&mut output, image.size);
        push_u32(&mut output, image.hotspot.x);
        push_u32(&mut output, image.hotspot.y);
        push_u32(&mut output, image.delay_ms);
        output.extend_from_slice(&image.pixels);
    }

    output
}

fn push_u32(output: &mut Vec<u8>, value: u32) {
    let mut word = [0u8; 4];
    LittleEndian::write_u32(&mut word, value);
    output.extend_from_slice(&word);
}
