//! Content sniffing for multi-frame sources
//!
//! Works on container structure only, never on file names.

use imgu_core::ImageFormat;

/// Whether `bytes` hold an animated GIF, WebP or PNG (APNG)
pub fn is_animated(bytes: &[u8]) -> bool {
    match ImageFormat::sniff(bytes) {
        Some(ImageFormat::Gif) => gif_frame_count(bytes) > 1,
        Some(ImageFormat::Webp) => webp_has_animation(bytes),
        Some(ImageFormat::Png) => png_has_actl(bytes),
        _ => false,
    }
}

/// Count image descriptors by walking GIF blocks, stopping at two
fn gif_frame_count(bytes: &[u8]) -> usize {
    // Header (6) + logical screen descriptor (7)
    let mut pos = 13;
    let Some(&flags) = bytes.get(10) else {
        return 0;
    };
    if flags & 0x80 != 0 {
        pos += 3 * (1usize << ((flags & 0x07) + 1));
    }

    let mut frames = 0;
    while let Some(&block) = bytes.get(pos) {
        match block {
            // Image descriptor
            0x2C => {
                frames += 1;
                if frames > 1 {
                    break;
                }
                let Some(&local) = bytes.get(pos + 9) else {
                    break;
                };
                pos += 10;
                if local & 0x80 != 0 {
                    pos += 3 * (1usize << ((local & 0x07) + 1));
                }
                // LZW minimum code size, then data sub-blocks
                pos += 1;
                pos = skip_sub_blocks(bytes, pos);
            }
            // Extension: label byte then sub-blocks
            0x21 => {
                pos = skip_sub_blocks(bytes, pos + 2);
            }
            // Trailer
            0x3B => break,
            _ => break,
        }
    }
    frames
}

fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> usize {
    while let Some(&len) = bytes.get(pos) {
        pos += 1;
        if len == 0 {
            return pos;
        }
        pos += len as usize;
    }
    pos
}

/// VP8X header with the animation flag set
fn webp_has_animation(bytes: &[u8]) -> bool {
    bytes.len() > 20 && &bytes[12..16] == b"VP8X" && bytes[20] & 0x02 != 0
}

/// An `acTL` chunk before the first `IDAT`
fn png_has_actl(bytes: &[u8]) -> bool {
    let mut pos = 8;
    while pos + 8 <= bytes.len() {
        let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
            as usize;
        match &bytes[pos + 4..pos + 8] {
            b"acTL" => return true,
            b"IDAT" | b"IEND" => return false,
            _ => {}
        }
        // length + type + data + crc
        pos = match pos.checked_add(12 + len) {
            Some(next) => next,
            None => return false,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gif(frames: usize) -> Vec<u8> {
        let mut out = b"GIF89a".to_vec();
        // 1x1 screen, global color table of 2 entries
        out.extend_from_slice(&[1, 0, 1, 0, 0x80, 0, 0]);
        out.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        for _ in 0..frames {
            // Graphic control extension
            out.extend_from_slice(&[0x21, 0xF9, 4, 0, 10, 0, 0, 0]);
            // Image descriptor, no local table
            out.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0]);
            // LZW min code size, one data sub-block, terminator
            out.extend_from_slice(&[2, 2, 0x44, 0x01, 0]);
        }
        out.push(0x3B);
        out
    }

    #[test]
    fn test_gif_frame_detection() {
        assert!(!is_animated(&gif(1)));
        assert!(is_animated(&gif(2)));
        assert!(is_animated(&gif(5)));
    }

    #[test]
    fn test_webp_animation_flag() {
        let mut still = b"RIFF\x00\x00\x00\x00WEBPVP8X".to_vec();
        still.extend_from_slice(&[10, 0, 0, 0, 0x00, 0, 0, 0]);
        assert!(!is_animated(&still));

        let mut animated = b"RIFF\x00\x00\x00\x00WEBPVP8X".to_vec();
        animated.extend_from_slice(&[10, 0, 0, 0, 0x02, 0, 0, 0]);
        assert!(is_animated(&animated));
    }

    #[test]
    fn test_png_actl_detection() {
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&[0; 13 + 4]);
        let mut apng = png.clone();

        png.extend_from_slice(&[0, 0, 0, 0]);
        png.extend_from_slice(b"IDAT");
        png.extend_from_slice(&[0; 4]);
        assert!(!is_animated(&png));

        apng.extend_from_slice(&[0, 0, 0, 8]);
        apng.extend_from_slice(b"acTL");
        apng.extend_from_slice(&[0; 8 + 4]);
        assert!(is_animated(&apng));
    }

    #[test]
    fn test_other_content_is_not_animated() {
        assert!(!is_animated(b"plain text"));
        assert!(!is_animated(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_animated(b"GIF89a"));
    }
}
