// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Barcode/QR scan over raw image bytes.

use tracing::debug;

/// One decoded barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Barcode {
    pub data: String,
    pub format: String,
}

/// Scans an image for barcodes and QR codes. Any decode failure yields an
/// empty list; a missing barcode is never an error.
pub fn scan_barcodes(image_bytes: &[u8]) -> Vec<Barcode> {
    let image = match image::load_from_memory(image_bytes) {
        Ok(img) => img,
        Err(e) => {
            debug!(error = %e, "barcode scan: image decode failed");
            return Vec::new();
        }
    };
    let luma = image.to_luma8();
    let (width, height) = (luma.width(), luma.height());

    match rxing::helpers::detect_multiple_in_luma(luma.into_raw(), width, height) {
        Ok(results) => results
            .iter()
            .map(|r| Barcode {
                data: r.getText().to_string(),
                format: r.getBarcodeFormat().to_string(),
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "barcode scan: nothing detected");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_bytes_yield_empty() {
        assert!(scan_barcodes(b"not an image").is_empty());
        assert!(scan_barcodes(&[]).is_empty());
    }

    #[test]
    fn blank_image_has_no_barcodes() {
        let img = image::DynamicImage::new_luma8(64, 64);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert!(scan_barcodes(&bytes).is_empty());
    }
}
