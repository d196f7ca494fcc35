//! 圖片完整性檢查。必須完整解碼像素資料，只讀標頭無法發現截斷的下載。

use std::path::Path;

use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityValidator;

impl IntegrityValidator {
    pub fn new() -> Self {
        Self
    }

    /// 檔案不存在、長度為零、無法解碼或寬高為零時回傳 false。不會修改或刪除檔案。
    pub fn validate(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            Ok(_) => {
                tracing::debug!("Integrity check: {} is empty or not a file", path.display());
                return false;
            }
            Err(e) => {
                tracing::debug!("Integrity check: cannot stat {}: {}", path.display(), e);
                return false;
            }
        }

        match std::fs::read(path) {
            Ok(bytes) => self.validate_bytes(&bytes),
            Err(e) => {
                tracing::debug!("Integrity check: cannot read {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn validate_bytes(&self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }

        match image::load_from_memory(bytes) {
            Ok(img) => img.width() > 0 && img.height() > 0,
            Err(e) => {
                tracing::debug!("Integrity check: decode failed: {}", e);
                false
            }
        }
    }

    /// 在 blocking 執行緒上解碼，避免卡住 event loop
    pub async fn validate_async(&self, path: &Path) -> Result<bool> {
        let validator = *self;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || validator.validate(&path))
            .await
            .map_err(|e| crate::utils::error::TarotError::ProcessingError {
                message: format!("integrity check task failed: {}", e),
            })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// 產生一張有效的 PNG，左上角與其他像素顏色不同，方便檢查旋轉
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbImage::from_pixel(width, height, Rgb([20, 40, 60]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .expect("encode test png");
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::png_bytes;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_zero_truncated_and_valid_files() {
        let dir = TempDir::new().unwrap();
        let validator = IntegrityValidator::new();

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();

        let full = png_bytes(32, 48);
        let truncated = dir.path().join("truncated.png");
        std::fs::write(&truncated, &full[..full.len() / 2]).unwrap();

        let valid = dir.path().join("valid.png");
        std::fs::write(&valid, &full).unwrap();

        assert!(!validator.validate(&empty));
        assert!(!validator.validate(&truncated));
        assert!(validator.validate(&valid));
    }

    #[test]
    fn test_missing_file_and_garbage() {
        let dir = TempDir::new().unwrap();
        let validator = IntegrityValidator::new();

        assert!(!validator.validate(&dir.path().join("missing.png")));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"<html>404 Not Found</html>").unwrap();
        assert!(!validator.validate(&garbage));
    }

    #[test]
    fn test_validation_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"not an image").unwrap();

        assert!(!IntegrityValidator::new().validate(&corrupt));
        assert!(corrupt.exists());
        assert_eq!(std::fs::read(&corrupt).unwrap(), b"not an image");
    }

    #[tokio::test]
    async fn test_validate_async() {
        let dir = TempDir::new().unwrap();
        let valid = dir.path().join("valid.png");
        std::fs::write(&valid, png_bytes(8, 8)).unwrap();

        assert!(IntegrityValidator::new().validate_async(&valid).await.unwrap());
    }
}
