use crate::domain::model::ImageInput;
use crate::utils::error::{PhoneExtractError, Result};
use crate::utils::validation::{has_extension, ARCHIVE_EXTENSIONS, IMAGE_EXTENSIONS};
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// 單一項目預先配置的容量上限
const MAX_PREALLOCATED_ENTRY_BYTES: u64 = 16 * 1024 * 1024;

/// 依壓縮檔順序取出支援的圖片；損毀的項目記錄為無法讀取，不中斷整批
pub fn images_from_zip(archive_bytes: &[u8]) -> Result<Vec<ImageInput>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut images = Vec::new();

    for index in 0..archive.len() {
        let Some(entry_name) = archive.name_for_index(index).map(str::to_string) else {
            continue;
        };
        if entry_name.ends_with('/') {
            continue;
        }
        // macOS 壓縮時產生的資源檔
        if entry_name.starts_with("__MACOSX/") {
            continue;
        }
        let file_name = Path::new(&entry_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&entry_name)
            .to_string();
        if file_name.starts_with("._") {
            continue;
        }

        if !has_extension(&file_name, IMAGE_EXTENSIONS) {
            tracing::debug!("Skipping non-image archive entry: {}", entry_name);
            continue;
        }

        match read_entry(&mut archive, index) {
            Ok(bytes) => images.push(ImageInput::new(file_name, bytes)),
            Err(reason) => {
                tracing::warn!("⚠️ Could not read archive entry {}: {}", entry_name, reason);
                images.push(ImageInput::unreadable(file_name, reason));
            }
        }
    }

    Ok(images)
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    index: usize,
) -> std::result::Result<Vec<u8>, String> {
    let mut entry = archive.by_index(index).map_err(|e| e.to_string())?;
    let capacity = entry.size().min(MAX_PREALLOCATED_ENTRY_BYTES) as usize;
    let mut bytes = Vec::with_capacity(capacity);
    entry.read_to_end(&mut bytes).map_err(|e| e.to_string())?;
    Ok(bytes)
}

/// 依參數順序將所有輸入合併為一個批次
pub fn collect_images(paths: &[String]) -> Result<Vec<ImageInput>> {
    let mut batch = Vec::new();

    for path in paths {
        if has_extension(path, ARCHIVE_EXTENSIONS) {
            tracing::info!("📦 Reading archive {}", path);
            let bytes = std::fs::read(path)?;
            let images = images_from_zip(&bytes)?;
            if images.is_empty() {
                tracing::warn!("⚠️ Archive {} contains no PNG or JPEG images", path);
            } else {
                tracing::info!("Found {} images in {}", images.len(), path);
            }
            batch.extend(images);
        } else if has_extension(path, IMAGE_EXTENSIONS) {
            let bytes = std::fs::read(path)?;
            let name = Path::new(path)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(path);
            batch.push(ImageInput::new(name, bytes));
        } else {
            return Err(PhoneExtractError::ValidationError {
                message: format!(
                    "Unsupported input '{}': expected .png, .jpg, .jpeg or .zip",
                    path
                ),
            });
        }
    }

    Ok(batch)
}
