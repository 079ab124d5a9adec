use crate::domain::model::{ExtractionRequest, ImageFormat, ImageInput};
use crate::domain::ports::VisionModel;
use crate::utils::error::{PhoneExtractError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_INSTRUCTION: &str = "Extract all phone numbers from the provided image and return them as a comma-separated list within square brackets, like [phone1, phone2, phone3, ...]. If no phone numbers are found, return an empty list [].";

// 第一個 [...]，非貪婪
static BRACKETED_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("bracket pattern is valid"));

/// 依內容判斷實際圖片格式，不看檔名
pub fn detect_format(image: &ImageInput) -> Result<ImageFormat> {
    if image.bytes.is_empty() {
        return Err(PhoneExtractError::UnreadableImage {
            name: image.name.clone(),
            reason: "file is empty".to_string(),
        });
    }

    match image::guess_format(&image.bytes) {
        Ok(image::ImageFormat::Png) => Ok(ImageFormat::Png),
        Ok(image::ImageFormat::Jpeg) => Ok(ImageFormat::Jpeg),
        Ok(other) => Err(PhoneExtractError::UnreadableImage {
            name: image.name.clone(),
            reason: format!("unsupported image format {:?}, expected PNG or JPEG", other),
        }),
        Err(e) => Err(PhoneExtractError::UnreadableImage {
            name: image.name.clone(),
            reason: e.to_string(),
        }),
    }
}

/// 產生 `data:<mime>;base64,<payload>`，相同內容必得相同結果
pub fn encode_data_uri(image: &ImageInput) -> Result<String> {
    let format = detect_format(image)?;
    if let Some(declared) = image.declared_format {
        if declared != format {
            tracing::debug!(
                "{} is named as {} but contains {}",
                image.name,
                declared.mime_type(),
                format.mime_type()
            );
        }
    }
    Ok(format!(
        "data:{};base64,{}",
        format.mime_type(),
        STANDARD.encode(&image.bytes)
    ))
}

pub fn build_request(image: &ImageInput, model: &str, instruction: &str) -> Result<ExtractionRequest> {
    Ok(ExtractionRequest {
        model: model.to_string(),
        instruction: instruction.to_string(),
        image_data_uri: encode_data_uri(image)?,
    })
}

/// 取出第一組方括號內的項目，去除空白並略過空項目；沒有 `[...]` 時不產生任何值
pub fn parse_phone_numbers(response: &str) -> impl Iterator<Item = &str> {
    BRACKETED_LIST
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|list| list.as_str())
        .into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

pub struct Extractor<M: VisionModel> {
    model: M,
    model_name: String,
    instruction: String,
}

impl<M: VisionModel> Extractor<M> {
    pub fn new(model: M, model_name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            instruction: instruction.into(),
        }
    }

    pub async fn extract(&self, image: &ImageInput) -> Result<Vec<String>> {
        let request = build_request(image, &self.model_name, &self.instruction)?;
        tracing::debug!(
            "Sending {} ({} bytes) to model {}",
            image.name,
            image.bytes.len(),
            self.model_name
        );

        let response = self.model.complete(&request).await?;
        tracing::debug!("Raw model response for {}: {}", image.name, response);

        let numbers: Vec<String> = parse_phone_numbers(&response).map(String::from).collect();
        if numbers.is_empty() && !BRACKETED_LIST.is_match(&response) {
            tracing::warn!("⚠️ No bracketed list in response for {}", image.name);
        }
        Ok(numbers)
    }
}
