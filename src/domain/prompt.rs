//! Generation settings and Vietnamese prompt assembly

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Writing tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Persuasive,
    #[serde(other)]
    Formal,
}

impl Tone {
    fn vietnamese(&self) -> &'static str {
        match self {
            Tone::Professional => "chuyên nghiệp",
            Tone::Friendly => "thân thiện",
            Tone::Persuasive => "thuyết phục",
            Tone::Formal => "trang trọng",
        }
    }
}

/// Regional vocabulary preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Northern,
    Central,
    Southern,
    #[default]
    #[serde(other)]
    Neutral,
}

impl Dialect {
    fn instruction(&self) -> Option<&'static str> {
        match self {
            Dialect::Neutral => None,
            Dialect::Northern => Some("Sử dụng ngôn ngữ và từ vựng phổ biến ở miền Bắc Việt Nam."),
            Dialect::Central => Some("Sử dụng ngôn ngữ và từ vựng phổ biến ở miền Trung Việt Nam."),
            Dialect::Southern => Some("Sử dụng ngôn ngữ và từ vựng phổ biến ở miền Nam Việt Nam."),
        }
    }
}

/// Written or conversational register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoiceStyle {
    #[default]
    Written,
    #[serde(other)]
    Spoken,
}

/// Target length of the generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetLength {
    Short,
    #[default]
    Medium,
    Long,
    /// No length guideline
    #[serde(other)]
    Any,
}

impl TargetLength {
    fn instruction(&self) -> Option<&'static str> {
        match self {
            TargetLength::Short => Some("Viết nội dung ngắn gọn, súc tích, dưới 300 từ."),
            TargetLength::Medium => Some("Viết nội dung vừa phải, khoảng 500-800 từ."),
            TargetLength::Long => Some("Viết nội dung dài, chi tiết, khoảng 1000-1500 từ."),
            TargetLength::Any => None,
        }
    }
}

/// Kind of content being written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Blog,
    Social,
    Email,
    Product,
    #[default]
    #[serde(other)]
    General,
}

impl ContentType {
    fn instruction(&self) -> Option<&'static str> {
        match self {
            ContentType::General => None,
            ContentType::Blog => Some("Viết dưới dạng bài blog có cấu trúc rõ ràng với phần giới thiệu, nội dung chính, và kết luận."),
            ContentType::Social => Some("Viết nội dung ngắn gọn, thu hút, phù hợp cho mạng xã hội với emoji và ngôn ngữ tương tác."),
            ContentType::Email => Some("Viết email chuyên nghiệp với lời chào, nội dung chính, và lời kết phù hợp."),
            ContentType::Product => Some("Viết mô tả sản phẩm thu hút, tập trung vào đặc điểm và lợi ích, với lời kêu gọi hành động."),
        }
    }
}

/// Style options that shape the system message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub tone: Tone,
    pub dialect: Dialect,
    pub voice_style: VoiceStyle,
    pub seo_optimize: bool,
    pub target_length: TargetLength,
    pub content_type: ContentType,
}

/// Build the Vietnamese system message for a generation request
pub fn build_system_message(settings: &GenerationSettings) -> String {
    let mut message = format!(
        "Bạn là trợ lý viết nội dung AI cho người Việt. Hãy viết nội dung {}.",
        settings.tone.vietnamese()
    );

    let mut push = |sentence: &str| {
        message.push(' ');
        message.push_str(sentence);
    };

    if let Some(dialect) = settings.dialect.instruction() {
        push(dialect);
    }

    push(match settings.voice_style {
        VoiceStyle::Written => "Sử dụng văn viết.",
        VoiceStyle::Spoken => "Sử dụng văn nói.",
    });

    if settings.seo_optimize {
        push("Tối ưu hóa nội dung cho SEO với các heading, từ khóa phù hợp, và cấu trúc tốt cho tìm kiếm.");
    }
    if let Some(length) = settings.target_length.instruction() {
        push(length);
    }
    if let Some(kind) = settings.content_type.instruction() {
        push(kind);
    }

    message
}

/// Visual style for image generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    Artistic,
    Cartoon,
    Sketch,
    #[default]
    #[serde(other)]
    Realistic,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "realistic",
            ImageStyle::Artistic => "artistic",
            ImageStyle::Cartoon => "cartoon",
            ImageStyle::Sketch => "sketch",
        }
    }
}

/// Wrap the user's prompt with style keywords understood by the image model
pub fn enhance_image_prompt(prompt: &str, style: ImageStyle) -> String {
    match style {
        ImageStyle::Artistic => format!("An artistic rendering of: {}, stylized, vibrant colors", prompt),
        ImageStyle::Cartoon => format!("A cartoon style drawing of: {}, animated, simple", prompt),
        ImageStyle::Sketch => format!("A pencil sketch of: {}, detailed drawing, grayscale", prompt),
        ImageStyle::Realistic => format!("A realistic photo of: {}, detailed, high definition", prompt),
    }
}

/// Map a 0..1 quality slider onto the image API's quality levels
pub fn image_quality(quality: f64) -> &'static str {
    if quality >= 0.8 { "hd" } else { "standard" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_system_message() {
        let message = build_system_message(&GenerationSettings::default());
        assert_eq!(
            message,
            "Bạn là trợ lý viết nội dung AI cho người Việt. Hãy viết nội dung chuyên nghiệp. \
             Sử dụng văn viết. Viết nội dung vừa phải, khoảng 500-800 từ."
        );
    }

    #[test]
    fn test_full_system_message_order() {
        let settings = GenerationSettings {
            tone: Tone::Friendly,
            dialect: Dialect::Southern,
            voice_style: VoiceStyle::Spoken,
            seo_optimize: true,
            target_length: TargetLength::Short,
            content_type: ContentType::Social,
        };
        let message = build_system_message(&settings);

        let tone = message.find("thân thiện").unwrap();
        let dialect = message.find("miền Nam").unwrap();
        let voice = message.find("văn nói").unwrap();
        let seo = message.find("SEO").unwrap();
        let length = message.find("dưới 300 từ").unwrap();
        let kind = message.find("mạng xã hội").unwrap();
        assert!(tone < dialect && dialect < voice && voice < seo && seo < length && length < kind);
    }

    #[test]
    fn test_unknown_values_use_fallbacks() {
        let settings: GenerationSettings = serde_json::from_value(serde_json::json!({
            "tone": "sarcastic",
            "dialect": "martian",
            "voiceStyle": "sung",
            "targetLength": "epic",
            "contentType": "poem"
        }))
        .unwrap();

        assert_eq!(settings.tone, Tone::Formal);
        assert_eq!(settings.dialect, Dialect::Neutral);
        assert_eq!(settings.voice_style, VoiceStyle::Spoken);
        assert_eq!(settings.target_length, TargetLength::Any);
        assert_eq!(settings.content_type, ContentType::General);

        let message = build_system_message(&settings);
        assert!(message.contains("trang trọng"));
        assert!(!message.contains("từ."));
    }

    #[test]
    fn test_image_prompt_styles() {
        assert_eq!(
            enhance_image_prompt("phở bò", ImageStyle::Sketch),
            "A pencil sketch of: phở bò, detailed drawing, grayscale"
        );
        assert!(enhance_image_prompt("phở bò", ImageStyle::Realistic).starts_with("A realistic photo of"));
    }

    #[test]
    fn test_image_quality_threshold() {
        assert_eq!(image_quality(0.8), "hd");
        assert_eq!(image_quality(0.79), "standard");
    }
}
