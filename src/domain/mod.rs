//! Domain types and rules

pub mod budget;
pub mod content;
pub mod prompt;

pub use budget::{
    charged_tokens, estimate_prompt_tokens, estimate_total_tokens, needs_monthly_reset,
    refund_adjustment, settle_adjustment, usage_day, AllowanceDecision, TokenBudget,
};
pub use content::{derive_title, Page, PageRequest, UsagePeriod};
pub use prompt::{
    build_system_message, enhance_image_prompt, image_quality, ContentType, Dialect,
    GenerationSettings, ImageStyle, TargetLength, Tone, VoiceStyle,
};
