//! Text generation pipeline
//!
//! estimate -> reserve -> provider -> settle, or refund when the provider
//! fails. The reservation is what keeps concurrent submits from one user
//! inside the monthly allowance.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::EngineError;
use crate::config::GenerationSettings as GenerationDefaults;
use crate::db::{settings_json, NewContent, ReserveOutcome, Settlement, TokenLedger};
use crate::domain::{
    build_system_message, charged_tokens, derive_title, estimate_total_tokens, GenerationSettings,
};
use crate::providers::{CompletionRequest, ProviderRegistry};

/// Upper bound on the completion budget a single request may ask for
pub const MAX_COMPLETION_TOKENS: i32 = 8192;

/// Body of `POST /api/v1/generate`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub prompt: String,
    /// `claude`, `openai` or `gemini`; anything else uses the default model
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    /// Replaces the system message built from the style options
    pub system_message: Option<String>,
    /// `tone`, `dialect`, `voiceStyle`, `seoOptimize`, `targetLength` and
    /// `contentType` sit at the top level of the body
    #[serde(flatten)]
    pub settings: GenerationSettings,
    pub category: Option<String>,
    pub template: Option<String>,
}

/// Result of a successful generation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationOutcome {
    pub text: String,
    pub used_tokens: i32,
    pub content_id: Uuid,
    /// Routing code of the provider that answered
    pub model: String,
}

/// A request with defaults applied and bounds checked
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGeneration {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: i32,
    pub system_message: String,
}

impl GenerateRequest {
    pub fn validate(&self, defaults: &GenerationDefaults) -> Result<ValidatedGeneration, EngineError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(EngineError::InvalidRequest("Prompt must not be empty".to_string()));
        }
        if prompt.chars().count() > defaults.max_prompt_chars {
            return Err(EngineError::InvalidRequest(format!(
                "Prompt exceeds {} characters",
                defaults.max_prompt_chars
            )));
        }

        let temperature = self.temperature.unwrap_or(defaults.default_temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(EngineError::InvalidRequest("temperature must be between 0 and 2".to_string()));
        }

        let max_tokens = self.max_tokens.unwrap_or(defaults.default_max_tokens);
        if !(1..=MAX_COMPLETION_TOKENS).contains(&max_tokens) {
            return Err(EngineError::InvalidRequest(format!(
                "max_tokens must be between 1 and {}",
                MAX_COMPLETION_TOKENS
            )));
        }

        let system_message = self.system_message
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| build_system_message(&self.settings));

        Ok(ValidatedGeneration {
            prompt: prompt.to_string(),
            temperature,
            max_tokens,
            system_message,
        })
    }
}

pub struct ContentEngine {
    ledger: Arc<dyn TokenLedger>,
    providers: Arc<ProviderRegistry>,
    defaults: GenerationDefaults,
}

impl ContentEngine {
    pub fn new(ledger: Arc<dyn TokenLedger>, providers: Arc<ProviderRegistry>, defaults: GenerationDefaults) -> Self {
        ContentEngine { ledger, providers, defaults }
    }

    pub async fn generate(&self, user_id: Uuid, request: GenerateRequest) -> Result<GenerationOutcome, EngineError> {
        let validated = request.validate(&self.defaults)?;
        let provider = self.providers
            .resolve(request.model.as_deref())
            .ok_or(EngineError::NoProvider)?;

        let estimate = estimate_total_tokens(&validated.prompt, validated.max_tokens);

        let reservation = match self.ledger.reserve_tokens(user_id, estimate).await? {
            ReserveOutcome::Reserved(reservation, _) => reservation,
            ReserveOutcome::Denied(decision) => return Err(EngineError::TokenLimitExceeded(decision)),
        };

        let completion_request = CompletionRequest {
            prompt: validated.prompt.clone(),
            system_message: Some(validated.system_message.clone()),
            temperature: validated.temperature,
            max_tokens: validated.max_tokens,
        };

        let completion = match provider.generate(&completion_request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(user_id = %user_id, model = provider.code(), error = %e, "Generation failed");
                if let Err(refund_err) = self.ledger.refund(reservation).await {
                    error!(user_id = %user_id, error = %refund_err, "Failed to refund token reservation");
                }
                return Err(EngineError::Provider(e));
            }
        };

        let charged = charged_tokens(completion.used_tokens, estimate);
        let style = serde_json::to_value(&request.settings).unwrap_or_default();

        let settled = self.ledger.settle(Settlement {
            reservation,
            charged,
            content: NewContent {
                user_id,
                title: derive_title(&validated.prompt),
                content: completion.text.clone(),
                prompt: validated.prompt,
                tokens_used: charged,
                settings: settings_json(provider.code(), validated.temperature, validated.max_tokens, style),
                category: request.category,
                template: request.template,
            },
        }).await;

        let content_id = match settled {
            Ok(content_id) => content_id,
            Err(e) => {
                error!(
                    user_id = %user_id,
                    model = provider.code(),
                    charged,
                    completion_chars = completion.text.chars().count(),
                    error = %e,
                    "Failed to save generation, completion discarded"
                );
                // The settle transaction rolled back, so the reservation is still booked
                if let Err(refund_err) = self.ledger.refund(reservation).await {
                    error!(user_id = %user_id, error = %refund_err, "Failed to refund token reservation");
                }
                return Err(EngineError::Database(e));
            }
        };

        info!(
            user_id = %user_id,
            model = provider.code(),
            estimate,
            tokens = charged,
            content_id = %content_id,
            "Content generated"
        );

        Ok(GenerationOutcome {
            text: completion.text,
            used_tokens: charged,
            content_id,
            model: provider.code().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbError, Reservation};
    use crate::domain::{estimate_total_tokens, AllowanceDecision, ContentType, Dialect, TargetLength, Tone, VoiceStyle};
    use crate::providers::traits::tests::StaticProvider;
    use crate::providers::{Completion, LlmProvider, ProviderError, ProviderResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum LedgerCall {
        Reserve(i32),
        Settle { reserved: i32, charged: i32 },
        Refund(i32),
    }

    /// Ledger that records every call instead of touching a database
    #[derive(Default)]
    struct RecordingLedger {
        calls: Mutex<Vec<LedgerCall>>,
        available: Option<i32>,
        fail_settle: bool,
    }

    impl RecordingLedger {
        fn calls(&self) -> Vec<LedgerCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenLedger for RecordingLedger {
        async fn reserve_tokens(&self, user_id: Uuid, estimate: i32) -> Result<ReserveOutcome, DbError> {
            self.calls.lock().unwrap().push(LedgerCall::Reserve(estimate));
            let available = self.available.unwrap_or(100_000);
            let decision = AllowanceDecision {
                reset: false,
                tokens_used: 100_000 - available,
                monthly_token_limit: 100_000,
                available,
                allowed: available >= estimate,
            };
            if !decision.allowed {
                return Ok(ReserveOutcome::Denied(decision));
            }
            let reservation = Reservation { user_id, reserved: estimate, period_start: Utc::now() };
            Ok(ReserveOutcome::Reserved(reservation, decision))
        }

        async fn settle(&self, settlement: Settlement) -> Result<Uuid, DbError> {
            self.calls.lock().unwrap().push(LedgerCall::Settle {
                reserved: settlement.reservation.reserved,
                charged: settlement.charged,
            });
            if self.fail_settle {
                return Err(DbError::Config("connection reset".to_string()));
            }
            Ok(Uuid::new_v4())
        }

        async fn refund(&self, reservation: Reservation) -> Result<(), DbError> {
            self.calls.lock().unwrap().push(LedgerCall::Refund(reservation.reserved));
            Ok(())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn code(&self) -> &'static str { "openai" }
        fn name(&self) -> &'static str { "Failing" }
        fn model(&self) -> &str { "failing-1" }
        fn is_configured(&self) -> bool { true }

        async fn generate(&self, _request: &CompletionRequest) -> ProviderResult<Completion> {
            Err(ProviderError::Api { status: 500, message: "overloaded".to_string() })
        }
    }

    fn engine(ledger: Arc<RecordingLedger>) -> ContentEngine {
        let mut registry = ProviderRegistry::new("claude");
        registry.register(Arc::new(StaticProvider { code: "claude", configured: true }));
        registry.register(Arc::new(FailingProvider));
        ContentEngine::new(ledger, Arc::new(registry), GenerationDefaults::default())
    }

    fn expected_estimate(prompt: &str) -> i32 {
        estimate_total_tokens(prompt, GenerationDefaults::default().default_max_tokens)
    }

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let validated = request("  Viết về phở  ").validate(&GenerationDefaults::default()).unwrap();
        assert_eq!(validated.prompt, "Viết về phở");
        assert_eq!(validated.max_tokens, 1024);
        assert!((validated.temperature - 0.7).abs() < f32::EPSILON);
        assert!(validated.system_message.starts_with("Bạn là trợ lý viết nội dung AI cho người Việt."));
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let result = request(" \n\t ").validate(&GenerationDefaults::default());
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_prompt_length_limit_counts_characters() {
        let defaults = GenerationDefaults { max_prompt_chars: 5, ..Default::default() };
        assert!(request("ừừừừừ").validate(&defaults).is_ok());
        assert!(request("ừừừừừừ").validate(&defaults).is_err());
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        let defaults = GenerationDefaults::default();
        let mut req = request("ok");
        req.temperature = Some(2.5);
        assert!(req.validate(&defaults).is_err());

        let mut req = request("ok");
        req.max_tokens = Some(0);
        assert!(req.validate(&defaults).is_err());

        let mut req = request("ok");
        req.max_tokens = Some(MAX_COMPLETION_TOKENS + 1);
        assert!(req.validate(&defaults).is_err());
    }

    #[test]
    fn test_explicit_system_message_wins() {
        let mut req = request("ok");
        req.system_message = Some("Chỉ trả lời bằng một câu.".to_string());
        req.settings.tone = Tone::Friendly;
        let validated = req.validate(&GenerationDefaults::default()).unwrap();
        assert_eq!(validated.system_message, "Chỉ trả lời bằng một câu.");
    }

    #[test]
    fn test_request_reads_style_options_from_top_level() {
        let req: GenerateRequest = serde_json::from_str(
            r#"{
                "prompt": "Viết",
                "model": "openai",
                "tone": "friendly",
                "dialect": "southern",
                "voiceStyle": "spoken",
                "seoOptimize": true,
                "targetLength": "short",
                "contentType": "blog"
            }"#,
        ).unwrap();
        assert_eq!(req.model.as_deref(), Some("openai"));
        assert_eq!(req.settings.tone, Tone::Friendly);
        assert_eq!(req.settings.dialect, Dialect::Southern);
        assert_eq!(req.settings.voice_style, VoiceStyle::Spoken);
        assert!(req.settings.seo_optimize);
        assert_eq!(req.settings.target_length, TargetLength::Short);
        assert_eq!(req.settings.content_type, ContentType::Blog);
    }

    #[test]
    fn test_missing_style_options_use_defaults() {
        let req: GenerateRequest = serde_json::from_str(r#"{"prompt": "Viết"}"#).unwrap();
        assert_eq!(req.settings, GenerationSettings::default());
    }

    #[tokio::test]
    async fn test_successful_generation_settles_reported_tokens() {
        let ledger = Arc::new(RecordingLedger::default());
        let outcome = engine(ledger.clone())
            .generate(Uuid::new_v4(), request("Viết về phở"))
            .await
            .unwrap();

        let estimate = expected_estimate("Viết về phở");
        assert_eq!(outcome.text, "echo: Viết về phở");
        assert_eq!(outcome.used_tokens, 42);
        assert_eq!(outcome.model, "claude");
        assert_eq!(
            ledger.calls(),
            vec![
                LedgerCall::Reserve(estimate),
                LedgerCall::Settle { reserved: estimate, charged: 42 },
            ]
        );
    }

    #[tokio::test]
    async fn test_provider_failure_refunds_reservation() {
        let ledger = Arc::new(RecordingLedger::default());
        let mut req = request("Viết về phở");
        req.model = Some("openai".to_string());

        let result = engine(ledger.clone()).generate(Uuid::new_v4(), req).await;

        let estimate = expected_estimate("Viết về phở");
        assert!(matches!(result, Err(EngineError::Provider(ProviderError::Api { status: 500, .. }))));
        assert_eq!(ledger.calls(), vec![LedgerCall::Reserve(estimate), LedgerCall::Refund(estimate)]);
    }

    #[tokio::test]
    async fn test_failed_settlement_refunds_reservation() {
        let ledger = Arc::new(RecordingLedger { fail_settle: true, ..Default::default() });

        let result = engine(ledger.clone()).generate(Uuid::new_v4(), request("Viết về phở")).await;

        let estimate = expected_estimate("Viết về phở");
        assert!(matches!(result, Err(EngineError::Database(_))));
        assert_eq!(
            ledger.calls(),
            vec![
                LedgerCall::Reserve(estimate),
                LedgerCall::Settle { reserved: estimate, charged: 42 },
                LedgerCall::Refund(estimate),
            ]
        );
    }

    #[tokio::test]
    async fn test_denied_allowance_skips_provider() {
        let ledger = Arc::new(RecordingLedger { available: Some(10), ..Default::default() });

        let result = engine(ledger.clone()).generate(Uuid::new_v4(), request("Viết về phở")).await;

        match result {
            Err(EngineError::TokenLimitExceeded(decision)) => assert_eq!(decision.available, 10),
            other => panic!("unexpected: {:?}", other.map(|o| o.text)),
        }
        assert_eq!(ledger.calls(), vec![LedgerCall::Reserve(expected_estimate("Viết về phở"))]);
    }
}
