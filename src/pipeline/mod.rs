//! Strategy chain orchestrator.
//!
//! Strategies run sequentially in configured priority order; the first
//! success wins. Failures are logged and the chain advances. The STT fallback
//! is gated behind the paid tier and only runs after every caption strategy
//! has failed. Quota and payment gates are checked before any network call.

use anyhow::Result;
use std::time::Duration;

use crate::config::Config;
use crate::limit::RateLimiter;
use crate::model::{AccessTier, Attempt, FetchRequest, FetchResponse};
use crate::strategies::{self, TranscriptStrategy};
use crate::stt::SttFallback;
use crate::FetchError;

/// Rate-limit key used when the caller supplied none
const ANONYMOUS_KEY: &str = "anonymous";

pub struct TranscriptPipeline {
    config: Config,
    strategies: Vec<Box<dyn TranscriptStrategy>>,
    limiter: RateLimiter,
    http: reqwest::Client,
}

impl TranscriptPipeline {
    /// Build the pipeline from config: shared HTTP client with bounded
    /// timeouts, the configured strategy chain, and the free-tier limiter.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(config.http.timeout_secs.min(8)))
            .build()?;

        let strategies = strategies::build_chain(&config, &http)?;
        let limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        );

        Ok(Self {
            config,
            strategies,
            limiter,
            http,
        })
    }

    /// Test/embedding constructor with an injected strategy chain
    pub fn with_strategies(
        config: Config,
        strategies: Vec<Box<dyn TranscriptStrategy>>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        );
        Ok(Self {
            config,
            strategies,
            limiter,
            http,
        })
    }

    /// Run the chain for one request.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.check_gates(request)?;

        for strategy in &self.strategies {
            tracing::info!("Attempting strategy {}", strategy.name());

            match strategy.attempt(request).await {
                Attempt::Success(transcript) => {
                    tracing::info!(
                        "Strategy {} succeeded with {} segments",
                        strategy.name(),
                        transcript.total_segments
                    );
                    return Ok(FetchResponse {
                        transcript,
                        source: strategy.name().to_string(),
                    });
                }
                Attempt::Deferred { job_id } => {
                    return Err(FetchError::SttPending { job_id }.into());
                }
                Attempt::Failure { reason } => {
                    tracing::warn!("Strategy {} failed: {}", strategy.name(), reason);
                }
            }
        }

        if request.allow_stt {
            return self.run_stt_fallback(request).await;
        }

        Err(FetchError::NoCaptions(request.video_id.clone()).into())
    }

    /// Tier and quota gates, checked before any upstream call
    fn check_gates(&self, request: &FetchRequest) -> Result<()> {
        match request.tier {
            AccessTier::Paid => {
                // Payment verification proper is out of scope; the gate only
                // requires a session token to be present.
                let has_session = request
                    .session_token
                    .as_deref()
                    .map(|t| !t.trim().is_empty())
                    .unwrap_or(false);
                if !has_session {
                    return Err(FetchError::AuthorizationRequired.into());
                }
            }
            AccessTier::Free => {
                if request.allow_stt {
                    // STT is a paid-tier feature.
                    return Err(FetchError::AuthorizationRequired.into());
                }
                let key = request.client_key.as_deref().unwrap_or(ANONYMOUS_KEY);
                if !self.limiter.check(key) {
                    return Err(FetchError::RateLimited(format!(
                        "{} requests per {}s exceeded",
                        self.config.rate_limit.max_requests, self.config.rate_limit.window_secs
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    async fn run_stt_fallback(&self, request: &FetchRequest) -> Result<FetchResponse> {
        tracing::info!("All caption strategies failed; running STT fallback");

        let fallback = SttFallback::new(self.config.stt.clone(), self.http.clone()).await?;

        match fallback.run(request).await {
            Attempt::Success(transcript) => Ok(FetchResponse {
                transcript,
                source: "stt".to_string(),
            }),
            Attempt::Deferred { job_id } => Err(FetchError::SttPending { job_id }.into()),
            Attempt::Failure { reason } => {
                tracing::warn!("STT fallback failed: {}", reason);
                Err(FetchError::NoCaptions(request.video_id.clone()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, Transcript};
    use crate::strategies::MockTranscriptStrategy;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.rate_limit.max_requests = 2;
        config
    }

    fn dummy_transcript() -> Transcript {
        Transcript::new(
            "dQw4w9WgXcQ",
            "en",
            false,
            vec![Segment::new(0.0, 1.0, "hello").unwrap()],
        )
    }

    fn succeeding(name: &'static str, times: usize) -> MockTranscriptStrategy {
        let mut mock = MockTranscriptStrategy::new();
        mock.expect_name().return_const(name);
        mock.expect_attempt()
            .times(times)
            .returning(|_| Attempt::Success(dummy_transcript()));
        mock
    }

    fn failing(name: &'static str, times: usize) -> MockTranscriptStrategy {
        let mut mock = MockTranscriptStrategy::new();
        mock.expect_name().return_const(name);
        mock.expect_attempt()
            .times(times)
            .returning(|_| Attempt::failure("nope"));
        mock
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![
            Box::new(failing("first", 1)),
            Box::new(succeeding("second", 1)),
            Box::new(succeeding("third", 0)),
        ];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let response = pipeline
            .fetch(&FetchRequest::new("dQw4w9WgXcQ"))
            .await
            .unwrap();
        assert_eq!(response.source, "second");
        assert_eq!(response.transcript.total_segments, 1);
    }

    #[tokio::test]
    async fn test_all_failures_yield_no_captions() {
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![
            Box::new(failing("first", 1)),
            Box::new(failing("second", 1)),
        ];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let err = pipeline
            .fetch(&FetchRequest::new("dQw4w9WgXcQ"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::NoCaptions(_))
        ));
    }

    #[tokio::test]
    async fn test_free_tier_rate_limited() {
        let mut config = test_config();
        config.rate_limit.max_requests = 1;

        // Both strategies fail so each accepted request walks the chain once.
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![Box::new(failing("only", 1))];
        let pipeline = TranscriptPipeline::with_strategies(config, chain).unwrap();

        let mut request = FetchRequest::new("dQw4w9WgXcQ");
        request.client_key = Some("10.0.0.1".to_string());

        let _ = pipeline.fetch(&request).await;
        let err = pipeline.fetch(&request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_paid_tier_requires_session_token() {
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![Box::new(succeeding("only", 0))];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let mut request = FetchRequest::new("dQw4w9WgXcQ");
        request.tier = AccessTier::Paid;

        let err = pipeline.fetch(&request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::AuthorizationRequired)
        ));
    }

    #[tokio::test]
    async fn test_paid_tier_with_session_passes_gate() {
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![Box::new(succeeding("only", 1))];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let mut request = FetchRequest::new("dQw4w9WgXcQ");
        request.tier = AccessTier::Paid;
        request.session_token = Some("cs_test_123".to_string());

        assert!(pipeline.fetch(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_free_tier_stt_is_authorization_error() {
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![Box::new(succeeding("only", 0))];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let mut request = FetchRequest::new("dQw4w9WgXcQ");
        request.allow_stt = true;

        let err = pipeline.fetch(&request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::AuthorizationRequired)
        ));
    }

    #[tokio::test]
    async fn test_deferred_job_stops_the_chain() {
        let mut deferred = MockTranscriptStrategy::new();
        deferred.expect_name().return_const("deferring");
        deferred.expect_attempt().times(1).returning(|_| Attempt::Deferred {
            job_id: "capfetch_abc123".to_string(),
        });

        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![
            Box::new(failing("first", 1)),
            Box::new(deferred),
            Box::new(succeeding("never", 0)),
        ];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let err = pipeline
            .fetch(&FetchRequest::new("dQw4w9WgXcQ"))
            .await
            .unwrap_err();
        match err.downcast_ref::<FetchError>() {
            Some(FetchError::SttPending { job_id }) => assert_eq!(job_id, "capfetch_abc123"),
            other => panic!("expected SttPending, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chain_invariant_every_earlier_strategy_failed() {
        // If strategy k runs, strategies 1..k-1 must each have reported
        // failure exactly once; mock call counts enforce it.
        let chain: Vec<Box<dyn TranscriptStrategy>> = vec![
            Box::new(failing("s1", 1)),
            Box::new(failing("s2", 1)),
            Box::new(failing("s3", 1)),
            Box::new(succeeding("s4", 1)),
        ];
        let pipeline = TranscriptPipeline::with_strategies(test_config(), chain).unwrap();

        let response = pipeline
            .fetch(&FetchRequest::new("dQw4w9WgXcQ"))
            .await
            .unwrap();
        assert_eq!(response.source, "s4");
    }
}
