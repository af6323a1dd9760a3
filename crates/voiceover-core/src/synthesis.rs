//! Speech synthesis orchestration.
//!
//! A script is chunked, each chunk is sent to the [`SpeechProvider`] one at
//! a time, and the decoded audio of every chunk is appended in order into a
//! single [`AudioPayload`]. Any chunk failure aborts the whole call.

use crate::chunker::{ChunkBounds, TextChunk, TextChunker};
use crate::config::ProviderConfig;
use crate::error::{VoiceoverError, VoiceoverResult};
use crate::provider::{basic_auth_header, AudioEncoding, SpeechProvider, SynthesisRequest};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Speaking rate used when the caller gives none
pub const DEFAULT_SPEAKING_RATE: f32 = 1.0;

/// Pitch used when the caller gives none
pub const DEFAULT_PITCH: f32 = 1.0;

/// Optional prosody parameters for a synthesis call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SynthesisOptions {
    /// Pitch multiplier, defaults to 1.0
    pub pitch: Option<f32>,
    /// Speaking rate multiplier, defaults to 1.0
    pub speed: Option<f32>,
}

impl SynthesisOptions {
    /// Set the pitch multiplier
    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Set the speaking rate multiplier
    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Validate the options
    ///
    /// # Errors
    ///
    /// Returns an error if a given value is not a finite positive number
    pub fn validate(&self) -> VoiceoverResult<()> {
        for (name, value) in [("Pitch", self.pitch), ("Speed", self.speed)] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(VoiceoverError::invalid_input(format!(
                        "{name} must be a positive number, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn speaking_rate(&self) -> f32 {
        self.speed.unwrap_or(DEFAULT_SPEAKING_RATE)
    }

    fn pitch(&self) -> f32 {
        self.pitch.unwrap_or(DEFAULT_PITCH)
    }
}

/// Audio produced by one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// Encoded audio, all chunks appended in script order
    pub bytes: Vec<u8>,
    /// Container format of `bytes`
    pub encoding: AudioEncoding,
    /// Number of provider requests the script was split into
    pub chunk_count: usize,
}

impl AudioPayload {
    /// Base64 form, as the provider returns it on the wire
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Size of the encoded audio in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload holds no audio
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns scripts into audio through a rate-limited speech provider
#[derive(Debug)]
pub struct SynthesisOrchestrator {
    provider: Arc<dyn SpeechProvider>,
    config: ProviderConfig,
    chunker: TextChunker,
    permits: Arc<Semaphore>,
}

impl SynthesisOrchestrator {
    /// Create an orchestrator over `provider`
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk bounds are invalid or the concurrency
    /// ceiling is zero
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        config: ProviderConfig,
        bounds: ChunkBounds,
    ) -> VoiceoverResult<Self> {
        if config.max_concurrent_requests == 0 {
            return Err(VoiceoverError::configuration(
                "Concurrent request ceiling must be at least 1",
            ));
        }

        info!(
            "Creating synthesis orchestrator: provider={}, model={}, bounds={}..{}",
            provider.name(),
            config.model_id,
            bounds.min,
            bounds.max
        );

        Ok(Self {
            chunker: TextChunker::new(bounds)?,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            provider,
            config,
        })
    }

    /// Chunker used to split scripts
    #[must_use]
    pub const fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Synthesize `text` with `voice_id`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The voice ID is empty or the options are invalid
    /// - The credential cannot be Basic-encoded (`EncodingError`)
    /// - The text holds nothing but whitespace
    /// - Any chunk fails (`ProviderError` carries the provider's body); no
    ///   partial audio is returned
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        options: SynthesisOptions,
    ) -> VoiceoverResult<AudioPayload> {
        if voice_id.trim().is_empty() {
            return Err(VoiceoverError::invalid_input("Voice ID cannot be empty"));
        }
        options.validate()?;

        let authorization = basic_auth_header(&self.config.api_key, &self.config.api_secret)?;

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(VoiceoverError::invalid_input("Text contains nothing to synthesize"));
        }

        info!("Processing {} chunks for voice {}", chunks.len(), voice_id);

        let mut bytes = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let request = self.build_request(chunk, voice_id, options);
            let encoded = self.send_with_retry(&request, &authorization, index).await?;
            let audio = STANDARD.decode(encoded.trim()).map_err(|e| {
                VoiceoverError::synthesis(format!("Chunk {index} audio is not valid base64: {e}"))
            })?;
            debug!("Chunk {} produced {} bytes", index, audio.len());
            bytes.extend_from_slice(&audio);
        }

        info!("Synthesized {} bytes from {} chunks", bytes.len(), chunks.len());
        Ok(AudioPayload {
            bytes,
            encoding: self.config.audio_encoding,
            chunk_count: chunks.len(),
        })
    }

    fn build_request(
        &self,
        chunk: &TextChunk,
        voice_id: &str,
        options: SynthesisOptions,
    ) -> SynthesisRequest {
        SynthesisRequest {
            text: chunk.text.clone(),
            voice_id: voice_id.to_string(),
            model_id: self.config.model_id.clone(),
            speaking_rate: options.speaking_rate(),
            pitch: options.pitch(),
            audio_encoding: self.config.audio_encoding,
        }
    }

    /// One chunk under the concurrency ceiling; only transport failures are retried.
    async fn send_with_retry(
        &self,
        request: &SynthesisRequest,
        authorization: &str,
        index: usize,
    ) -> VoiceoverResult<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| VoiceoverError::synthesis("Synthesis request limiter closed"))?;

        let mut attempt: u32 = 0;
        loop {
            match self.provider.synthesize_chunk(request, authorization).await {
                Ok(audio) => return Ok(audio),
                Err(err) if err.is_retriable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_backoff() * attempt;
                    warn!(
                        "Chunk {} attempt {} failed ({}), retrying in {:?}",
                        index, attempt, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!("Chunk {} failed: {}", index, err);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes each chunk's text back as its "audio".
    #[derive(Debug, Default)]
    struct EchoProvider {
        requests: Mutex<Vec<SynthesisRequest>>,
        failures: Mutex<VecDeque<VoiceoverError>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl EchoProvider {
        fn failing_with(errors: Vec<VoiceoverError>) -> Self {
            Self {
                failures: Mutex::new(errors.into()),
                ..Self::default()
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl SpeechProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn synthesize_chunk(
            &self,
            request: &SynthesisRequest,
            authorization: &str,
        ) -> VoiceoverResult<String> {
            assert!(authorization.starts_with("Basic "));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;

            self.requests.lock().push(request.clone());
            let failure = self.failures.lock().pop_front();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match failure {
                Some(err) => Err(err),
                None => Ok(STANDARD.encode(request.text.as_bytes())),
            }
        }
    }

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            retry_backoff_ms: 1,
            ..ProviderConfig::default()
        }
    }

    fn orchestrator(provider: Arc<EchoProvider>) -> SynthesisOrchestrator {
        SynthesisOrchestrator::new(provider, test_config(), ChunkBounds::new(10, 30).unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_chunk_returns_its_audio() {
        let provider = Arc::new(EchoProvider::default());
        let payload = orchestrator(provider.clone())
            .synthesize("Hello there.", "Alex", SynthesisOptions::default())
            .await
            .unwrap();

        assert_eq!(payload.bytes, b"Hello there.");
        assert_eq!(payload.chunk_count, 1);
        assert_eq!(payload.encoding, AudioEncoding::Mp3);
        assert_eq!(payload.to_base64(), STANDARD.encode("Hello there."));
    }

    #[tokio::test]
    async fn test_defaults_for_rate_and_pitch() {
        let provider = Arc::new(EchoProvider::default());
        orchestrator(provider.clone())
            .synthesize("Hello", "Ashley", SynthesisOptions::default())
            .await
            .unwrap();

        let requests = provider.requests.lock();
        assert_eq!(requests[0].speaking_rate, 1.0);
        assert_eq!(requests[0].pitch, 1.0);
        assert_eq!(requests[0].voice_id, "Ashley");
        assert_eq!(requests[0].model_id, "inworld-tts-1");
    }

    #[tokio::test]
    async fn test_options_are_forwarded() {
        let provider = Arc::new(EchoProvider::default());
        let options = SynthesisOptions::default().with_speed(1.25).with_pitch(0.8);
        orchestrator(provider.clone())
            .synthesize("Hello", "Craig", options)
            .await
            .unwrap();

        let requests = provider.requests.lock();
        assert_eq!(requests[0].speaking_rate, 1.25);
        assert_eq!(requests[0].pitch, 0.8);
    }

    #[tokio::test]
    async fn test_multi_chunk_audio_is_concatenated_in_order() {
        let provider = Arc::new(EchoProvider::default());
        let text = "First sentence is here. Second sentence is here. Third one.";
        let payload = orchestrator(provider.clone())
            .synthesize(text, "Alex", SynthesisOptions::default())
            .await
            .unwrap();

        let chunk_texts: Vec<String> =
            provider.requests.lock().iter().map(|r| r.text.clone()).collect();
        assert!(chunk_texts.len() > 1);
        assert_eq!(payload.chunk_count, chunk_texts.len());
        assert_eq!(payload.bytes, chunk_texts.concat().into_bytes());
    }

    #[tokio::test]
    async fn test_provider_error_aborts_without_partial_audio() {
        let provider = Arc::new(EchoProvider::failing_with(vec![VoiceoverError::provider(
            500,
            "rate limited",
        )]));
        let err = orchestrator(provider.clone())
            .synthesize(&"word ".repeat(30), "Alex", SynthesisOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, VoiceoverError::provider(500, "rate limited"));
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let provider = Arc::new(EchoProvider::failing_with(vec![
            VoiceoverError::network("connection reset"),
            VoiceoverError::timeout("slow"),
        ]));
        let payload = orchestrator(provider.clone())
            .synthesize("Hello", "Alex", SynthesisOptions::default())
            .await
            .unwrap();

        assert_eq!(payload.bytes, b"Hello");
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let provider = Arc::new(EchoProvider::failing_with(vec![
            VoiceoverError::network("down"),
            VoiceoverError::network("down"),
            VoiceoverError::network("still down"),
        ]));
        let err = orchestrator(provider.clone())
            .synthesize("Hello", "Alex", SynthesisOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, VoiceoverError::network("still down"));
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_encoding_error_before_any_request() {
        let provider = Arc::new(EchoProvider::default());
        let config = ProviderConfig {
            api_key: "ключ".to_string(),
            ..test_config()
        };
        let orchestrator =
            SynthesisOrchestrator::new(provider.clone(), config, ChunkBounds::default()).unwrap();

        let err = orchestrator
            .synthesize("Hello", "Alex", SynthesisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceoverError::EncodingError { .. }));
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_input() {
        let provider = Arc::new(EchoProvider::default());
        let orchestrator = orchestrator(provider.clone());

        let err = orchestrator
            .synthesize("   \n ", "Alex", SynthesisOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_user_error());

        let err = orchestrator
            .synthesize("Hello", " ", SynthesisOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_user_error());

        let err = orchestrator
            .synthesize("Hello", "Alex", SynthesisOptions::default().with_speed(-1.0))
            .await
            .unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_at_most_one_request_in_flight() {
        let provider = Arc::new(EchoProvider::default());
        let orchestrator = Arc::new(orchestrator(provider.clone()));
        let text = "One sentence right here. Another sentence there. And more.";

        let (a, b) = tokio::join!(
            orchestrator.synthesize(text, "Alex", SynthesisOptions::default()),
            orchestrator.synthesize(text, "Julia", SynthesisOptions::default()),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let config = ProviderConfig {
            max_concurrent_requests: 0,
            ..test_config()
        };
        let result = SynthesisOrchestrator::new(
            Arc::new(EchoProvider::default()),
            config,
            ChunkBounds::default(),
        );
        assert!(result.is_err());
    }
}
