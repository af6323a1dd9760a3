//! Speech provider client.
//!
//! The [`SpeechProvider`] trait is the seam between the orchestrator and the
//! network; [`InworldClient`] is the HTTP implementation for the Inworld TTS
//! `/voice` endpoint.

use crate::config::ProviderConfig;
use crate::error::{VoiceoverError, VoiceoverResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Audio container requested from the provider
///
/// Only stream formats whose byte streams can be appended back to back are
/// offered, since multi-chunk output is concatenated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    /// MPEG-1 Layer III
    #[default]
    Mp3,
    /// Opus in an Ogg container
    OggOpus,
}

impl AudioEncoding {
    /// Conventional file extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggOpus => "ogg",
        }
    }

    /// MIME type of the encoded audio
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggOpus => "audio/ogg",
        }
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mp3 => write!(f, "MP3"),
            Self::OggOpus => write!(f, "OGG_OPUS"),
        }
    }
}

/// Request body for one chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    /// Chunk text
    pub text: String,
    /// Provider voice identifier
    pub voice_id: String,
    /// Provider model identifier
    pub model_id: String,
    /// Speaking rate multiplier
    pub speaking_rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Requested audio encoding
    pub audio_encoding: AudioEncoding,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    audio_content: Option<String>,
}

/// Build `Basic base64(key:secret)` the way a browser `btoa` would.
///
/// Every character must fit in one Latin-1 byte.
///
/// # Errors
///
/// Returns an `EncodingError` if the credential contains a character above
/// U+00FF
pub fn basic_auth_header(key: &str, secret: &str) -> VoiceoverResult<String> {
    let credential = format!("{key}:{secret}");
    let bytes = credential
        .chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                VoiceoverError::encoding(format!(
                    "Credential contains character U+{:04X} outside the Latin-1 range",
                    u32::from(c)
                ))
            })
        })
        .collect::<VoiceoverResult<Vec<u8>>>()?;

    Ok(format!("Basic {}", STANDARD.encode(bytes)))
}

/// A text-to-speech backend that turns one request into base64 audio
#[async_trait]
pub trait SpeechProvider: Send + Sync + std::fmt::Debug {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Synthesize one chunk and return its base64 audio
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` with the raw body for non-success responses,
    /// `NetworkError`/`TimeoutError` for transport failures and
    /// `SynthesisError` for malformed success responses
    async fn synthesize_chunk(
        &self,
        request: &SynthesisRequest,
        authorization: &str,
    ) -> VoiceoverResult<String>;
}

/// HTTP client for the Inworld TTS API
#[derive(Debug, Clone)]
pub struct InworldClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl InworldClient {
    /// Create a client for `{base_url}/voice`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &ProviderConfig) -> VoiceoverResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                VoiceoverError::configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/voice", config.base_url.trim_end_matches('/')),
            timeout: config.request_timeout(),
        })
    }

    /// Full synthesis URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SpeechProvider for InworldClient {
    fn name(&self) -> &'static str {
        "inworld"
    }

    async fn synthesize_chunk(
        &self,
        request: &SynthesisRequest,
        authorization: &str,
    ) -> VoiceoverResult<String> {
        debug!(
            "POST {} ({} chars, voice {})",
            self.endpoint,
            request.text.chars().count(),
            request.voice_id
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Speech provider returned {}: {}", status, body);
            return Err(VoiceoverError::provider(status.as_u16(), body));
        }

        let data: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| VoiceoverError::synthesis(format!("Malformed provider response: {e}")))?;

        data.audio_content
            .filter(|audio| !audio.is_empty())
            .ok_or_else(|| VoiceoverError::synthesis("Provider response is missing audioContent"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            voice_id: "Alex".to_string(),
            model_id: "inworld-tts-1".to_string(),
            speaking_rate: 1.0,
            pitch: 1.0,
            audio_encoding: AudioEncoding::Mp3,
        }
    }

    fn client_for(server: &MockServer) -> InworldClient {
        let config = ProviderConfig {
            base_url: server.uri(),
            ..ProviderConfig::default()
        };
        InworldClient::new(&config).unwrap()
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            basic_auth_header("key", "secret").unwrap(),
            "Basic a2V5OnNlY3JldA=="
        );
    }

    #[test]
    fn test_basic_auth_header_latin1() {
        // 'é' is U+00E9, a single Latin-1 byte
        assert_eq!(basic_auth_header("é", "").unwrap(), "Basic 6To=");
    }

    #[test]
    fn test_basic_auth_header_rejects_wide_chars() {
        let err = basic_auth_header("key", "s€cret").unwrap_err();
        assert!(matches!(err, VoiceoverError::EncodingError { .. }));
        assert!(err.to_string().contains("U+20AC"));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let value = serde_json::to_value(request("Hello")).unwrap();
        assert_eq!(
            value,
            json!({
                "text": "Hello",
                "voiceId": "Alex",
                "modelId": "inworld-tts-1",
                "speakingRate": 1.0,
                "pitch": 1.0,
                "audioEncoding": "MP3"
            })
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = ProviderConfig {
            base_url: "https://tts.example.com/v1/".to_string(),
            ..ProviderConfig::default()
        };
        let client = InworldClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "https://tts.example.com/v1/voice");
    }

    #[tokio::test]
    async fn test_synthesize_chunk_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/voice"))
            .and(header("authorization", "Basic a2V5OnNlY3JldA=="))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::to_value(request("Hello")).unwrap()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "audioContent": "SUQz" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .synthesize_chunk(&request("Hello"), "Basic a2V5OnNlY3JldA==")
            .await
            .unwrap();
        assert_eq!(audio, "SUQz");
    }

    #[tokio::test]
    async fn test_synthesize_chunk_provider_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/voice"))
            .respond_with(ResponseTemplate::new(400).set_body_string("voice not found"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .synthesize_chunk(&request("Hello"), "Basic x")
            .await
            .unwrap_err();
        assert_eq!(err, VoiceoverError::provider(400, "voice not found"));
    }

    #[tokio::test]
    async fn test_synthesize_chunk_missing_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "usage": {} })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .synthesize_chunk(&request("Hello"), "Basic x")
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceoverError::SynthesisError { .. }));
    }
}
