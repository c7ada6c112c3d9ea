//! Server configuration.
//!
//! Configuration is read from environment variables (after any `.env`
//! file is loaded at startup), with an optional YAML file overriding
//! individual values.
//!
//! Priority order (highest to lowest):
//! 1. YAML file values
//! 2. Environment variables (actual ENV vars override .env values)
//! 3. Default values

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::realtime::{
    AuthScheme, OpenAiLinkConfig, OpenAiRealtimeModel, OpenAiRealtimeVoice, VadTuning,
    VoiceSessionConfig,
};

/// TLS configuration for HTTPS and WSS.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Instructions used when none are configured.
const DEFAULT_INSTRUCTIONS: &str = "You are a friendly scheduling assistant calling on behalf of \
a sales team. Greet the lead by name if you know it, explain why you are calling, and try to \
book a meeting at a time that suits them using the book_meeting tool. Today's date is {date}. \
Keep responses short, this is a phone call.";

/// Server configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// TLS configuration, plain HTTP when absent
    pub tls: Option<TlsConfig>,

    /// OpenAI API key
    pub openai_api_key: String,
    /// Realtime model name
    pub openai_model: OpenAiRealtimeModel,
    /// Assistant voice
    pub openai_voice: OpenAiRealtimeVoice,
    /// WebSocket auth scheme for the Realtime API
    pub openai_auth: AuthScheme,
    /// Assistant instructions, `{date}` interpolates today's date
    pub assistant_instructions: Option<String>,

    /// VAD activation threshold
    pub vad_threshold: f32,
    /// VAD audio prefix padding in ms
    pub vad_prefix_padding_ms: u32,
    /// VAD silence duration in ms
    pub vad_silence_duration_ms: u32,

    /// CRM application server base URL
    pub crm_base_url: String,
    /// Bearer token for CRM API calls
    pub crm_api_token: Option<String>,

    /// Allowed CORS origins, permissive when unset
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Rate limit: sustained requests per second, 0 disables limiting
    pub rate_limit_requests_per_second: u64,
    /// Rate limit: burst size
    pub rate_limit_burst_size: u32,
}

/// YAML overlay applied on top of environment configuration.
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    host: Option<String>,
    port: Option<u16>,
    tls: Option<TlsConfig>,
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    openai_voice: Option<String>,
    openai_auth: Option<String>,
    assistant_instructions: Option<String>,
    vad_threshold: Option<f32>,
    vad_prefix_padding_ms: Option<u32>,
    vad_silence_duration_ms: Option<u32>,
    crm_base_url: Option<String>,
    crm_api_token: Option<String>,
    cors_allowed_origins: Option<Vec<String>>,
    rate_limit_requests_per_second: Option<u64>,
    rate_limit_burst_size: Option<u32>,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::load_env();
        config.validate()?;
        Ok(config)
    }

    fn load_env() -> Self {
        let tls = match (env::var("TLS_CERT_PATH"), env::var("TLS_KEY_PATH")) {
            (Ok(cert), Ok(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3000),
            tls,
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openai_model: OpenAiRealtimeModel::from_str_or_default(&env_or("OPENAI_MODEL", "")),
            openai_voice: OpenAiRealtimeVoice::from_str_or_default(&env_or("OPENAI_VOICE", "")),
            openai_auth: AuthScheme::from_str_or_default(&env_or("OPENAI_WS_AUTH", "")),
            assistant_instructions: env::var("ASSISTANT_INSTRUCTIONS").ok(),
            vad_threshold: env_parse("VAD_THRESHOLD", VadTuning::default().threshold),
            vad_prefix_padding_ms: env_parse(
                "VAD_PREFIX_PADDING_MS",
                VadTuning::default().prefix_padding_ms,
            ),
            vad_silence_duration_ms: env_parse(
                "VAD_SILENCE_DURATION_MS",
                VadTuning::default().silence_duration_ms,
            ),
            crm_base_url: env_or("CRM_BASE_URL", "http://localhost:8080"),
            crm_api_token: env::var("CRM_API_TOKEN").ok(),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect()),
            rate_limit_requests_per_second: env_parse("RATE_LIMIT_RPS", 60),
            rate_limit_burst_size: env_parse("RATE_LIMIT_BURST", 10),
        }
    }

    /// Load from environment variables with YAML overrides.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml: YamlConfig = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        let mut config = Self::load_env();

        if let Some(host) = yaml.host {
            config.host = host;
        }
        if let Some(port) = yaml.port {
            config.port = port;
        }
        if let Some(tls) = yaml.tls {
            config.tls = Some(tls);
        }
        if let Some(key) = yaml.openai_api_key {
            config.openai_api_key = key;
        }
        if let Some(model) = yaml.openai_model {
            config.openai_model = OpenAiRealtimeModel::from_str_or_default(&model);
        }
        if let Some(voice) = yaml.openai_voice {
            config.openai_voice = OpenAiRealtimeVoice::from_str_or_default(&voice);
        }
        if let Some(auth) = yaml.openai_auth {
            config.openai_auth = AuthScheme::from_str_or_default(&auth);
        }
        if yaml.assistant_instructions.is_some() {
            config.assistant_instructions = yaml.assistant_instructions;
        }
        if let Some(v) = yaml.vad_threshold {
            config.vad_threshold = v;
        }
        if let Some(v) = yaml.vad_prefix_padding_ms {
            config.vad_prefix_padding_ms = v;
        }
        if let Some(v) = yaml.vad_silence_duration_ms {
            config.vad_silence_duration_ms = v;
        }
        if let Some(url) = yaml.crm_base_url {
            config.crm_base_url = url;
        }
        if yaml.crm_api_token.is_some() {
            config.crm_api_token = yaml.crm_api_token;
        }
        if yaml.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = yaml.cors_allowed_origins;
        }
        if let Some(v) = yaml.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = v;
        }
        if let Some(v) = yaml.rate_limit_burst_size {
            config.rate_limit_burst_size = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.openai_api_key.is_empty() {
            return Err("OPENAI_API_KEY is required".into());
        }
        if self.crm_base_url.is_empty() {
            return Err("CRM_BASE_URL must not be empty".into());
        }
        Ok(())
    }

    /// Server address as "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether TLS is enabled.
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Realtime link configuration for one call.
    pub fn openai_link(&self) -> OpenAiLinkConfig {
        OpenAiLinkConfig {
            api_key: self.openai_api_key.clone(),
            model: self.openai_model,
            auth: self.openai_auth,
        }
    }

    /// VAD tuning from the configured values.
    pub fn vad_tuning(&self) -> VadTuning {
        VadTuning {
            threshold: self.vad_threshold,
            prefix_padding_ms: self.vad_prefix_padding_ms,
            silence_duration_ms: self.vad_silence_duration_ms,
        }
    }

    /// Assistant instructions with today's date interpolated.
    pub fn instructions_for_today(&self) -> String {
        let template = self
            .assistant_instructions
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS);
        let now = time::OffsetDateTime::now_utc();
        let today = format!(
            "{:04}-{:02}-{:02}",
            now.year(),
            now.month() as u8,
            now.day()
        );
        template.replace("{date}", &today)
    }

    /// Voice session configuration for one call.
    pub fn voice_session(&self) -> VoiceSessionConfig {
        VoiceSessionConfig::booking_assistant(
            self.instructions_for_today(),
            self.openai_voice.as_str().to_string(),
            self.vad_tuning(),
        )
    }
}

/// Zeroize secrets when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.openai_api_key.zeroize();
        if let Some(token) = self.crm_api_token.as_mut() {
            token.zeroize();
        }
    }
}
