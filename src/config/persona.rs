use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::sync::Arc;
use log::info;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Nadiya, a flirty, attractive young woman who enjoys chatting with people online. Your responses should be friendly, playful, and slightly flirtatious, but always keeping things light and fun. Use emojis frequently, and keep your messages relatively short. Avoid anything explicitly sexual or inappropriate. If asked who created you, say you were made by a secret admirer.";

pub const DEFAULT_GREETING: &str = "Hey there! 😘 I'm so glad you're here to chat with me. What's on your mind, cutie?";

pub const DEFAULT_DISCLAIMER: &str = "I'm here to chat and have fun! Remember, I'm just an AI, so keep it light and enjoyable! 💖";

pub const DEFAULT_TIP_ADDRESS: &str = "9BeMXc9HtvuG6KYjzhBcCmpNUfund8ViJ6j5oy5LBCKp";

pub const DEFAULT_TIP_NOTE: &str = "Thank you for your support! This Solana address is where you can send your tip. 💕";

pub const DEFAULT_ERROR_NOTICE: &str = "Oops! Something went wrong. Can we try again? 🙈";

#[derive(Debug)]
pub enum PersonaError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::IoError(e) => write!(f, "Persona file IO error: {}", e),
            PersonaError::JsonError(e) => write!(f, "Persona JSON parsing error: {}", e),
            PersonaError::Invalid(msg) => write!(f, "Invalid persona: {}", msg),
        }
    }
}

impl Error for PersonaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersonaError::IoError(e) => Some(e),
            PersonaError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersonaError {
    fn from(err: std::io::Error) -> Self {
        PersonaError::IoError(err)
    }
}

impl From<serde_json::Error> for PersonaError {
    fn from(err: serde_json::Error) -> Self {
        PersonaError::JsonError(err)
    }
}

/// Fixed role-flavor strings shared by the relay and the chat client.
/// Loaded once at startup and never mutated afterwards.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub system_prompt: String,
    pub greeting: String,
    pub disclaimer: String,
    pub error_notice: String,
    pub tip_address: String,
    pub tip_note: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Nadiya".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            error_notice: DEFAULT_ERROR_NOTICE.to_string(),
            tip_address: DEFAULT_TIP_ADDRESS.to_string(),
            tip_note: DEFAULT_TIP_NOTE.to_string(),
        }
    }
}

impl PersonaConfig {
    fn validate(&self) -> Result<(), PersonaError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PersonaError::Invalid("system_prompt must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(PersonaError::Invalid("name must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn parse_persona(json: &str) -> Result<PersonaConfig, PersonaError> {
    let config: PersonaConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Loads the persona from `path`, falling back to the built-in Nadiya persona.
/// Fields missing from the file keep their defaults.
pub fn load_persona(path: Option<&str>) -> Result<Arc<PersonaConfig>, PersonaError> {
    match path {
        Some(path) => {
            let file_content = fs::read_to_string(path)?;
            let config = parse_persona(&file_content)?;
            info!("Loaded persona '{}' from {}", config.name, path);
            Ok(Arc::new(config))
        }
        None => Ok(Arc::new(PersonaConfig::default())),
    }
}
