//! Bot detection integration
//!
//! Fingerprinting itself is delegated to a [`BotDetector`]. [`BotGuard`]
//! wraps a detector and fails open: any load or detection failure is
//! reported as "not a bot" so real users are never starved of ads.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Reason reported when a detector flags automation
pub const AUTOMATION_DETECTED: &str = "Automation detected";

/// Reason reported when detection could not run
pub const DETECTION_FAILED: &str = "Bot detection failed - assuming human";

/// Outcome of bot detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotVerdict {
    pub is_bot: bool,
    pub reasons: Vec<String>,
}

impl BotVerdict {
    /// A human verdict with no reasons
    pub fn human() -> Self {
        Self::default()
    }

    /// A bot verdict with one reason
    pub fn bot(reason: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            reasons: vec![reason.into()],
        }
    }
}

/// Trait for bot fingerprinting libraries
#[async_trait::async_trait]
pub trait BotDetector: Send + Sync {
    /// Prepare the detector
    async fn load(&self) -> Result<()>;

    /// Run detection
    async fn detect(&self) -> Result<BotVerdict>;
}

/// Fail-open wrapper around a detector
pub struct BotGuard {
    detector: Option<Box<dyn BotDetector>>,
}

impl std::fmt::Debug for BotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotGuard")
            .field("enabled", &self.detector.is_some())
            .finish()
    }
}

impl BotGuard {
    /// Guard a detector
    pub fn new(detector: impl BotDetector + 'static) -> Self {
        Self {
            detector: Some(Box::new(detector)),
        }
    }

    /// A guard that always reports a human
    pub fn disabled() -> Self {
        Self { detector: None }
    }

    /// Build the guard described by settings
    pub fn from_settings(settings: &crate::config::settings::BotDetectionSettings) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }
        let user_agent = settings.user_agent.clone().unwrap_or_default();
        Self::new(UserAgentDetector::new(user_agent))
    }

    /// Load and run the detector, never failing
    pub async fn verdict(&self) -> BotVerdict {
        let Some(detector) = &self.detector else {
            return BotVerdict::human();
        };

        let result = async {
            detector.load().await?;
            detector.detect().await
        }
        .await;

        match result {
            Ok(verdict) => {
                if verdict.is_bot {
                    tracing::info!("Bot detected: {:?}", verdict.reasons);
                }
                verdict
            }
            Err(e) => {
                tracing::warn!("Bot detection failed, assuming human user: {}", e);
                BotVerdict {
                    is_bot: false,
                    reasons: vec![DETECTION_FAILED.to_string()],
                }
            }
        }
    }
}

/// Markers of headless browsers and HTTP tooling
const AUTOMATION_MARKERS: &[&str] = &[
    "headlesschrome",
    "phantomjs",
    "selenium",
    "webdriver",
    "puppeteer",
    "playwright",
    "curl/",
    "wget/",
    "python-requests",
    "go-http-client",
    "bot/",
    "bot;",
    "crawler",
    "spider",
];

/// Heuristic detector flagging well-known automation user agents
#[derive(Debug, Clone)]
pub struct UserAgentDetector {
    user_agent: String,
}

impl UserAgentDetector {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait::async_trait]
impl BotDetector for UserAgentDetector {
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    async fn detect(&self) -> Result<BotVerdict> {
        let ua = self.user_agent.to_lowercase();
        let reasons: Vec<String> = AUTOMATION_MARKERS
            .iter()
            .filter(|marker| ua.contains(*marker))
            .map(|marker| format!("{}: user agent contains '{}'", AUTOMATION_DETECTED, marker))
            .collect();

        Ok(BotVerdict {
            is_bot: !reasons.is_empty(),
            reasons,
        })
    }
}

/// Detector returning a fixed verdict, or failing on demand
#[derive(Debug, Clone)]
pub struct StaticDetector {
    verdict: Option<BotVerdict>,
}

impl StaticDetector {
    /// Always report this verdict
    pub fn new(verdict: BotVerdict) -> Self {
        Self {
            verdict: Some(verdict),
        }
    }

    /// Always fail to load
    pub fn failing() -> Self {
        Self { verdict: None }
    }
}

#[async_trait::async_trait]
impl BotDetector for StaticDetector {
    async fn load(&self) -> Result<()> {
        match self.verdict {
            Some(_) => Ok(()),
            None => Err(crate::Error::bot_detection("load", "detector unavailable")),
        }
    }

    async fn detect(&self) -> Result<BotVerdict> {
        self.verdict
            .clone()
            .ok_or_else(|| crate::Error::bot_detection("detect", "detector unavailable"))
    }
}
