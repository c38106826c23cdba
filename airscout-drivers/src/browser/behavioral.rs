use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Small randomised delays between UI actions.
///
/// Login forms on the portal drop keystrokes that arrive faster than its
/// input handlers run, so typing goes one character at a time.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub keystroke_ms: (u64, u64),
    pub action_ms: (u64, u64),
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            keystroke_ms: (30, 150),
            action_ms: (100, 400),
        }
    }
}

impl Pacing {
    /// No delays at all.
    pub fn none() -> Self {
        Self {
            keystroke_ms: (0, 0),
            action_ms: (0, 0),
        }
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, (min, max): (u64, u64)) {
        if max == 0 {
            return;
        }
        let ms = OsRng.gen_range(min..=max.max(min));
        sleep(Duration::from_millis(ms)).await;
    }

    pub async fn between_actions(&self) {
        self.random_delay(self.action_ms).await;
    }

    /// Type the provided text with small random delays between characters.
    pub async fn type_text(&self, element: &Element, text: &str) -> Result<(), CmdError> {
        for ch in text.chars() {
            element.send_keys(&ch.to_string()).await?;
            self.random_delay(self.keystroke_ms).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn no_pacing_never_sleeps() {
        let started = Instant::now();
        Pacing::none().between_actions().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
