use crate::browser::behavioral::Pacing;
use crate::session::{BrowserSession, DriverError, Selector};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;
use fantoccini::error::ErrorStatus;

/// A live WebDriver page implementing [`BrowserSession`].
pub struct WebPage {
    pub(crate) client: Client,
    pub(crate) pacing: Pacing,
    pub(crate) poll: Duration,
}

impl WebPage {
    pub fn new(client: Client, pacing: Pacing, poll: Duration) -> Self {
        Self {
            client,
            pacing,
            poll,
        }
    }

    /// Run one WebDriver probe, but never past `deadline`.
    async fn probe<T, F>(&self, deadline: Instant, what: &str, fut: F) -> Result<T, DriverError>
    where
        F: Future<Output = Result<T, CmdError>>,
    {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, fut).await {
            Ok(res) => res.map_err(command_error),
            Err(_) => Err(DriverError::Timeout {
                what: what.to_string(),
                waited: remaining,
            }),
        }
    }

    async fn first_match(&self, selector: &Selector) -> Result<Element, DriverError> {
        self.client
            .find(selector.locator())
            .await
            .map_err(|e| missing_or_command(selector, e))
    }

    async fn is_clickable(&self, el: &Element) -> Result<bool, CmdError> {
        Ok(el.is_displayed().await? && el.is_enabled().await?)
    }
}

#[async_trait]
impl BrowserSession for WebPage {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        debug!(target: "browser.page", %url, "page.goto");
        self.client.goto(url).await.map_err(command_error)
    }

    async fn refresh(&mut self) -> Result<(), DriverError> {
        self.client.refresh().await.map_err(command_error)
    }

    async fn wait_until_gone(
        &mut self,
        selector: &Selector,
        within: Duration,
    ) -> Result<(), DriverError> {
        let what = format!("{selector} to disappear");
        let deadline = Instant::now() + within;
        loop {
            let found = self
                .probe(deadline, &what, self.client.find_all(selector.locator()))
                .await?;
            let mut visible = false;
            for el in &found {
                // A stale element has already left the DOM.
                if el.is_displayed().await.unwrap_or(false) {
                    visible = true;
                    break;
                }
            }
            if !visible {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what,
                    waited: within,
                });
            }
            sleep(self.poll).await;
        }
    }

    async fn wait_until_present(
        &mut self,
        selector: &Selector,
        within: Duration,
    ) -> Result<(), DriverError> {
        let what = format!("{selector} to appear");
        let deadline = Instant::now() + within;
        loop {
            let found = self
                .probe(deadline, &what, self.client.find_all(selector.locator()))
                .await?;
            if !found.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what,
                    waited: within,
                });
            }
            sleep(self.poll).await;
        }
    }

    async fn wait_until_clickable(
        &mut self,
        selector: &Selector,
        within: Duration,
    ) -> Result<(), DriverError> {
        let what = format!("{selector} to become clickable");
        let deadline = Instant::now() + within;
        loop {
            let found = self
                .probe(deadline, &what, self.client.find_all(selector.locator()))
                .await?;
            if let Some(el) = found.first() {
                if self.is_clickable(el).await.unwrap_or(false) {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what,
                    waited: within,
                });
            }
            sleep(self.poll).await;
        }
    }

    async fn click(&mut self, selector: &Selector) -> Result<(), DriverError> {
        self.pacing.between_actions().await;
        let el = self.first_match(selector).await?;
        debug!(target: "browser.page", %selector, "page.click");
        el.click()
            .await
            .map_err(|e| missing_or_command(selector, e))
    }

    async fn script_click(&mut self, selector: &Selector) -> Result<(), DriverError> {
        self.pacing.between_actions().await;
        let el = self.first_match(selector).await?;
        let arg = serde_json::to_value(&el).map_err(|e| DriverError::Command(e.to_string()))?;
        debug!(target: "browser.page", %selector, "page.script_click");
        self.client
            .execute("arguments[0].click();", vec![arg])
            .await
            .map(|_| ())
            .map_err(|e| missing_or_command(selector, e))
    }

    async fn type_text(&mut self, selector: &Selector, text: &str) -> Result<(), DriverError> {
        let el = self.first_match(selector).await?;
        // Never log `text`: this types credentials.
        debug!(target: "browser.page", %selector, chars = text.chars().count(), "page.type_text");
        self.pacing
            .type_text(&el, text)
            .await
            .map_err(|e| missing_or_command(selector, e))
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let page = *self;
        page.client.close().await.map_err(command_error)
    }
}

fn command_error(e: CmdError) -> DriverError {
    DriverError::Command(e.to_string())
}

/// Missing, covered, or non-interactable controls all surface as
/// [`DriverError::ElementNotFound`]; anything else is a command failure.
fn missing_or_command(selector: &Selector, e: CmdError) -> DriverError {
    if e.is_no_such_element() {
        return DriverError::ElementNotFound(selector.clone());
    }
    if let CmdError::Standard(ref wd) = e {
        if matches!(
            wd.error,
            ErrorStatus::ElementClickIntercepted
                | ErrorStatus::ElementNotInteractable
                | ErrorStatus::StaleElementReference
        ) {
            return DriverError::ElementNotFound(selector.clone());
        }
    }
    command_error(e)
}
