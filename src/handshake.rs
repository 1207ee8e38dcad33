//! Reaching a fully loaded target page past an anti-automation gate.
//!
//! One attempt is `Requesting -> (Challenged -> Verifying | Verifying) -> Reached`;
//! any step that does not reach the page sends the machine back to
//! `Requesting` with a fresh page load until the attempt budget is spent,
//! then to `Failed`. Callers get a [`HandshakeOutcome`] value, never an error.

use std::time::Duration;

use crate::backoff::ExponentialBackoff;
use crate::browser::{Browser, Locator};
use crate::config::Config;
use crate::url_utils;

/// Cheap check that the page is already the target, tried before looking for a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastPath {
    /// Current URL is on this domain.
    DomainMatch(String),
    /// The ready marker is already on the page.
    MarkerVisible,
}

#[derive(Debug, Clone)]
pub struct HandshakePolicy {
    pub max_attempts: u32,
    pub reconnect_attempts: u32,
    pub fast_path: FastPath,
    pub fast_path_polls: u32,
    pub poll_interval: Duration,
    /// Wait after acting on a challenge before verifying.
    pub challenge_settle: Duration,
    pub verify_control: Locator,
    pub challenge_frame: Locator,
    /// Exists only on a successfully rendered target page.
    pub ready_marker: Locator,
    pub verify_timeout: Duration,
    pub backoff: ExponentialBackoff,
}

impl HandshakePolicy {
    /// Year and month listing pages.
    pub fn listing() -> Self {
        Self::with_fast_path(
            FastPath::DomainMatch(Config::TARGET_DOMAIN.to_string()),
            Locator::css(Config::LISTING_MARKER),
        )
    }

    /// Judgment documents: reached once the print control has rendered.
    pub fn document() -> Self {
        Self::with_fast_path(FastPath::MarkerVisible, print_control())
    }

    fn with_fast_path(fast_path: FastPath, ready_marker: Locator) -> Self {
        Self {
            max_attempts: Config::HANDSHAKE_MAX_ATTEMPTS,
            reconnect_attempts: Config::RECONNECT_ATTEMPTS,
            fast_path,
            fast_path_polls: Config::FAST_PATH_POLLS,
            poll_interval: Duration::from_secs(Config::POLL_INTERVAL_SECS),
            challenge_settle: Duration::from_secs(Config::CHALLENGE_SETTLE_SECS),
            verify_control: Locator::css(Config::VERIFY_CONTROL),
            challenge_frame: Locator::css(Config::CHALLENGE_FRAME),
            ready_marker,
            verify_timeout: Duration::from_secs(Config::VERIFY_TIMEOUT_SECS),
            backoff: ExponentialBackoff::new(Config::BACKOFF_BASE_MS, Config::BACKOFF_MAX_MS),
        }
    }

    /// Same protocol with every wait removed.
    pub fn without_delays(mut self) -> Self {
        self.poll_interval = Duration::ZERO;
        self.challenge_settle = Duration::ZERO;
        self.verify_timeout = Duration::ZERO;
        self.backoff = ExponentialBackoff::none();
        self
    }
}

/// The print-friendly control on a document page, in any of its renderings.
pub fn print_control() -> Locator {
    Locator::AnyOf(vec![
        Locator::css(Config::PRINT_CONTROL),
        Locator::tag_with_text("button", Config::PRINT_TEXT),
        Locator::tag_with_text("a", Config::PRINT_TEXT),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    VerifyControl,
    EmbeddedFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Requesting { attempt: u32 },
    Challenged(ChallengeKind),
    Verifying,
    Reached,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Reached { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl HandshakeOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, HandshakeOutcome::Reached { .. })
    }
}

/// Drive `browser` to `url` under `policy`.
pub async fn reach(browser: &mut dyn Browser, url: &str, policy: &HandshakePolicy) -> HandshakeOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut last_reason = String::from("no attempt made");
    let mut state = HandshakeState::Requesting { attempt };

    loop {
        tracing::trace!(url = %url, ?state, "Handshake state");

        state = match state {
            HandshakeState::Requesting { attempt: current } => {
                attempt = current;
                if current > 1 {
                    tokio::time::sleep(policy.backoff.delay(current - 2)).await;
                }
                tracing::debug!(url = %url, attempt, "Requesting page");

                match browser.open_with_reconnect(url, policy.reconnect_attempts).await {
                    Err(e) => {
                        last_reason = e.to_string();
                        tracing::warn!(url = %url, attempt, error = %e, "Page load failed");
                        next_attempt(attempt, max_attempts)
                    }
                    Ok(()) => {
                        if fast_path(browser, policy).await {
                            HandshakeState::Reached
                        } else {
                            detect_challenge(browser, policy).await
                        }
                    }
                }
            }

            HandshakeState::Challenged(kind) => {
                tracing::info!(url = %url, attempt, challenge = ?kind, "Challenge detected");
                let action = match kind {
                    ChallengeKind::VerifyControl => browser.click(&policy.verify_control).await,
                    ChallengeKind::EmbeddedFrame => browser.solve_challenge_widget().await,
                };
                if let Err(e) = action {
                    tracing::warn!(url = %url, attempt, error = %e, "Challenge action failed");
                }
                tokio::time::sleep(policy.challenge_settle).await;
                HandshakeState::Verifying
            }

            HandshakeState::Verifying => {
                match browser
                    .wait_visible(&policy.ready_marker, policy.verify_timeout)
                    .await
                {
                    Ok(()) => HandshakeState::Reached,
                    Err(e) => {
                        last_reason = e.to_string();
                        tracing::warn!(url = %url, attempt, error = %e, "Target page not verified");
                        next_attempt(attempt, max_attempts)
                    }
                }
            }

            HandshakeState::Reached => {
                tracing::debug!(url = %url, attempts = attempt, "Target page reached");
                return HandshakeOutcome::Reached { attempts: attempt };
            }

            HandshakeState::Failed => {
                tracing::warn!(url = %url, attempts = attempt, reason = %last_reason, "Handshake exhausted all attempts");
                return HandshakeOutcome::Failed {
                    attempts: attempt,
                    reason: last_reason,
                };
            }
        };
    }
}

fn next_attempt(attempt: u32, max_attempts: u32) -> HandshakeState {
    if attempt >= max_attempts {
        HandshakeState::Failed
    } else {
        HandshakeState::Requesting {
            attempt: attempt + 1,
        }
    }
}

async fn fast_path(browser: &mut dyn Browser, policy: &HandshakePolicy) -> bool {
    let polls = policy.fast_path_polls.max(1);
    for poll in 0..polls {
        let reached = match &policy.fast_path {
            FastPath::DomainMatch(domain) => browser
                .current_url()
                .await
                .is_some_and(|current| url_utils::belongs_to_domain(&current, domain)),
            FastPath::MarkerVisible => browser.is_visible(&policy.ready_marker).await,
        };
        if reached {
            return true;
        }
        if poll + 1 < polls {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }
    false
}

async fn detect_challenge(browser: &mut dyn Browser, policy: &HandshakePolicy) -> HandshakeState {
    if browser.is_visible(&policy.verify_control).await {
        HandshakeState::Challenged(ChallengeKind::VerifyControl)
    } else if browser.is_visible(&policy.challenge_frame).await {
        HandshakeState::Challenged(ChallengeKind::EmbeddedFrame)
    } else {
        // Nothing recognisable; the marker may still appear on its own.
        HandshakeState::Verifying
    }
}
