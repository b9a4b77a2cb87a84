use std::sync::Arc;

use murmur_core::config::Config;
use murmur_core::intake::IntakeService;
use murmur_core::moderation::ModerationService;
use murmur_core::notify::{Dispatcher, Mailer};
use murmur_core::ratelimit::RateLimiter;
use murmur_core::settings::SettingsService;
use murmur_core::store::Store;

/// Services shared by every handler. All three hold the same [`Store`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub intake: IntakeService,
    pub moderation: ModerationService,
    pub settings: SettingsService,
}

impl AppState {
    pub fn new(store: Store, config: &Config, mailer: Option<Arc<dyn Mailer>>) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window(),
        ));
        let dispatcher = Dispatcher::new(mailer, config.admin_url.clone(), config.smtp_timeout());

        Self {
            intake: IntakeService::new(store.clone(), limiter, dispatcher),
            moderation: ModerationService::new(store.clone()),
            settings: SettingsService::new(store),
        }
    }
}
