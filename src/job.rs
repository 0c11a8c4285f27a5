//! Run orchestration: one trigger, one linear pass.
//!
//! Order is fixed: gate check, signal collection, generation, rendering,
//! delivery, state commit. A skip (already sent, not enough news) is a normal
//! outcome and exits before any paid call; generation and delivery failures
//! are terminal and leave no partial state, so the next trigger retries the
//! whole pipeline. Invocations are serial by contract: the cron scheduler
//! fires one at a time and the state file carries no lock, so overlapping
//! runs are unsupported.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::config::Config;
use crate::deliver::mailerlite::{MailerLiteApi, MailerLiteConnect, MailerLiteLegacy, Sender};
use crate::deliver::{CampaignDispatcher, DeliveryReceipt, Dispatcher, Recipient};
use crate::error::JobError;
use crate::generate::{NewsletterGenerator, OpenAiGenerator};
use crate::ingest::providers::gold_api::GoldApiProvider;
use crate::ingest::providers::metals_api::MetalsApiProvider;
use crate::ingest::providers::news_rss::RssNewsProvider;
use crate::ingest::types::{NewsProvider, PriceProvider};
use crate::ingest::SignalCollector;
use crate::render;
use crate::retry::{HttpCaller, RetryPolicy};
use crate::state::{local_date_now, RunStateStore};

/// Headlines handed to the model per run.
pub const PROMPT_NEWS_LIMIT: usize = 10;

/// Why a run ended without a send. Not an error; the process still exits 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySentToday { date: NaiveDate },
    NotEnoughNews { found: usize, required: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadySentToday { date } => {
                write!(f, "newsletter already sent on {date}")
            }
            SkipReason::NotEnoughNews { found, required } => {
                write!(f, "only {found} relevant news items, {required} required")
            }
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Sent(DeliveryReceipt),
    Skipped(SkipReason),
}

pub struct JobRunner<G, D> {
    collector: SignalCollector,
    generator: G,
    dispatcher: D,
    state: RunStateStore,
    recipient: Recipient,
    min_news_items: usize,
}

impl<G, D> JobRunner<G, D>
where
    G: NewsletterGenerator,
    D: CampaignDispatcher,
{
    pub fn new(
        collector: SignalCollector,
        generator: G,
        dispatcher: D,
        state: RunStateStore,
        recipient: Recipient,
        min_news_items: usize,
    ) -> Self {
        Self {
            collector,
            generator,
            dispatcher,
            state,
            recipient,
            min_news_items,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome, JobError> {
        let today = local_date_now();
        if self.state.already_sent(today) {
            info!(%today, "already sent today, skipping");
            return Ok(RunOutcome::Skipped(SkipReason::AlreadySentToday {
                date: today,
            }));
        }

        let prices = self.collector.fetch_prices().await;
        let news = self.collector.fetch_news().await;
        if news.len() < self.min_news_items {
            info!(
                found = news.len(),
                required = self.min_news_items,
                "not enough relevant news, skipping"
            );
            return Ok(RunOutcome::Skipped(SkipReason::NotEnoughNews {
                found: news.len(),
                required: self.min_news_items,
            }));
        }

        let highlights = self.collector.select_for_prompt(&news, PROMPT_NEWS_LIMIT);
        info!(
            news = news.len(),
            highlights = highlights.len(),
            gold = ?prices.gold_usd,
            silver = ?prices.silver_usd,
            "signals collected, generating"
        );

        let newsletter = self.generator.generate(&prices, &highlights).await?;
        let document = render::render(&newsletter, &prices);
        let receipt = self.dispatcher.send(&document, &self.recipient).await?;
        info!(
            campaign = %receipt.campaign_id,
            endpoint = %receipt.endpoint,
            "newsletter delivered"
        );

        // The send already happened; a commit failure is logged, not returned.
        if let Err(e) = self.state.commit(today, &news) {
            error!(error = %e, "could not persist run state after send");
        }

        Ok(RunOutcome::Sent(receipt))
    }
}

pub type ProdRunner = JobRunner<OpenAiGenerator, Dispatcher<MailerLiteConnect, MailerLiteLegacy>>;

/// Wires the production pipeline from resolved configuration. `main` stays a
/// thin shell around this.
pub fn build_runner(config: &Config) -> ProdRunner {
    let client = reqwest::Client::builder()
        .user_agent(concat!("metals-newsletter/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let mut price_providers: Vec<Box<dyn PriceProvider>> = Vec::new();
    if let Some(key) = &config.metals_api_key {
        price_providers.push(Box::new(MetalsApiProvider::new(
            HttpCaller::new(client.clone(), RetryPolicy::prices()),
            config.metals_api_url.clone(),
            key.clone(),
        )));
    }
    price_providers.push(Box::new(GoldApiProvider::new(
        HttpCaller::new(client.clone(), RetryPolicy::prices()),
        config.spot_api_url.clone(),
    )));

    let news_providers: Vec<Box<dyn NewsProvider>> = config
        .news_feeds
        .iter()
        .map(|feed| {
            Box::new(RssNewsProvider::from_url(
                feed.label.clone(),
                feed.url.clone(),
                client.clone(),
            )) as Box<dyn NewsProvider>
        })
        .collect();

    let collector = SignalCollector::new(
        price_providers,
        news_providers,
        config.keywords.clone(),
        config.max_news_items,
    );

    let generator = OpenAiGenerator::new(
        HttpCaller::new(client.clone(), RetryPolicy::generation()),
        config.openai_api_key.clone(),
        config.model.clone(),
    );

    let sender = Sender {
        email: config.sender_email.clone(),
        name: config.sender_name.clone(),
    };
    let api = MailerLiteApi::new(
        HttpCaller::new(client, RetryPolicy::delivery()),
        config.mailerlite_api_key.clone(),
    );
    let dispatcher = Dispatcher::new(
        MailerLiteConnect::new(api.clone(), sender.clone()),
        MailerLiteLegacy::new(api, sender),
    );

    JobRunner::new(
        collector,
        generator,
        dispatcher,
        RunStateStore::new(config.state_path.clone()),
        config.recipient.clone(),
        config.min_news_items,
    )
}
