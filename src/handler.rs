use crate::body::BodyClassifier;
use crate::config::Config;
use crate::decode::{decode, truncate_chars};
use crate::dsn::DsnClassifier;
use crate::headers::headers_map;
use crate::mailbox::{BodyType, Mailbox, MessageId};
use crate::outcome::BounceOutcome;
use crate::report::DeliveryStatus;
use crate::router::{route, Route};
use crate::rules::RuleTable;
use crate::statistics::CascadeObserver;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Characters of a `message/*` body handed to the body classifier.
pub const MESSAGE_BODY_LIMIT: usize = 1000;

const EXPLANATION_SECTION: &str = "1";
const DELIVERY_STATUS_SECTION: &str = "2";
const ORIGINAL_MESSAGE_SECTION: &str = "3";

/// Classification of one message plus whatever raw material the
/// configuration asked to keep. The extras never affect the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceRecord {
    pub message_id: MessageId,
    pub route: Route,
    #[serde(flatten)]
    pub outcome: BounceOutcome,
    pub headers: Option<String>,
    pub body: Option<String>,
    pub original_email: Option<String>,
    pub original_email_headers: BTreeMap<String, String>,
}

pub struct BounceHandler<M: Mailbox> {
    mailbox: M,
    config: Config,
    dsn: DsnClassifier,
    body: BodyClassifier,
}

impl<M: Mailbox> BounceHandler<M> {
    pub fn new(mailbox: M, config: Config, rules: Arc<RuleTable>) -> Result<Self> {
        config.validate().context("Invalid handler configuration")?;
        Ok(Self {
            mailbox,
            config,
            dsn: DsnClassifier::new(rules.clone()),
            body: BodyClassifier::new(rules),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn CascadeObserver>) -> Self {
        self.dsn = self.dsn.with_observer(observer.clone());
        self.body = self.body.with_observer(observer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_mailbox(self) -> M {
        self.mailbox
    }

    /// Search the mailbox and classify every matching message, up to the
    /// configured limit. The mailbox is closed afterwards, also on error.
    /// Only a failed search is an error.
    pub fn process(&mut self) -> Result<Vec<BounceRecord>> {
        let result = self.process_all();
        self.mailbox.close();
        result
    }

    fn process_all(&mut self) -> Result<Vec<BounceRecord>> {
        let criterion = self.config.search_criterion();
        let ids = self
            .mailbox
            .search(&criterion)
            .with_context(|| format!("Mailbox search failed: {criterion}"))?;
        log::info!("{} candidate message(s) for {criterion}", ids.len());

        let limit = self.config.process_limit;
        let mut records = Vec::new();

        for id in ids {
            if limit > 0 && records.len() >= limit {
                log::info!("Process limit of {limit} reached");
                break;
            }

            let header = match self.mailbox.fetch_header(id) {
                Ok(header) => header,
                Err(e) => {
                    log::warn!("Skipping message {id}: {e:#}");
                    continue;
                }
            };
            if header.trim().is_empty() {
                log::debug!("Skipping message {id} with an empty header");
                self.delete_if_configured(id);
                continue;
            }

            match self.process_message(id, header) {
                Ok(record) => {
                    log::debug!(
                        "Message {id}: {:?} {:?} via {:?}",
                        record.outcome.severity,
                        record.outcome.email,
                        record.route
                    );
                    records.push(record);
                }
                Err(e) => {
                    log::warn!("Skipping message {id}: {e:#}");
                    continue;
                }
            }
            self.delete_if_configured(id);
        }

        if self.config.delete_after_processing {
            if let Err(e) = self.mailbox.expunge() {
                log::warn!("Expunge failed, deleted messages stay flagged: {e:#}");
            }
        }

        log::info!("Classified {} bounce message(s)", records.len());
        Ok(records)
    }

    fn process_message(&mut self, id: MessageId, header: String) -> Result<BounceRecord> {
        let route = route(&header);
        let outcome = match route {
            Route::Dsn => self.classify_dsn(id)?,
            Route::Body => self.classify_body(id)?,
        };

        let body = if self.config.return_body {
            Some(self.mailbox.fetch_body(id)?)
        } else {
            None
        };
        let original_email = if self.config.return_original_email {
            Some(self.mailbox.fetch_part(id, ORIGINAL_MESSAGE_SECTION)?)
        } else {
            None
        };

        let mut original_email_headers = BTreeMap::new();
        if self.config.return_original_email_headers_array {
            let original = match &original_email {
                Some(text) => text.clone(),
                None => self.mailbox.fetch_part(id, ORIGINAL_MESSAGE_SECTION)?,
            };
            original_email_headers = headers_map(&original);
            if original_email_headers.is_empty() {
                let full_body = match &body {
                    Some(text) => text.clone(),
                    None => self.mailbox.fetch_body(id)?,
                };
                original_email_headers = headers_map(&full_body);
            }
        }

        Ok(BounceRecord {
            message_id: id,
            route,
            outcome,
            headers: self.config.return_headers.then_some(header),
            body,
            original_email,
            original_email_headers,
        })
    }

    fn classify_dsn(&mut self, id: MessageId) -> Result<BounceOutcome> {
        let raw_explanation = self.mailbox.fetch_part(id, EXPLANATION_SECTION)?;
        let info = self.mailbox.part_structure(id, EXPLANATION_SECTION)?;
        let explanation = decode(&raw_explanation, info.encoding);

        let report = self.mailbox.fetch_part(id, DELIVERY_STATUS_SECTION)?;
        let status = DeliveryStatus::parse(&report);

        Ok(self.dsn.classify(&status, &explanation))
    }

    fn classify_body(&mut self, id: MessageId) -> Result<BounceOutcome> {
        let structure = self.mailbox.structure(id)?;
        let body = match structure.body_type {
            BodyType::Text | BodyType::Multipart => {
                let raw = self.mailbox.fetch_part(id, EXPLANATION_SECTION)?;
                let encoding = structure
                    .parts
                    .first()
                    .map_or(structure.encoding, |part| part.encoding);
                decode(&raw, encoding)
            }
            BodyType::Message => {
                let raw = self.mailbox.fetch_body(id)?;
                truncate_chars(&decode(&raw, structure.encoding), MESSAGE_BODY_LIMIT)
            }
            BodyType::Other => String::new(),
        };

        Ok(self.body.classify(&body))
    }

    fn delete_if_configured(&mut self, id: MessageId) {
        if !self.config.delete_after_processing {
            return;
        }
        if let Err(e) = self.mailbox.delete(id) {
            log::warn!("Failed to delete message {id}: {e:#}");
        }
    }
}
