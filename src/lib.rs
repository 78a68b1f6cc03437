pub mod address;
pub mod body;
pub mod config;
pub mod decode;
pub mod dsn;
pub mod handler;
pub mod headers;
pub mod mailbox;
pub mod matcher;
pub mod outcome;
pub mod report;
pub mod router;
pub mod rules;
pub mod statistics;

pub use body::BodyClassifier;
pub use config::Config;
pub use dsn::DsnClassifier;
pub use handler::{BounceHandler, BounceRecord};
pub use mailbox::{Mailbox, MemoryMailbox};
pub use outcome::{BounceOutcome, Severity};
pub use report::DeliveryStatus;
pub use router::{route, Route};
pub use rules::{RuleSetKind, RuleTable};
pub use statistics::{CascadeObserver, RuleStatistics};
