pub mod aggregate;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod normalizer;
pub mod notifier;
pub mod poller;
pub mod report;
pub mod scheduler;
pub mod storage;

pub use aggregate::DailyAggregateStore;
pub use engine::Engine;
pub use evaluator::{LimitEvaluator, LimitEvent};
pub use poller::PollCoordinator;
pub use scheduler::ReportScheduler;
