//! Queue processors: the glue layer between each durable queue and the
//! component actor that owns the state it carries.

pub mod healing_processor;
pub mod job_processor;
pub mod scrape_processor;

pub use healing_processor::HealingProcessor;
pub use job_processor::{JobHandler, JobProcessor};
pub use scrape_processor::{ScrapeProcessor, Scraper};
