pub mod job_agent;
pub mod matcher;
pub mod scraper;

pub use scraper::BrowserSession;
