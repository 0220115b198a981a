use rand::Rng;
use thiserror::Error;
use thirtyfour::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::models::{ScrapedPosting, SeekScraperInstructions};

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("webdriver error: {0}")]
    WebDriver(#[from] WebDriverError),
    #[error("scrape cancelled before completion")]
    Cancelled,
}

/// RAII guard around one WebDriver session. `Drop` fires a best-effort
/// `quit()` on a detached task so a cancelled or panicking scrape never
/// leaves a browser process running; callers that can await the close
/// should still call [`BrowserSession::close`] explicitly to observe errors.
pub struct BrowserSession {
    driver: Option<WebDriver>,
}

impl BrowserSession {
    pub async fn open(config: &Config) -> Result<Self, ScraperError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg(&format!("--user-agent={}", config.scraper_user_agent()))?;
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-gpu")?;
        let (width, height) = config.scraper_viewport();
        caps.add_arg(&format!("--window-size={width},{height}"))?;

        let driver = WebDriver::new(config.webdriver_endpoint(), caps).await?;
        Ok(Self {
            driver: Some(driver),
        })
    }

    #[must_use]
    pub fn driver(&self) -> &WebDriver {
        self.driver.as_ref().expect("driver taken before close")
    }

    pub async fn close(mut self) -> Result<(), ScraperError> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await?;
        }
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            tokio::spawn(async move {
                if let Err(error) = driver.quit().await {
                    warn!(%error, "failed to close leaked webdriver session");
                }
            });
        }
    }
}

/// Uniform jitter in `[min_ms, max_ms]`, distinct from the LLM client's
/// exponential backoff jitter: this one never grows with attempt count,
/// it just imitates a human's variable dwell time between page actions.
async fn human_delay(min_ms: u64, max_ms: u64) {
    let delay_ms = if max_ms > min_ms {
        rand::rng().random_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
}

/// Drops postings whose dedup key has already been seen, inserting newly
/// seen keys into `seen_urls` as it goes. Postings without a `job_url` are
/// never deduplicated (spec §3 FoundJob.4 only applies when one is present).
fn dedup_against_seen(
    candidates: Vec<ScrapedPosting>,
    seen_urls: &mut std::collections::HashSet<String>,
) -> Vec<ScrapedPosting> {
    candidates
        .into_iter()
        .filter(|posting| match posting.dedup_key() {
            Some(key) => seen_urls.insert(key),
            None => true,
        })
        .collect()
}

/// Harvests postings for one `seek_scraper` task. Stops early when the
/// requested result count is reached, the cancellation token fires, or the
/// hard cap on total results is hit — whichever comes first.
pub async fn run(
    config: &Config,
    instructions: &SeekScraperInstructions,
    cancellation: &CancellationToken,
) -> Result<Vec<ScrapedPosting>, ScraperError> {
    let session = BrowserSession::open(config).await?;
    let (delay_min, delay_max) = config.scraper_human_delay_range_ms();
    let hard_cap = config.scraper_max_results_hard_cap();
    let target = instructions.desired_result_count.min(hard_cap);

    let mut postings = Vec::new();
    let mut seen_urls = std::collections::HashSet::new();

    for job_title in &instructions.job_titles {
        if cancellation.is_cancelled() || postings.len() >= target {
            break;
        }

        info!(job_title = %job_title, location = %instructions.location, "scraping job title");
        let page_postings =
            scrape_one_title(session.driver(), job_title, &instructions.location).await?;

        for posting in dedup_against_seen(page_postings, &mut seen_urls) {
            if postings.len() >= target {
                break;
            }
            postings.push(posting);
            human_delay(delay_min, delay_max).await;

            if cancellation.is_cancelled() {
                break;
            }
        }
    }

    session.close().await?;

    if cancellation.is_cancelled() && postings.is_empty() {
        return Err(ScraperError::Cancelled);
    }

    Ok(postings)
}

async fn scrape_one_title(
    driver: &WebDriver,
    job_title: &str,
    location: &str,
) -> Result<Vec<ScrapedPosting>, ScraperError> {
    let search_url = format!(
        "https://www.seek.com.au/{}-jobs/in-{}",
        job_title.to_lowercase().replace(' ', "-"),
        location.to_lowercase().replace(' ', "-"),
    );
    driver.goto(&search_url).await?;

    let cards = driver
        .find_all(By::Css("article[data-automation='job-card']"))
        .await
        .unwrap_or_default();

    let mut postings = Vec::with_capacity(cards.len());
    for card in cards {
        let title = text_of(&card, "a[data-automation='jobTitle']").await;
        let company = text_of(&card, "a[data-automation='jobCompany']").await;
        let posting_location = text_of(&card, "a[data-automation='jobLocation']").await;
        let salary = text_of(&card, "span[data-automation='jobSalary']").await;
        let job_url = match card.find(By::Css("a[data-automation='jobTitle']")).await {
            Ok(el) => el.attr("href").await.ok().flatten(),
            Err(_) => None,
        };

        postings.push(ScrapedPosting {
            title: title.unwrap_or_default(),
            company: company.unwrap_or_default(),
            location: posting_location.unwrap_or_else(|| location.to_string()),
            salary: salary.unwrap_or_else(|| "n/a".to_string()),
            job_url,
            work_type: "unspecified".to_string(),
            detailed_description: String::new(),
            source_platform: "seek".to_string(),
        });
    }

    Ok(postings)
}

async fn text_of(card: &WebElement, selector: &str) -> Option<String> {
    card.find(By::Css(selector)).await.ok()?.text().await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(job_url: Option<&str>) -> ScrapedPosting {
        ScrapedPosting {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            salary: "n/a".to_string(),
            job_url: job_url.map(str::to_string),
            work_type: "full_time".to_string(),
            detailed_description: String::new(),
            source_platform: "seek".to_string(),
        }
    }

    #[test]
    fn dedup_against_seen_drops_repeat_urls_across_calls() {
        let mut seen = std::collections::HashSet::new();

        let first_page = dedup_against_seen(
            vec![posting(Some("https://seek.example/1")), posting(Some("https://seek.example/2"))],
            &mut seen,
        );
        assert_eq!(first_page.len(), 2);

        let second_page = dedup_against_seen(
            vec![posting(Some("https://seek.example/1?utm=feed")), posting(Some("https://seek.example/3"))],
            &mut seen,
        );
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].job_url.as_deref(), Some("https://seek.example/3"));
    }

    #[test]
    fn dedup_against_seen_never_drops_urlless_postings() {
        let mut seen = std::collections::HashSet::new();
        let postings = dedup_against_seen(vec![posting(None), posting(None)], &mut seen);
        assert_eq!(postings.len(), 2);
    }

    #[tokio::test]
    async fn human_delay_never_waits_past_the_upper_bound() {
        let started = tokio::time::Instant::now();
        human_delay(5, 15).await;
        assert!(started.elapsed() <= std::time::Duration::from_millis(200));
    }
}
