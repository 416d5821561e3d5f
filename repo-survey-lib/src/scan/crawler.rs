use super::{Checkpoint, CheckpointStore, DiscoveryLog};
use crate::Result;
use crate::github::{Client, search_repositories};
use chrono::{Days, NaiveDate};
use core::time::Duration;
use ohno::app_err;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "   crawler";

/// What to search for and how to walk the creation-date range.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    /// Repository language qualifier, e.g. `C#`
    pub language: String,

    /// Only repositories with strictly more stars than this are returned
    pub min_stars: u64,

    /// First creation date searched when no checkpoint exists
    pub start_date: NaiveDate,

    /// Creation dates on or after this are not searched
    pub end_date: NaiveDate,

    /// Width of each creation-date window
    pub window_days: u32,

    /// Pause between page fetches
    #[serde(with = "humantime_serde")]
    pub page_delay: Duration,
}

impl SearchSettings {
    /// The search expression for repositories created in `first..=last`.
    #[must_use]
    pub fn expression(&self, first: NaiveDate, last: NaiveDate) -> String {
        format!(
            "language:{} stars:>{} created:{}..{}",
            self.language,
            self.min_stars,
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        )
    }
}

/// Totals for one crawl invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub windows: usize,
    pub pages: usize,
    pub repositories: usize,

    /// `false` when a window could not be fully paginated
    pub complete: bool,
}

/// Walk creation-date windows from the stored checkpoint up to the configured end date.
///
/// Every page is appended to the discovery log before the checkpoint advances past
/// it. When a window cannot be fully paginated the crawl stops there, leaving the
/// checkpoint pointing at the last good page so the next run resumes from it.
pub async fn crawl(
    client: &Client,
    settings: &SearchSettings,
    checkpoints: &mut CheckpointStore,
    discovery_log: &mut DiscoveryLog,
) -> Result<CrawlSummary> {
    let mut checkpoint = checkpoints.load(settings.start_date)?;
    let mut summary = CrawlSummary {
        complete: true,
        ..CrawlSummary::default()
    };

    while checkpoint.current_date < settings.end_date {
        let window_start = checkpoint.current_date;
        let next = window_start
            .checked_add_days(Days::new(u64::from(settings.window_days)))
            .ok_or_else(|| app_err!("date overflow after {window_start}"))?;
        let window_last = next
            .min(settings.end_date)
            .pred_opt()
            .ok_or_else(|| app_err!("date underflow before {next}"))?;

        let expression = settings.expression(window_start, window_last);
        log::info!(target: LOG_TARGET, "Searching '{expression}'");

        let outcome = search_repositories(
            client,
            &expression,
            checkpoint.end_cursor.clone(),
            settings.page_delay,
            |repos, cursor| {
                discovery_log.append(repos)?;
                checkpoints.save(&Checkpoint {
                    current_date: window_start,
                    end_cursor: cursor.map(str::to_string),
                })?;
                summary.pages += 1;
                summary.repositories += repos.len();
                Ok(())
            },
        )
        .await?;

        if !outcome.complete {
            log::warn!(
                target: LOG_TARGET,
                "Stopping crawl: window starting {window_start} was not fully paginated; rerun to resume"
            );
            summary.complete = false;
            return Ok(summary);
        }

        log::info!(
            target: LOG_TARGET,
            "Window {window_start}..{window_last}: {} repositories",
            outcome.repos.len()
        );

        summary.windows += 1;
        checkpoint = Checkpoint {
            current_date: next,
            end_cursor: None,
        };
        checkpoints.save(&checkpoint)?;
    }

    Ok(summary)
}
