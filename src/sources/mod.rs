//! Job source adapters - one module per external API, feed, or scraper.

pub mod base;
pub mod feed;

pub mod adzuna;
pub mod arbeitnow;
pub mod ashby;
pub mod careerjet;
pub mod devitjobs;
pub mod findwork;
pub mod govuk_findajob;
pub mod greenhouse;
pub mod hn_hiring;
pub mod jobdata;
pub mod jobicy;
pub mod jobscollider;
pub mod jobspy;
pub mod jooble;
pub mod lever;
pub mod linkedin_direct;
pub mod lobsters;
pub mod remote_co;
pub mod remoteok;
pub mod remotive;
pub mod reed;
pub mod serpapi_google;
pub mod themuse;
pub mod totaljobs;
pub mod usajobs;
pub mod weworkremotely;
pub mod workable;
pub mod workingnomads;

use std::sync::Arc;

use crate::config::AppSettings;

pub use base::{BatchSink, JobSource, NoopSink, SearchQuery};

/// Registry of every source in presentation order. Sources with API key
/// requirements are included but gracefully skip when keys are missing.
pub fn registry(settings: &AppSettings) -> Vec<Arc<dyn JobSource>> {
    vec![
        // Free, no key needed
        Arc::new(remoteok::RemoteOkSource::new(settings)),
        Arc::new(arbeitnow::ArbeitnowSource::new(settings)),
        Arc::new(themuse::TheMuseSource::new(settings)),
        Arc::new(jobicy::JobicySource::new(settings)),
        Arc::new(remotive::RemotiveSource::new(settings)),
        Arc::new(weworkremotely::WeWorkRemotelySource::new(settings)),
        Arc::new(workingnomads::WorkingNomadsSource::new(settings)),
        Arc::new(lobsters::LobstersSource::new(settings)),
        Arc::new(greenhouse::GreenhouseSource::new(settings)),
        Arc::new(lever::LeverSource::new(settings)),
        Arc::new(ashby::AshbySource::new(settings)),
        Arc::new(workable::WorkableSource::new(settings)),
        Arc::new(jobscollider::JobsColliderSource::new(settings)),
        Arc::new(devitjobs::DevItJobsSource::new(settings)),
        Arc::new(hn_hiring::HackerNewsHiringSource::new(settings)),
        Arc::new(totaljobs::TotaljobsSource::new(settings)),
        Arc::new(remote_co::RemoteCoSource::new(settings)),
        Arc::new(govuk_findajob::GovUkFindAJobSource::new(settings)),
        // Scrapers, no key needed
        Arc::new(jobspy::JobSpySource::new(settings)),
        Arc::new(jobspy::JobSpySource::linkedin_only(settings)),
        Arc::new(linkedin_direct::LinkedInDirectSource::new(settings)),
        // Free API key required
        Arc::new(adzuna::AdzunaSource::new(settings)),
        Arc::new(reed::ReedSource::new(settings)),
        Arc::new(usajobs::UsaJobsSource::new(settings)),
        Arc::new(jooble::JoobleSource::new(settings)),
        Arc::new(serpapi_google::SerpApiGoogleJobsSource::new(settings)),
        Arc::new(findwork::FindworkSource::new(settings)),
        Arc::new(careerjet::CareerJetSource::new(settings)),
        Arc::new(jobdata::JobDataSource::new(settings)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_unique_names() {
        let settings = AppSettings::from_env().unwrap();
        let sources = registry(&settings);
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(names.len(), unique.len());
        assert!(names.contains(&"JobSpy"));
        assert!(names.contains(&"LinkedIn"));
        assert!(names.contains(&"LinkedIn (Direct)"));
    }
}
