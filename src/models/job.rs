use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Canonical normalised job listing. Every source adapter converts vendor
/// payloads into this shape before anything else touches them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: String,
    /// One of "Remote", "On-site", "Hybrid", "Unknown".
    pub remote: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub job_type: String,
    pub experience_level: String,
    /// ISO date string when the provider supplies one, else empty.
    pub date_posted: String,
    pub tags: String,
    pub company_logo: String,
    /// UTC timestamp set once at record creation; never mutated.
    pub date_scraped: String,
}

/// Ordered column list for CSV export. The order is a contract: tests lock it.
pub const CSV_COLUMNS: [&str; 17] = [
    "job_id",
    "title",
    "company",
    "location",
    "description",
    "url",
    "source",
    "remote",
    "salary_min",
    "salary_max",
    "salary_currency",
    "job_type",
    "experience_level",
    "date_posted",
    "date_scraped",
    "tags",
    "company_logo",
];

impl Job {
    /// Finalise a freshly-built record: stamp `date_scraped`, derive the
    /// deterministic `job_id` when unset, and trim the description.
    pub fn finalize(mut self) -> Self {
        if self.date_scraped.is_empty() {
            self.date_scraped = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        }
        if self.job_id.is_empty() {
            self.job_id = self.derive_id();
        }
        if !self.description.is_empty() {
            self.description = self.description.trim().to_string();
        }
        if self.remote.is_empty() {
            self.remote = "Unknown".to_string();
        }
        self
    }

    /// Stable content hash: `source|url`, falling back to
    /// `source|title|company` when the listing has no URL. Dedup across
    /// reruns relies on this being deterministic.
    fn derive_id(&self) -> String {
        let raw = if !self.url.is_empty() {
            format!("{}|{}", self.source, self.url)
        } else {
            format!("{}|{}|{}", self.source, self.title, self.company)
        };
        format!("{:x}", md5::compute(raw.as_bytes()))
    }

    pub fn csv_record(&self) -> [String; 17] {
        [
            self.job_id.clone(),
            self.title.clone(),
            self.company.clone(),
            self.location.clone(),
            self.description.clone(),
            self.url.clone(),
            self.source.clone(),
            self.remote.clone(),
            self.salary_min.map(|v| v.to_string()).unwrap_or_default(),
            self.salary_max.map(|v| v.to_string()).unwrap_or_default(),
            self.salary_currency.clone(),
            self.job_type.clone(),
            self.experience_level.clone(),
            self.date_posted.clone(),
            self.date_scraped.clone(),
            self.tags.clone(),
            self.company_logo.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(source: &str, url: &str, title: &str, company: &str) -> Job {
        Job {
            title: title.to_string(),
            company: company.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            ..Default::default()
        }
        .finalize()
    }

    #[test]
    fn same_source_and_url_give_same_id() {
        let a = job("RemoteOK", "https://x/y", "Data Analyst", "Acme");
        let b = job("RemoteOK", "https://x/y", "Completely Different", "Other");
        assert_eq!(a.job_id, b.job_id);
    }

    #[test]
    fn different_sources_give_different_ids() {
        let a = job("RemoteOK", "https://x/y", "Data Analyst", "Acme");
        let b = job("Remotive", "https://x/y", "Data Analyst", "Acme");
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn missing_url_falls_back_to_title_and_company() {
        let a = job("Lobsters", "", "Data Analyst", "Acme");
        let b = job("Lobsters", "", "Data Analyst", "Acme");
        let c = job("Lobsters", "", "Data Analyst", "Globex");
        assert_eq!(a.job_id, b.job_id);
        assert_ne!(a.job_id, c.job_id);
    }

    #[test]
    fn finalize_trims_description_and_defaults_remote() {
        let j = Job {
            title: "t".into(),
            source: "s".into(),
            description: "  body \n".into(),
            ..Default::default()
        }
        .finalize();
        assert_eq!(j.description, "body");
        assert_eq!(j.remote, "Unknown");
        assert!(!j.date_scraped.is_empty());
    }

    #[test]
    fn preset_id_is_kept() {
        let j = Job {
            job_id: "abc123".into(),
            title: "t".into(),
            source: "s".into(),
            ..Default::default()
        }
        .finalize();
        assert_eq!(j.job_id, "abc123");
    }

    #[test]
    fn csv_column_order_is_locked() {
        assert_eq!(
            CSV_COLUMNS,
            [
                "job_id",
                "title",
                "company",
                "location",
                "description",
                "url",
                "source",
                "remote",
                "salary_min",
                "salary_max",
                "salary_currency",
                "job_type",
                "experience_level",
                "date_posted",
                "date_scraped",
                "tags",
                "company_logo",
            ]
        );
        let j = job("RemoteOK", "https://x/y", "Data Analyst", "Acme");
        assert_eq!(j.csv_record().len(), CSV_COLUMNS.len());
    }
}
