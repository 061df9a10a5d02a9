//! Access-log line classification
//!
//! A line is reduced to at most one event: the calendar day of its timestamp
//! and the raw identifier of the catalog page it hit.

use crate::config::PipelineConfig;
use crate::core::{ClassifiedEvent, EntityType};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

/// Layout of the bracketed access-log timestamp, e.g. `[01/Mar/2024:00:00:01.123456]`
pub const TIMESTAMP_FORMAT: &str = "[%d/%b/%Y:%H:%M:%S%.f]";

const STATIC_RESOURCE_PATTERN: &str = "/resources/";

#[derive(Error, Debug)]
pub enum ClassifyError {
    /// A token shaped like a timestamp could not be parsed
    #[error("Invalid timestamp token '{token}': {source}")]
    Timestamp {
        token: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A pattern could not be compiled from the configured languages
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Classifies access-log lines into catalog entity hits.
///
/// Tokens are tested against the pattern groups in a fixed precedence:
/// resource by id, dataset slug, reuse slug, organization slug, static
/// resource URL. The first group matching a token decides for that token,
/// and the last matching token of the line decides for the line.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    marker: String,
    prefix_groups: Vec<(EntityType, Regex)>,
    static_host: String,
}

impl LineClassifier {
    pub fn new(marker: &str, languages: &[String], static_host: &str) -> Result<Self, ClassifyError> {
        let langs = languages.iter().map(|l| regex::escape(l)).collect::<Vec<_>>().join("|");
        let group = |path: &str| Regex::new(&format!("/(?:{})/{}/", langs, path));

        // Order matters: `/datasets/r/` must be tried before `/datasets/`.
        let prefix_groups = vec![
            (EntityType::ResourceById, group("datasets/r")?),
            (EntityType::DatasetSlug, group("datasets")?),
            (EntityType::ReuseSlug, group("reuses")?),
            (EntityType::OrganizationSlug, group("organizations")?),
        ];

        Ok(Self {
            marker: marker.to_string(),
            prefix_groups,
            static_host: static_host.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ClassifyError> {
        Self::new(&config.marker, &config.languages, &config.static_host)
    }

    /// Classify one decoded log line.
    ///
    /// Returns `Ok(None)` for lines without the access marker, without a
    /// timestamp or without any entity reference.
    pub fn classify(&self, line: &str) -> Result<Option<ClassifiedEvent>, ClassifyError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        if !tokens.iter().any(|t| *t == self.marker) {
            return Ok(None);
        }

        let mut date: Option<NaiveDate> = None;
        let mut found: Option<(EntityType, String)> = None;

        for token in tokens {
            if let Some(day) = parse_timestamp(token)? {
                date = Some(day);
            }
            // Later matches overwrite earlier ones.
            if let Some(hit) = self.match_token(token) {
                found = Some(hit);
            }
        }

        Ok(match (date, found) {
            (Some(date), Some((entity_type, raw_identifier))) => {
                Some(ClassifiedEvent { date, entity_type, raw_identifier })
            }
            _ => None,
        })
    }

    /// Test a single token against the pattern groups in precedence order.
    fn match_token(&self, token: &str) -> Option<(EntityType, String)> {
        for (entity_type, pattern) in &self.prefix_groups {
            if let Some(m) = pattern.find(token) {
                let identifier: String = token[m.end()..]
                    .split('/')
                    .next()
                    .unwrap_or_default()
                    .replace(';', "");
                // An empty slug (a listing page) still stops the lower groups.
                return (!identifier.is_empty()).then_some((*entity_type, identifier));
            }
        }

        if token.contains(STATIC_RESOURCE_PATTERN) {
            let url = format!("{}{}", self.static_host, token).replace(';', "");
            return Some((EntityType::ResourceStaticUrl, url));
        }

        None
    }
}

/// Parse a bracketed timestamp token down to its calendar day.
///
/// Tokens that do not have the timestamp shape yield `Ok(None)`; tokens that
/// have the shape but not a valid date are an error.
pub fn parse_timestamp(token: &str) -> Result<Option<NaiveDate>, ClassifyError> {
    let shaped = token.len() > 2
        && token.starts_with('[')
        && token.ends_with(']')
        && token.split('/').count() == 3
        && token.split(':').count() == 4;
    if !shaped {
        return Ok(None);
    }

    NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT)
        .map(|ts| Some(ts.date()))
        .map_err(|source| ClassifyError::Timestamp { token: token.to_string(), source })
}
