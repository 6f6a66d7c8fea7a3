//! Looking up individual indexed chunks by id.
//!
//! Chunk ids produced by the indexer embed the URL-safe base64 encoding of
//! the source document's URL, which is decoded here to help find a chunk
//! when the id fields themselves are not filterable.

use crate::retrieval::{RetrievedDocument, SearchBackend, SearchRequest};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;

/// Id segments shorter than this are never treated as encoded URLs.
const MIN_ENCODED_LEN: usize = 21;

const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Find and decode the source URL embedded in a chunk id.
pub fn decode_source_url(id: &str) -> Option<String> {
    id.split('_')
        .filter(|part| part.len() >= MIN_ENCODED_LEN)
        .find_map(|part| {
            let mut padded = part.to_string();
            let rem = padded.len() % 4;
            if rem > 0 {
                padded.push_str(&"=".repeat(4 - rem));
            }

            let bytes = LENIENT_URL_SAFE.decode(padded.as_bytes()).ok()?;
            let decoded = String::from_utf8(bytes).ok()?;
            decoded
                .contains("http")
                .then(|| decoded.trim_end_matches(char::is_control).to_string())
        })
}

/// File name at the end of a source URL, without a `;n` suffix.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let last = url.rsplit('/').next()?;
    let name = last.split(';').next()?;
    (!name.is_empty()).then_some(name)
}

/// How a chunk was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStrategy {
    ChunkIdFilter,
    IdFilter,
    FileNameSearch(String),
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStrategy::ChunkIdFilter => write!(f, "filter 'chunk_id'"),
            LookupStrategy::IdFilter => write!(f, "filter 'id'"),
            LookupStrategy::FileNameSearch(name) => {
                write!(f, "file name search for '{}' (approximation)", name)
            }
        }
    }
}

/// A chunk and the strategy that found it.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub strategy: LookupStrategy,
    pub document: RetrievedDocument,
}

/// Escape a value for use inside an OData string literal.
fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Try each lookup strategy in turn; the first hit wins.
pub async fn find_document<S: SearchBackend>(backend: &S, id: &str) -> Option<Lookup> {
    let mut attempts = vec![
        (
            LookupStrategy::ChunkIdFilter,
            SearchRequest::text("*", 1).with_filter(format!("chunk_id eq {}", odata_literal(id))),
        ),
        (
            LookupStrategy::IdFilter,
            SearchRequest::text("*", 1).with_filter(format!("id eq {}", odata_literal(id))),
        ),
    ];

    if let Some(name) = decode_source_url(id)
        .as_deref()
        .and_then(file_name_from_url)
        .map(str::to_string)
    {
        attempts.push((
            LookupStrategy::FileNameSearch(name.clone()),
            SearchRequest::text(name, 1),
        ));
    }

    for (strategy, request) in attempts {
        match backend.search(&request).await {
            Ok(hits) => {
                if let Some(fields) = hits.into_iter().next() {
                    return Some(Lookup {
                        strategy,
                        document: RetrievedDocument::from_fields(fields),
                    });
                }
                log::debug!("No match via {}", strategy);
            }
            Err(e) => log::debug!("Lookup via {} failed: {}", strategy, e),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvalError, Result};
    use serde_json::{Map, Value, json};
    use std::cell::RefCell;

    const RBS_ID: &str = "42a2af166b30_aHR0cHM6Ly9zdHpwejV4dmcyZWxzdmUuYmxvYi5jb3JlLndpbmRvd3MubmV0L2RvY3MvT2ZmaWNlRG9jcy1TaGFyZVBvaW50LXByL1NoYXJlUG9pbnQvU2hhcmVQb2ludFNlcnZlci9hZG1pbmlzdHJhdGlvbi9yYnMtcGxhbm5pbmcubWQ7MTA1_pages_0";

    const RANKING_ID: &str = "f5e06cdd18ba_aHR0cHM6Ly9zdHpwejV4dmcyZWxzdmUuYmxvYi5jb3JlLndpbmRvd3MubmV0L2RvY3MvT2ZmaWNlRG9jcy1TaGFyZVBvaW50LXByL1NoYXJlUG9pbnQvU2hhcmVQb2ludFNlcnZlci9zZWFyY2gvY2hhbmdpbmctdGhlLXJhbmtpbmctb2Ytc2VhcmNoLXJlc3VsdHMubWQ7NA2_pages_0";

    #[test]
    fn test_decode_source_url() {
        assert_eq!(
            decode_source_url(RBS_ID).as_deref(),
            Some("https://stzpz5xvg2elsve.blob.core.windows.net/docs/OfficeDocs-SharePoint-pr/SharePoint/SharePointServer/administration/rbs-planning.md;105")
        );
    }

    #[test]
    fn test_decode_source_url_unpadded() {
        let url = decode_source_url(RANKING_ID).unwrap();
        assert!(url.ends_with("/search/changing-the-ranking-of-search-results.md;4"));
    }

    #[test]
    fn test_decode_source_url_without_encoded_part() {
        assert_eq!(decode_source_url("abc_pages_0"), None);
        assert_eq!(decode_source_url("aaaaaaaaaaaaaaaaaaaaaaaaaaaa"), None);
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://x/docs/a/rbs-planning.md;105"),
            Some("rbs-planning.md")
        );
        assert_eq!(file_name_from_url("https://x/docs/"), None);
    }

    #[test]
    fn test_odata_literal_escapes_quotes() {
        assert_eq!(odata_literal("o'brien"), "'o''brien'");
    }

    /// Backend that only answers requests matching a filter or text.
    struct FilterBackend {
        answer_filter: Option<String>,
        answer_text: Option<String>,
        fail_filters: bool,
        seen: RefCell<Vec<SearchRequest>>,
    }

    impl SearchBackend for FilterBackend {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<Map<String, Value>>> {
            self.seen.borrow_mut().push(request.clone());
            let doc = json!({"content": "found", "title": "T"})
                .as_object()
                .cloned()
                .unwrap_or_default();

            if let Some(filter) = &request.filter {
                if self.fail_filters {
                    return Err(EvalError::Search("field is not filterable".to_string()));
                }
                if self.answer_filter.as_deref().is_some_and(|f| filter.starts_with(f)) {
                    return Ok(vec![doc]);
                }
            } else if self.answer_text.as_deref() == Some(request.search.as_str()) {
                return Ok(vec![doc]);
            }
            Ok(vec![])
        }
    }

    #[test]
    fn test_find_document_via_id_filter() {
        let backend = FilterBackend {
            answer_filter: Some("id eq".to_string()),
            answer_text: None,
            fail_filters: false,
            seen: RefCell::new(Vec::new()),
        };

        let lookup = tokio_test::block_on(find_document(&backend, RBS_ID)).unwrap();
        assert_eq!(lookup.strategy, LookupStrategy::IdFilter);
        assert_eq!(lookup.document.content, "found");
        assert_eq!(backend.seen.borrow().len(), 2);
    }

    #[test]
    fn test_find_document_falls_back_to_file_name() {
        let backend = FilterBackend {
            answer_filter: None,
            answer_text: Some("rbs-planning.md".to_string()),
            fail_filters: true,
            seen: RefCell::new(Vec::new()),
        };

        let lookup = tokio_test::block_on(find_document(&backend, RBS_ID)).unwrap();
        assert_eq!(
            lookup.strategy,
            LookupStrategy::FileNameSearch("rbs-planning.md".to_string())
        );
    }

    #[test]
    fn test_find_document_not_found() {
        let backend = FilterBackend {
            answer_filter: None,
            answer_text: None,
            fail_filters: false,
            seen: RefCell::new(Vec::new()),
        };

        assert!(tokio_test::block_on(find_document(&backend, "plain-id")).is_none());
        assert_eq!(backend.seen.borrow().len(), 2);
    }
}
