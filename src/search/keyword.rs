//! BM25 keyword ranking over an in-memory tantivy index.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, STORED, STRING, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, doc};
use tracing::debug;

use crate::error::Result;
use crate::search::hybrid::RankedResult;

const WRITER_HEAP_BYTES: usize = 15_000_000;

/// One document to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDoc {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl KeywordDoc {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: None,
        }
    }
}

/// Read-only keyword index, rebuilt per corpus snapshot.
pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    f_id: Field,
    f_text: Field,
    created: HashMap<String, DateTime<Utc>>,
}

impl KeywordIndex {
    /// Index every document in `docs`.
    pub fn build(docs: &[KeywordDoc]) -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let f_id = schema_builder.add_text_field("id", STRING | STORED);
        let f_text = schema_builder.add_text_field("text", TEXT);
        let index = Index::create_in_ram(schema_builder.build());

        let mut writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
        let mut created = HashMap::new();
        for item in docs {
            writer.add_document(doc!(
                f_id => item.id.clone(),
                f_text => item.text.clone(),
            ))?;
            if let Some(created_at) = item.created_at {
                created.insert(item.id.clone(), created_at);
            }
        }
        writer.commit()?;

        let reader = index.reader()?;
        debug!(docs = docs.len(), "built keyword index");
        Ok(Self {
            index,
            reader,
            f_id,
            f_text,
            created,
        })
    }

    /// BM25-ranked hits for `query`, best first, ranks 1-based.
    ///
    /// Malformed query syntax is parsed leniently rather than rejected.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<RankedResult>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parser = QueryParser::for_index(&self.index, vec![self.f_text]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!(query, errors = errors.len(), "lenient keyword query parse");
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let stored: TantivyDocument = searcher.doc(address)?;
            let Some(id) = stored.get_first(self.f_id).and_then(|v| v.as_str()) else {
                continue;
            };
            hits.push(RankedResult {
                rank: hits.len() + 1,
                created_at: self.created.get(id).copied(),
                ..RankedResult::new(id, f64::from(score))
            });
        }
        Ok(hits)
    }
}
