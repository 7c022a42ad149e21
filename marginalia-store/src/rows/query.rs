// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{ObjectId, Origin, ScopedObject};

/// Which rows of a document are considered at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorpusScope {
    /// Rows belonging to exactly this corpus, plus structural rows without any corpus.
    Corpus(ObjectId),

    /// Only structural rows, regardless of their corpus.
    ///
    /// Requests without a corpus never see "all corpora the document belongs to".
    StructuralOnly,
}

/// Restriction on the analysis or extract owning a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerFilter {
    /// Rows not owned by an object of this kind.
    Absent,

    /// Rows owned by exactly this object.
    Is(ObjectId),
}

impl OwnerFilter {
    fn matches(&self, owner: Option<ObjectId>) -> bool {
        match self {
            OwnerFilter::Absent => owner.is_none(),
            OwnerFilter::Is(id) => owner == Some(*id),
        }
    }
}

/// Storage-level predicate over the scoped rows of one document.
///
/// All references in here were already resolved and checked by the caller, the store applies
/// the predicate verbatim and does not evaluate any permissions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowQuery {
    pub document_id: ObjectId,
    pub scope: CorpusScope,

    /// Only rows on one of these pages. Relationships match when any linked annotation does.
    pub pages: Option<Vec<u32>>,
    pub analysis: Option<OwnerFilter>,
    pub extract: Option<OwnerFilter>,
    pub structural: Option<bool>,
}

impl RowQuery {
    pub fn new(document_id: ObjectId, scope: CorpusScope) -> Self {
        Self {
            document_id,
            scope,
            pages: None,
            analysis: None,
            extract: None,
            structural: None,
        }
    }

    pub fn pages(mut self, pages: Vec<u32>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn analysis(mut self, filter: OwnerFilter) -> Self {
        self.analysis = Some(filter);
        self
    }

    pub fn extract(mut self, filter: OwnerFilter) -> Self {
        self.extract = Some(filter);
        self
    }

    pub fn structural(mut self, structural: bool) -> Self {
        self.structural = Some(structural);
        self
    }

    /// Returns `true` if the row passes all filters except the page filter.
    pub fn matches<T: ScopedObject>(&self, row: &T) -> bool {
        if row.document_id() != self.document_id {
            return false;
        }

        let in_scope = match self.scope {
            CorpusScope::Corpus(corpus_id) => {
                row.corpus_id() == Some(corpus_id)
                    || (row.structural() && row.corpus_id().is_none())
            }
            CorpusScope::StructuralOnly => row.structural(),
        };
        if !in_scope {
            return false;
        }

        if self
            .structural
            .is_some_and(|structural| row.structural() != structural)
        {
            return false;
        }

        let origin: Origin = row.origin();
        if self
            .analysis
            .is_some_and(|filter| !filter.matches(origin.analysis_id()))
        {
            return false;
        }
        if self
            .extract
            .is_some_and(|filter| !filter.matches(origin.extract_id()))
        {
            return false;
        }

        true
    }
}
