//! Resolution of one query into an accumulator.
//!
//! Independent retrieval steps run concurrently and accrete into a shared
//! [`ResultAccumulator`] as soon as each one finishes, so a deadline that
//! cancels the remaining steps still leaves every completed step's results
//! behind.

use crate::accumulator::ResultAccumulator;
use crate::error::SourceError;
use crate::model::{EntityKind, ResultSource, SearchResult, SearchSettings};
use crate::ontology::label_from_uri;
use crate::query::QueryExpr;
use crate::searchers::{soften, SearchContext, NCBI_GENE_URI_PREFIX};
use crate::sources::{Criteria, MatchField};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use tracing::debug;

/// Kinds searched by the database and index alone.
const SIMPLE_KINDS: [EntityKind; 4] = [
    EntityKind::GeneSet,
    EntityKind::ExperimentSet,
    EntityKind::Publication,
    EntityKind::Phenotype,
];

pub(crate) struct Resolution<'a> {
    ctx: &'a SearchContext,
    settings: &'a SearchSettings,
    acc: &'a ResultAccumulator,
}

impl<'a> Resolution<'a> {
    pub(crate) fn new(
        ctx: &'a SearchContext,
        settings: &'a SearchSettings,
        acc: &'a ResultAccumulator,
    ) -> Self {
        Self { ctx, settings, acc }
    }

    // ========================================================================
    // Free text
    // ========================================================================

    /// Resolves a parsed free-text query.
    ///
    /// Genes are searched with the unstripped `expr`; every other step uses
    /// `stripped`, which has single-character terms removed.
    pub(crate) async fn free_text(&self, expr: &QueryExpr, stripped: &QueryExpr) {
        let wants_genes = [EntityKind::Gene, EntityKind::BioSequence, EntityKind::Experiment]
            .into_iter()
            .any(|kind| self.settings.includes(kind));

        let genes = if wants_genes {
            self.step("gene", self.ctx.gene().search(self.settings, expr))
                .await
        } else {
            Vec::new()
        };
        if self.settings.includes(EntityKind::Gene) {
            self.acc.extend(genes.iter().cloned());
        }

        let mut steps: Vec<BoxFuture<'_, ()>> = Vec::new();
        if self.settings.includes(EntityKind::Experiment) {
            steps.push(self.experiments(stripped, &genes).boxed());
        }
        if self.settings.includes(EntityKind::Probe) || self.settings.includes(EntityKind::Platform) {
            steps.push(self.probes_and_platforms(stripped).boxed());
        }
        if self.settings.includes(EntityKind::BioSequence) {
            steps.push(self.bio_sequences(stripped, &genes).boxed());
        }
        for kind in SIMPLE_KINDS {
            if self.settings.includes(kind) {
                steps.push(self.direct(kind, stripped).boxed());
            }
        }
        if self.settings.use_characteristics {
            let kinds: BTreeSet<EntityKind> = self
                .settings
                .kinds
                .iter()
                .copied()
                .filter(|kind| *kind != EntityKind::Experiment)
                .collect();
            if !kinds.is_empty() {
                steps.push(self.characteristics(kinds, stripped).boxed());
            }
        }
        if self.settings.use_go && self.settings.includes(EntityKind::Gene) {
            steps.push(self.go_genes(stripped).boxed());
        }

        debug!(target: "sift::service", steps = steps.len(), "Running retrieval steps");
        join_all(steps).await;
    }

    /// Experiment chain; stops at the first database hit.
    async fn experiments(&self, expr: &QueryExpr, genes: &[SearchResult]) {
        let kind = EntityKind::Experiment;

        if self.settings.use_database {
            let hits = self
                .step("experiment database", self.ctx.database().search(kind, expr))
                .await;
            if self.accrete(hits) > 0 {
                return;
            }
        }

        if self.settings.use_database && !genes.is_empty() {
            let derived = self
                .step(
                    "experiments from genes",
                    self.ctx.derived().experiments_from_genes(genes),
                )
                .await;
            self.accrete(derived);
        }

        if self.settings.use_characteristics {
            let kinds = BTreeSet::from([kind]);
            let hits = self
                .step(
                    "experiment characteristics",
                    self.ctx.characteristic().search(&kinds, expr),
                )
                .await;
            self.accrete(hits);
        }

        if self.settings.use_index && !self.settings.is_saturated(self.acc.count(kind)) {
            let hits = self
                .step("experiment index", self.ctx.index().search(kind, expr))
                .await;
            self.accrete(hits);
        }

        if self.acc.count(kind) == 0 && self.settings.use_database {
            let platforms = self
                .step(
                    "platforms for experiments",
                    self.ctx.database().search(EntityKind::Platform, expr),
                )
                .await;
            if !platforms.is_empty() {
                let derived = self
                    .step(
                        "experiments from platforms",
                        self.ctx.derived().experiments_from_platforms(&platforms),
                    )
                    .await;
                self.accrete(derived);
            }
        }
    }

    async fn probes_and_platforms(&self, expr: &QueryExpr) {
        let probes = if self.settings.use_database {
            self.step(
                "probe database",
                self.ctx.database().search(EntityKind::Probe, expr),
            )
            .await
        } else {
            Vec::new()
        };

        if self.settings.includes(EntityKind::Probe) {
            self.accrete(probes.clone());
            if self.settings.use_index {
                let hits = self
                    .step(
                        "probe index",
                        self.ctx.index().search(EntityKind::Probe, expr),
                    )
                    .await;
                self.accrete(hits);
            }
        }

        if !self.settings.includes(EntityKind::Platform) {
            return;
        }
        if self.settings.use_database {
            let hits = self
                .step(
                    "platform database",
                    self.ctx.database().search(EntityKind::Platform, expr),
                )
                .await;
            if self.accrete(hits) > 0 {
                return;
            }
        }
        if self.settings.use_index {
            let hits = self
                .step(
                    "platform index",
                    self.ctx.index().search(EntityKind::Platform, expr),
                )
                .await;
            self.accrete(hits);
        }
        if !probes.is_empty() {
            let derived = self
                .step(
                    "platforms from probes",
                    self.ctx.derived().follow(&probes, EntityKind::Platform),
                )
                .await;
            self.accrete(derived);
        }
    }

    /// Direct sequence matches plus sequences of the genes already found.
    async fn bio_sequences(&self, expr: &QueryExpr, genes: &[SearchResult]) {
        self.direct(EntityKind::BioSequence, expr).await;
        if !genes.is_empty() {
            let derived = self
                .step(
                    "sequences from genes",
                    self.ctx.derived().follow(genes, EntityKind::BioSequence),
                )
                .await;
            self.accrete(derived);
        }
    }

    /// Database and index lookups for one kind.
    async fn direct(&self, kind: EntityKind, expr: &QueryExpr) {
        if self.settings.use_database {
            let hits = self.step("database", self.ctx.database().search(kind, expr)).await;
            self.accrete(hits);
        }
        if self.settings.use_index {
            let hits = self.step("index", self.ctx.index().search(kind, expr)).await;
            self.accrete(hits);
        }
    }

    async fn characteristics(&self, kinds: BTreeSet<EntityKind>, expr: &QueryExpr) {
        let hits = self
            .step("characteristics", self.ctx.characteristic().search(&kinds, expr))
            .await;
        self.accrete(hits);
    }

    async fn go_genes(&self, expr: &QueryExpr) {
        let Some(text) = crate::query::rewrite_for_exact_match(expr, false) else {
            return;
        };
        let hits = self
            .step("gene ontology", self.ctx.characteristic().genes_by_go_terms(&text))
            .await;
        self.accrete(hits);
    }

    // ========================================================================
    // URI
    // ========================================================================

    /// Resolves an ontology term URI.
    pub(crate) async fn uri(&self, uri: &str) {
        if uri.contains("ncbi_gene") {
            self.gene_uri(uri).await;
            return;
        }
        if !self.settings.use_characteristics {
            debug!(target: "sift::service", uri, "Characteristic search disabled, nothing to resolve");
            return;
        }

        let resolved = soften(
            self.ctx.expander.provider().resolve_by_uri(uri).await,
            "resolve_by_uri",
        );
        match resolved {
            Some(term) => {
                let uris = self.ctx.expander.closure_uris(std::slice::from_ref(&term)).await;
                debug!(target: "sift::service", uri, closure = uris.len(), "Resolved term");
                let direct: HashSet<String> = term.uri().map(str::to_string).into_iter().collect();
                let hits = self
                    .step(
                        "annotated with closure",
                        self.ctx
                            .characteristic()
                            .annotated_with(&self.settings.kinds, &uris, &direct),
                    )
                    .await;
                self.accrete(hits);
            }
            None => {
                debug!(target: "sift::service", uri, "Term not in any ontology, matching literal URI");
                let uris = vec![uri.to_string()];
                let direct: HashSet<String> = uris.iter().cloned().collect();
                let label = label_from_uri(uri);
                let hits = self
                    .step(
                        "annotated with uri",
                        self.ctx
                            .characteristic()
                            .annotated_with(&self.settings.kinds, &uris, &direct),
                    )
                    .await;
                self.accrete(
                    hits.into_iter()
                        .map(|r| r.with_highlight("term", label.clone())),
                );
            }
        }
    }

    /// A gene identifier URI resolves to the gene itself and to entities
    /// annotated with it.
    async fn gene_uri(&self, uri: &str) {
        let ncbi_id = uri
            .strip_prefix(NCBI_GENE_URI_PREFIX)
            .unwrap_or(uri)
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .trim();

        if self.settings.includes(EntityKind::Gene) && self.settings.use_database && !ncbi_id.is_empty()
        {
            let ids = self
                .step(
                    "gene by ncbi id",
                    self.ctx
                        .store
                        .find_exact(EntityKind::Gene, &Criteria::new(MatchField::NcbiId, ncbi_id)),
                )
                .await;
            self.accrete(ids.into_iter().map(|id| {
                SearchResult::new(EntityKind::Gene, id, 1.0, ResultSource::Database)
                    .with_highlight(MatchField::NcbiId.as_str(), ncbi_id)
            }));
        }

        if self.settings.use_characteristics {
            let uris = vec![uri.to_string()];
            let direct: HashSet<String> = uris.iter().cloned().collect();
            let hits = self
                .step(
                    "annotated with gene",
                    self.ctx
                        .characteristic()
                        .annotated_with(&self.settings.kinds, &uris, &direct),
                )
                .await;
            self.accrete(hits);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Awaits one retrieval step; a failed step logs and yields nothing.
    async fn step<T, F>(&self, name: &str, fut: F) -> Vec<T>
    where
        F: Future<Output = Result<Vec<T>, SourceError>>,
    {
        soften(fut.await, name)
    }

    fn accrete(&self, results: impl IntoIterator<Item = SearchResult>) -> usize {
        let mut seen = 0;
        for result in results {
            self.acc.add(result);
            seen += 1;
        }
        seen
    }
}
