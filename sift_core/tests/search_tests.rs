use async_trait::async_trait;
use sift_core::model::{BioSequence, Experiment, Gene, GeneSet, Publication};
use sift_core::searchers::FROM_BIOMATERIAL;
use sift_core::model::EntityId;
use sift_core::sources::{Annotation, AnnotationOwner, Criteria, IndexHit, MatchField};
use sift_core::query::QueryExpr;
use sift_core::{
    Entity, EntityKind, EntityStore, FullTextIndex, MemoryCatalog, SearchConfig, SearchError, SearchService,
    SearchSettings, SourceError, Taxon,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BRAIN: &str = "http://purl.obolibrary.org/obo/UBERON_0000955";
const HIPPOCAMPUS: &str = "http://purl.obolibrary.org/obo/UBERON_0002421";

// ============================================================================
// Fixtures
// ============================================================================

fn human() -> Taxon {
    Taxon::new(1, "Homo sapiens").with_common_name("human")
}

fn mouse() -> Taxon {
    Taxon::new(2, "Mus musculus").with_common_name("mouse")
}

fn gene(id: u64, symbol: &str, ncbi_id: Option<u64>, taxon: Taxon) -> Entity {
    Entity::Gene(Gene {
        id,
        official_symbol: symbol.to_string(),
        official_name: String::new(),
        ncbi_id,
        ensembl_id: None,
        aliases: Vec::new(),
        products: Vec::new(),
        taxon: Some(taxon),
    })
}

fn experiment(id: u64, short_name: &str, name: &str, taxon: Taxon) -> Entity {
    Entity::Experiment(Experiment {
        id,
        short_name: short_name.to_string(),
        name: name.to_string(),
        accession: None,
        description: String::new(),
        platforms: Vec::new(),
        taxon: Some(taxon),
    })
}

fn annotation(id: u64, value: &str, uri: Option<&str>) -> Annotation {
    Annotation {
        id,
        category: None,
        value: value.to_string(),
        value_uri: uri.map(str::to_string),
    }
}

fn catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_taxon(human())
        .with_taxon(mouse())
        .with_entity(gene(1, "GRIN1", Some(2902), human()))
        .with_entity(gene(2, "Grin1", Some(14810), mouse()))
        .with_entity(experiment(20, "GSE20", "hippocampus study", mouse()))
        .with_entity(experiment(21, "GSE21", "hippocampus atlas", human()))
        .with_entity(experiment(30, "GSE30", "seizure cohort", mouse()))
        .with_entity(experiment(31, "GSE31", "cortex survey", mouse()))
        .with_entity(experiment(40, "GSE40", "knockout screen", mouse()))
        .with_entity(Entity::BioSequence(BioSequence {
            id: 7,
            name: "NM_008169".to_string(),
            accession: Some("NM_008169.3".to_string()),
            genes: vec![2],
            taxon: Some(mouse()),
        }))
        .with_entity(Entity::GeneSet(GeneSet {
            id: 60,
            name: "hippocampus markers".to_string(),
            description: String::new(),
            taxon: Some(mouse()),
        }))
        .with_entity(Entity::Publication(Publication {
            id: 50,
            title: "A hippocampus review".to_string(),
            pubmed_id: Some("123456".to_string()),
        }))
        .with_term(BRAIN, "brain", &[HIPPOCAMPUS])
        .with_term(HIPPOCAMPUS, "hippocampus", &[])
        .with_annotation(
            annotation(100, "hippocampus", Some(HIPPOCAMPUS)),
            AnnotationOwner::BioMaterial { id: 5, experiment: 20 },
        )
        .with_annotation(
            annotation(101, "brain", Some(BRAIN)),
            AnnotationOwner::Entity {
                kind: EntityKind::Experiment,
                id: 21,
            },
        )
        .with_annotation(
            annotation(200, "brain", Some(BRAIN)),
            AnnotationOwner::Entity {
                kind: EntityKind::Experiment,
                id: 30,
            },
        )
        .with_annotation(
            annotation(201, "brain", Some(BRAIN)),
            AnnotationOwner::Entity {
                kind: EntityKind::Experiment,
                id: 31,
            },
        )
        .with_annotation(
            annotation(202, "epilepsy", None),
            AnnotationOwner::FactorValue { id: 9, experiment: 30 },
        )
        .with_annotation(
            annotation(300, "NCBI gene 14810", Some("http://ncbi_gene/14810")),
            AnnotationOwner::Entity {
                kind: EntityKind::Experiment,
                id: 40,
            },
        )
}

/// Delegates to the catalog and records which kinds were searched.
struct CountingIndex {
    inner: Arc<MemoryCatalog>,
    calls: Mutex<HashMap<EntityKind, usize>>,
}

impl CountingIndex {
    fn new(inner: Arc<MemoryCatalog>) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn calls(&self, kind: EntityKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl FullTextIndex for CountingIndex {
    async fn search(&self, kind: EntityKind, query: &QueryExpr) -> Result<Vec<IndexHit>, SourceError> {
        *self.calls.lock().unwrap().entry(kind).or_default() += 1;
        self.inner.search(kind, query).await
    }
}

struct FailingIndex;

#[async_trait]
impl FullTextIndex for FailingIndex {
    async fn search(&self, _kind: EntityKind, _query: &QueryExpr) -> Result<Vec<IndexHit>, SourceError> {
        Err(SourceError::unavailable("index", "connection refused"))
    }
}

/// Delegates to the catalog, failing exact lookups or loads on request.
struct FlakyStore {
    inner: Arc<MemoryCatalog>,
    fail_exact: bool,
    fail_load: bool,
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn find_exact(&self, kind: EntityKind, criteria: &Criteria) -> Result<Vec<EntityId>, SourceError> {
        if self.fail_exact {
            return Err(SourceError::unavailable("store", "connection reset"));
        }
        self.inner.find_exact(kind, criteria).await
    }

    async fn find_inexact(
        &self,
        kind: EntityKind,
        field: MatchField,
        pattern: &str,
    ) -> Result<Vec<EntityId>, SourceError> {
        self.inner.find_inexact(kind, field, pattern).await
    }

    async fn load(&self, kind: EntityKind, ids: &[EntityId]) -> Result<Vec<Entity>, SourceError> {
        if self.fail_load {
            return Err(SourceError::unavailable("store", "connection reset"));
        }
        self.inner.load(kind, ids).await
    }

    async fn taxa(&self) -> Result<Vec<Taxon>, SourceError> {
        self.inner.taxa().await
    }

    async fn related(
        &self,
        from: EntityKind,
        ids: &[EntityId],
        to: EntityKind,
    ) -> Result<Vec<(EntityId, EntityId)>, SourceError> {
        self.inner.related(from, ids, to).await
    }
}

fn service_with_store(catalog: Arc<MemoryCatalog>, store: FlakyStore) -> SearchService {
    SearchService::new(
        Arc::new(store),
        catalog.clone(),
        catalog.clone(),
        catalog,
        SearchConfig::default(),
    )
}

/// Hangs on gene set queries, answers everything else from the catalog.
struct SlowIndex {
    inner: Arc<MemoryCatalog>,
}

#[async_trait]
impl FullTextIndex for SlowIndex {
    async fn search(&self, kind: EntityKind, query: &QueryExpr) -> Result<Vec<IndexHit>, SourceError> {
        if kind == EntityKind::GeneSet {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        self.inner.search(kind, query).await
    }
}

fn service_with_index(
    catalog: Arc<MemoryCatalog>,
    index: Arc<dyn FullTextIndex>,
    config: SearchConfig,
) -> SearchService {
    SearchService::new(catalog.clone(), index, catalog.clone(), catalog, config)
}

fn ids(results: &[sift_core::SearchResult]) -> Vec<u64> {
    results.iter().map(|r| r.id).collect()
}

// ============================================================================
// Gene search
// ============================================================================

#[tokio::test]
async fn test_gene_short_circuit_skips_index() {
    let catalog = Arc::new(catalog());
    let index = Arc::new(CountingIndex::new(catalog.clone()));
    let service = service_with_index(catalog, index.clone(), SearchConfig::default());

    let settings = SearchSettings::new("2902")
        .with_kinds([EntityKind::Gene])
        .with_return_on_db_hit(true);
    let response = service.search(&settings).await.unwrap();

    let genes = response.get(EntityKind::Gene);
    assert_eq!(ids(genes), vec![1]);
    assert_eq!(genes[0].score(), 1.0);
    assert_eq!(index.total(), 0);
}

#[tokio::test]
async fn test_gene_search_consults_index_by_default() {
    let catalog = Arc::new(catalog());
    let index = Arc::new(CountingIndex::new(catalog.clone()));
    let service = service_with_index(catalog, index.clone(), SearchConfig::default());

    let settings = SearchSettings::new("2902").with_kinds([EntityKind::Gene]);
    let response = service.search(&settings).await.unwrap();

    assert_eq!(ids(response.get(EntityKind::Gene)), vec![1]);
    assert_eq!(index.calls(EntityKind::Gene), 1);
}

#[tokio::test]
async fn test_symbol_match_is_case_insensitive_across_taxa() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("grin1").with_kinds([EntityKind::Gene]);
    let response = service.search(&settings).await.unwrap();

    assert_eq!(ids(response.get(EntityKind::Gene)), vec![1, 2]);
    assert!(response.get(EntityKind::Gene).iter().all(|r| r.entity.is_some()));
}

#[tokio::test]
async fn test_per_kind_cap_keeps_best_scores() {
    let mut catalog = MemoryCatalog::new();
    for id in 1..=50 {
        catalog.insert(gene(id, &format!("Kcna{id}"), None, mouse()));
    }
    let service = catalog.into_service(SearchConfig::default());

    let settings = SearchSettings::new("kcna")
        .with_kinds([EntityKind::Gene])
        .with_max_results(10);
    let response = service.search(&settings).await.unwrap();

    let genes = response.get(EntityKind::Gene);
    assert_eq!(genes.len(), 10);
    assert!(genes.windows(2).all(|w| w[0].score() >= w[1].score()));
    assert_eq!(ids(genes), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_bio_sequences_derive_from_genes() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("Grin1")
        .with_kinds([EntityKind::BioSequence])
        .with_taxon(mouse());
    let response = service.search(&settings).await.unwrap();

    let sequences = response.get(EntityKind::BioSequence);
    assert_eq!(ids(sequences), vec![7]);
    assert!((sequences[0].score() - 0.8).abs() < 1e-9);
    assert!(sequences[0].highlights["gene"].ends_with("(from associated Gene)"));
}

// ============================================================================
// Experiments
// ============================================================================

#[tokio::test]
async fn test_taxon_filter_keeps_matching_experiments() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("hippocampus")
        .with_kinds([EntityKind::Experiment])
        .with_taxon(mouse());
    let response = service.search(&settings).await.unwrap();

    assert_eq!(ids(response.get(EntityKind::Experiment)), vec![20]);
    assert_eq!(response.taxon, Some(mouse()));
}

#[tokio::test]
async fn test_taxon_inferred_from_query_words() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("hippocampus human").with_kinds([EntityKind::Experiment]);
    let response = service.search(&settings).await.unwrap();

    assert_eq!(response.taxon, Some(human()));
    assert_eq!(ids(response.get(EntityKind::Experiment)), vec![21]);
}

#[tokio::test]
async fn test_kinds_without_taxon_pass_unless_strict() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("hippocampus")
        .with_kinds([EntityKind::Experiment, EntityKind::Publication])
        .with_taxon(mouse());

    let lenient = service.search(&settings).await.unwrap();
    assert_eq!(ids(lenient.get(EntityKind::Publication)), vec![50]);

    let strict = service
        .search(&settings.clone().with_strict_taxon_filter(true))
        .await
        .unwrap();
    assert!(strict.get(EntityKind::Publication).is_empty());
    assert_eq!(ids(strict.get(EntityKind::Experiment)), vec![20]);
}

#[tokio::test]
async fn test_and_query_intersects_characteristics() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("brain AND epilepsy").with_kinds([EntityKind::Experiment]);
    let response = service.search(&settings).await.unwrap();

    let experiments = response.get(EntityKind::Experiment);
    assert_eq!(ids(experiments), vec![30]);
    assert!((experiments[0].score() - 0.8).abs() < 1e-9);
    assert_eq!(
        experiments[0].highlights["characteristic"],
        "brain, epilepsy (from associated FactorValue)"
    );
}

#[tokio::test]
async fn test_or_query_unions_characteristics() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("brain OR epilepsy")
        .with_kinds([EntityKind::Experiment])
        .with_sources(false, false, true);
    let response = service.search(&settings).await.unwrap();

    // 20 is annotated with hippocampus, a descendant of brain
    assert_eq!(ids(response.get(EntityKind::Experiment)), vec![21, 30, 31, 20]);
}

#[tokio::test]
async fn test_experiments_from_gene_annotations() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("Grin1")
        .with_kinds([EntityKind::Experiment])
        .with_taxon(mouse());
    let response = service.search(&settings).await.unwrap();

    let experiments = response.get(EntityKind::Experiment);
    assert_eq!(ids(experiments), vec![40]);
    assert!((experiments[0].score() - 0.8).abs() < 1e-9);
    assert_eq!(experiments[0].highlights["gene"], "Grin1 (from associated Gene)");
}

// ============================================================================
// URI resolution
// ============================================================================

#[tokio::test]
async fn test_uri_expands_descendants() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("")
        .with_term_uri(BRAIN)
        .with_kinds([EntityKind::Experiment]);
    let response = service.search(&settings).await.unwrap();

    let experiments = response.get(EntityKind::Experiment);
    assert_eq!(ids(experiments), vec![21, 30, 31, 20]);
    assert_eq!(experiments[0].score(), 1.0);
    let derived = &experiments[3];
    assert!((derived.score() - 0.72).abs() < 1e-9);
    assert!(derived.highlights["characteristic"].ends_with(FROM_BIOMATERIAL));
    assert!(service.cache().contains(BRAIN));
}

#[tokio::test]
async fn test_unknown_uri_matches_literal_annotations() {
    let uri = "http://purl.obolibrary.org/obo/MONDO_0005027";
    let catalog = catalog().with_annotation(
        annotation(400, "epilepsy", Some(uri)),
        AnnotationOwner::Entity {
            kind: EntityKind::Experiment,
            id: 31,
        },
    );
    let service = catalog.into_service(SearchConfig::default());
    let settings = SearchSettings::new(uri).with_kinds([EntityKind::Experiment]);
    let response = service.search(&settings).await.unwrap();

    let experiments = response.get(EntityKind::Experiment);
    assert_eq!(ids(experiments), vec![31]);
    assert_eq!(experiments[0].highlights["term"], "MONDO:0005027");
}

#[tokio::test]
async fn test_gene_identifier_uri_resolves_gene_and_annotations() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("http://ncbi_gene/14810")
        .with_kinds([EntityKind::Gene, EntityKind::Experiment]);
    let response = service.search(&settings).await.unwrap();

    assert_eq!(ids(response.get(EntityKind::Gene)), vec![2]);
    assert_eq!(ids(response.get(EntityKind::Experiment)), vec![40]);
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_failing_index_does_not_fail_search() {
    let catalog = Arc::new(catalog());
    let service = service_with_index(catalog, Arc::new(FailingIndex), SearchConfig::default());
    let settings = SearchSettings::new("hippocampus")
        .with_kinds([EntityKind::Experiment, EntityKind::GeneSet]);
    let response = service.search(&settings).await.unwrap();

    assert_eq!(ids(response.get(EntityKind::Experiment)), vec![20, 21]);
    assert_eq!(ids(response.get(EntityKind::GeneSet)), vec![60]);
    assert!(!response.timed_out);
}

#[tokio::test]
async fn test_failing_gene_lookup_keeps_index_hits() {
    let catalog = Arc::new(MemoryCatalog::new().with_taxon(human()).with_entity(Entity::Gene(Gene {
        id: 1,
        official_symbol: "GRIN1".to_string(),
        official_name: "glutamate receptor".to_string(),
        ncbi_id: Some(2902),
        ensembl_id: None,
        aliases: Vec::new(),
        products: Vec::new(),
        taxon: Some(human()),
    })));
    let store = FlakyStore {
        inner: catalog.clone(),
        fail_exact: true,
        fail_load: false,
    };
    let service = service_with_store(catalog, store);

    let settings = SearchSettings::new("glutamate").with_kinds([EntityKind::Gene]);
    let response = service.search(&settings).await.unwrap();

    assert_eq!(ids(response.get(EntityKind::Gene)), vec![1]);
}

#[tokio::test]
async fn test_failing_load_drops_unverifiable_taxon_results() {
    let catalog = Arc::new(catalog());
    let store = FlakyStore {
        inner: catalog.clone(),
        fail_exact: false,
        fail_load: true,
    };
    let service = service_with_store(catalog, store);

    let settings = SearchSettings::new("hippocampus")
        .with_kinds([EntityKind::Experiment, EntityKind::Publication])
        .with_taxon(mouse())
        .with_fill_results(false);
    let response = service.search(&settings).await.unwrap();

    assert!(response.get(EntityKind::Experiment).is_empty());
    assert_eq!(ids(response.get(EntityKind::Publication)), vec![50]);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_returns_partial_results() {
    let catalog = Arc::new(catalog());
    let index = Arc::new(SlowIndex {
        inner: catalog.clone(),
    });
    let config = SearchConfig {
        deadline_ms: 100,
        ..SearchConfig::default()
    };
    let service = service_with_index(catalog, index, config);
    let settings = SearchSettings::new("hippocampus")
        .with_kinds([EntityKind::Experiment, EntityKind::GeneSet]);
    let response = service.search(&settings).await.unwrap();

    assert!(response.timed_out);
    assert_eq!(ids(response.get(EntityKind::Experiment)), vec![20, 21]);
}

// ============================================================================
// Query handling
// ============================================================================

#[tokio::test]
async fn test_reserved_syntax_is_escaped() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("C++").with_kinds([EntityKind::Gene]);
    let response = service.search(&settings).await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_escaped_star_is_matched_literally() {
    let service = catalog().into_service(SearchConfig::default());

    let wildcard = SearchSettings::new("GRI*")
        .with_kinds([EntityKind::Gene])
        .with_sources(true, false, false);
    let response = service.search(&wildcard).await.unwrap();
    assert_eq!(ids(response.get(EntityKind::Gene)), vec![1, 2]);

    let literal = SearchSettings::new(r"GRI\*")
        .with_kinds([EntityKind::Gene])
        .with_sources(true, false, false);
    let response = service.search(&literal).await.unwrap();
    assert!(response.get(EntityKind::Gene).is_empty());
}

#[tokio::test]
async fn test_escaped_retry_does_not_reintroduce_wildcards() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("grin* (")
        .with_kinds([EntityKind::Gene])
        .with_sources(true, false, false);
    let response = service.search(&settings).await.unwrap();
    assert!(response.get(EntityKind::Gene).is_empty());
}

#[tokio::test]
async fn test_unparseable_query_is_an_error() {
    let service = catalog().into_service(SearchConfig::default());
    let err = service.search(&SearchSettings::new("AND")).await.unwrap_err();
    match err {
        SearchError::QueryParse { original, escaped, .. } => {
            assert_eq!(original, "AND");
            assert_eq!(escaped, "AND");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_blank_and_short_queries_are_empty() {
    let service = catalog().into_service(SearchConfig::default());
    assert!(service.search(&SearchSettings::new("   ")).await.unwrap().is_empty());
    assert!(service.search(&SearchSettings::new("a b")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_kinds_is_invalid() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("grin1").with_kinds(Vec::<EntityKind>::new());
    assert!(matches!(
        service.search(&settings).await,
        Err(SearchError::InvalidSettings(_))
    ));
}

// ============================================================================
// Projection
// ============================================================================

#[tokio::test]
async fn test_search_for_returns_ranked_entities() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("2902");
    let genes = service.search_for(&settings, EntityKind::Gene).await.unwrap();

    assert_eq!(genes.len(), 1);
    match &genes[0] {
        Entity::Gene(gene) => assert_eq!(gene.official_symbol, "GRIN1"),
        other => panic!("unexpected entity: {other:?}"),
    }
}

#[tokio::test]
async fn test_unfilled_results_carry_no_payload() {
    let service = catalog().into_service(SearchConfig::default());
    let settings = SearchSettings::new("hippocampus")
        .with_kinds([EntityKind::Experiment])
        .with_taxon(mouse())
        .with_fill_results(false);
    let response = service.search(&settings).await.unwrap();

    let experiments = response.get(EntityKind::Experiment);
    assert_eq!(ids(experiments), vec![20]);
    assert!(experiments[0].entity.is_none());
}

#[tokio::test]
async fn test_supported_kinds_is_complete() {
    let service = MemoryCatalog::new().into_service(SearchConfig::default());
    assert_eq!(service.supported_kinds().len(), EntityKind::ALL.len());
}
