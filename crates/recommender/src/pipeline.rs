use crate::artifacts::ArtifactPaths;
use crate::catalog::ToolCatalog;
use crate::config::{BaseConfig, ConfigResolver, DataConfig, LoaderConfig, RecommendationSettings};
use crate::errors::Result;
use crate::graph;
use crate::scorer::{self, GraphScorer, ScorerLoader};
use crate::topk;
use crate::validator::{rank_candidates, validate_sequence, Candidate, SelectionPrompt, SequenceValidator};
use common::{OperationTimer, RequestContext};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Результат одной рекомендации
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendation {
    /// Имена инструментов, лучший первым
    pub tools: Vec<String>,
    /// Логиты выбранных инструментов, в том же порядке
    pub scores: Vec<f32>,
    pub node_count: usize,
    pub edge_count: usize,
}

impl Recommendation {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Catalog + loaded scorer: turns a validated sequence into top-K names
pub struct Recommender {
    catalog: Arc<ToolCatalog>,
    scorer: Box<dyn GraphScorer>,
    tools_to_recommend: usize,
}

impl Recommender {
    pub fn new(catalog: Arc<ToolCatalog>, scorer: Box<dyn GraphScorer>, tools_to_recommend: usize) -> Self {
        Self {
            catalog,
            scorer,
            tools_to_recommend,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Convert → encode → score → top-K → names.
    ///
    /// An empty sequence yields an empty recommendation without touching the
    /// scorer.
    pub fn recommend_validated<S: AsRef<str>>(&self, names: &[S]) -> Result<Recommendation> {
        if names.is_empty() {
            return Ok(Recommendation::default());
        }

        let steps = self.catalog.convert_sequence(names)?;

        let mut timer = OperationTimer::new("encode_graph");
        let encoded = graph::encode(&steps)?;
        timer.set_items(encoded.graph.node_count());
        timer.finish();

        let timer = OperationTimer::new("forward_pass");
        let logits = scorer::score(self.scorer.as_ref(), &encoded.batch);
        timer.finish_with_result(&logits);
        let logits = logits?;

        let ranked = topk::top_k(&logits, self.tools_to_recommend);
        let tools = topk::to_names(&ranked, &self.catalog)?;
        debug!(?tools, "Top-{} extracted", self.tools_to_recommend);

        Ok(Recommendation {
            tools,
            scores: ranked.iter().map(|&(_, score)| score).collect(),
            node_count: encoded.graph.node_count(),
            edge_count: encoded.graph.edge_count(),
        })
    }
}

/// Сессия рекомендаций: каталог загружается один раз
pub struct RecommendationService {
    artifacts: ArtifactPaths,
    base: BaseConfig,
    settings: RecommendationSettings,
    catalog: Arc<ToolCatalog>,
}

impl RecommendationService {
    /// Loads the catalog; nothing is kept if loading fails
    pub fn open(artifacts: ArtifactPaths, base: BaseConfig, settings: RecommendationSettings) -> Result<Self> {
        let catalog = Arc::new(artifacts.load_catalog()?);
        Ok(Self::with_catalog(artifacts, base, settings, catalog))
    }

    pub fn with_catalog(
        artifacts: ArtifactPaths,
        base: BaseConfig,
        settings: RecommendationSettings,
        catalog: Arc<ToolCatalog>,
    ) -> Self {
        Self {
            artifacts,
            base,
            settings,
            catalog,
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    pub fn validator(&self) -> SequenceValidator<'_> {
        SequenceValidator::new(&self.catalog, self.settings.validator)
    }

    /// Ранжированные кандидаты для токена (без модели)
    pub fn candidates(&self, token: &str, limit: usize) -> Vec<Candidate> {
        rank_candidates(token.trim(), &self.catalog)
            .into_iter()
            .take(limit)
            .collect()
    }

    /// Base config + best hyperparameters + model dir, augmented with data sizes
    pub fn resolve_config(&self) -> Result<LoaderConfig> {
        let best = self.artifacts.load_best_hyperparameters()?;
        let resolved = ConfigResolver::new(self.base.clone())
            .with_best_params(best)
            .with_model_path(self.artifacts.model_dir())
            .resolve()?;
        Ok(LoaderConfig::new(resolved, DataConfig::from_catalog(&self.catalog)))
    }

    /// Full request: validate, then (only if something is left) resolve the
    /// config, load the scorer and recommend.
    ///
    /// Returns an empty list when the sequence is empty or abandoned.
    pub fn recommend<S: AsRef<str>>(
        &self,
        tokens: &[S],
        prompt: &mut dyn SelectionPrompt,
        loader: &dyn ScorerLoader,
    ) -> Result<Recommendation> {
        let context = RequestContext::new();
        let span = context.span("recommend");
        let _guard = span.enter();

        let sequence = validate_sequence(&self.catalog, tokens, self.settings.validator, prompt);
        if sequence.is_empty() {
            info!(request_id = %context.request_id, "Nothing to recommend");
            return Ok(Recommendation::default());
        }

        let config = self.resolve_config()?;

        let timer = OperationTimer::new("load_scorer");
        let scorer = loader.load(&config);
        timer.finish_with_result(&scorer);

        let recommender = Recommender::new(
            Arc::clone(&self.catalog),
            scorer?,
            self.settings.tools_to_recommend,
        );
        let recommendation = recommender.recommend_validated(&sequence)?;

        info!(
            request_id = %context.request_id,
            duration_ms = context.elapsed_ms(),
            recommended = recommendation.tools.len(),
            "✅ Recommendation ready"
        );
        Ok(recommendation)
    }
}

/// One-shot helper: open the artifacts and run a single request
pub fn recommend_sequence<S: AsRef<str>>(
    artifacts: ArtifactPaths,
    base: BaseConfig,
    settings: RecommendationSettings,
    tokens: &[S],
    prompt: &mut dyn SelectionPrompt,
    loader: &dyn ScorerLoader,
) -> Result<Vec<String>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let service = RecommendationService::open(artifacts, base, settings)?;
    Ok(service.recommend(tokens, prompt, loader)?.tools)
}
