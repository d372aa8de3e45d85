//! Sequences the stages of one run and turns the outcome into a [`PipelineResult`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{Instrument, error, info, info_span, warn};

use super::{PipelineError, PipelineResult, Query, Stage};
use crate::config::PipelineConfig;
use crate::detect::{ContentClassifier, SignatureClassifier};
use crate::extract::ExportLinkExtractor;
use crate::fetch::FetchSession;
use crate::import::{self, BulkLoader};
use crate::staging::DownloadStage;

/// Runs the scrape-download-import pipeline for one query at a time.
///
/// A `Pipeline` holds no per-run state; share it behind an [`Arc`] and call
/// [`run`](Self::run) from as many requests as needed.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    classifier: Arc<dyn ContentClassifier>,
    extractor: ExportLinkExtractor,
    stage: DownloadStage,
    loader: Arc<dyn BulkLoader>,
}

impl Pipeline {
    /// Creates a pipeline with the default signature classifier.
    #[must_use]
    pub fn new(config: PipelineConfig, loader: Arc<dyn BulkLoader>) -> Self {
        let extractor = ExportLinkExtractor::new(
            config.export_anchor_id(),
            config.catalog_origin().clone(),
        );
        let stage = DownloadStage::new(config.staging_dir());
        Self {
            config,
            classifier: Arc::new(SignatureClassifier::default()),
            extractor,
            stage,
            loader,
        }
    }

    /// Replaces the content classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline for a raw `query` parameter.
    ///
    /// Never fails and never panics: every error, and any panic raised inside
    /// a stage, becomes a failed [`PipelineResult`].
    pub async fn run(&self, query: Option<&str>) -> PipelineResult {
        let query = match Query::parse(query) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "rejected search request");
                return PipelineResult::failure(&e);
            }
        };

        let span = info_span!("pipeline", query = %query);
        let outcome = AssertUnwindSafe(self.execute(&query).instrument(span))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(message)) => PipelineResult::success(message),
            Ok(Err(e)) => PipelineResult::failure(&e),
            Err(panic) => {
                PipelineResult::failure(&PipelineError::Unclassified(panic_message(panic.as_ref())))
            }
        };

        if result.is_ok() {
            info!(query = %query, message = %result.message, "pipeline finished");
        } else if result.http_code >= 500 {
            error!(
                query = %query,
                code = result.http_code,
                message = %result.message,
                "pipeline failed"
            );
        } else {
            warn!(
                query = %query,
                code = result.http_code,
                message = %result.message,
                "pipeline failed"
            );
        }
        result
    }

    async fn execute(&self, query: &Query) -> Result<String, PipelineError> {
        enter(query, Stage::Start);

        let staged = {
            let session =
                FetchSession::open(self.config.catalog_origin(), self.config.fetch().clone())
                    .map_err(PipelineError::UpstreamUnavailable)?;

            enter(query, Stage::Fetching);
            session.pause_before_first_request().await;
            let page = session
                .fetch(&self.config.search_url(query.as_str()))
                .await
                .map_err(PipelineError::catalog)?;
            if !page.is_ok() {
                return Err(PipelineError::UpstreamStatus {
                    status: page.status,
                });
            }

            enter(query, Stage::Classifying);
            let classification = self.classifier.classify(&page.body);
            if !classification.is_legitimate() {
                return Err(PipelineError::ChallengeOrMalformedContent { classification });
            }

            enter(query, Stage::Extracting);
            let link = self.extractor.extract(&page.body)?;

            enter(query, Stage::Downloading);
            self.stage.stage(&session, query.as_str(), &link).await?
        };

        enter(query, Stage::Importing);
        let summary = import::import_and_archive(
            self.loader.as_ref(),
            self.config.staging_dir(),
            self.config.archive_dir(),
            |_| enter(query, Stage::Archiving),
        )
        .await?;

        enter(query, Stage::Done);
        Ok(format!(
            "{} downloaded and saved to '{}'; {} file(s) with {} row(s) imported",
            staged.file_name,
            self.config.archive_dir().display(),
            summary.loaded.files.len(),
            summary.loaded.total_rows()
        ))
    }
}

fn enter(query: &Query, stage: Stage) {
    info!(query = %query, %stage, "stage entered");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
