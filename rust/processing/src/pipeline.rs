// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-document conversion pipeline.
//!
//! `Idle → ParsingReferences → Generating → Merging → Done`, with `Aborted`
//! reachable from `Generating` and `Merging`. Cancellation is polled once per
//! entity, so an abort lands within one entity's processing time. Partial
//! output is discarded on abort.

use crate::config::ConversionConfig;
use crate::error::Result;
use dxf_lite_core::{Document, DocumentParser, Entity, Layout, Rgb};
use dxf_lite_geometry::{
    ChangeKind, EntityGeometryGenerator, FontManager, LayoutScene, Placement, ReferenceIndex,
    Scene, SceneMerger, SceneNode,
};
use std::borrow::Cow;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    ParsingReferences,
    Generating,
    Merging,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, ParsingReferences)
                | (ParsingReferences, Generating)
                | (Generating, Merging)
                | (Generating, Aborted)
                | (Merging, Done)
                | (Merging, Aborted)
                | (Done, Idle)
                | (Aborted, Idle)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::ParsingReferences => "parsing-references",
            PipelineState::Generating => "generating",
            PipelineState::Merging => "merging",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation flag shared with the host
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receives `(processed, total)` entity counts; purely informational
pub trait ProgressSink {
    fn on_progress(&self, processed: usize, total: usize);
}

impl<F: Fn(usize, usize)> ProgressSink for F {
    fn on_progress(&self, processed: usize, total: usize) {
        self(processed, total)
    }
}

/// Terminal result of a conversion
#[derive(Debug)]
pub enum ConversionOutcome {
    Done(Scene),
    /// Cancelled; nothing generated is returned
    Aborted {
        processed: usize,
        generated_nodes: usize,
    },
}

impl ConversionOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, ConversionOutcome::Aborted { .. })
    }

    pub fn scene(&self) -> Option<&Scene> {
        match self {
            ConversionOutcome::Done(scene) => Some(scene),
            ConversionOutcome::Aborted { .. } => None,
        }
    }

    pub fn into_scene(self) -> Option<Scene> {
        match self {
            ConversionOutcome::Done(scene) => Some(scene),
            ConversionOutcome::Aborted { .. } => None,
        }
    }
}

/// Per-entity decision of a generation pass
pub(crate) enum Selection {
    Skip,
    Generate,
    Tagged(ChangeKind, Rgb),
}

/// One document's generation over an already built index
pub(crate) struct Pass<'p, 'doc> {
    pub index: &'p ReferenceIndex<'doc>,
    pub select: &'p dyn Fn(&Entity) -> Selection,
}

#[derive(Debug, Default)]
struct Counters {
    processed: usize,
    generated: usize,
    total: usize,
}

/// Converts documents into scenes
pub struct ScenePipeline {
    config: ConversionConfig,
    cancel: CancellationToken,
    progress: Option<Box<dyn ProgressSink>>,
    fonts: Option<Arc<dyn FontManager + Send + Sync>>,
    state: PipelineState,
}

impl ScenePipeline {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            progress: None,
            fonts: None,
            state: PipelineState::Idle,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn with_fonts(mut self, fonts: Arc<dyn FontManager + Send + Sync>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Token that cancels this pipeline's conversions
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Parse `raw` and convert it; a parse failure refuses the conversion
    pub fn convert_bytes(
        &mut self,
        parser: &dyn DocumentParser,
        raw: &[u8],
        encoding: &str,
    ) -> Result<ConversionOutcome> {
        let document = parser.parse(raw, encoding).map_err(|error| {
            tracing::error!(%error, bytes = raw.len(), "document parse failed");
            error
        })?;
        Ok(self.convert(&document))
    }

    /// Convert one document
    pub fn convert(&mut self, document: &Document) -> ConversionOutcome {
        self.start();
        let document = with_model_layout(document);
        let index = ReferenceIndex::new(&document);
        tracing::info!(
            entities = document.entities.len(),
            indexed = index.entity_count(),
            duplicates = index.duplicate_count(),
            "reference index built"
        );

        self.run(&[Pass {
            index: &index,
            select: &|_| Selection::Generate,
        }])
    }

    pub(crate) fn start(&mut self) {
        if self.state.is_terminal() {
            self.transition(PipelineState::Idle);
        }
        self.transition(PipelineState::ParsingReferences);
    }

    /// Generate every pass into one scene, then merge
    pub(crate) fn run(&mut self, passes: &[Pass<'_, '_>]) -> ConversionOutcome {
        let started = Instant::now();
        self.transition(PipelineState::Generating);

        let mut counters = Counters {
            total: passes
                .iter()
                .map(|pass| pass.index.document().entities.len())
                .sum(),
            ..Counters::default()
        };
        let mut scene = Scene::default();
        for pass in passes {
            if self.generate_pass(pass, &mut scene, &mut counters).is_break() {
                return self.abort(&counters);
            }
        }
        tracing::info!(
            nodes = scene.node_count(),
            unsupported = scene.stats.unsupported_total(),
            dangling = scene.stats.dangling_references,
            malformed = scene.stats.malformed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation complete"
        );

        self.transition(PipelineState::Merging);
        if self.cancel.is_cancelled() {
            return self.abort(&counters);
        }
        if self.config.enable_merge {
            SceneMerger::new(self.config.prune_policy()).merge(&mut scene);
        }

        self.transition(PipelineState::Done);
        tracing::info!(
            layouts = scene.layouts.len(),
            nodes = scene.node_count(),
            batches = scene.stats.batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "conversion done"
        );
        ConversionOutcome::Done(scene)
    }

    fn generate_pass(
        &self,
        pass: &Pass<'_, '_>,
        scene: &mut Scene,
        counters: &mut Counters,
    ) -> ControlFlow<()> {
        let document = pass.index.document();
        let mut generator =
            EntityGeometryGenerator::new(pass.index, self.config.generator_options())
                .with_arena(std::mem::take(&mut scene.arena));
        if let Some(fonts) = &self.fonts {
            generator = generator.with_fonts(Box::new(Arc::clone(fonts)));
        }

        for layout in document.sorted_layouts() {
            if self.keeps(layout) && scene.layout(&layout.name).is_none() {
                scene
                    .layouts
                    .push(LayoutScene::new(&layout.name, layout.handle, layout.is_model()));
            }
        }

        let mut flow = ControlFlow::Continue(());
        for entity in &document.entities {
            if self.cancel.is_cancelled() {
                flow = ControlFlow::Break(());
                break;
            }
            if let Some((layout, node)) = self.generate_entity(&generator, pass, entity) {
                if let Some(target) = scene.layout_mut(&layout) {
                    target.roots.push(node);
                    counters.generated += 1;
                }
            }
            counters.processed += 1;
            self.report(counters);
        }

        let (arena, stats, viewports) = generator.into_parts();
        scene.arena = arena;
        scene.stats.absorb(&stats);
        for viewport in viewports {
            if let Some(layout) = scene.layout_mut(&viewport.layout) {
                layout.viewports.push(viewport);
            }
        }
        flow
    }

    fn generate_entity(
        &self,
        generator: &EntityGeometryGenerator<'_>,
        pass: &Pass<'_, '_>,
        entity: &Entity,
    ) -> Option<(String, SceneNode)> {
        let layout = match pass.index.placement(entity) {
            Placement::Layout(layout) => layout,
            // Reached through inserts only
            Placement::BlockInterior => return None,
            Placement::Orphan => {
                generator.record_dangling();
                tracing::debug!(entity = %entity.handle, "unknown owner, using model space");
                let Some(model) = pass.index.document().model_layout() else {
                    tracing::warn!(entity = %entity.handle, "no model layout, entity dropped");
                    return None;
                };
                model
            }
        };
        if !self.keeps(layout) {
            return None;
        }

        let tag = match (pass.select)(entity) {
            Selection::Skip => return None,
            Selection::Generate => None,
            Selection::Tagged(kind, color) => Some((kind, color)),
        };
        let mut node = generator.generate(entity, &layout.name, None)?;
        if let Some((kind, color)) = tag {
            node.tag_change(kind, color);
        }
        Some((layout.name.clone(), node))
    }

    #[inline]
    fn keeps(&self, layout: &Layout) -> bool {
        layout.is_model() || !self.config.ignore_paper_space
    }

    fn report(&self, counters: &Counters) {
        let Some(sink) = &self.progress else {
            return;
        };
        let interval = self.config.progress_interval.max(1);
        if counters.processed % interval == 0 || counters.processed == counters.total {
            sink.on_progress(counters.processed, counters.total);
        }
    }

    fn abort(&mut self, counters: &Counters) -> ConversionOutcome {
        self.transition(PipelineState::Aborted);
        tracing::info!(
            processed = counters.processed,
            generated = counters.generated,
            "conversion aborted"
        );
        ConversionOutcome::Aborted {
            processed: counters.processed,
            generated_nodes: counters.generated,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid pipeline transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }
}

impl Default for ScenePipeline {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

/// Borrow the document, or copy it when it lacks the "Model" layout
pub(crate) fn with_model_layout(document: &Document) -> Cow<'_, Document> {
    let document = document.with_model_layout();
    if matches!(document, Cow::Owned(_)) {
        tracing::warn!("document has no model layout, using the default one");
    }
    document
}
