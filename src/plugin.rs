//! Bundler-facing entry point
//!
//! [`BundlePlugin`] assembles the hook chain from a [`BundleConfig`], routes every hook
//! failure through one [`ErrorSink`] and runs the release pipeline once the build is
//! done. Integrations for specific bundlers only forward their hook calls here.

use crate::core::config::BundleConfig;
use crate::core::error::{BundleResult, ConfigError};
use crate::instrument::debug_id_injector::DebugIdInjector;
use crate::instrument::hooks::{HookChain, ResolvedModule, TransformOutput};
use crate::instrument::metadata_injector::ModuleMetadataInjector;
use crate::instrument::release_injector::ReleaseInjector;
use crate::release::backend::ReleaseBackend;
use crate::release::name::detect_release_name;
use crate::release::pipeline::{PipelineReport, ReleasePipeline};
use crate::release::sink::ErrorSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct BundlePlugin {
  config: BundleConfig,
  release: Option<String>,
  chain: HookChain,
  sink: ErrorSink,
  project_dir: PathBuf,
}

impl BundlePlugin {
  /// Build a plugin, detecting the release name from config, CI environment or git
  pub fn new(config: BundleConfig, project_dir: impl Into<PathBuf>, sink: ErrorSink) -> BundleResult<Self> {
    let project_dir = project_dir.into();
    let release = detect_release_name(config.release.name.as_deref(), Some(&project_dir));
    Self::with_release(config, release, project_dir, sink)
  }

  /// Build a plugin for an already known release name
  ///
  /// Hooks run in a fixed order: release import, module metadata, debug ID. The debug
  /// ID comes last so it covers every other chunk edit.
  pub fn with_release(
    config: BundleConfig,
    release: Option<String>,
    project_dir: impl Into<PathBuf>,
    sink: ErrorSink,
  ) -> BundleResult<Self> {
    let resolution = config.injection.map_resolution;
    let mut chain = HookChain::new();

    if config.release.inject {
      match &release {
        Some(name) => match ReleaseInjector::new(
          name.clone(),
          config.injection.build_info.clone(),
          &config.injection.release_targets,
        ) {
          Ok(injector) => chain.add_hook(Arc::new(injector.with_resolution(resolution))),
          Err(e) => sink.handle(e.context("release injection disabled"))?,
        },
        None => sink.handle(ConfigError::ReleaseNameUnresolved)?,
      }
    }
    if let Some(metadata) = &config.injection.module_metadata {
      chain.add_hook(Arc::new(ModuleMetadataInjector::new(metadata, resolution)));
    }
    if config.injection.debug_ids {
      chain.add_hook(Arc::new(DebugIdInjector::new(resolution)));
    }

    tracing::debug!(
      hooks = ?chain.hooks().iter().map(|h| h.name().to_string()).collect::<Vec<_>>(),
      release = ?release,
      "plugin ready"
    );

    Ok(Self {
      config,
      release,
      chain,
      sink,
      project_dir: project_dir.into(),
    })
  }

  pub fn release(&self) -> Option<&str> {
    self.release.as_deref()
  }

  pub fn config(&self) -> &BundleConfig {
    &self.config
  }

  pub fn project_dir(&self) -> &Path {
    &self.project_dir
  }

  pub fn hooks(&self) -> &HookChain {
    &self.chain
  }

  pub fn resolve_id(&self, id: &str) -> Option<ResolvedModule> {
    self.chain.resolve_id(id)
  }

  pub fn load(&self, id: &str) -> Option<String> {
    self.chain.load(id)
  }

  /// Module transform; a delegated failure leaves the module untouched
  pub fn transform(&self, code: &str, id: &str) -> BundleResult<Option<TransformOutput>> {
    match self.chain.transform(code, id) {
      Ok(output) => Ok(output),
      Err(e) => self.sink.handle(e.context(format!("while transforming {}", id))).map(|_| None),
    }
  }

  /// Chunk post-processing; a delegated failure leaves the chunk untouched
  pub fn render_chunk(&self, code: &str, file_name: &str) -> BundleResult<Option<TransformOutput>> {
    match self.chain.render_chunk(code, file_name) {
      Ok(output) => Ok(output),
      Err(e) => self
        .sink
        .handle(e.context(format!("while rendering {}", file_name)))
        .map(|_| None),
    }
  }

  /// Run the release pipeline against `backend`
  pub fn finish_build(&self, backend: &dyn ReleaseBackend) -> BundleResult<PipelineReport> {
    ReleasePipeline::new(self.release.clone(), &self.config.release, &self.project_dir).run(backend, &self.sink)
  }
}
