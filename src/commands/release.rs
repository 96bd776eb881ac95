use crate::commands::load_config;
use bundle_rail::core::config::ErrorPolicyKind;
use bundle_rail::core::error::{BundleResult, print_error};
use bundle_rail::release::name::detect_release_name;
use bundle_rail::release::pipeline::{PipelineReport, StepStatus};
use bundle_rail::release::{CliBackend, DryRunBackend, ErrorPolicy, ErrorSink, ReleasePipeline};
use std::path::Path;

/// Run the release command
pub fn run_release(
  current_dir: &Path,
  config_path: Option<&Path>,
  name: Option<String>,
  policy: Option<ErrorPolicyKind>,
  dry_run: bool,
  json: bool,
) -> BundleResult<()> {
  let config = load_config(current_dir, config_path)?;
  let release = name
    .filter(|n| !n.trim().is_empty())
    .or_else(|| detect_release_name(config.release.name.as_deref(), Some(current_dir)));

  let sink = match policy.unwrap_or(config.errors.policy) {
    ErrorPolicyKind::Raise => ErrorSink::new(ErrorPolicy::Raise),
    ErrorPolicyKind::Report => ErrorSink::new(ErrorPolicy::delegate(print_error)),
  };

  if !json {
    match &release {
      Some(name) => println!("🚀 Running release pipeline for '{}'", name),
      None => println!("🚀 Running release pipeline"),
    }
  }

  let pipeline = ReleasePipeline::new(release, &config.release, current_dir);
  let report = if dry_run {
    let backend = DryRunBackend::new();
    let report = pipeline.run(&backend, &sink)?;
    if !json {
      println!("\n🔍 DRY-RUN MODE - No remote changes were made");
      for operation in backend.operations() {
        println!("   • would {}", operation);
      }
    }
    report
  } else {
    let backend = CliBackend::new(config.cli.clone(), current_dir);
    pipeline.run(&backend, &sink)?
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report);
  }
  Ok(())
}

fn print_report(report: &PipelineReport) {
  println!();
  for record in &report.steps {
    let (icon, note) = match record.status {
      StepStatus::Completed => ("✅", String::new()),
      StepStatus::Skipped => ("⏭️ ", " (disabled)".to_string()),
      StepStatus::Failed => ("❌", " (failed)".to_string()),
      StepStatus::NotRun => ("⛔", " (not run)".to_string()),
    };
    println!("   {} {}{}", icon, record.step, note);
  }

  if report.has_failures() {
    println!("\n⚠️  Release pipeline finished with failures");
  } else {
    println!("\n🎉 Release pipeline complete!");
  }
}
