//! Integration tests for `bundle-rail release`

use crate::helpers::{TestProject, run_bundle_rail, run_bundle_rail_raw, stdout_json};
use anyhow::Result;

fn status(report: &serde_json::Value, step: &str) -> String {
  report["steps"]
    .as_array()
    .and_then(|steps| steps.iter().find(|s| s["step"] == step))
    .and_then(|s| s["status"].as_str())
    .unwrap_or("missing")
    .to_string()
}

#[test]
fn test_dry_run_default_steps() -> Result<()> {
  let project = TestProject::new()?;
  project.write("dist/main.js", "x();")?;
  project.write(
    "bundle-rail.toml",
    r#"
[release]
name = "web@1.0.0"

[[release.uploads]]
paths = ["dist"]
"#,
  )?;

  let output = run_bundle_rail(&project.path, &["release", "--dry-run", "--json"])?;
  let report = stdout_json(&output)?;

  assert_eq!(report["release"], "web@1.0.0");
  assert_eq!(status(&report, "create"), "completed");
  assert_eq!(status(&report, "clean_artifacts"), "skipped");
  assert_eq!(status(&report, "upload_source_maps"), "completed");
  assert_eq!(status(&report, "set_commits"), "skipped");
  assert_eq!(status(&report, "finalize"), "completed");
  assert_eq!(status(&report, "deploy"), "skipped");
  assert_eq!(report["aborted"], false);
  Ok(())
}

#[test]
fn test_release_name_from_flag_and_git() -> Result<()> {
  let project = TestProject::new()?;
  let head = project.init_git()?;
  project.write("bundle-rail.toml", "[release]\nfinalize = false\n")?;

  let report = stdout_json(&run_bundle_rail(&project.path, &["release", "--dry-run", "--json"])?)?;
  assert_eq!(report["release"], head.as_str());

  let report = stdout_json(&run_bundle_rail(
    &project.path,
    &["release", "--dry-run", "--json", "--name", "override"],
  )?)?;
  assert_eq!(report["release"], "override");
  Ok(())
}

#[test]
fn test_unresolved_release_name() -> Result<()> {
  let project = TestProject::new()?;
  project.write("bundle-rail.toml", "")?;

  let output = run_bundle_rail_raw(&project.path, &["release", "--dry-run"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Could not determine a release name"), "{}", stderr);
  assert!(stderr.contains("SENTRY_RELEASE"));
  Ok(())
}

#[test]
fn test_missing_config() -> Result<()> {
  let project = TestProject::new()?;
  let output = run_bundle_rail_raw(&project.path, &["release", "--dry-run"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("bundle-rail.toml"));
  Ok(())
}

#[test]
fn test_invalid_config_rejected() -> Result<()> {
  let project = TestProject::new()?;
  project.write("bundle-rail.toml", "[release.set_commits]\nrepo = \"acme/web\"\n")?;
  let output = run_bundle_rail_raw(&project.path, &["release", "--dry-run", "--name", "1.0"])?;
  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("set_commits"));
  Ok(())
}

#[test]
fn test_invalid_config_reported_under_report_policy() -> Result<()> {
  let project = TestProject::new()?;
  project.write(
    "bundle-rail.toml",
    "[release]\nname = \"1.0\"\n\n[release.set_commits]\nrepo = \"acme/web\"\n\n[errors]\npolicy = \"report\"\n",
  )?;

  let output = run_bundle_rail(&project.path, &["release", "--dry-run", "--json", "--policy", "report"])?;
  let report = stdout_json(&output)?;

  assert_eq!(report["aborted"], true);
  let steps = report["steps"].as_array().map(|s| s.len()).unwrap_or(0);
  assert_eq!(steps, 6);
  for step in ["create", "clean_artifacts", "upload_source_maps", "set_commits", "finalize", "deploy"] {
    assert_eq!(status(&report, step), "not_run", "{}", step);
  }
  assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid set_commits configuration"));
  Ok(())
}

#[cfg(unix)]
mod with_fake_cli {
  use super::*;

  fn config(cli: &std::path::Path, policy: &str) -> String {
    format!(
      r#"
[release]
name = "web@2.0.0"
clean_artifacts = true

[[release.uploads]]
paths = ["dist"]
url_prefix = "~/js"

[release.set_commits]
auto = true

[release.deploy]
env = "production"

[cli]
binary = "{}"
org = "acme"

[errors]
policy = "{}"
"#,
      cli.display(),
      policy
    )
  }

  fn setup(fail_on: Option<&str>, policy: &str) -> Result<TestProject> {
    let project = TestProject::new()?;
    project.write("dist/main.js", "x();")?;
    let cli = project.fake_cli(fail_on)?;
    project.write("bundle-rail.toml", &config(&cli, policy))?;
    Ok(project)
  }

  #[test]
  fn test_steps_run_in_order() -> Result<()> {
    let project = setup(None, "raise")?;
    let output = run_bundle_rail(&project.path, &["release"])?;
    assert!(String::from_utf8_lossy(&output.stdout).contains("Release pipeline complete"));

    let calls = project.cli_calls()?;
    assert_eq!(calls.len(), 6, "{:?}", calls);
    assert_eq!(calls[0], "releases new web@2.0.0");
    assert_eq!(calls[1], "releases files web@2.0.0 delete --all");
    assert!(calls[2].starts_with("releases files web@2.0.0 upload-sourcemaps "));
    assert!(calls[2].contains("main.js"));
    assert!(calls[2].ends_with("--url-prefix ~/js"));
    assert_eq!(calls[3], "releases set-commits web@2.0.0 --auto");
    assert_eq!(calls[4], "releases finalize web@2.0.0");
    assert_eq!(calls[5], "releases deploys web@2.0.0 new --env production");

    let log = project.read("cli.log")?;
    assert!(log.lines().all(|l| l.starts_with("[acme] ")));
    Ok(())
  }

  #[test]
  fn test_upload_failure_reported_and_pipeline_continues() -> Result<()> {
    let project = setup(Some("upload-sourcemaps"), "report")?;
    let output = run_bundle_rail(&project.path, &["release", "--json"])?;
    let report = stdout_json(&output)?;

    assert_eq!(status(&report, "upload_source_maps"), "failed");
    assert_eq!(status(&report, "finalize"), "completed");
    assert_eq!(status(&report, "deploy"), "completed");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("upload source maps"), "{}", stderr);
    assert!(stderr.contains("upload-sourcemaps rejected"));

    let calls = project.cli_calls()?;
    assert!(calls.iter().any(|c| c.starts_with("releases finalize")));
    Ok(())
  }

  #[test]
  fn test_upload_failure_raised() -> Result<()> {
    let project = setup(Some("upload-sourcemaps"), "raise")?;
    let output = run_bundle_rail_raw(&project.path, &["release"])?;

    assert_eq!(output.status.code(), Some(3));
    let calls = project.cli_calls()?;
    assert_eq!(calls.len(), 3, "{:?}", calls);
    assert!(!calls.iter().any(|c| c.starts_with("releases finalize")));
    Ok(())
  }

  #[test]
  fn test_create_failure_stops_pipeline() -> Result<()> {
    for policy in ["raise", "report"] {
      let project = setup(Some("releases new"), policy)?;
      let output = run_bundle_rail_raw(&project.path, &["release", "--json"])?;

      let calls = project.cli_calls()?;
      assert_eq!(calls, vec!["releases new web@2.0.0".to_string()], "policy {}", policy);

      if policy == "report" {
        let report = stdout_json(&output)?;
        assert_eq!(report["aborted"], true);
        assert_eq!(status(&report, "finalize"), "not_run");
      } else {
        assert_eq!(output.status.code(), Some(3));
      }
    }
    Ok(())
  }

  #[test]
  fn test_policy_flag_overrides_config() -> Result<()> {
    let project = setup(Some("set-commits"), "raise")?;
    let output = run_bundle_rail(&project.path, &["release", "--policy", "report", "--json"])?;
    let report = stdout_json(&output)?;
    assert_eq!(status(&report, "set_commits"), "failed");
    assert_eq!(status(&report, "deploy"), "completed");
    Ok(())
  }

  #[test]
  fn test_missing_cli_binary() -> Result<()> {
    let project = TestProject::new()?;
    project.write(
      "bundle-rail.toml",
      "[release]\nname = \"1.0\"\n\n[cli]\nbinary = \"/nonexistent/release-cli\"\n",
    )?;
    let output = run_bundle_rail_raw(&project.path, &["release"])?;
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cli.binary"));
    Ok(())
  }
}
