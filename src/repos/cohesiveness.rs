//! Deterministic cohesiveness scoring.
//!
//! A fixed penalty table over four 0-100 subscores (structure, naming,
//! dependencies, config); naming and dependencies have no checks yet and
//! stay at 100 as hooks for future ones. `overall` is the rounded mean of
//! the four, computed once all penalties have applied.

use super::types::{Cohesiveness, Issue, IssueType, Severity, Structure};

pub fn score(structure: &Structure) -> Cohesiveness {
    let mut config_score: i32 = 100;
    let mut structure_score: i32 = 100;
    let mut issues = Vec::new();

    if !structure.has_manifest {
        config_score -= 30;
        issues.push(Issue {
            issue_type: IssueType::MissingConfig,
            severity: Severity::Warning,
            message: "project is missing its manifest file".to_string(),
            path: None,
            suggestion: Some("add a project manifest".to_string()),
            auto_fixable: true,
        });
    }

    if !structure.has_type_config {
        config_score -= 20;
        issues.push(Issue {
            issue_type: IssueType::MissingConfig,
            severity: Severity::Info,
            message: "project is missing a type-config file".to_string(),
            path: None,
            suggestion: Some("add a type-config file".to_string()),
            auto_fixable: true,
        });
    }

    if !structure.has_deployment_config {
        config_score -= 25;
        issues.push(Issue {
            issue_type: IssueType::MissingConfig,
            severity: Severity::Warning,
            message: "project is missing a deployment-config file".to_string(),
            path: None,
            suggestion: Some("add a deployment-config file".to_string()),
            auto_fixable: true,
        });
    }

    let has_src_dir = structure.directories.iter().any(|d| d == "src");
    if !has_src_dir && structure.files.len() > 5 {
        structure_score -= 20;
        issues.push(Issue {
            issue_type: IssueType::StructureMismatch,
            severity: Severity::Info,
            message: "project has more than 5 files but no src/ directory".to_string(),
            path: None,
            suggestion: None,
            auto_fixable: false,
        });
    }

    let has_readme = structure
        .files
        .iter()
        .any(|f| f.to_ascii_lowercase().starts_with("readme"));
    if !has_readme {
        structure_score -= 10;
        issues.push(Issue {
            issue_type: IssueType::MissingConfig,
            severity: Severity::Info,
            message: "project has no README".to_string(),
            path: None,
            suggestion: Some("add a README".to_string()),
            auto_fixable: true,
        });
    }

    let structure_score = structure_score.max(0) as u32;
    let config_score = config_score.max(0) as u32;
    let naming_score = 100;
    let dependencies_score = 100;

    let overall =
        ((structure_score + naming_score + dependencies_score + config_score) as f64 / 4.0)
            .round() as u32;

    Cohesiveness {
        structure: structure_score,
        naming: naming_score,
        dependencies: dependencies_score,
        config: config_score,
        overall,
        issues,
        last_checked: None,
    }
}
