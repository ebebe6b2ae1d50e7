//! Plain-text rendering of profiles, collection summaries and authentication
//! outcomes.

use crate::authenticator::{AuthenticationOutcome, AuthenticationReport, Verdict};
use crate::enrollment::CollectionReport;
use crate::profile::Profile;
use crate::sample::Feature;

const WIDTH: usize = 72;

fn header(report: &mut String, title: &str) {
    report.push_str(&"=".repeat(WIDTH));
    report.push('\n');
    report.push_str(&format!("{:^WIDTH$}\n", title));
    report.push_str(&"=".repeat(WIDTH));
    report.push_str("\n\n");
}

fn section(report: &mut String, title: &str) {
    report.push_str(&"-".repeat(WIDTH));
    report.push('\n');
    report.push_str(title);
    report.push('\n');
    report.push_str(&"-".repeat(WIDTH));
    report.push_str("\n\n");
}

fn push_bounds(report: &mut String, profile: &Profile) {
    report.push_str(&format!(
        "{:<26}{:>14}{:>14}{:>14}{:>14}\n",
        "", "Mean", "Std Dev", "Lower", "Upper"
    ));
    for (feature, b) in profile.bounds.iter() {
        report.push_str(&format!(
            "{:<26}{:>14.6}{:>14.6}{:>14.6}{:>14.6}\n",
            feature.label(),
            b.mean,
            b.std_dev,
            b.lower,
            b.upper
        ));
    }
    report.push('\n');
}

pub fn generate_profile_report(profile: &Profile) -> String {
    let mut report = String::new();
    header(&mut report, "TYPING PROFILE");
    report.push_str(&format!("User:           {}\n", profile.user_id));
    report.push_str(&format!("Samples:        {}\n\n", profile.sample_count));
    section(&mut report, "ACCEPTANCE BOUNDS");
    push_bounds(&mut report, profile);
    report
}

pub fn generate_collection_report(collection: &CollectionReport) -> String {
    let mut report = String::new();
    header(&mut report, "SAMPLE COLLECTION");
    report.push_str(&format!("User:           {}\n", collection.user_id));
    report.push_str(&format!(
        "Collected:      {} (phrases #{}-#{})\n",
        collection.added, collection.first_phrase_number, collection.last_phrase_number
    ));
    report.push_str(&format!("Total Samples:  {}\n\n", collection.total_samples));

    section(&mut report, "ACCEPTANCE BOUNDS");
    push_bounds(&mut report, &collection.profile);

    if let Some(cv) = &collection.cross_validation {
        section(&mut report, "REGRESSION TELEMETRY");
        let scores: Vec<String> = cv
            .fold_scores
            .iter()
            .map(|s| format!("{s:.4}"))
            .collect();
        report.push_str(&format!("Cross-Validation Scores: [{}]\n", scores.join(", ")));
        report.push_str(&format!("Mean CV Score:           {:.4}\n\n", cv.mean_score));
    }
    report
}

pub fn generate_authentication_report(outcome: &AuthenticationOutcome) -> String {
    match outcome {
        AuthenticationOutcome::NoHistory { user_id } => {
            let mut report = String::new();
            header(&mut report, "AUTHENTICATION");
            report.push_str(&format!("User:           {user_id}\n"));
            report.push_str("Verdict:        NO_HISTORY\n");
            report.push_str("  -> No enrollment data exists for this user.\n");
            report
        }
        AuthenticationOutcome::Evaluated(evaluated) => render_evaluated(outcome, evaluated),
    }
}

fn render_evaluated(outcome: &AuthenticationOutcome, evaluated: &AuthenticationReport) -> String {
    let mut report = String::new();
    header(&mut report, "AUTHENTICATION");
    report.push_str(&format!("User:           {}\n", evaluated.user_id));
    report.push_str(&format!(
        "History:        {} sample(s)\n\n",
        evaluated.profile.sample_count
    ));

    section(&mut report, "OBSERVATION VS BOUNDS (advisory)");
    for (feature, check) in evaluated.range_checks.iter() {
        report.push_str(&format!(
            "{:<26}{:>14.6}  [{:.6}, {:.6}]  {}\n",
            feature.label(),
            check.value,
            check.bounds.lower,
            check.bounds.upper,
            if check.within { "normal" } else { "ANOMALOUS" }
        ));
    }
    report.push('\n');

    section(&mut report, "SIGNIFICANCE TESTS (advisory)");
    let sig = &evaluated.significance;
    let t_flags = sig.t_significance();
    let f_flags = sig.f_significance();
    for feature in Feature::ALL {
        let t = sig.t_tests.get(feature);
        let f = sig.f_tests.get(feature);
        report.push_str(&format!("{}\n", feature.label()));
        report.push_str(&format!(
            "  t = {:.6}, p = {:.6}  -> {}\n",
            t.statistic,
            t.p_value,
            t_flags.get(feature)
        ));
        report.push_str(&format!(
            "  F = {:.6}, p = {:.6}  -> {}\n",
            f.statistic,
            f.p_value,
            f_flags.get(feature)
        ));
    }
    report.push_str(&format!("  (alpha = {})\n\n", sig.alpha));

    section(&mut report, "DECISION");
    report.push_str(&format!("Verdict:        {}\n", outcome.state()));
    match &evaluated.verdict {
        Verdict::Accepted {
            matched,
            differences,
        } => {
            report.push_str(&format!(
                "Matched:        phrase #{} ({:?})\n",
                matched.phrase_number, matched.phrase
            ));
            for (feature, diff) in differences.iter() {
                report.push_str(&format!(
                    "  {:<24}difference {:.6}\n",
                    feature.label(),
                    diff
                ));
            }
        }
        Verdict::Rejected => {
            report.push_str("  -> No stored sample is close enough on every feature.\n");
        }
    }
    report
}
