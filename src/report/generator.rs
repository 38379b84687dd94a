//! Plain-text digest generation.
//!
//! This module renders a [`Digest`] into the fixed weekly mail layout.
//! Each section is built as a list of lines; the lists are joined once
//! at the end.

use crate::models::{Bucket, Digest, Initiative, Issue, Phase};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

const INTRO: &str = "Dies ist eine wöchentliche Zusammenfassung der derzeit laufenden \
Initiativen im LiquidFeedback des Landesverbands.";

const CLOSED_HEADER: &str = "== Abgeschlossen (letzte Woche) ==";
const CLOSED_HINT: &str = "(sortiert nach Rang, \"+\" = Angenommen, \"-\" = Abgelehnt)";

/// Errors raised while rendering a digest.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("Initiative i{initiative_id} of closed issue #{issue_id} has no rank")]
    UnrankedInitiative { issue_id: i32, initiative_id: i32 },
}

/// Decides which bucket gates the emission of the open-phase sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionGuard {
    /// Each section is emitted when its own bucket is non-empty.
    #[default]
    OwnBucket,
    /// Voting, frozen, discussion and new are all gated on the voting
    /// bucket, matching the layout of older digests.
    Voting,
}

/// Settings that shape the rendered text.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Base URL of the LiquidFeedback instance, ending with `/`.
    pub base_url: String,
    /// Address members can write to about account problems.
    pub contact_email: String,
    pub section_guard: SectionGuard,
}

/// Generate the complete digest text.
pub fn generate_text_report(digest: &Digest, ctx: &ReportContext) -> Result<String, ReportError> {
    let mut lines = Vec::new();

    // Intro
    lines.extend(generate_intro());

    // Closed issues
    if !digest.closed.is_empty() {
        lines.extend(generate_closed_section(&digest.closed, &ctx.base_url)?);
    }

    // Open phases, each preceded by a separator line
    for phase in [Phase::Voting, Phase::Frozen, Phase::Discussion, Phase::New] {
        lines.push(String::new());

        if section_enabled(digest, phase, ctx.section_guard) {
            lines.extend(generate_phase_section(
                phase_header(phase),
                digest.bucket(phase),
                &ctx.base_url,
            ));
        }
    }

    // Footer
    lines.extend(generate_footer(&ctx.contact_email));

    Ok(lines.join("\n"))
}

/// Whether the section for `phase` is emitted under the given guard.
fn section_enabled(digest: &Digest, phase: Phase, guard: SectionGuard) -> bool {
    match guard {
        SectionGuard::OwnBucket => !digest.bucket(phase).is_empty(),
        SectionGuard::Voting => !digest.voting.is_empty(),
    }
}

fn phase_header(phase: Phase) -> &'static str {
    match phase {
        Phase::Closed => CLOSED_HEADER,
        Phase::Voting => "== Abstimmung ==",
        Phase::Frozen => "== Eingefroren ==",
        Phase::Discussion => "== Diskussion ==",
        Phase::New => "== Neu ==",
    }
}

fn generate_intro() -> Vec<String> {
    vec![INTRO.to_string(), String::new()]
}

/// Header line linking to an issue page.
fn issue_line(issue: &Issue, base_url: &str) -> String {
    format!("#{0} - {1}issue/show/{0}.html:", issue.id, base_url)
}

/// Generate the closed section, initiatives ordered by rank.
fn generate_closed_section(issues: &Bucket, base_url: &str) -> Result<Vec<String>, ReportError> {
    let mut section = vec![
        CLOSED_HEADER.to_string(),
        CLOSED_HINT.to_string(),
        String::new(),
    ];

    for issue in issues.values() {
        section.push(issue_line(issue, base_url));

        for (rank, ini) in ranked_initiatives(issue)? {
            section.push(format!(
                "-> #{} ({}): i{} {}",
                rank,
                ini.marker(),
                ini.id,
                ini.name
            ));
        }
        section.push(String::new());
    }

    Ok(section)
}

/// Initiatives of a closed issue in ascending rank order.
fn ranked_initiatives(issue: &Issue) -> Result<Vec<(i32, &Initiative)>, ReportError> {
    let mut ranked = issue
        .initiatives
        .values()
        .map(|ini| {
            ini.rank
                .map(|rank| (rank, ini))
                .ok_or(ReportError::UnrankedInitiative {
                    issue_id: issue.id,
                    initiative_id: ini.id,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    ranked.sort_by_key(|(rank, _)| *rank);
    Ok(ranked)
}

/// Generate an open-phase section, initiatives ordered by id.
fn generate_phase_section(header: &str, issues: &Bucket, base_url: &str) -> Vec<String> {
    let mut section = vec![header.to_string()];

    for issue in issues.values() {
        section.push(issue_line(issue, base_url));
        for ini in issue.initiatives_by_id() {
            section.push(format!("-> i{} {}", ini.id, ini.name));
        }
        section.push(String::new());
    }

    section
}

fn generate_footer(contact_email: &str) -> Vec<String> {
    vec![
        String::new(),
        "== Anmerkungen ==".to_string(),
        format!(
            "Jedem Mitglied wird spätestens ein Monat nach Beitritt ein Invitecode zugeschickt, \
mit dem sich ein eigener Account im LiquidFeedback angelegt werden kann. Sollte es Probleme \
mit dem Zugang geben, so kann sich an die E-Mail Adresse {} gewendet werden.",
            contact_email
        ),
    ]
}

/// Subject line carrying the send date as `dd.mm.yyyy`.
pub fn subject_line(prefix: &str, today: NaiveDate) -> String {
    format!("{} ({})", prefix, today.format("%d.%m.%Y"))
}

#[derive(Serialize)]
struct JsonDigest<'a> {
    subject: &'a str,
    summary: crate::models::DigestSummary,
    #[serde(flatten)]
    digest: &'a Digest,
}

/// Generate a JSON dump of the classified digest.
pub fn generate_json_report(digest: &Digest, subject: &str) -> Result<String> {
    let doc = JsonDigest {
        subject,
        summary: digest.summary(),
        digest,
    };
    serde_json::to_string_pretty(&doc).map_err(Into::into)
}
