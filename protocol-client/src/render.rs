//! Projection of an [`AnalysisResult`] into what the user sees: a summary
//! panel, one card per drug, and text output for terminals.

use std::fmt;

use chrono::NaiveDateTime;

use crate::{
    locale::{Locale, Messages},
    models::{AnalysisResult, Drug, ResearchResults, non_blank},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPanel {
    pub summary: String,
    pub main_condition: Option<String>,
}

/// A drug entry with placeholders already applied. The always-visible fields
/// are plain strings; the optional lines stay `Option`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrugCard {
    pub title: String,
    pub inn_english: Option<String>,
    pub dosage: String,
    pub route: String,
    pub frequency: String,
    pub duration: String,
    pub indication: Option<String>,
}

impl DrugCard {
    pub fn project(drug: &Drug, messages: &Messages) -> Self {
        let or_placeholder = |value: &Option<String>| {
            non_blank(value.as_deref())
                .unwrap_or(messages.not_specified)
                .to_string()
        };

        Self {
            title: non_blank(drug.name.as_deref())
                .unwrap_or(messages.name_not_specified)
                .to_string(),
            inn_english: non_blank(drug.inn_english.as_deref()).map(str::to_string),
            dosage: or_placeholder(&drug.dosage),
            route: or_placeholder(&drug.route),
            frequency: or_placeholder(&drug.frequency),
            duration: or_placeholder(&drug.duration),
            indication: non_blank(drug.indication.as_deref()).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultView {
    pub analyzed_at: Option<NaiveDateTime>,
    pub summary: Option<SummaryPanel>,
    pub drugs: Vec<DrugCard>,
    messages: &'static Messages,
}

impl ResultView {
    pub fn project(result: &AnalysisResult, locale: Locale) -> Self {
        let messages = locale.messages();

        let summary = non_blank(result.protocol_summary.as_deref()).map(|summary| SummaryPanel {
            summary: summary.to_string(),
            main_condition: non_blank(result.main_condition.as_deref()).map(str::to_string),
        });

        let drugs = result
            .drugs()
            .iter()
            .map(|drug| DrugCard::project(drug, messages))
            .collect();

        Self {
            analyzed_at: result.analyzed_at(),
            summary,
            drugs,
            messages,
        }
    }

    /// Shown in place of the drug list when nothing was extracted.
    pub fn no_drugs_notice(&self) -> Option<&'static str> {
        self.drugs.is_empty().then_some(self.messages.no_drugs)
    }

    pub fn disclaimer(&self) -> &'static str {
        self.messages.disclaimer
    }
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.messages;

        writeln!(f, "{}", m.results_title)?;
        writeln!(f, "{}", "=".repeat(m.results_title.chars().count()))?;
        writeln!(f, "{}", m.disclaimer)?;
        if let Some(at) = self.analyzed_at {
            writeln!(f, "{}: {}", m.analyzed_at, at.format("%Y-%m-%d %H:%M:%S"))?;
        }

        if let Some(panel) = &self.summary {
            writeln!(f)?;
            writeln!(f, "{}", m.summary_title)?;
            for line in panel.summary.lines() {
                writeln!(f, "  {}", line)?;
            }
            if let Some(condition) = &panel.main_condition {
                writeln!(f, "  {}: {}", m.main_condition, condition)?;
            }
        }

        writeln!(f)?;
        if let Some(notice) = self.no_drugs_notice() {
            return writeln!(f, "{}", notice);
        }

        writeln!(f, "{}", m.drugs_title)?;
        for (index, card) in self.drugs.iter().enumerate() {
            writeln!(f, "{}. {}", index + 1, card.title)?;
            if let Some(inn) = &card.inn_english {
                writeln!(f, "   {}: {}", m.inn_english, inn)?;
            }
            writeln!(f, "   {}: {}", m.dosage, card.dosage)?;
            writeln!(f, "   {}: {}", m.route, card.route)?;
            writeln!(f, "   {}: {}", m.frequency, card.frequency)?;
            writeln!(f, "   {}: {}", m.duration, card.duration)?;
            if let Some(indication) = &card.indication {
                writeln!(f, "   {}: {}", m.indication, indication)?;
            }
        }
        Ok(())
    }
}

/// Plain-text listing of a research lookup.
pub fn render_research(drug_name: &str, research: &ResearchResults) -> String {
    let mut out = format!("Research: {}\n", drug_name);

    if research.is_empty() {
        out.push_str("  (no results)\n");
        return out;
    }

    if !research.pubmed.is_empty() {
        out.push_str("PubMed\n");
        for article in &research.pubmed {
            out.push_str(&format!(
                "  [{}] {} ({} {}) {}\n",
                article.study_type, article.title, article.journal, article.year, article.url
            ));
        }
    }
    if !research.clinical_trials.is_empty() {
        out.push_str("ClinicalTrials.gov\n");
        for trial in &research.clinical_trials {
            out.push_str(&format!(
                "  {} {} [{}; {}] {}\n",
                trial.nct_id, trial.title, trial.status, trial.phase, trial.url
            ));
        }
    }
    if !research.fda.is_empty() {
        out.push_str("FDA\n");
        for application in &research.fda {
            out.push_str(&format!(
                "  {} {} {}\n",
                application.application_number, application.sponsor_name, application.url
            ));
        }
    }
    out
}
