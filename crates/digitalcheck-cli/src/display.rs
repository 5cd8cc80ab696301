//! Plain-text rendering for terminal output.

use digitalcheck_core::{Catalog, Satisfaction, PASSAGE_SEPARATOR};
use digitalcheck_runtime::{PipelineReport, ProviderRegistry, RuntimeConfig};

pub fn render_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    for (i, category) in catalog.categories().iter().enumerate() {
        out += &format!("{}. {}\n", i + 1, category.name);
        for principle in &category.principles {
            out += &format!("   - {}\n", principle);
        }
    }
    out
}

/// One line per configured model, with credential status.
pub fn render_models(config: &RuntimeConfig, providers: &ProviderRegistry) -> String {
    let mut out = String::new();
    for model in &config.models {
        let mode = if model.structured_output {
            "structured-json"
        } else {
            "freeform"
        };
        let status = match providers.validate(&model.provider, &model.settings) {
            Ok(()) => "ready".to_string(),
            Err(e) => e.to_string(),
        };
        out += &format!(
            "{:<36} {:<10} {:<16} {}\n",
            model.id, model.provider, mode, status
        );
    }
    out
}

pub fn render_report(report: &PipelineReport) -> String {
    let mut out = format!("Digitalcheck ({})\n", report.model);

    for group in &report.analysis.categories {
        out += &format!("\n== {} ==\n", group.category);
        for verdict in &group.verdicts {
            out += &format!(
                "[{}] {}\n",
                verdict.satisfied.label(),
                verdict.principle
            );
            out += &format!("    Begründung: {}\n", verdict.justification);
            if let Some(quote) = &verdict.quoted_passage {
                let passages: Vec<&str> = quote.split(PASSAGE_SEPARATOR).collect();
                out += &format!("    Zitat: {}\n", passages.join("\n           "));
            }
            if let Some(change) = &verdict.suggested_change {
                out += &format!("    Änderungsvorschlag: {}\n", change);
            }
        }
    }

    out += &format!(
        "\n{} Prinzipien geprüft: {} erfüllt, {} nicht erfüllt, {} ohne Aussage\n",
        report.analysis.len(),
        report.analysis.count(Satisfaction::Satisfied),
        report.analysis.count(Satisfaction::Violated),
        report.analysis.count(Satisfaction::Indeterminate),
    );

    for repair in &report.analysis.contract_repairs {
        out += &format!(
            "Hinweis: bei '{}' wurden unzulässige Felder verworfen: {}\n",
            repair.principle,
            repair.dropped.join(", ")
        );
    }

    for finding in &report.quote_findings {
        out += &format!(
            "Warnung: Zitat zu '{}' nicht im Gesetzestext gefunden ({})\n",
            finding.principle, finding.reason
        );
    }

    match &report.amended_text {
        Some(text) => {
            out += &format!(
                "\n== Überarbeiteter Text ({} Vorschläge) ==\n{}\n",
                report.suggestions.len(),
                text
            );
        }
        None if report.suggestions.is_empty() => {
            out += "\nKeine Änderungsvorschläge.\n";
        }
        None => {
            out += &format!(
                "\n{} Änderungsvorschläge, Überarbeitung nicht angefordert.\n",
                report.suggestions.len()
            );
        }
    }

    out += &format!(
        "\n{} Aufrufe, {} Tokens ({} Eingabe, {} Ausgabe)\n",
        report.usage.llm_calls,
        report.usage.total_tokens,
        report.usage.input_tokens,
        report.usage.output_tokens
    );
    out
}
