//! Prompt construction for the analysis and amendment steps.
//!
//! Both prompts are pure functions of their inputs: no clock, no
//! randomness, no hash-ordered iteration. The output schema shown to the
//! model is rendered from [`crate::response::FIELDS`], the same table the
//! parser validates against.

use std::fmt::Write;

use crate::catalog::Catalog;
use crate::response::{self, FieldKind, FIELDS, SATISFIED};
use crate::types::AmendmentSuggestion;

/// Opening delimiter of a changed span in an amended text.
pub const CHANGE_MARKER_OPEN: &str = "[[";

/// Closing delimiter of a changed span in an amended text.
pub const CHANGE_MARKER_CLOSE: &str = "]]";

const ANALYSIS_INTRO: &str = "\
Der Digitalcheck unterstützt bei der Erarbeitung von digitaltauglichen Regelungsvorhaben.
Beurteile für jedes unten aufgeführte Prinzip, ob das Gesetz es erfüllt.";

const AMENDMENT_INTRO: &str = "\
Bei einer Prüfung des Gesetzes auf Digitaltauglichkeit wurden die folgenden Mängel festgestellt.
Überarbeite den Gesetzestext so, dass jeder Änderungsvorschlag umgesetzt wird.";

const AMENDMENT_RULES: &str = "\
- Behalte die Gliederung (Paragraphen, Absätze, Nummern) und die Regeln der Gesetzesredaktion bei.
- Ändere nur, was für die Umsetzung der Vorschläge erforderlich ist.
- Gib ausschließlich den überarbeiteten Gesetzestext zurück, ohne Erläuterungen.";

/// Renders prompts for one catalog.
pub struct PromptBuilder<'a> {
    catalog: &'a Catalog,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Build the analysis instruction for a law text.
    ///
    /// The prompt embeds the text verbatim, the output example, the
    /// per-field rules and the catalog in order.
    pub fn analysis_prompt(&self, law_text: &str) -> String {
        let example = serde_json::to_string_pretty(&response::example(self.catalog))
            .unwrap_or_default();

        let mut prompt = String::new();
        push_law_text(&mut prompt, law_text);

        prompt.push_str(ANALYSIS_INTRO);
        prompt.push_str("\n\nGib die Antwort zwingend als JSON-Objekt in genau der folgenden Struktur zurück. ");
        prompt.push_str("Ersetze die Platzhalter durch echte JSON-Werte; verwende keine anderen Feldnamen.\n\n");
        prompt.push_str(&example);
        prompt.push_str("\n\nFür jedes Prinzip:\n");
        for field in &FIELDS {
            let _ = writeln!(prompt, "- `\"{}\"`: {}", field.name, field.rule);
        }

        let nullable: Vec<String> = FIELDS
            .iter()
            .filter(|f| f.kind == FieldKind::OptionalText)
            .map(|f| format!("`\"{}\"`", f.name))
            .collect();
        let _ = writeln!(
            prompt,
            "\nWichtig: {} müssen `null` sein, wenn `\"{}\"` nicht `false` ist.",
            nullable.join(" und "),
            SATISFIED
        );

        prompt.push_str("\n**Prinzipien:**\n");
        for category in self.catalog.categories() {
            let _ = writeln!(prompt, "**{}:**", category.name);
            for principle in &category.principles {
                let _ = writeln!(prompt, "- {}", principle);
            }
        }

        prompt
    }

    /// Build the amendment instruction for a law text and its findings.
    pub fn amendment_prompt(law_text: &str, suggestions: &[AmendmentSuggestion]) -> String {
        let mut prompt = String::new();
        push_law_text(&mut prompt, law_text);

        prompt.push_str(AMENDMENT_INTRO);
        prompt.push_str("\n\n**Mängel und Änderungsvorschläge:**\n");
        for (i, s) in suggestions.iter().enumerate() {
            let _ = writeln!(prompt, "{}. [{}] {}", i + 1, s.category, s.principle);
            if let Some(quote) = &s.quoted_passage {
                let _ = writeln!(prompt, "   Betroffene Passage: \"{}\"", quote);
            }
            let _ = writeln!(prompt, "   Änderungsvorschlag: {}", s.suggested_change);
        }

        prompt.push_str("\n**Vorgaben:**\n");
        prompt.push_str(AMENDMENT_RULES);
        let _ = writeln!(
            prompt,
            "\n- Kennzeichne jede geänderte oder neu eingefügte Passage, indem du sie in {} und {} einschließt.",
            CHANGE_MARKER_OPEN, CHANGE_MARKER_CLOSE
        );

        prompt
    }
}

fn push_law_text(prompt: &mut String, law_text: &str) {
    prompt.push_str("Das folgende Dokument ist ein Gesetz:\n\n<<<\n");
    prompt.push_str(law_text);
    prompt.push_str("\n>>>\n\n");
}
