use std::fmt::Write as _;

use crate::knowledge::{title_case, KnowledgeEntity};

pub const CONTEXT_HEADER: &str = "## Relevant Medical Knowledge:";
pub const SOURCES_HEADER: &str = "### Medical Sources:";

/// Render matched entities and their citations for the generator prompt.
///
/// Each optional field gets its own labelled subsection; absent fields are
/// omitted entirely, as is the sources block when there are no citations.
pub fn format_context(entities: &[KnowledgeEntity], sources: &[String]) -> String {
    let mut out = String::new();
    out.push_str(CONTEXT_HEADER);
    out.push_str("\n\n");

    for entity in entities {
        let _ = writeln!(out, "### {}", entity.name);
        out.push_str(&entity.description);
        out.push_str("\n\n");

        if let Some(ranges) = &entity.normal_ranges {
            out.push_str("**Age-Specific Reference Ranges:**\n");
            for (label, range) in ranges.iter() {
                let _ = writeln!(out, "- {}: {}", range_label(label), range);
            }
            out.push('\n');
        }

        if let Some(interpretation) = &entity.interpretation {
            out.push_str("**Clinical Interpretation:**\n");
            for (level, meaning) in interpretation.iter() {
                let _ = writeln!(out, "- {}: {}", title_case(level), meaning);
            }
            out.push('\n');
        }

        if let Some(notes) = &entity.clinical_notes {
            push_list(&mut out, "**Important Clinical Notes:**", notes);
        }

        if let Some(impact) = &entity.fertility_impact {
            push_list(&mut out, "**Fertility Impact:**", impact);
        }

        if let Some(criteria) = &entity.diagnosis_criteria {
            let _ = write!(out, "**Diagnosis:** {criteria}\n\n");
        }

        if let Some(relationship) = &entity.amh_relationship {
            let _ = write!(out, "**AMH Relationship:** {relationship}\n\n");
        }
    }

    if !sources.is_empty() {
        out.push('\n');
        out.push_str(SOURCES_HEADER);
        out.push('\n');
        for source in sources {
            let _ = writeln!(out, "- {source}");
        }
    }

    out
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    out.push_str(heading);
    out.push('\n');
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

/// `age_31_35` → `age-31-35`, `age 31-35` → `Age 31-35`.
fn range_label(label: &str) -> String {
    label.replace('_', "-").replace("age ", "Age ")
}
