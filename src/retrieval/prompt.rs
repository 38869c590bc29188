//! Generation prompt assembly.
//!
//! The instruction block encodes the city's answer-formatting rules; the
//! retrieved chunks become a numbered context section and the citizen's
//! original, un-enhanced question closes the prompt.

use crate::knowledge::Chunk;

/// Render retrieved chunks into a numbered context block.
pub fn build_context(evidence: &[Chunk]) -> String {
    let mut context = String::new();
    for (i, chunk) in evidence.iter().enumerate() {
        context.push_str(&format!(
            "[{}] {}\n{}\n\n",
            i + 1,
            chunk.metadata.title,
            chunk.text.trim_end()
        ));
    }
    context.trim_end().to_string()
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful city information assistant. Use the following context to answer \
         the citizen's question about city services, facilities, and policies.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Instructions:\n\
         - Provide accurate, helpful information based on the context\n\
         - Include specific details like addresses, phone numbers, hours, and fees when available\n\
         - If you don't have enough information, say so clearly\n\
         - Be concise but comprehensive\n\
         - Format important information clearly\n\
         - If the question refers to a sector or zone not explicitly mentioned in the context, \
         explain that the city uses zone designations (A, B, C, D, E) instead of sectors\n\
         - For questions about building permits, include form numbers, required documents, fees, \
         and contact information\n\
         - For questions about business licenses, include application steps, fees, and renewal \
         information\n\
         - For questions about waste collection, include pickup schedules for different zones\n\
         - For questions about library hours, include opening times for different days and \
         location details\n\
         \n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::DocMetadata;

    fn chunk(title: &str, text: &str) -> Chunk {
        Chunk {
            id: "c".to_string(),
            text: text.to_string(),
            metadata: DocMetadata {
                id: "1".to_string(),
                title: title.to_string(),
                category: "c".to_string(),
                source_category: "c".to_string(),
            },
            start_offset: 0,
            chunk_index: 0,
        }
    }

    #[test]
    fn context_is_numbered_and_titled() {
        let context = build_context(&[
            chunk("Library Hours", "Open 9am-6pm.\n"),
            chunk("Waste Zones", "Zone A: Monday.\n"),
        ]);

        assert!(context.starts_with("[1] Library Hours\nOpen 9am-6pm."));
        assert!(context.contains("[2] Waste Zones\nZone A: Monday."));
    }

    #[test]
    fn prompt_embeds_context_and_original_question() {
        let prompt = build_prompt("[1] T\nsome facts", "What are the library hours?");

        assert!(prompt.contains("Context:\n[1] T\nsome facts\n"));
        assert!(prompt.contains("Question: What are the library hours?\n"));
        assert!(prompt.contains("zone designations (A, B, C, D, E)"));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }
}
