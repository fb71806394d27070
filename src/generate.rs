//! Report Generator: prompt assembly, context-budget chunking and the
//! sequential completion fold.
//!
//! Document bodies are rendered into provenance sections (name + date header)
//! and packed into chunks that never split a document. Chunks are completed
//! one after another; each request past the first carries a rolling summary of
//! the output so far, threaded through the loop as explicit state. Transient
//! endpoint failures retry with bounded backoff; anything else aborts before a
//! partial report can reach the publisher.

use tracing::{info, warn};

use crate::contract::{Completer, CompletionRequest, ExtractedDocument, GenerationError, ReportDraft};
use crate::retry::{retry_with_backoff, RetryPolicy};

pub const SYSTEM_PROMPT: &str = "You are an advanced personal development assistant, skilled in \
helping users gain deeper self-awareness and create practical action plans based on their daily \
notes. Your goal is to help the user uncover hidden aspects or patterns they may not notice, and \
guide them to a concrete 1-week plan to address opportunities or challenges. Provide thoughtful \
insights and constructive, realistic next steps.";

const ANALYSIS_TEMPLATE: &str = "Below is the user's journal or daily records for the specified \
period. Please read it carefully, and produce a thorough review that includes:\n\n\
1. Key Observations:\n\
   - Summarize the main themes, trends, and recurring patterns.\n\
2. Self-Awareness & Hidden Insights:\n\
   - Highlight any emotional/behavioral patterns the user might not realize.\n\
   - Discuss potential root causes or motivations.\n\
3. Reflection & Next Steps:\n\
   - Suggest how the user can reflect on these insights to learn more about themselves.\n\
   - Offer a clear and concrete 1-week action plan with steps for improvement, habit formation, \
or problem-solving.\n\n\
Be sure the final output helps the user gain new self-awareness and practical guidance for the \
coming week.";

#[derive(Debug, Clone, Copy)]
pub struct GenerateConfig {
    /// Input budget per completion request, in estimated tokens.
    pub context_budget_tokens: usize,
    /// Upper bound on the rolling summary carried between chunk requests.
    pub summary_budget_chars: usize,
    pub retry: RetryPolicy,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        // Leaves room for the prompt template and a 2500-token completion
        // inside an 8k context.
        Self {
            context_budget_tokens: 5000,
            summary_budget_chars: 2000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Rough token count: four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// One bounded slice of concatenated document sections.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
    pub document_ids: Vec<String>,
    pub text: String,
}

fn render_section(doc: &ExtractedDocument) -> String {
    format!(
        "=== {} ({}) ===\n{}\n",
        doc.document.name,
        doc.document.resolved_date,
        doc.body_text.trim_end()
    )
}

/// Greedily pack document sections into chunks under the token budget. A
/// document is never split: one whose section alone exceeds the budget gets a
/// chunk of its own (the endpoint may truncate it, but provenance stays whole).
pub fn chunk_documents(documents: &[ExtractedDocument], budget_tokens: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk::default();
    let mut current_tokens = 0usize;

    for doc in documents {
        let section = render_section(doc);
        let cost = estimate_tokens(&section);
        if !current.document_ids.is_empty() && current_tokens + cost > budget_tokens {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        if cost > budget_tokens {
            warn!(
                document_id = %doc.document.id,
                name = %doc.document.name,
                estimated_tokens = cost,
                budget_tokens,
                "Single document exceeds the context budget; sending it as its own chunk"
            );
        }
        current.document_ids.push(doc.document.id.clone());
        current.text.push_str(&section);
        current.text.push('\n');
        current_tokens += cost;
    }
    if !current.document_ids.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn render_user_prompt(chunk: &Chunk, carry: Option<&str>, index: usize, total: usize) -> String {
    let mut prompt = String::from(ANALYSIS_TEMPLATE);
    if total > 1 {
        prompt.push_str(&format!(
            "\n\nThe records are split into {total} parts; this is part {} in chronological \
order. Write the review for this part so it reads as a continuation.",
            index + 1
        ));
    }
    if let Some(summary) = carry {
        prompt.push_str("\n\nReview produced for the earlier parts (for continuity):\n");
        prompt.push_str(summary);
    }
    prompt.push_str("\n\n");
    prompt.push_str(&chunk.text);
    prompt
}

/// Tail of the output so far, carried into the next chunk's prompt.
fn rolling_summary(output: &str, budget_chars: usize) -> String {
    let trimmed = output.trim();
    let length = trimmed.chars().count();
    if length <= budget_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(length - budget_chars).collect()
}

/// Generate the report body from the extracted documents, in discovery order.
pub async fn generate<C: Completer>(
    completer: &C,
    documents: &[ExtractedDocument],
    config: &GenerateConfig,
) -> Result<ReportDraft, GenerationError> {
    let chunks = chunk_documents(documents, config.context_budget_tokens);
    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "Generating report"
    );

    let mut generated_text = String::new();
    // Rolling summary threaded explicitly through the chunk loop.
    let mut carry: Option<String> = None;

    for (index, chunk) in chunks.iter().enumerate() {
        let user_prompt = render_user_prompt(chunk, carry.as_deref(), index, chunks.len());
        info!(
            chunk = index + 1,
            of = chunks.len(),
            documents = chunk.document_ids.len(),
            prompt_tokens = estimate_tokens(&user_prompt),
            "Requesting completion for chunk"
        );
        let output = retry_with_backoff(config.retry, GenerationError::is_transient, || {
            completer.complete(CompletionRequest {
                system_prompt: SYSTEM_PROMPT,
                user_prompt: &user_prompt,
            })
        })
        .await?;

        if !generated_text.is_empty() {
            generated_text.push_str("\n\n");
        }
        generated_text.push_str(output.trim_end());
        carry = Some(rolling_summary(&output, config.summary_budget_chars));
    }

    Ok(ReportDraft {
        source_document_ids: documents
            .iter()
            .map(|d| d.document.id.clone())
            .collect(),
        generated_text,
    })
}
