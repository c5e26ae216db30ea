//! Answer composition: prompt assembly over retrieved chunks and the model call.

use anyhow::{Context, Result};

use crate::llm::ChatModel;
use crate::models::{Answer, RetrievalResult, SourceRef};

/// Returned when nothing relevant was retrieved, and the sentence the model is
/// told to reply with when the context does not contain the answer.
pub const NOT_FOUND_ANSWER: &str = "I could not find the answer in the uploaded documents.";

/// Chat-template control tokens that must not reach the model from user data.
const CONTROL_TOKENS: [&str; 3] = ["<|im_start|>", "<|im_end|>", "<|endoftext|>"];

/// Maximum characters in a source preview, ellipsis included.
pub const PREVIEW_CHARS: usize = 120;
const ELLIPSIS: &str = "...";

/// Answer `question` from `retrieval`.
///
/// The model's output is returned verbatim. The prompt instructs the model to
/// use only the supplied context, but nothing here verifies that it did: the
/// restriction is a prompt contract, not a guarantee.
pub async fn compose(
    model: &dyn ChatModel,
    question: &str,
    retrieval: &RetrievalResult,
) -> Result<Answer> {
    if retrieval.is_empty() {
        return Ok(Answer {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
        });
    }

    let prompt = build_prompt(question, retrieval);
    let answer = model
        .complete(&prompt)
        .await
        .context("Chat model failed to answer")?;

    Ok(Answer {
        answer,
        sources: collect_sources(retrieval),
    })
}

pub fn build_prompt(question: &str, retrieval: &RetrievalResult) -> String {
    let mut prompt = String::from(
        "You are an assistant that answers questions about uploaded PDF documents.\n\
         Answer ONLY from the numbered context excerpts below. Do not use outside \
         knowledge, guess, or make anything up.\n",
    );
    prompt.push_str(&format!(
        "If the excerpts do not contain the answer, reply exactly: \"{NOT_FOUND_ANSWER}\"\n"
    ));
    prompt.push_str("Refer to excerpts by their number, e.g. [1].\n\n[Context]\n");

    for (i, chunk) in retrieval.chunks.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] ({}, page {})\n{}\n\n",
            i + 1,
            sanitize_for_prompt(&chunk.metadata.filename),
            chunk.metadata.page,
            sanitize_for_prompt(chunk.content.trim())
        ));
    }

    prompt.push_str(&format!(
        "[Question]\n{}\n",
        sanitize_for_prompt(question.trim())
    ));
    prompt
}

/// One source per filename in first-seen order, with the distinct pages that
/// contributed.
pub fn collect_sources(retrieval: &RetrievalResult) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();

    for chunk in &retrieval.chunks {
        let meta = &chunk.metadata;
        match sources.iter_mut().find(|s| s.filename == meta.filename) {
            Some(source) => {
                if !source.pages.contains(&meta.page) {
                    source.pages.push(meta.page);
                }
            }
            None => sources.push(SourceRef {
                document_id: meta.document_id,
                filename: meta.filename.clone(),
                pages: vec![meta.page],
                preview: shorten_preview(&chunk.content, PREVIEW_CHARS),
            }),
        }
    }

    for source in &mut sources {
        source.pages.sort_unstable();
    }
    sources
}

/// Collapse whitespace and cut `text` to at most `width` characters on a word
/// boundary, ending in an ellipsis when anything was dropped. A first word
/// longer than the width is cut mid-word.
pub fn shorten_preview(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(ELLIPSIS.len());
    let mut out = String::new();
    let mut used = 0;
    for word in &words {
        let sep = usize::from(!out.is_empty());
        let len = word.chars().count();
        if used + sep + len > budget {
            break;
        }
        if sep == 1 {
            out.push(' ');
        }
        out.push_str(word);
        used += sep + len;
    }
    if out.is_empty() {
        out = collapsed.chars().take(budget).collect();
    }
    out.push_str(ELLIPSIS);
    out
}

pub fn sanitize_for_prompt(text: &str) -> String {
    CONTROL_TOKENS
        .iter()
        .fold(text.to_string(), |acc, token| acc.replace(token, ""))
}
