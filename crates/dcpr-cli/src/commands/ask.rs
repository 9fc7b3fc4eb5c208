use crate::cli::AskArgs;
use crate::output::OutputWriter;
use crate::output_types::AnswerOutput;
use crate::progress::spinner_for;
use anyhow::{Context, Result};
use console::style;
use dcpr_core::config::LayeredConfig;
use dcpr_retrieval::{ConfiguredPipeline, RetrievalResult};

pub async fn execute(
    args: AskArgs,
    config: &LayeredConfig,
    output: &OutputWriter,
    explain: bool,
) -> Result<()> {
    let pipeline = open_pipeline(config)?;

    let spinner = spinner_for(output.is_json(), "Searching the regulations...");
    let result = pipeline.answer_question(&args.question, &[]).await;
    spinner.finish_and_clear();

    let result = result.context("Failed to answer question")?;
    render_answer(output, &args.question, &result, explain)
}

/// Validate the configuration and assemble the configured pipeline
pub(crate) fn open_pipeline(config: &LayeredConfig) -> Result<ConfiguredPipeline> {
    config.validate()?;
    ConfiguredPipeline::from_config(config).with_context(|| {
        format!(
            "Failed to open the index at {}. Run 'dcpr ingest <document>' first.",
            config.index_path.value.display()
        )
    })
}

/// Print an answer with its sources, and the search details when asked
pub(crate) fn render_answer(
    output: &OutputWriter,
    question: &str,
    result: &RetrievalResult,
    explain: bool,
) -> Result<()> {
    let answer = AnswerOutput::new(question, result, explain);

    if output.is_json() {
        return output.result(answer);
    }

    output.section("Answer");
    output.text(&answer.answer);

    if answer.sources.is_empty() {
        output.info("No regulation passages matched this question");
    } else {
        output.section("Sources");
        for (i, source) in answer.sources.iter().enumerate() {
            output.text(format!(
                "\n{}. {} {}",
                i + 1,
                style(source.regulation_id.as_deref().unwrap_or("Unlabelled passage")).bold(),
                style(format!("(relevance: {:.2})", source.relevance)).dim()
            ));
            output.text(format!("   {}", source.excerpt.replace('\n', "\n   ")));
        }
    }

    if let Some(explanation) = &answer.explanation {
        output.section("Explanation");
        output.kv("Standalone Question", &explanation.standalone_question);
        output.kv("Search Text", &explanation.search_text);
        output.kv("Filter", explanation.filter.as_deref().unwrap_or("none"));
        output.kv("Candidates", explanation.candidates_considered);
        for rejection in &explanation.rejected {
            output.warning(format!("Dropped filter fragment: {}", rejection));
        }
        for (i, source) in answer.sources.iter().enumerate() {
            output.kv(
                format!("  {}. Scores", i + 1),
                format!("similarity {:.3}, relevance {:.3}", source.similarity, source.relevance),
            );
        }
    }

    Ok(())
}
