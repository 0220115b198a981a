/// Prompt template for scoring one posting against a résumé. Rendered with
/// [`render`], which uses literal `str::replace` rather than `format!` so a
/// `{` or `}` inside the résumé text or job description can never be
/// mistaken for a template placeholder.
const RESUME_MATCH_PROMPT_TEMPLATE: &str = r"You are an expert recruiter. Score how well the candidate's résumé matches the job posting below.

Job title: __JOB_TITLE__
Company: __COMPANY__
Job description:
__JOB_DESCRIPTION__

Candidate résumé:
__RESUME_TEXT__

Respond with a single JSON object with exactly these fields:
{
  \"matching_score\": integer 0-100,
  \"summary\": one-sentence overall verdict,
  \"strengths\": array of short strings,
  \"gaps\": array of short strings,
  \"recommendations\": array of short strings,
  \"reasoning\": one paragraph explaining the score
}

Respond with only the JSON object, no surrounding prose.";

pub struct ResumeMatchInputs<'a> {
    pub job_title: &'a str,
    pub company: &'a str,
    pub job_description: &'a str,
    pub resume_text: &'a str,
}

#[must_use]
pub fn render_resume_match_prompt(inputs: &ResumeMatchInputs<'_>) -> String {
    RESUME_MATCH_PROMPT_TEMPLATE
        .replace("__JOB_TITLE__", inputs.job_title)
        .replace("__COMPANY__", inputs.company)
        .replace("__JOB_DESCRIPTION__", inputs.job_description)
        .replace("__RESUME_TEXT__", inputs.resume_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_all_placeholders_literally() {
        let inputs = ResumeMatchInputs {
            job_title: "Backend Engineer",
            company: "Acme",
            job_description: "Loves curly braces: {not a placeholder}",
            resume_text: "5 years Rust, some {json} experience",
        };

        let rendered = render_resume_match_prompt(&inputs);

        assert!(rendered.contains("Backend Engineer"));
        assert!(rendered.contains("Acme"));
        assert!(rendered.contains("Loves curly braces: {not a placeholder}"));
        assert!(rendered.contains("5 years Rust, some {json} experience"));
        assert!(!rendered.contains("__JOB_TITLE__"));
        assert!(!rendered.contains("__RESUME_TEXT__"));
    }
}
