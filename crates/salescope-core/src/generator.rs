//! Prompt-to-code generation.
//!
//! Turns a natural-language analysis request into a plain Python source
//! string by calling the completion collaborator with a fixed system
//! instruction and cleaning up the response. The instruction text is the
//! only steering mechanism over the collaborator, and the collaborator may
//! ignore its formatting constraints, so fence stripping is mandatory.
//! No semantic or safety validation happens here: isolation is enforced by
//! the sandbox, not by inspecting the generated code.

use crate::errors::PipelineError;
use crate::llm::CompletionClient;
use regex::Regex;
use std::sync::Arc;

/// System instruction sent with every request. Describes the dataset schema
/// so the generated code reads the right columns, requires printed output,
/// and forbids dynamic code execution.
const SYSTEM_INSTRUCTION: &str = r#"You generate Python code for sales data analysis using pandas, numpy, and matplotlib/seaborn.

The CSV file 'sales.csv' has these columns:
- date: Date of sale
- product: Product name
- category: Product category (Casual Wear, Formal Wear)
- region: Sales region (North, South, East, West)
- revenue: Revenue amount
- units_sold: Number of units sold
- gender: Customer gender (Male, Female)
- age_group: Customer age group (18-24, 25-34, 35-44)

For counting total sales per product, use the 'units_sold' column instead of just counting rows.

CRITICAL: Your code MUST include print() statements to display results. Always print the final answer or analysis results.

Do not use eval() or exec().

Return only the Python code, no explanations, no markdown formatting, no code blocks."#;

/// Remove markdown code-fence markers, language-tagged or not, and trim
/// surrounding whitespace. Idempotent: fence-free code passes through
/// unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let re = Regex::new(r"```[A-Za-z0-9_+-]*\n?").expect("fence pattern is valid");
    re.replace_all(text, "").trim().to_string()
}

/// Translates a user prompt into executable Python source.
pub struct CodeGenerator {
    client: Arc<dyn CompletionClient>,
}

impl CodeGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let completion = self.client.complete(SYSTEM_INSTRUCTION, prompt).await?;

        let code = strip_code_fences(&completion);
        if code.is_empty() {
            return Err(PipelineError::Generation(
                "Completion service returned an empty response".to_string(),
            ));
        }

        log::debug!("Generated {} bytes of code", code.len());
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedCompletion(String);

    #[async_trait]
    impl CompletionClient for FixedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, PipelineError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_strip_tagged_fences() {
        let fenced = "```python\nprint('hi')\n```";
        assert_eq!(strip_code_fences(fenced), "print('hi')");
    }

    #[test]
    fn test_strip_untagged_fences() {
        let fenced = "```\nprint('hi')\n```\n";
        assert_eq!(strip_code_fences(fenced), "print('hi')");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let fenced = "```python\nimport pandas as pd\nprint(df)\n```";
        let once = strip_code_fences(fenced);
        let twice = strip_code_fences(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fence_free_code_unchanged() {
        let code = "import pandas as pd\nprint(pd.read_csv('sales.csv').head())";
        assert_eq!(strip_code_fences(code), code);
    }

    #[tokio::test]
    async fn test_generate_strips_fences_from_completion() {
        let generator = CodeGenerator::new(Arc::new(FixedCompletion(
            "```python\nprint('total')\n```".to_string(),
        )));
        let code = generator.generate("total units sold").await.unwrap();
        assert_eq!(code, "print('total')");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_completion() {
        let generator = CodeGenerator::new(Arc::new(FixedCompletion("```python\n```".to_string())));
        let err = generator.generate("anything").await.unwrap_err();
        match err {
            PipelineError::Generation(msg) => assert!(msg.contains("empty response")),
            other => panic!("expected Generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_instruction_names_schema_columns() {
        for column in [
            "date",
            "product",
            "category",
            "region",
            "revenue",
            "units_sold",
            "gender",
            "age_group",
        ] {
            assert!(SYSTEM_INSTRUCTION.contains(column), "missing column {}", column);
        }
        assert!(SYSTEM_INSTRUCTION.contains("print()"));
    }
}
