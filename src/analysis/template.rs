// Prompt templates

use crate::types::*;
use crate::utils::StringValidator;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .expect("placeholder pattern is valid");
}

/// An instruction template with `{{name}}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    parameters: HashMap<String, String>,
    required_params: Vec<String>,
}

impl PromptTemplate {
    /// Create a template, extracting its placeholder names
    ///
    /// # Example
    /// ```
    /// use review_insights::analysis::PromptTemplate;
    ///
    /// let template = PromptTemplate::new("Отзыв: {{review_text}}").unwrap();
    /// assert_eq!(template.required_params(), ["review_text"]);
    /// ```
    pub fn new(template: impl Into<String>) -> InsightResult<Self> {
        let template = StringValidator::not_empty(template, "template")?;

        let mut required_params: Vec<String> = Vec::new();
        for cap in PLACEHOLDER_REGEX.captures_iter(&template) {
            let name = cap[1].to_string();
            if !required_params.contains(&name) {
                required_params.push(name);
            }
        }

        if required_params.is_empty() {
            return Err(InsightError::TemplateError(
                "Template must contain at least one {{param}} placeholder".into()
            ));
        }

        Ok(Self {
            template,
            parameters: HashMap::new(),
            required_params,
        })
    }

    pub fn required_params(&self) -> &[String] {
        &self.required_params
    }

    /// Bind a value to a placeholder.
    ///
    /// Values are substituted verbatim, including empty strings.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> InsightResult<Self> {
        let name = name.into();

        if !self.required_params.contains(&name) {
            return Err(InsightError::TemplateError(
                format!("Unknown parameter '{}'. Available parameters: {}",
                        name, self.required_params.join(", "))
            ));
        }

        self.parameters.insert(name, value.into());
        Ok(self)
    }

    /// Replace every placeholder with its bound value in a single pass.
    ///
    /// Placeholder-like text inside a bound value is left as is.
    pub fn render(&self) -> InsightResult<String> {
        let missing_params: Vec<&str> = self.required_params.iter()
            .filter(|p| !self.parameters.contains_key(*p))
            .map(String::as_str)
            .collect();

        if !missing_params.is_empty() {
            return Err(InsightError::TemplateError(
                format!("Missing required parameter(s): {}", missing_params.join(", "))
            ));
        }

        let rendered = PLACEHOLDER_REGEX.replace_all(&self.template, |cap: &Captures| {
            self.parameters.get(&cap[1]).cloned().unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }
}
