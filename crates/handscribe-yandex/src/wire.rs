//! Request and response bodies of the recognition API.

use serde::{Deserialize, Serialize};

/// Body of a `recognizeText` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognizeRequest<'a> {
    pub mime_type: &'a str,
    pub language_codes: &'a [String],
    pub model: &'a str,
    /// Base64-encoded image bytes.
    pub content: String,
}

/// Body of a `recognizeText` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognizeResponse {
    #[serde(default)]
    pub result: RecognizeResult,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognizeResult {
    #[serde(default)]
    pub text_annotation: TextAnnotation,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TextAnnotation {
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Block {
    #[serde(default)]
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Line {
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Word {
    #[serde(default)]
    pub text: String,
}

/// Error object embedded in an otherwise successful response.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Accepts the error code as either a number or a string.
fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl RecognizeResponse {
    /// Returns the embedded error message when one is present.
    pub fn error_message(&self) -> Option<&ApiError> {
        self.error.as_ref().filter(|e| !e.message.is_empty())
    }

    /// Returns the recognized text, trimmed.
    ///
    /// `fullText` wins when present. Otherwise the text is rebuilt from the
    /// layout: words joined by single spaces, lines by newlines.
    pub fn text(&self) -> String {
        let annotation = &self.result.text_annotation;
        if !annotation.full_text.is_empty() {
            return annotation.full_text.trim().to_owned();
        }

        let lines: Vec<String> = annotation
            .blocks
            .iter()
            .flat_map(|block| &block.lines)
            .map(|line| {
                line.words
                    .iter()
                    .map(|word| word.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        lines.join("\n").trim().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> RecognizeResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_full_text_wins_over_blocks() {
        let response = parse(
            r#"{"result":{"textAnnotation":{
                "fullText":"  Привет мир \n",
                "blocks":[{"lines":[{"words":[{"text":"ignored"}]}]}]
            }}}"#,
        );
        assert_eq!(response.text(), "Привет мир");
    }

    #[test]
    fn test_text_rebuilt_from_blocks() {
        let response = parse(
            r#"{"result":{"textAnnotation":{
                "fullText":"",
                "blocks":[
                    {"lines":[
                        {"words":[{"text":"мама"},{"text":"мыла"}]},
                        {"words":[{"text":"раму"}]}
                    ]},
                    {"lines":[{"words":[{"text":"конец"}]}]}
                ]
            }}}"#,
        );
        assert_eq!(response.text(), "мама мыла\nраму\nконец");
    }

    #[test]
    fn test_whitespace_only_text_is_empty() {
        let response = parse(r#"{"result":{"textAnnotation":{"fullText":"  \n\t "}}}"#);
        assert_eq!(response.text(), "");

        let response = parse(r#"{"result":{}}"#);
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_embedded_error_detected() {
        let response = parse(r#"{"error":{"code":8,"message":"quota exceeded"}}"#);
        let error = response.error_message().unwrap();
        assert_eq!(error.message, "quota exceeded");
        assert_eq!(error.code, "8");

        let response = parse(r#"{"error":{"code":"","message":""}}"#);
        assert!(response.error_message().is_none());
    }

    #[test]
    fn test_request_uses_camel_case() {
        let languages = vec!["ru".to_owned()];
        let request = RecognizeRequest {
            mime_type: "image/jpeg",
            language_codes: &languages,
            model: "handwritten",
            content: "AAEC".to_owned(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mimeType": "image/jpeg",
                "languageCodes": ["ru"],
                "model": "handwritten",
                "content": "AAEC"
            })
        );
    }
}
