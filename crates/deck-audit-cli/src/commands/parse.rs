use clap::Args;
use serde::Serialize;
use serde_json::json;

use deck_audit_core::parser::{parse_display, CellFormat};
use rust_decimal::Decimal;

use crate::commands::CommandOutput;

/// Arguments for parsing display strings
#[derive(Args)]
pub struct ParseArgs {
    /// Display strings as they appear in a deck, e.g. "$1,234.50" "(500)" "12.3%"
    #[arg(required = true, allow_hyphen_values = true)]
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ParsedText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CellFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn parse_texts(texts: &[String]) -> Vec<ParsedText> {
    texts
        .iter()
        .map(|text| match parse_display(text) {
            Ok(parsed) => ParsedText {
                text: text.clone(),
                value: parsed.value(),
                format: Some(parsed.format()),
                error: None,
            },
            Err(e) => ParsedText {
                text: text.clone(),
                value: None,
                format: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Exits 1 when any text fails to parse.
pub fn run_parse(args: ParseArgs) -> Result<CommandOutput, Box<dyn std::error::Error>> {
    let parsed = parse_texts(&args.texts);
    let failures = parsed.iter().filter(|p| p.error.is_some()).count();
    Ok(CommandOutput {
        value: json!({ "result": parsed, "warnings": [] }),
        exit_code: if failures > 0 { 1 } else { 0 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mixed_inputs() {
        let parsed = parse_texts(&texts(&["$1,234.50", "(500)", "-", "12.3%", "N/A*"]));
        assert_eq!(parsed[0].value, Some(dec!(1234.50)));
        assert_eq!(parsed[0].format, Some(CellFormat::Currency));
        assert_eq!(parsed[1].value, Some(dec!(-500)));
        assert_eq!(parsed[2].value, None);
        assert_eq!(parsed[2].format, Some(CellFormat::Placeholder));
        assert_eq!(parsed[3].format, Some(CellFormat::Percent));
        assert!(parsed[4].error.is_some());
    }

    #[test]
    fn test_failure_sets_exit_code() {
        let out = run_parse(ParseArgs {
            texts: texts(&["£127K", "abc"]),
        })
        .unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.value["result"][0]["value"], "127000");
    }
}
