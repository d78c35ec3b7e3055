use clap::Args;
use std::fs;

use deck_audit_core::config::AuditConfig;
use deck_audit_core::orchestrator::Auditor;
use deck_audit_core::types::Granularity;

use crate::commands::CommandOutput;
use crate::input::{self, GridInput, SourceFile};
use crate::output::json::render_json;

/// Arguments for a full deck audit
#[derive(Args)]
pub struct ValidateArgs {
    /// Source records: JSON array or CSV with entity,channel,period,spend,impressions,grps,reach
    #[arg(long)]
    pub source: String,

    /// Extracted deck grid as JSON, or "-" to read it from stdin
    #[arg(long)]
    pub grid: String,

    /// Audit configuration (YAML or JSON); defaults apply to missing keys
    #[arg(long)]
    pub config: Option<String>,

    /// Period granularity of the deck (overrides the config file)
    #[arg(long)]
    pub granularity: Option<Granularity>,

    /// Also write the full JSON report to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Treat the first unreadable cell as fatal
    #[arg(long)]
    pub strict: bool,
}

pub fn run_validate(args: ValidateArgs) -> Result<CommandOutput, Box<dyn std::error::Error>> {
    let mut config: AuditConfig = match args.config {
        Some(ref path) => input::file::read_config(path)?,
        None => AuditConfig::default(),
    };
    if let Some(granularity) = args.granularity {
        config.granularity = granularity;
    }
    if args.strict {
        config.fatal_on_unparseable = true;
    }

    // Unreadable inputs surface as a fatal verdict, not as a CLI error.
    let source = SourceFile::new(&args.source);
    let grid = GridInput::from_arg(&args.grid);
    let result = Auditor::new(config).run(source, grid);

    let exit_code = result.result.verdict.exit_code();
    let value = serde_json::to_value(&result)?;

    if let Some(ref path) = args.report {
        fs::write(path, render_json(&value)?)
            .map_err(|e| format!("Failed to write report '{}': {}", path, e))?;
    }

    Ok(CommandOutput { value, exit_code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SOURCE_CSV: &str = "entity,channel,period,spend\nAlpha,TV,Jan,100\nAlpha,TV,Feb,200\n";

    fn grid_json(total: &str) -> String {
        format!(
            r#"{{"tables":[{{"header":["CAMPAIGN","MEDIA","JAN","FEB","TOTAL"],"cells":[
                {{"row":0,"col":0,"text":"Alpha"}},
                {{"row":0,"col":1,"text":"TV"}},
                {{"row":0,"col":2,"text":"$100.00"}},
                {{"row":0,"col":3,"text":"$200.00"}},
                {{"row":0,"col":4,"text":"{total}"}}
            ]}}]}}"#
        )
    }

    fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args(source: &NamedTempFile, grid: &str) -> ValidateArgs {
        ValidateArgs {
            source: source.path().to_string_lossy().into_owned(),
            grid: grid.to_string(),
            config: None,
            granularity: None,
            report: None,
            strict: false,
        }
    }

    #[test]
    fn test_clean_deck_exits_zero() {
        let source = temp_file(".csv", SOURCE_CSV);
        let grid = temp_file(".json", &grid_json("$300.00"));
        let out = run_validate(args(&source, &grid.path().to_string_lossy())).unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.value["result"]["verdict"], "pass");
    }

    #[test]
    fn test_mismatch_exits_one_and_writes_report() {
        let source = temp_file(".csv", SOURCE_CSV);
        let grid = temp_file(".json", &grid_json("$250.00"));
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.json");

        let mut a = args(&source, &grid.path().to_string_lossy());
        a.report = Some(report_path.to_string_lossy().into_owned());
        let out = run_validate(a).unwrap();

        assert_eq!(out.exit_code, 1);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(written["result"]["verdict"], "fail");
        assert_eq!(written["result"]["counts"]["mismatched"], 1);
    }

    #[test]
    fn test_missing_grid_is_fatal() {
        let source = temp_file(".csv", SOURCE_CSV);
        let out = run_validate(args(&source, "/nonexistent/deck.json")).unwrap();
        assert_eq!(out.exit_code, 2);
        assert_eq!(out.value["result"]["verdict"], "fatal");
    }

    #[test]
    fn test_config_file_and_overrides() {
        let source = temp_file(".csv", SOURCE_CSV);
        let grid = temp_file(".json", &grid_json("$300.00"));
        let config = temp_file(".yaml", "granularity: quarterly\n");

        let mut a = args(&source, &grid.path().to_string_lossy());
        a.config = Some(config.path().to_string_lossy().into_owned());
        a.granularity = Some(Granularity::Monthly);
        a.strict = true;
        let out = run_validate(a).unwrap();

        assert_eq!(out.value["assumptions"]["granularity"], "monthly");
        assert_eq!(out.value["assumptions"]["fatal_on_unparseable"], true);
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let source = temp_file(".csv", SOURCE_CSV);
        let config = temp_file(".json", "{ not json");
        let mut a = args(&source, "-");
        a.config = Some(config.path().to_string_lossy().into_owned());
        assert!(run_validate(a).is_err());
    }
}
