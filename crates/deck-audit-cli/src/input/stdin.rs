use serde::de::DeserializeOwned;
use std::io::{self, Read};

use deck_audit_core::{AuditError, AuditResult};

const STDIN: &str = "stdin";

/// Read a JSON document piped on stdin.
/// Interactive stdin or an empty pipe is a load failure.
pub fn read_stdin<T: DeserializeOwned>() -> AuditResult<T> {
    if atty::is(atty::Stream::Stdin) {
        return Err(load_error("nothing piped on stdin"));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| load_error(e.to_string()))?;
    parse_piped(&buffer)
}

fn parse_piped<T: DeserializeOwned>(buffer: &str) -> AuditResult<T> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err(load_error("stdin was empty"));
    }
    serde_json::from_str(trimmed).map_err(|e| load_error(e.to_string()))
}

fn load_error(reason: impl Into<String>) -> AuditError {
    AuditError::Load {
        source_name: STDIN.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_audit_core::classifier::DisplayedGrid;

    #[test]
    fn test_piped_grid() {
        let grid: DisplayedGrid = parse_piped(" {\"tables\":[{\"header\":[\"CAMPAIGN\"]}]}\n").unwrap();
        assert_eq!(grid.tables[0].header, vec!["CAMPAIGN".to_string()]);
    }

    #[test]
    fn test_empty_pipe_is_load_error() {
        let err = parse_piped::<DisplayedGrid>("  \n").unwrap_err();
        assert!(err.is_fatal());
    }
}
