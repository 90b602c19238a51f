//! Explicit cycle configuration.
//!
//! The archive locations, declared year spans and inter-cycle gaps used to be
//! institutional knowledge baked into a script; here they are an ordered list
//! supplied by the caller as JSON:
//!
//! ```json
//! [
//!   { "path": "/archive/run/cycle1/pp", "years": 60 },
//!   { "path": "/archive/run/cycle2/pp", "years": 60, "lead_gap": 1 }
//! ]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::StitchError;

/// One simulation cycle: where its post-processed output lives, how many
/// years it simulated, and how many unsimulated years precede it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CycleSpec {
    pub path: PathBuf,
    pub years: u32,
    #[serde(default)]
    pub lead_gap: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CycleConfig {
    pub cycles: Vec<CycleSpec>,
}

impl CycleConfig {
    pub fn from_json(text: &str) -> Result<Self, StitchError> {
        let config: CycleConfig =
            serde_json::from_str(text).map_err(|e| StitchError::BadConfig(e.to_string()))?;
        if config.cycles.is_empty() {
            return Err(StitchError::BadConfig("no cycles listed".to_string()));
        }
        Ok(config)
    }

    /// Gap values for the N-cycle reducer: the lead gap of every cycle after
    /// the first.
    pub fn gaps(&self) -> Vec<i64> {
        self.cycles.iter().skip(1).map(|c| i64::from(c.lead_gap)).collect()
    }

    pub fn years(&self) -> Vec<u32> {
        self.cycles.iter().map(|c| c.years).collect()
    }

    pub fn lead_gaps(&self) -> Vec<u32> {
        self.cycles.iter().map(|c| c.lead_gap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cycle_list_with_default_gap() {
        let config = CycleConfig::from_json(
            r#"[
                { "path": "/archive/run/cycle1/pp", "years": 60 },
                { "path": "/archive/run/cycle2/pp", "years": 60, "lead_gap": 1 },
                { "path": "/archive/run/cycle3/pp", "years": 61, "lead_gap": 1 }
            ]"#,
        )
        .unwrap();
        assert_eq!(config.cycles.len(), 3);
        assert_eq!(config.cycles[0].lead_gap, 0);
        assert_eq!(config.gaps(), vec![1, 1]);
        assert_eq!(config.years(), vec![60, 60, 61]);
        assert_eq!(config.lead_gaps(), vec![0, 1, 1]);
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(
            CycleConfig::from_json("[]"),
            Err(StitchError::BadConfig(_))
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            CycleConfig::from_json("{ not json"),
            Err(StitchError::BadConfig(_))
        ));
    }
}
