//! Read proposed monthly targets from a free-form seed response
//!
//! A seed response is text that should contain a JSON object such as
//! `{ "monthlyTargets": { "2025-06": 12, ... }, "strategy": "even" }`,
//! possibly wrapped in prose or a markdown code fence. Extraction is
//! best-effort: when nothing usable is found the targets are spread
//! evenly instead.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::lib::{
    allocation::{coerce_target, MonthlyTargetMap},
    distribute::{distribute, Strategy},
    fiscal::FiscalYear,
    month::MonthBucket,
};

/// Strategy name recorded when the response could not be used
pub const EVEN_FALLBACK: &str = "even_fallback";

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("no JSON object found in seed response")]
    NoJson,
    #[error("seed response has no 'monthlyTargets' object")]
    MissingTargets,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedResponse {
    monthly_targets: Option<BTreeMap<String, Value>>,
    strategy: Option<String>,
    reasoning: Option<String>,
}

/// Monthly targets proposed for one allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub monthly_targets: MonthlyTargetMap,
    /// as announced by the response, or `even_fallback`
    pub strategy: String,
    pub reasoning: Option<String>,
    /// sum of `monthly_targets`
    pub total_distributed: u64,
}

impl Seed {
    /// Targets computed locally with `strategy`
    pub fn from_strategy(total: u64, months: &[MonthBucket], strategy: Strategy) -> Self {
        Self::new(distribute(total, months, strategy), strategy.to_string(), None)
    }

    /// Targets read from `response`, or an even distribution of `total` over `months`
    ///
    /// Months of the response that are not in `months` are dropped, months that
    /// are missing from the response are set to 0.
    pub fn from_response(response: &str, total: u64, months: &[MonthBucket]) -> Self {
        match extract_response(response) {
            Ok((targets, strategy, reasoning)) => {
                let mut monthly_targets = months.iter().map(|m| (*m, 0)).collect::<MonthlyTargetMap>();
                for (key, value) in targets {
                    let slot = match key.parse::<MonthBucket>() {
                        Ok(month) => monthly_targets.get_mut(&month),
                        Err(_) => None,
                    };
                    match slot {
                        Some(slot) => *slot = coerce_value(&value),
                        None => debug!(key = key.as_str(), "seed month outside of allocation dropped"),
                    }
                }
                let strategy = strategy.unwrap_or_else(|| "unspecified".to_string());
                Self::new(monthly_targets, strategy, reasoning)
            }
            Err(e) => {
                warn!(error = %e, "seed response unusable, falling back to an even distribution");
                Self::new(
                    distribute(total, months, Strategy::Even),
                    EVEN_FALLBACK.to_string(),
                    None,
                )
            }
        }
    }

    fn new(monthly_targets: MonthlyTargetMap, strategy: String, reasoning: Option<String>) -> Self {
        let total_distributed = monthly_targets.values().fold(0u64, |a, v| a.saturating_add(*v));
        Self {
            monthly_targets,
            strategy,
            reasoning,
            total_distributed,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.strategy == EVEN_FALLBACK
    }

    /// The targets written as a `plan` declaration of a plan file
    pub fn to_plan_block<'s>(
        &'s self,
        activity_id: &'s str,
        fiscal_year: FiscalYear,
        area_id: &'s str,
    ) -> PlanBlock<'s> {
        PlanBlock {
            seed: self,
            activity_id,
            fiscal_year,
            area_id,
        }
    }
}

/// Printable `plan` declaration, see `Seed::to_plan_block`
pub struct PlanBlock<'s> {
    seed: &'s Seed,
    activity_id: &'s str,
    fiscal_year: FiscalYear,
    area_id: &'s str,
}

impl fmt::Display for PlanBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "// strategy: {}, total: {}",
            self.seed.strategy, self.seed.total_distributed
        )?;
        if let Some(reasoning) = &self.seed.reasoning {
            for line in reasoning.lines() {
                writeln!(f, "// {}", line)?;
            }
        }
        writeln!(f, "plan {} {} @ {} {{", self.activity_id, self.fiscal_year, self.area_id)?;
        for (month, target) in &self.seed.monthly_targets {
            writeln!(f, "    {}: {};", month, target)?;
        }
        write!(f, "}}")
    }
}

/// Monthly value as found in a response
///
/// Numbers are truncated and negative ones count as 0, strings follow
/// `coerce_target`, anything else counts as 0.
fn coerce_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|x| *x >= 0.0).map(|x| x as u64))
            .unwrap_or(0),
        Value::String(s) => coerce_target(s),
        _ => 0,
    }
}

type Extracted = (BTreeMap<String, Value>, Option<String>, Option<String>);

/// Find the `monthlyTargets` object of a response
///
/// Tries, in order: the whole text, the contents of a code fence, the text
/// between the first `{` and the last `}`, and the latter without trailing commas.
pub fn extract_response(text: &str) -> Result<Extracted, SeedError> {
    let mut candidates = vec![text.trim().to_string()];
    if let Some(fenced) = FENCE.captures(text).and_then(|c| c.get(1)) {
        candidates.push(fenced.as_str().trim().to_string());
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            let object = &text[start..=end];
            candidates.push(object.to_string());
            candidates.push(TRAILING_COMMA.replace_all(object, "$1").into_owned());
        }
    }
    let mut found_json = false;
    for (pass, candidate) in candidates.iter().enumerate() {
        match serde_json::from_str::<SeedResponse>(candidate) {
            Ok(SeedResponse {
                monthly_targets: Some(targets),
                strategy,
                reasoning,
            }) => {
                debug!(pass, "seed response parsed");
                return Ok((targets, strategy, reasoning));
            }
            Ok(_) => found_json = true,
            Err(e) => debug!(pass, error = %e, "seed response pass failed"),
        }
    }
    if found_json {
        Err(SeedError::MissingTargets)
    } else {
        Err(SeedError::NoJson)
    }
}

#[cfg(test)]
#[rustfmt::skip]
mod test {
    use super::*;

    macro_rules! mk {
        ( $s:expr ) => { $s.parse::<MonthBucket>().unwrap() }
    }

    fn months() -> Vec<MonthBucket> {
        vec![mk!("2025-06"), mk!("2025-07"), mk!("2025-08")]
    }

    #[test]
    fn plain_json() {
        let seed = Seed::from_response(
            r#"{ "monthlyTargets": { "2025-06": 5, "2025-07": "7", "2025-08": 2.5 }, "strategy": "weighted", "totalDistributed": 14 }"#,
            20, &months(),
        );
        assert_eq!(seed.strategy, "weighted");
        assert_eq!(seed.monthly_targets.values().copied().collect::<Vec<_>>(), vec![5, 7, 2]);
        assert_eq!(seed.total_distributed, 14);
        assert!(!seed.is_fallback());
    }

    #[test]
    fn fenced_json() {
        let text = "Here is the plan:\n```json\n{\"monthlyTargets\": {\"2025-07\": 9}, \"reasoning\": \"rainy season\"}\n```\nGood luck!";
        let seed = Seed::from_response(text, 20, &months());
        assert_eq!(seed.monthly_targets[&mk!("2025-07")], 9);
        assert_eq!(seed.monthly_targets[&mk!("2025-06")], 0);
        assert_eq!(seed.reasoning.as_deref(), Some("rainy season"));
    }

    #[test]
    fn embedded_json_with_trailing_commas() {
        let text = r#"Sure! { "monthlyTargets": { "2025-06": 1, "2025-08": 3, }, "strategy": "backloaded", } Hope it helps."#;
        let seed = Seed::from_response(text, 20, &months());
        assert_eq!(seed.strategy, "backloaded");
        assert_eq!(seed.total_distributed, 4);
    }

    #[test]
    fn months_outside_are_dropped() {
        let seed = Seed::from_response(r#"{"monthlyTargets": {"2025-05": 50, "June": 3, "2025-06": 1}}"#, 20, &months());
        assert_eq!(seed.monthly_targets.len(), 3);
        assert_eq!(seed.total_distributed, 1);
    }

    #[test]
    fn unusable_response_falls_back() {
        for text in ["I cannot help with that.", r#"{"strategy": "even"}"#, "{ broken"] {
            let seed = Seed::from_response(text, 10, &months());
            assert!(seed.is_fallback(), "{}", text);
            assert_eq!(seed.monthly_targets.values().copied().collect::<Vec<_>>(), vec![4, 3, 3]);
        }
        assert_eq!(extract_response("nothing").unwrap_err(), SeedError::NoJson);
        assert_eq!(extract_response(r#"{"strategy": "even"}"#).unwrap_err(), SeedError::MissingTargets);
    }

    #[test]
    fn plan_block() {
        let seed = Seed::from_strategy(10, &months(), Strategy::Even);
        let block = seed.to_plan_block("hygiene", FiscalYear::for_start_year(2025), "village-12").to_string();
        assert_eq!(block, "\
// strategy: even, total: 10
plan hygiene FY 2025-26 @ village-12 {
    2025-06: 4;
    2025-07: 3;
    2025-08: 3;
}");
    }

    #[test]
    fn plan_block_carries_reasoning() {
        let seed = Seed::from_response(
            r#"{"monthlyTargets": {"2025-07": 2}, "strategy": "weighted", "reasoning": "rains in June\nharvest in August"}"#,
            20, &months(),
        );
        let block = seed.to_plan_block("wells", FiscalYear::for_start_year(2025), "v").to_string();
        let lines = block.lines().collect::<Vec<_>>();
        assert_eq!(lines[..4], ["// strategy: weighted, total: 2", "// rains in June", "// harvest in August", "plan wells FY 2025-26 @ v {"]);
        assert_eq!(lines.last(), Some(&"}"));
    }
}
