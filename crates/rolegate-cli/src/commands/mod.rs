pub mod check;
pub mod inspect;
pub mod roles;

use rolegate::RuleParams;
use serde_json::Value;

pub(crate) fn to_params(pairs: &[(String, Value)]) -> RuleParams {
    pairs.iter().cloned().collect()
}
