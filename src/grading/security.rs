//! Security grader, registered under the custom `security` dimension
//!
//! Looks for calls that execute or deserialize untrusted data and for
//! credentials bound to string literals.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::evaluation::LearningStrategy;
use crate::syntax::{CallSite, SyntaxModel};
use crate::types::{GraderResult, GradingDimension, ImprovementSuggestion, ThresholdBands, WeightSet};

use super::aggregate::{MetricOutcome, ScoreAggregator};
use super::Grader;

pub const DIMENSION: &str = "security";
pub const DANGEROUS_CALLS: &str = "dangerous_calls";
pub const SECRETS: &str = "secrets";

const WEIGHTS: &[(&str, f64)] = &[(DANGEROUS_CALLS, 0.6), (SECRETS, 0.4)];

const BANDS: &[(&str, f64)] = &[
    ("excellent", 90.0),
    ("good", 75.0),
    ("acceptable", 60.0),
    ("needs_improvement", 40.0),
];

const HARDCODED_SECRET_PENALTY: f64 = 25.0;
const INSECURE_RANDOM_PENALTY: f64 = 10.0;

/// Names that look like credentials
static CREDENTIAL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(passw(or)?d|passwd|secret|api_?key|access_?key|auth_?token|^token$|_token$)")
        .expect("Valid credential name regex")
});

/// A call pattern and what to do instead
struct DangerousCall {
    matches: fn(&CallSite) -> bool,
    penalty: f64,
    priority: u8,
    message: &'static str,
    remedy: &'static str,
}

static DANGEROUS_CALL_RULES: &[DangerousCall] = &[
    DangerousCall {
        matches: |c| c.callee == "eval",
        penalty: 30.0,
        priority: 1,
        message: "eval() executes arbitrary code",
        remedy: "Parse literals with ast.literal_eval or JSON.parse instead of eval",
    },
    DangerousCall {
        matches: |c| c.callee == "exec",
        penalty: 30.0,
        priority: 1,
        message: "Dynamic code execution",
        remedy: "Dispatch through a mapping of known functions instead of executing strings",
    },
    DangerousCall {
        matches: |c| c.callee == "os.system" || c.callee.ends_with("child_process.exec"),
        penalty: 25.0,
        priority: 1,
        message: "Shell command built at runtime",
        remedy: "Run commands with an argument list, e.g. subprocess.run([\"ls\", path])",
    },
    DangerousCall {
        matches: |c| c.callee.starts_with("subprocess.") && c.arguments.contains("shell=True"),
        penalty: 20.0,
        priority: 1,
        message: "subprocess call with shell=True",
        remedy: "Drop shell=True and pass the command as a list",
    },
    DangerousCall {
        matches: |c| {
            c.callee.ends_with(".execute")
                && (c.arguments.contains('+')
                    || c.arguments.starts_with("(f\"")
                    || c.arguments.starts_with("(f'")
                    || c.arguments.contains(".format("))
        },
        penalty: 20.0,
        priority: 1,
        message: "SQL statement assembled from strings",
        remedy: "Use parameterized queries: cursor.execute(\"SELECT * FROM t WHERE id = ?\", (id,))",
    },
    DangerousCall {
        matches: |c| matches!(c.callee.as_str(), "pickle.load" | "pickle.loads" | "marshal.loads"),
        penalty: 15.0,
        priority: 2,
        message: "Unpickling can execute arbitrary code",
        remedy: "Use json.loads for untrusted data",
    },
];

#[derive(Default)]
pub struct SecurityGrader;

impl SecurityGrader {
    pub fn new() -> Self {
        Self
    }

    fn dangerous_calls(&self, model: &SyntaxModel) -> MetricOutcome {
        let mut metric = MetricOutcome::new(DANGEROUS_CALLS, 100.0);

        for rule in DANGEROUS_CALL_RULES {
            let hits: Vec<&CallSite> = model.calls.iter().filter(|c| (rule.matches)(c)).collect();
            if hits.is_empty() {
                continue;
            }
            metric.deduct(rule.penalty);
            for call in &hits {
                metric.diagnose(call.line, rule.message);
            }
            metric.suggest(ImprovementSuggestion::new(
                DANGEROUS_CALLS,
                rule.priority,
                rule.remedy,
            ));
        }

        metric
    }

    fn secrets(&self, model: &SyntaxModel) -> MetricOutcome {
        let mut metric = MetricOutcome::new(SECRETS, 100.0);

        let hardcoded: Vec<_> = model
            .bindings
            .iter()
            .filter(|b| b.string_literal && CREDENTIAL_NAME.is_match(&b.name))
            .collect();
        for binding in &hardcoded {
            metric.deduct(HARDCODED_SECRET_PENALTY);
            metric.diagnose(
                binding.line,
                format!("'{}' is assigned a hardcoded credential", binding.name),
            );
        }
        if !hardcoded.is_empty() {
            metric.suggest(
                ImprovementSuggestion::new(
                    SECRETS,
                    1,
                    "Load credentials from the environment or a secret store",
                )
                .with_examples(vec!["password = os.environ[\"DB_PASSWORD\"]".to_string()]),
            );
        }

        let handles_credentials = model.bindings.iter().any(|b| CREDENTIAL_NAME.is_match(&b.name));
        let weak_random: Vec<&CallSite> = model
            .calls
            .iter()
            .filter(|c| c.callee.starts_with("random.") || c.callee == "Math.random")
            .collect();
        if handles_credentials && !weak_random.is_empty() {
            metric.deduct(INSECURE_RANDOM_PENALTY);
            for call in &weak_random {
                metric.diagnose(call.line, "Non-cryptographic random near credential handling");
            }
            metric.suggest(ImprovementSuggestion::new(
                SECRETS,
                2,
                "Generate tokens with the secrets module or crypto.randomBytes",
            ));
        }

        metric
    }
}

impl Grader for SecurityGrader {
    fn dimension(&self) -> GradingDimension {
        GradingDimension::Custom(DIMENSION.to_string())
    }

    fn default_weights(&self) -> WeightSet {
        WeightSet::from_pairs(WEIGHTS)
    }

    fn default_thresholds(&self) -> ThresholdBands {
        ThresholdBands::declared(BANDS)
    }

    fn description(&self) -> &str {
        "Dangerous calls and hardcoded credentials"
    }

    fn grade(&self, model: &SyntaxModel, strategy: &LearningStrategy) -> GraderResult {
        let aggregator = ScoreAggregator::new(self.dimension(), self.default_weights(), strategy);
        if model.is_empty() {
            return aggregator.neutral(model);
        }
        aggregator.aggregate(model, vec![self.dangerous_calls(model), self.secrets(model)])
    }
}
