//! Field-level validation of a founder's project submission.
//!
//! Validation is pure: it never touches the network, and every rule is
//! evaluated so the form can show all problems at once.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tranche_core::Settings;

const NAME_MAX_CHARS: usize = 100;
const DESCRIPTION_MIN_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 2000;
const MILESTONE_TITLE_MAX_CHARS: usize = 100;
const MILESTONE_DESCRIPTION_MIN_CHARS: usize = 10;

/// Allowed gap between the funding goal and the sum of milestone amounts.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

/// A number typed into a form field; clients send either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    /// The amount as entered, or `None` unless it is a plain decimal such as
    /// `1500` or `10.005`. JSON numbers use their shortest exact rendering.
    pub fn to_amount(&self) -> Option<DecimalAmount> {
        let text = match self {
            Self::Number(n) if n.is_finite() => format!("{n}"),
            Self::Number(_) => return None,
            Self::Text(s) => s.trim().to_string(),
        };
        if !is_plain_decimal(&text) {
            return None;
        }
        let value = text.parse::<f64>().ok()?;
        Some(DecimalAmount { value, text })
    }
}

fn is_plain_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    !(whole.is_empty() && fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

/// A decimal amount that keeps the exact text it was entered as.
///
/// `value` drives range and sum checks; `text` is what gets scaled into
/// token base units and stored, so no rounding happens after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimalAmount {
    value: f64,
    text: String,
}

impl DecimalAmount {
    pub fn as_f64(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Digits after the decimal point, ignoring trailing zeros.
    pub fn fraction_digits(&self) -> usize {
        self.text
            .split_once('.')
            .map_or(0, |(_, fraction)| fraction.trim_end_matches('0').len())
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub funding_amount: NumericInput,
    pub deadline: DateTime<Utc>,
}

/// A project as entered in the creation form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub funding_goal: NumericInput,
    pub funding_deadline: DateTime<Utc>,
    /// Overrides the configured default funding token.
    #[serde(default)]
    pub funding_token: Option<String>,
    #[serde(default)]
    pub jurors: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<MilestoneDraft>,
}

/// Configurable bounds for a submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundingLimits {
    pub min_goal: f64,
    pub max_goal: f64,
    pub max_milestones: usize,
}

impl Default for FundingLimits {
    fn default() -> Self {
        Self {
            min_goal: 100.0,
            max_goal: 10_000_000.0,
            max_milestones: 10,
        }
    }
}

impl FundingLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_goal: settings.min_funding_goal,
            max_goal: settings.max_funding_goal,
            max_milestones: settings.max_milestones,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMilestone {
    pub title: String,
    pub description: String,
    pub funding_amount: DecimalAmount,
    pub deadline: DateTime<Utc>,
}

/// A submission that passed every rule, with typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProject {
    pub name: String,
    pub description: String,
    pub cover_image_url: Option<String>,
    pub website_url: Option<String>,
    pub category: Option<String>,
    pub funding_goal: DecimalAmount,
    pub funding_deadline: DateTime<Utc>,
    pub funding_token: Option<Address>,
    pub jurors: Vec<Address>,
    pub milestones: Vec<ValidatedMilestone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid submission:")?;
        for (i, e) in self.0.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(f, "{sep}{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }
}

/// Validate a submission against `limits`, judging the deadline relative to `now`.
pub fn validate(
    submission: &ProjectSubmission,
    limits: &FundingLimits,
    now: DateTime<Utc>,
) -> Result<ValidatedProject, ValidationErrors> {
    let mut errors = Collector::default();

    let name = submission.name.trim();
    let name_len = name.chars().count();
    if name_len == 0 {
        errors.push("name", "Project name is required");
    } else if name_len > NAME_MAX_CHARS {
        errors.push("name", format!("Project name must be at most {NAME_MAX_CHARS} characters"));
    }

    let description = submission.description.trim();
    let description_len = description.chars().count();
    if description_len < DESCRIPTION_MIN_CHARS {
        errors.push(
            "description",
            format!("Description must be at least {DESCRIPTION_MIN_CHARS} characters"),
        );
    } else if description_len > DESCRIPTION_MAX_CHARS {
        errors.push(
            "description",
            format!("Description must be at most {DESCRIPTION_MAX_CHARS} characters"),
        );
    }

    let cover_image_url = optional_url(&mut errors, "coverImageUrl", &submission.cover_image_url);
    let website_url = optional_url(&mut errors, "websiteUrl", &submission.website_url);

    let funding_goal = match submission.funding_goal.to_amount() {
        None => {
            errors.push("fundingGoal", "Funding goal must be a number");
            None
        }
        Some(goal) if goal.as_f64() < limits.min_goal || goal.as_f64() > limits.max_goal => {
            errors.push(
                "fundingGoal",
                format!(
                    "Funding goal must be between {} and {}",
                    limits.min_goal, limits.max_goal
                ),
            );
            None
        }
        Some(goal) => Some(goal),
    };

    if submission.funding_deadline <= now {
        errors.push("fundingDeadline", "Funding deadline must be in the future");
    }

    let funding_token = match submission.funding_token.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<Address>() {
            Ok(address) => Some(address),
            Err(_) => {
                errors.push("fundingToken", "Funding token must be a valid address");
                None
            }
        },
    };

    let mut jurors = Vec::with_capacity(submission.jurors.len());
    for (i, raw) in submission.jurors.iter().enumerate() {
        match raw.trim().parse::<Address>() {
            Ok(address) => jurors.push(address),
            Err(_) => errors.push(format!("jurors[{i}]"), "Juror must be a valid address"),
        }
    }

    let count = submission.milestones.len();
    if count == 0 {
        errors.push("milestones", "At least one milestone is required");
    } else if count > limits.max_milestones {
        errors.push(
            "milestones",
            format!("At most {} milestones are allowed", limits.max_milestones),
        );
    }

    let mut milestones = Vec::with_capacity(count);
    for (i, draft) in submission.milestones.iter().enumerate() {
        let field = |name: &str| format!("milestones[{i}].{name}");

        let title = draft.title.trim();
        let title_len = title.chars().count();
        if title_len == 0 {
            errors.push(field("title"), "Milestone title is required");
        } else if title_len > MILESTONE_TITLE_MAX_CHARS {
            errors.push(
                field("title"),
                format!("Milestone title must be at most {MILESTONE_TITLE_MAX_CHARS} characters"),
            );
        }

        let milestone_description = draft.description.trim();
        if milestone_description.chars().count() < MILESTONE_DESCRIPTION_MIN_CHARS {
            errors.push(
                field("description"),
                format!(
                    "Milestone description must be at least \
                     {MILESTONE_DESCRIPTION_MIN_CHARS} characters"
                ),
            );
        }

        let amount = match draft.funding_amount.to_amount() {
            Some(amount) if amount.as_f64() > 0.0 => Some(amount),
            _ => {
                errors.push(field("fundingAmount"), "Funding amount must be a positive number");
                None
            }
        };

        if draft.deadline <= submission.funding_deadline {
            errors.push(
                field("deadline"),
                "Milestone deadline must be after the funding deadline",
            );
        }

        if let Some(funding_amount) = amount {
            milestones.push(ValidatedMilestone {
                title: title.to_string(),
                description: milestone_description.to_string(),
                funding_amount,
                deadline: draft.deadline,
            });
        }
    }

    if let Some(goal) = &funding_goal {
        if count > 0 && milestones.len() == count {
            let total: f64 = milestones.iter().map(|m| m.funding_amount.as_f64()).sum();
            let goal = goal.as_f64();
            if (total - goal).abs() > AMOUNT_TOLERANCE {
                errors.push(
                    "milestones",
                    format!(
                        "Milestone amounts add up to {total:.2} but the funding goal is {goal:.2}"
                    ),
                );
            }
        }
    }

    let funding_goal = match funding_goal {
        Some(goal) if errors.0.is_empty() => goal,
        _ => return Err(ValidationErrors(errors.0)),
    };

    Ok(ValidatedProject {
        name: name.to_string(),
        description: description.to_string(),
        cover_image_url,
        website_url,
        category: submission
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        funding_goal,
        funding_deadline: submission.funding_deadline,
        funding_token,
        jurors,
        milestones,
    })
}

/// Empty strings count as absent; anything else must be an absolute http(s) URL.
fn optional_url(errors: &mut Collector, field: &str, raw: &Option<String>) -> Option<String> {
    let raw = raw.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    match reqwest::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(raw.to_string()),
        _ => {
            errors.push(field, "Must be a valid http(s) URL");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn milestone(amount: f64, deadline: DateTime<Utc>) -> MilestoneDraft {
        MilestoneDraft {
            title: "Prototype".into(),
            description: "Ship a working prototype".into(),
            funding_amount: NumericInput::Number(amount),
            deadline,
        }
    }

    fn submission() -> ProjectSubmission {
        let funding_deadline = now() + Duration::days(30);
        ProjectSubmission {
            name: "Solar Cooperative".into(),
            description:
                "Community-owned solar panels for twelve rural schools, financed per milestone."
                    .into(),
            cover_image_url: Some("https://example.com/cover.png".into()),
            website_url: None,
            category: Some("energy".into()),
            funding_goal: NumericInput::Text("1000".into()),
            funding_deadline,
            funding_token: None,
            jurors: vec!["0xa000000000000000000000000000000000000001".into()],
            milestones: vec![
                milestone(400.0, funding_deadline + Duration::days(30)),
                milestone(600.0, funding_deadline + Duration::days(60)),
            ],
        }
    }

    #[test]
    fn valid_submission_passes() {
        let project = validate(&submission(), &FundingLimits::default(), now()).unwrap();
        assert_eq!(project.funding_goal.as_f64(), 1000.0);
        assert_eq!(project.funding_goal.as_str(), "1000");
        assert_eq!(project.milestones.len(), 2);
        assert_eq!(project.jurors.len(), 1);
        assert_eq!(project.category.as_deref(), Some("energy"));
    }

    #[test]
    fn milestone_sum_within_tolerance_is_accepted() {
        let mut s = submission();
        s.milestones[0].funding_amount = NumericInput::Number(400.005);
        assert!(validate(&s, &FundingLimits::default(), now()).is_ok());
    }

    #[test]
    fn milestone_sum_mismatch_is_rejected() {
        let mut s = submission();
        s.milestones[0].funding_amount = NumericInput::Number(399.0);
        let errors = validate(&s, &FundingLimits::default(), now()).unwrap_err();
        assert!(errors.has_field("milestones"));
    }

    #[test]
    fn milestone_deadline_equal_to_funding_deadline_is_rejected() {
        let mut s = submission();
        s.milestones[1].deadline = s.funding_deadline;
        let errors = validate(&s, &FundingLimits::default(), now()).unwrap_err();
        assert_eq!(
            errors.0,
            vec![FieldError {
                field: "milestones[1].deadline".into(),
                message: "Milestone deadline must be after the funding deadline".into(),
            }]
        );
    }

    #[test]
    fn collects_every_field_error() {
        let mut s = submission();
        s.name = "   ".into();
        s.description = "too short".into();
        s.website_url = Some("ftp://example.com".into());
        s.funding_goal = NumericInput::Text("lots".into());
        s.jurors.push("not-an-address".into());

        let errors = validate(&s, &FundingLimits::default(), now()).unwrap_err();
        for field in ["name", "description", "websiteUrl", "fundingGoal", "jurors[1]"] {
            assert!(errors.has_field(field), "missing error for {field}: {errors}");
        }
    }

    #[test]
    fn goal_outside_limits_is_rejected() {
        let limits = FundingLimits {
            min_goal: 5000.0,
            ..FundingLimits::default()
        };
        let errors = validate(&submission(), &limits, now()).unwrap_err();
        assert!(errors.has_field("fundingGoal"));
        // The sum check is skipped when the goal itself is invalid.
        assert!(!errors.has_field("milestones"));
    }

    #[test]
    fn milestone_count_bounds() {
        let mut s = submission();
        s.milestones.clear();
        let errors = validate(&s, &FundingLimits::default(), now()).unwrap_err();
        assert!(errors.has_field("milestones"));

        let limits = FundingLimits {
            max_milestones: 1,
            ..FundingLimits::default()
        };
        let errors = validate(&submission(), &limits, now()).unwrap_err();
        assert!(errors.has_field("milestones"));
    }

    #[test]
    fn milestone_fields_are_checked() {
        let mut s = submission();
        s.milestones[0].description = "short".into();
        s.milestones[0].funding_amount = NumericInput::Number(-1.0);
        s.milestones[1].title = String::new();

        let errors = validate(&s, &FundingLimits::default(), now()).unwrap_err();
        assert!(errors.has_field("milestones[0].description"));
        assert!(errors.has_field("milestones[0].fundingAmount"));
        assert!(errors.has_field("milestones[1].title"));
    }

    #[test]
    fn past_funding_deadline_is_rejected() {
        let mut s = submission();
        s.funding_deadline = now() - Duration::hours(1);
        let errors = validate(&s, &FundingLimits::default(), now()).unwrap_err();
        assert!(errors.has_field("fundingDeadline"));
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "name": "Clinic",
            "description": "A rural clinic with a solar-powered vaccine fridge and two nurses.",
            "fundingGoal": 500,
            "fundingDeadline": "2026-02-01T00:00:00Z",
            "milestones": [
                {
                    "title": "Build",
                    "description": "Construct the building",
                    "fundingAmount": "500",
                    "deadline": "2026-03-01T00:00:00Z"
                }
            ]
        }"#;
        let s: ProjectSubmission = serde_json::from_str(json).unwrap();
        let project = validate(&s, &FundingLimits::default(), now()).unwrap();
        assert_eq!(project.milestones[0].funding_amount.as_str(), "500");
        assert!(project.jurors.is_empty());
    }

    #[test]
    fn amounts_keep_the_entered_text() {
        let mut s = submission();
        s.funding_goal = NumericInput::Text(" 1000.00 ".into());
        s.milestones[0].funding_amount = NumericInput::Number(399.995);
        s.milestones[1].funding_amount = NumericInput::Text("600.005".into());

        let project = validate(&s, &FundingLimits::default(), now()).unwrap();
        assert_eq!(project.funding_goal.as_str(), "1000.00");
        assert_eq!(project.funding_goal.fraction_digits(), 0);
        assert_eq!(project.milestones[0].funding_amount.as_str(), "399.995");
        assert_eq!(project.milestones[1].funding_amount.fraction_digits(), 3);
    }

    #[test]
    fn non_decimal_text_is_not_an_amount() {
        for raw in ["1e3", "inf", "NaN", "12.3.4", ".", "", "0x10"] {
            assert!(
                NumericInput::Text(raw.into()).to_amount().is_none(),
                "{raw:?} accepted"
            );
        }
        assert!(NumericInput::Number(f64::NAN).to_amount().is_none());
        assert_eq!(
            NumericInput::Text(".5".into()).to_amount().map(|a| a.as_f64()),
            Some(0.5)
        );
    }
}
